//! insync-client: authentication and endpoint wrappers for the InSync web
//! API. All HTTP lives here; callers hand the flattened operation batch to
//! `insync-core` for reconciliation.

pub mod api;
pub mod auth;

pub use api::{
    fetch_balances, fetch_loyalty_status, fetch_operations, fetch_package_info, AccountBalance,
    LoyaltyStatus, PackageCondition, PackageInfo,
};
pub use auth::{login, Credentials, Session};
