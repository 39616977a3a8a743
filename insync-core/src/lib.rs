//! insync-core: operation record model and the reconciliation engine.

pub mod reconcile;
pub mod record;

pub use reconcile::{reconcile, ReconcileError};
pub use record::{Category, Icon, LedgerRow, Money, RawOperation, RowKind};
