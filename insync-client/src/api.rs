//! Endpoint wrappers over an authenticated [`Session`].

use anyhow::{bail, Context, Result};
use insync_core::{Money, RawOperation};
use serde::{Deserialize, Serialize};

use crate::auth::{Session, BASE_URL};

/// How many operations one `history/items` request asks for.
pub const PAGE_SIZE: usize = 50;

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryRequest {
    page_size: usize,
    offset: usize,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    items: Vec<RawOperation>,
}

fn page_request(fetched: usize, total: usize) -> Option<HistoryRequest> {
    if fetched >= total {
        return None;
    }
    Some(HistoryRequest {
        page_size: PAGE_SIZE.min(total - fetched),
        offset: fetched,
    })
}

/// Fetch up to `total_items` operations, page by page, flattened into one
/// batch. Stops early when the server returns an empty page;
/// reconciliation never sees page boundaries.
pub async fn fetch_operations(session: &Session, total_items: usize) -> Result<Vec<RawOperation>> {
    let mut all = Vec::new();
    while let Some(body) = page_request(all.len(), total_items) {
        let offset = body.offset;
        let resp = session
            .client
            .post(format!("{BASE_URL}/history/items"))
            .headers(session.headers.clone())
            .json(&body)
            .send()
            .await
            .with_context(|| format!("history page at offset {offset}"))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("history fetch failed: {status} {text}");
        }
        let page: HistoryResponse = resp.json().await.context("parse history page")?;
        if page.items.is_empty() {
            break;
        }
        all.extend(page.items);
    }
    Ok(all)
}

/// One account balance as shown in the account-list widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub title: String,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
struct AccountListResponse {
    #[serde(default)]
    accounts: Vec<AccountEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountEntry {
    #[serde(default)]
    widget_info: Option<WidgetInfo>,
}

#[derive(Debug, Deserialize)]
struct WidgetInfo {
    #[serde(default)]
    info: Option<WidgetDetails>,
}

#[derive(Debug, Deserialize)]
struct WidgetDetails {
    #[serde(default)]
    title: String,
    #[serde(default)]
    amount: Option<Money>,
}

/// Fetch account balances. Accounts without widget info are skipped, the
/// way the web client tolerates them.
pub async fn fetch_balances(session: &Session) -> Result<Vec<AccountBalance>> {
    let out: AccountListResponse = get_json(session, "/account/list", "account list").await?;
    Ok(out
        .accounts
        .into_iter()
        .filter_map(|acc| {
            let info = acc.widget_info?.info?;
            let amount = info.amount?;
            Some(AccountBalance {
                title: info.title,
                amount: amount.amount,
                currency: amount.postfix,
            })
        })
        .collect())
}

/// Package-solution subscription state and its free-service conditions.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    pub package_info: PackageSummary,
    #[serde(default)]
    pub conditions_title: String,
    #[serde(default)]
    pub conditions_description: String,
    #[serde(default)]
    pub conditions: Vec<PackageCondition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSummary {
    #[serde(default)]
    pub title: String,
    pub status: PackageStatus,
    #[serde(default)]
    pub payment_description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageStatus {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageCondition {
    #[serde(default)]
    pub text: String,
    /// 1.0 and above means the condition is met.
    #[serde(default)]
    pub percent: f64,
    pub current_value: ConditionValue,
    pub end_value: ConditionValue,
}

/// Condition progress value; `postfix` is null for unitless conditions.
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionValue {
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub postfix: Option<String>,
}

pub async fn fetch_package_info(session: &Session) -> Result<PackageInfo> {
    get_json(session, "/package-solution/info", "package info").await
}

/// Loyalty program connection state and bonus balance.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyStatus {
    pub bonus_amount: Money,
    #[serde(default)]
    pub is_connected: bool,
}

pub async fn fetch_loyalty_status(session: &Session) -> Result<LoyaltyStatus> {
    get_json(session, "/loyalty-program/status", "loyalty status").await
}

async fn get_json<T: serde::de::DeserializeOwned>(
    session: &Session,
    path: &str,
    what: &str,
) -> Result<T> {
    let resp = session
        .client
        .get(format!("{BASE_URL}{path}"))
        .headers(session.headers.clone())
        .send()
        .await
        .with_context(|| format!("{what} request"))?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        bail!("{what} failed: {status} {text}");
    }
    resp.json()
        .await
        .with_context(|| format!("parse {what} response"))
}
