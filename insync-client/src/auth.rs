//! Three-step login against the InSync authentication endpoints.
//!
//! Step order matters: the login check binds the server-side session, the
//! basic credential unlocks it, and only then does the token endpoint hand
//! out a bearer token — in the `authorization` response header, not the
//! body.

use anyhow::{bail, Context, Result};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const BASE_URL: &str = "https://insync3.alfa-bank.by/web/api";

/// Everything the login flow needs from the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub login: String,
    /// Base64 basic-auth secret for the password step.
    pub auth_basic: String,
    /// `x-client-app` header value the web client registers with.
    pub client_app: String,
    /// `x-dev-id` header value tied to the enrolled device.
    pub dev_id: String,
}

/// An authenticated API handle: HTTP client plus the header set every
/// endpoint call must carry.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) client: reqwest::Client,
    pub(crate) headers: HeaderMap,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: String,
}

fn base_headers(creds: &Credentials) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert("x-lang", HeaderValue::from_static("ru"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://insnc.by"));
    headers.insert(REFERER, HeaderValue::from_static("https://insnc.by"));
    headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
    headers.insert(
        "x-session-id",
        HeaderValue::from_str(&Uuid::new_v4().to_string())?,
    );
    headers.insert("x-api-version", HeaderValue::from_static("52"));
    headers.insert("x-client-app", HeaderValue::from_str(&creds.client_app)?);
    headers.insert("x-dev-id", HeaderValue::from_str(&creds.dev_id)?);
    Ok(headers)
}

/// Run the full login flow and return a session ready for API calls.
pub async fn login(creds: &Credentials) -> Result<Session> {
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .context("build http client")?;
    let mut headers = base_headers(creds)?;

    // Step 1: login check
    let resp = client
        .post(format!("{BASE_URL}/authentication/check-client/credentials"))
        .headers(headers.clone())
        .json(&serde_json::json!({ "login": creds.login }))
        .send()
        .await
        .context("check-client request")?;
    expect_success(resp, "check-client").await?;

    // Step 2: password (basic-auth secret)
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Basic {}", creds.auth_basic))?,
    );
    let resp = client
        .get(format!("{BASE_URL}/authentication/login"))
        .headers(headers.clone())
        .send()
        .await
        .context("login request")?;
    expect_success(resp, "login").await?;

    // Step 3: bearer token
    let resp = client
        .get(format!("{BASE_URL}/authentication/session/token"))
        .headers(headers.clone())
        .send()
        .await
        .context("session token request")?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("session token failed: {status} {body}");
    }
    let token = resp
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .context("no authorization header in token response")?;
    if !token.starts_with("Bearer ") {
        bail!("unexpected token format: {token}");
    }
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&token)?);

    Ok(Session { client, headers })
}

async fn expect_success(resp: reqwest::Response, step: &str) -> Result<()> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("{step} failed: {status} {body}");
    }
    let out: StatusResponse = resp
        .json()
        .await
        .with_context(|| format!("parse {step} response"))?;
    if out.status != "SUCCESS" {
        bail!("{step} rejected: status={}", out.status);
    }
    Ok(())
}
