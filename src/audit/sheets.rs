use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::time::Duration;
use url::Url;

use super::{AuditRow, AuditSink};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_TTL_SECS: i64 = 3600;
const REQUEST_TIMEOUT_SECS: u64 = 10;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a Google service-account key file that the sink needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// `{api_base}/v4/spreadsheets/{sheet_id}/values/{range}:append?valueInputOption=USER_ENTERED`
pub fn append_url(api_base: &str, sheet_id: &str, range: &str) -> Result<Url> {
    let mut url = Url::parse(api_base).with_context(|| format!("invalid sheets api base {}", api_base))?;
    let target = format!("{}:append", range);
    url.path_segments_mut()
        .map_err(|_| anyhow!("sheets api base cannot hold a path: {}", api_base))?
        .pop_if_empty()
        .extend(["v4", "spreadsheets", sheet_id, "values", target.as_str()]);
    url.query_pairs_mut()
        .append_pair("valueInputOption", "USER_ENTERED");
    Ok(url)
}

/// Appends audit rows to a Google Sheet as a service account.
///
/// Each append signs a fresh RS256 assertion, exchanges it for an access
/// token at the account's `token_uri`, then calls `values:append`.
pub struct SheetsSink {
    client: Client,
    account: ServiceAccount,
    key: EncodingKey,
    append_url: Url,
}

impl SheetsSink {
    pub fn new(account: ServiceAccount, sheet_id: &str, range: &str, api_base: &str) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .context("service account private_key is not an RSA PEM key")?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            append_url: append_url(api_base, sheet_id, range)?,
            account,
            key,
        })
    }

    fn assertion(&self, now_secs: i64) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.account.private_key_id.clone();
        let claims = Claims {
            iss: &self.account.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.account.token_uri,
            iat: now_secs,
            exp: now_secs + ASSERTION_TTL_SECS,
        };
        Ok(encode(&header, &claims, &self.key)?)
    }

    async fn access_token(&self) -> Result<String> {
        let assertion = self.assertion(Utc::now().timestamp())?;
        let resp = self
            .client
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .context("token request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("token endpoint returned {}: {}", status, body));
        }
        let token: TokenResponse = resp.json().await.context("token response")?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl AuditSink for SheetsSink {
    fn name(&self) -> &'static str {
        "sheets"
    }

    async fn append(&self, row: &AuditRow) -> Result<()> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .post(self.append_url.clone())
            .bearer_auth(token)
            .json(&json!({ "values": [row.cells()] }))
            .send()
            .await
            .context("append request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("sheets append returned {}: {}", status, body));
        }
        Ok(())
    }
}
