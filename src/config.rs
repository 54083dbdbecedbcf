use crate::audit::sheets::ServiceAccount;
use crate::feed::FeedFormat;
use crate::logging::{log, obj, v_str, Domain, Level};

pub const DEFAULT_FEED_URL: &str = "https://www.forexfactory.com/calendar.php";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";
pub const DEFAULT_SHEET_ID: &str = "1xnVihsf6H3brKf2NOz2Puo3CX-5Vj7cUJQm9144VIh0";
pub const DEFAULT_SHEET_RANGE: &str = "Sheet1!A1";
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

#[derive(Clone, Debug)]
pub struct FeedConfig {
    pub url: String,
    pub format: FeedFormat,
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Audit sink settings. No credentials means no audit rows.
#[derive(Clone, Debug)]
pub struct AuditConfig {
    pub credentials: Option<ServiceAccount>,
    pub sheet_id: String,
    pub sheet_range: String,
    pub api_base: String,
}

impl AuditConfig {
    pub fn enabled(&self) -> bool {
        self.credentials.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub read_timeout_secs: u64,
    pub feed: FeedConfig,
    pub audit: AuditConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparseable values take defaults.
    pub fn from_vars<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let feed_url = get("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string());
        let format = match get("FEED_FORMAT") {
            Some(raw) => raw.parse::<FeedFormat>().unwrap_or_else(|err: String| {
                log(
                    Level::Warn,
                    Domain::System,
                    "config_invalid",
                    obj(&[("key", v_str("FEED_FORMAT")), ("msg", v_str(&err))]),
                );
                FeedFormat::infer(&feed_url)
            }),
            None => FeedFormat::infer(&feed_url),
        };

        Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: get("PORT").and_then(|v| v.parse().ok()).unwrap_or(5000),
            read_timeout_secs: get("READ_TIMEOUT_SECS").and_then(|v| v.parse().ok()).unwrap_or(5),
            feed: FeedConfig {
                url: feed_url,
                format,
                timeout_secs: get("FEED_TIMEOUT_SECS").and_then(|v| v.parse().ok()).unwrap_or(10),
                user_agent: get("FEED_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            },
            audit: AuditConfig {
                credentials: get("GOOGLE_SERVICE_ACCOUNT_JSON").and_then(|raw| load_credentials(&raw)),
                sheet_id: get("GOOGLE_SHEET_ID").unwrap_or_else(|| DEFAULT_SHEET_ID.to_string()),
                sheet_range: get("GOOGLE_SHEET_RANGE").unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string()),
                api_base: get("SHEETS_API_BASE").unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.to_string()),
            },
        }
    }
}

fn load_credentials(raw: &str) -> Option<ServiceAccount> {
    if raw.trim().is_empty() || raw.trim() == "{}" {
        log(
            Level::Warn,
            Domain::Audit,
            "credentials_missing",
            obj(&[("msg", v_str("empty service account json"))]),
        );
        return None;
    }
    match serde_json::from_str::<ServiceAccount>(raw) {
        Ok(account) => Some(account),
        Err(err) => {
            log(
                Level::Warn,
                Domain::Audit,
                "credentials_invalid",
                obj(&[("msg", v_str(&err.to_string()))]),
            );
            None
        }
    }
}
