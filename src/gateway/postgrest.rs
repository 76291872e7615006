//! Insert gateway for a hosted PostgREST endpoint (the REST face of the practice database).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Request};
use serde::Deserialize;
use tracing::debug;

use crate::normalize::NormalizedRecord;
use crate::types::Collection;

use super::{GatewayError, PersistenceGateway};

/// Environment variables consulted by [`GatewayConfig::from_env`], in lookup order.
pub const URL_VARS: &[&str] = &["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"];
pub const KEY_VARS: &[&str] = &["SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"];

fn default_timeout_secs() -> u64 {
    30
}

/// Connection settings for [`PostgrestGateway`].
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub base_url: String,
    /// Anon (or service) key sent as `apikey` and bearer token.
    pub api_key: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GatewayConfig {
    /// Create a config with the default timeout.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Read settings from the process environment (see [`URL_VARS`] and [`KEY_VARS`]).
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, taking the first non-empty value for each setting.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |vars: &[&str]| {
            vars.iter()
                .filter_map(|v| lookup(*v))
                .find(|value| !value.trim().is_empty())
        };

        let base_url = first(URL_VARS)
            .ok_or_else(|| GatewayError::Config(format!("none of {URL_VARS:?} is set")))?;
        let api_key = first(KEY_VARS)
            .ok_or_else(|| GatewayError::Config(format!("none of {KEY_VARS:?} is set")))?;
        Ok(Self::new(base_url, api_key))
    }

    /// `true` when both the URL and the key are non-empty.
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    /// Insert endpoint for a collection.
    pub fn collection_url(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), collection.as_str())
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("api_key_set", &!self.api_key.is_empty())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Inserts each record with one `POST /rest/v1/<collection>` call.
#[derive(Debug, Clone)]
pub struct PostgrestGateway {
    client: Client,
    config: GatewayConfig,
}

impl PostgrestGateway {
    /// Build a gateway. Fails if the config is incomplete or the HTTP client cannot be built.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        if !config.is_configured() {
            return Err(GatewayError::Config("base_url and api_key must be set".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Build a gateway from the environment.
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::new(GatewayConfig::from_env()?)
    }

    /// The request [`PersistenceGateway::insert`] sends for `record`.
    ///
    /// The body is a one-element JSON array; `Prefer: return=minimal` asks the server not to echo
    /// the inserted row back.
    pub fn build_insert_request(
        &self,
        collection: Collection,
        record: &NormalizedRecord,
    ) -> Result<Request, GatewayError> {
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|e| GatewayError::Config(format!("invalid api key: {e}")))?;

        let request = self
            .client
            .post(self.config.collection_url(collection))
            .header("apikey", &self.config.api_key)
            .header(AUTHORIZATION, bearer)
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return=minimal")
            .json(&[record])
            .build()?;
        Ok(request)
    }
}

#[async_trait]
impl PersistenceGateway for PostgrestGateway {
    async fn insert(&self, collection: Collection, record: &NormalizedRecord) -> Result<(), GatewayError> {
        let request = self.build_insert_request(collection, record)?;
        let response = self.client.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        debug!(%collection, status = status.as_u16(), "insert rejected");
        Err(rejection_from_body(status.as_u16(), &body))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "msg", alias = "error_description")]
    message: String,
}

/// Turn a non-2xx response into a [`GatewayError::Rejected`].
///
/// PostgREST reports errors as `{"code","details","hint","message"}`; the `message` is passed
/// through untouched. Anything else is reported as `HTTP <status>: <body>`.
pub fn rejection_from_body(status: u16, body: &str) -> GatewayError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    };
    GatewayError::Rejected {
        status: Some(status),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::PatientRecord;

    fn patient() -> NormalizedRecord {
        NormalizedRecord::Patient(PatientRecord {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            date_of_birth: Some("1815-12-10".to_string()),
            phone: None,
            email: None,
            address: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            medical_history: None,
            allergies: None,
        })
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let owned: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| owned.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn config_prefers_unprefixed_vars() {
        let cfg = GatewayConfig::from_lookup(env(&[
            ("SUPABASE_URL", "https://a.example"),
            ("NEXT_PUBLIC_SUPABASE_URL", "https://b.example"),
            ("NEXT_PUBLIC_SUPABASE_ANON_KEY", "key"),
        ]))
        .unwrap();
        assert_eq!(cfg.base_url, "https://a.example");
        assert_eq!(cfg.api_key, "key");
        assert!(cfg.is_configured());
    }

    #[test]
    fn config_missing_key_is_an_error() {
        let err = GatewayConfig::from_lookup(env(&[
            ("SUPABASE_URL", "https://a.example"),
            ("SUPABASE_ANON_KEY", "  "),
        ]))
        .unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn config_debug_hides_key() {
        let cfg = GatewayConfig::new("https://a.example", "secret-key");
        assert!(!format!("{cfg:?}").contains("secret-key"));
    }

    #[test]
    fn insert_request_shape() {
        let gw = PostgrestGateway::new(GatewayConfig::new("https://a.example/", "key123")).unwrap();
        let req = gw.build_insert_request(Collection::Patients, &patient()).unwrap();

        assert_eq!(req.method(), &reqwest::Method::POST);
        assert_eq!(req.url().as_str(), "https://a.example/rest/v1/patients");
        assert_eq!(req.headers()["apikey"], "key123");
        assert_eq!(req.headers()[AUTHORIZATION], "Bearer key123");
        assert_eq!(req.headers()["Prefer"], "return=minimal");

        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json[0]["first_name"], "Ada");
        assert_eq!(json[0]["date_of_birth"], "1815-12-10");
        assert!(json[0]["phone"].is_null());
    }

    #[test]
    fn unconfigured_gateway_is_refused() {
        let err = PostgrestGateway::new(GatewayConfig::new("", "key")).unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn postgrest_error_message_is_passed_through() {
        let body = r#"{"code":"23505","details":null,"hint":null,"message":"duplicate key value violates unique constraint \"patients_email_key\""}"#;
        let err = rejection_from_body(409, body);
        assert_eq!(
            err.to_string(),
            "duplicate key value violates unique constraint \"patients_email_key\""
        );
    }

    #[test]
    fn non_json_error_body_is_wrapped() {
        let err = rejection_from_body(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
        assert!(matches!(err, GatewayError::Rejected { status: Some(502), .. }));
    }
}
