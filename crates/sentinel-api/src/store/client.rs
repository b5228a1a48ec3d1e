// Async HTTP client for the PostgREST record store (Supabase REST).
//
// Base path: /rest/v1/
// Auth: `apikey` header plus `Authorization: Bearer <key>`

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::types::{
    NewSystemLog, NewThreat, RecordId, Soldier, SoldierFields, SystemLog, Threat,
};
use crate::Error;
use crate::transport::TransportConfig;

/// `Accept` value asking PostgREST for a single object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// `Prefer` value asking PostgREST to echo written rows back.
const RETURN_REPRESENTATION: &str = "return=representation";

/// Row caps for list queries.
pub const SOLDIER_LIST_LIMIT: u32 = 200;
pub const LOG_LIST_LIMIT: u32 = 200;
pub const THREAT_LIST_LIMIT: u32 = 100;

// ── Error response shape from PostgREST ─────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the soldiers / system_logs / threats tables.
#[derive(Debug, Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    base_url: Url,
}

impl StoreClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from the project URL and anon key.
    ///
    /// Injects `apikey` and `Authorization` as default headers, both
    /// marked sensitive so they never show up in debug output.
    pub fn from_key(
        base_url: &str,
        key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();

        let mut key_value = HeaderValue::from_str(key.expose_secret()).map_err(|e| {
            Error::InvalidHeader {
                name: "apikey",
                reason: e.to_string(),
            }
        })?;
        key_value.set_sensitive(true);
        headers.insert("apikey", key_value);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", key.expose_secret()))
            .map_err(|e| Error::InvalidHeader {
                name: "authorization",
                reason: e.to_string(),
            })?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let http = transport.build_client_with_headers(headers)?;
        Self::from_reqwest(base_url, http)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base URL ends with `/rest/v1/`.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with("/rest/v1") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/rest/v1/"));
        }

        Ok(url)
    }

    fn url(&self, table: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(table)?)
    }

    // ── Soldiers ─────────────────────────────────────────────────────

    /// Newest soldiers first, capped at [`SOLDIER_LIST_LIMIT`].
    pub async fn list_soldiers(&self) -> Result<Vec<Soldier>, Error> {
        self.select("soldiers", SOLDIER_LIST_LIMIT).await
    }

    pub async fn create_soldier(&self, fields: &SoldierFields) -> Result<Soldier, Error> {
        self.insert("soldiers", fields).await
    }

    pub async fn update_soldier(
        &self,
        id: &RecordId,
        fields: &SoldierFields,
    ) -> Result<Soldier, Error> {
        let url = self.url("soldiers")?;
        debug!("PATCH {url} id={id}");

        let resp = self
            .http
            .patch(url)
            .query(&[("id", format!("eq.{id}")), ("select", "*".into())])
            .header("Prefer", RETURN_REPRESENTATION)
            .header(ACCEPT, SINGLE_OBJECT)
            .json(fields)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    pub async fn delete_soldier(&self, id: &RecordId) -> Result<(), Error> {
        let url = self.url("soldiers")?;
        debug!("DELETE {url} id={id}");

        let resp = self
            .http
            .delete(url)
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        self.handle_empty(resp).await
    }

    // ── System logs ──────────────────────────────────────────────────

    pub async fn list_system_logs(&self) -> Result<Vec<SystemLog>, Error> {
        self.select("system_logs", LOG_LIST_LIMIT).await
    }

    pub async fn create_system_log(&self, entry: &NewSystemLog) -> Result<SystemLog, Error> {
        self.insert("system_logs", entry).await
    }

    // ── Threats ──────────────────────────────────────────────────────

    pub async fn list_threats(&self) -> Result<Vec<Threat>, Error> {
        self.select("threats", THREAT_LIST_LIMIT).await
    }

    pub async fn create_threat(&self, threat: &NewThreat) -> Result<Threat, Error> {
        self.insert("threats", threat).await
    }

    // ── Table verbs ──────────────────────────────────────────────────

    async fn select<T: DeserializeOwned>(&self, table: &str, limit: u32) -> Result<Vec<T>, Error> {
        let url = self.url(table)?;
        debug!("GET {url} limit={limit}");

        let resp = self
            .http
            .get(url)
            .query(&[
                ("select", "*".to_owned()),
                ("order", "created_at.desc".to_owned()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn insert<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(table)?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .query(&[("select", "*")])
            .header("Prefer", RETURN_REPRESENTATION)
            .header(ACCEPT, SINGLE_OBJECT)
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();

        if let Ok(err) = serde_json::from_str::<ErrorResponse>(&raw) {
            Error::Store {
                status: status.as_u16(),
                message: err.message.unwrap_or_else(|| status.to_string()),
                code: err.code,
            }
        } else {
            Error::Store {
                status: status.as_u16(),
                message: if raw.is_empty() { status.to_string() } else { raw },
                code: None,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_rest_prefix_once() {
        let a = StoreClient::normalize_base_url("https://abc.supabase.co").unwrap();
        assert_eq!(a.as_str(), "https://abc.supabase.co/rest/v1/");

        let b = StoreClient::normalize_base_url("https://abc.supabase.co/rest/v1/").unwrap();
        assert_eq!(b.as_str(), "https://abc.supabase.co/rest/v1/");

        let c = StoreClient::normalize_base_url("http://localhost:3000/db").unwrap();
        assert_eq!(c.join("threats").unwrap().as_str(), "http://localhost:3000/db/rest/v1/threats");
    }

    #[test]
    fn key_with_newline_is_rejected() {
        let key = SecretString::from("bad\nkey".to_owned());
        let err = StoreClient::from_key("https://abc.supabase.co", &key, &TransportConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHeader { name: "apikey", .. }), "got {err:?}");
    }
}
