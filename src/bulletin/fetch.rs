//! Bulletin download.

use reqwest::blocking::Client;

use crate::error::IndexError;

pub const DEFAULT_BASE_URL: &str = "https://www.indec.gob.ar/ftp/cuadros/economia/";
const BASE_URL_ENV: &str = "RWAGES_BULLETIN_BASE_URL";

/// Where bulletin bytes come from.
pub trait BulletinSource {
    fn fetch(&self, filename: &str) -> Result<Vec<u8>, IndexError>;
}

/// Resolve the base URL: explicit override, then `.env`/environment, then default.
pub fn resolve_base_url(explicit: Option<&str>) -> String {
    if let Some(url) = explicit {
        return url.to_string();
    }
    dotenvy::dotenv().ok();
    std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

/// Plain GET against `<base_url><filename>`.
///
/// Timeouts are left to the HTTP client's defaults.
pub struct HttpBulletinSource {
    client: Client,
    base_url: String,
}

impl HttpBulletinSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, filename: &str) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{filename}", self.base_url)
        } else {
            format!("{}/{filename}", self.base_url)
        }
    }
}

impl BulletinSource for HttpBulletinSource {
    fn fetch(&self, filename: &str) -> Result<Vec<u8>, IndexError> {
        let fetch_err = |reason: String| IndexError::Fetch {
            artifact: filename.to_string(),
            reason,
        };

        let url = self.url_for(filename);
        tracing::debug!(url = %url, "Fetching bulletin");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| fetch_err(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(fetch_err(format!("request failed with status {}", resp.status())));
        }

        let bytes = resp
            .bytes()
            .map_err(|e| fetch_err(format!("failed to read response body: {e}")))?;
        if bytes.is_empty() {
            return Err(fetch_err("empty response body".to_string()));
        }

        Ok(bytes.to_vec())
    }
}
