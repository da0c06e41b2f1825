use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::server::ErrorResponse;
use crate::service::Stats;
use crate::{KvsError, Record, Result};

/// `KvsClient` contains the functionality for communication with a [`KvsServer`] over its
/// HTTP API.
///
/// [`KvsServer`]: ./struct.KvsServer.html
pub struct KvsClient {
    http: Client,
    base: Url,
}

impl KvsClient {
    /// creates a client for the server at `base_url`, for example `http://127.0.0.1:8080`
    ///
    /// # Errors
    /// `Err<KvsError::Parsing>` if `base_url` is not a valid http URL
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| KvsError::Parsing(format!("invalid server url {}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(KvsError::Parsing(format!(
                "invalid server url {}: not a base url",
                base_url
            )));
        }

        Ok(KvsClient {
            http: Client::builder().build()?,
            base,
        })
    }

    /// lists up to `limit` records starting at the first key. The server's default limit is
    /// used when `limit` is `None`.
    pub fn list(&self, limit: Option<i64>) -> Result<Vec<Record>> {
        let mut req = self.http.get(self.endpoint(&["api", "keys"]));
        if let Some(limit) = limit {
            req = req.query(&[("limit", limit)]);
        }
        decode(req.send()?)
    }

    /// gets the record of the specified `key` from the server
    /// ## Returns
    /// `Ok<Some<Record>>` if the key was found.
    /// `Ok<None>` if there is no value associated with the key
    pub fn get(&self, key: &str) -> Result<Option<Record>> {
        let resp = self.http.get(self.endpoint(&["api", "keys", key])).send()?;
        match decode(resp) {
            Ok(record) => Ok(Some(record)),
            Err(KvsError::KeyNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// creates (or overwrites) a key/value pair on the server
    /// # Errors
    /// `Err<KvsError::Validation>` if the server rejected the key
    pub fn set(&self, key: &str, value: &str) -> Result<Record> {
        let resp = self
            .http
            .post(self.endpoint(&["api", "keys"]))
            .json(&json!({ "key": key, "value": value }))
            .send()?;
        decode(resp)
    }

    /// replaces the value of `key` on the server, creating it if it does not exist
    pub fn update(&self, key: &str, value: &str) -> Result<Record> {
        let resp = self
            .http
            .put(self.endpoint(&["api", "keys", key]))
            .json(&json!({ "value": value }))
            .send()?;
        decode(resp)
    }

    /// removes a key and its associated value from the store
    /// # Errors
    /// `Err<KvsError::KeyNotFound>` if the key does not exist
    pub fn remove(&self, key: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.endpoint(&["api", "keys", key]))
            .send()?;
        check(resp).map(|_| ())
    }

    /// returns every record whose key contains `query`, ignoring case
    pub fn search(&self, query: &str) -> Result<Vec<Record>> {
        let resp = self
            .http
            .get(self.endpoint(&["api", "search"]))
            .query(&[("q", query)])
            .send()?;
        decode(resp)
    }

    /// fetches the store statistics
    pub fn stats(&self) -> Result<Stats> {
        decode(self.http.get(self.endpoint(&["api", "stats"])).send()?)
    }

    /// joins `segments` onto the base url, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// turns a non-success response into the matching [`KvsError`]
fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    debug!(%status, url = %resp.url());
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text()?;
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error)
        .unwrap_or(body);
    match status {
        StatusCode::NOT_FOUND => Err(KvsError::KeyNotFound),
        StatusCode::BAD_REQUEST => Err(KvsError::Validation(message)),
        _ => Err(KvsError::StringErr(format!("{}: {}", status, message))),
    }
}

fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    Ok(check(resp)?.json()?)
}
