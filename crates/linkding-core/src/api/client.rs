//! API client for a linkding server's REST API.
//!
//! Every method is a single request/response exchange: build the URL, send
//! it with the token header, and map the status code onto a value or an
//! `ApiError`. Nothing is retried or cached.

use std::sync::Arc;

use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Configuration;
use crate::models::{is_truthy, Bookmark, Page, SearchOptions, Tag, UserProfile};
use crate::permissions::PermissionBroker;

use super::{ApiError, Operation};

// ============================================================================
// Constants
// ============================================================================

/// Page size for the tag listing; large enough to fetch every tag at once.
const TAG_PAGE_LIMIT: u32 = 5000;

/// Page size for the connection probe.
const PROBE_PAGE_LIMIT: u32 = 1;

const BOOKMARKS_PATH: &str = "/api/bookmarks/";
const CHECK_PATH: &str = "/api/bookmarks/check/";
const TAGS_PATH: &str = "/api/tags/";
const PROFILE_PATH: &str = "/api/user/profile/";

/// API client for one linkding server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct LinkdingApi {
    client: Client,
    configuration: Configuration,
    permissions: Arc<dyn PermissionBroker>,
}

impl LinkdingApi {
    /// Create a new API client. No request timeout is set; callers that
    /// want one pass their own `Client` to `with_client`.
    pub fn new(
        configuration: Configuration,
        permissions: Arc<dyn PermissionBroker>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().build()?;

        Ok(Self::with_client(client, configuration, permissions))
    }

    /// Create a client on an existing connection pool. Transport settings
    /// such as timeouts come from `client`.
    pub fn with_client(
        client: Client,
        configuration: Configuration,
        permissions: Arc<dyn PermissionBroker>,
    ) -> Self {
        Self {
            client,
            configuration,
            permissions,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    // ===== Request helpers =====

    /// Full URL for `path`, with query values percent-encoded.
    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> String {
        let mut url = format!("{}{}", self.configuration.base_url(), path);
        for (i, (key, value)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(&encode_component(value));
        }
        url
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        debug!(method = %method, url = url, "Sending request");
        self.client
            .request(method, url)
            .header(header::AUTHORIZATION, self.configuration.authorization().clone())
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("{}: {}", e, ApiError::truncate_body(&text)))
        })
    }

    /// GET `url` and parse the body when the status is 200.
    async fn get<T: DeserializeOwned>(&self, operation: Operation, url: &str) -> Result<T, ApiError> {
        let response = self.request(Method::GET, url).send().await?;

        let status = response.status();
        if status == StatusCode::OK {
            Self::read_json(response).await
        } else {
            warn!(%operation, status = status.as_u16(), "Unexpected response status");
            Err(ApiError::Status { operation, status })
        }
    }

    // ===== Bookmarks =====

    /// Fetch a single bookmark by id
    pub async fn get_bookmark(&self, bookmark_id: u64) -> Result<Bookmark, ApiError> {
        let url = self.endpoint(&format!("{}{}/", BOOKMARKS_PATH, bookmark_id), &[]);
        self.get(Operation::GetBookmark, &url).await
    }

    /// Create a bookmark. Returns the server's copy of the new record.
    pub async fn save_bookmark(&self, bookmark: &Bookmark) -> Result<Bookmark, ApiError> {
        let url = self.endpoint(BOOKMARKS_PATH, &[]);
        let response = self
            .request(Method::POST, &url)
            .json(bookmark)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => Self::read_json(response).await,
            StatusCode::BAD_REQUEST => {
                let body = integral_floats_as_ints(Self::read_json(response).await?);
                warn!("Bookmark rejected by server validation");
                Err(ApiError::Validation { body })
            }
            status => {
                warn!(status = status.as_u16(), "Unexpected response status saving bookmark");
                Err(ApiError::Request { status })
            }
        }
    }

    /// Delete a bookmark by id. Returns `true` once the server confirms.
    pub async fn delete_bookmark(&self, bookmark_id: u64) -> Result<bool, ApiError> {
        let url = self.endpoint(&format!("{}{}/", BOOKMARKS_PATH, bookmark_id), &[]);
        let response = self.request(Method::DELETE, &url).send().await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            Ok(true)
        } else {
            warn!(status = status.as_u16(), "Unexpected response status deleting bookmark");
            Err(ApiError::Status {
                operation: Operation::DeleteBookmark,
                status,
            })
        }
    }

    /// Search bookmarks with linkding's query syntax (words, `#tags`, `!unread`).
    /// Only the first page is returned.
    pub async fn search(&self, text: &str, options: &SearchOptions) -> Result<Vec<Bookmark>, ApiError> {
        let limit = options.effective_limit().to_string();
        let url = self.endpoint(BOOKMARKS_PATH, &[("q", text), ("limit", &limit)]);
        let page: Page = self.get(Operation::Search, &url).await?;
        debug!(count = page.results.len(), "Search returned bookmarks");
        Ok(page.results)
    }

    /// Look up a URL on the server: whether it is bookmarked already, plus
    /// any metadata the server scraped for it.
    pub async fn check(&self, url: &str) -> Result<Value, ApiError> {
        let endpoint = self.endpoint(CHECK_PATH, &[("url", url)]);
        self.get(Operation::Check, &endpoint).await
    }

    // ===== Tags and profile =====

    /// Fetch all tags
    pub async fn get_tags(&self) -> Result<Vec<Tag>, ApiError> {
        let limit = TAG_PAGE_LIMIT.to_string();
        let url = self.endpoint(TAGS_PATH, &[("limit", &limit)]);
        let page: Page = self.get(Operation::GetTags, &url).await?;
        debug!(count = page.results.len(), "Loaded tags");
        Ok(page.results)
    }

    /// Fetch the profile of the token's owner
    pub async fn get_user_profile(&self) -> Result<UserProfile, ApiError> {
        let url = self.endpoint(PROFILE_PATH, &[]);
        self.get(Operation::GetUserProfile, &url).await
    }

    // ===== Connectivity =====

    /// Ask the host for access to the server, then probe the bookmark list.
    ///
    /// Returns `false` without touching the network when access is denied.
    /// Any failure after that (transport, status, body) also yields `false`.
    pub async fn test_connection(&self) -> bool {
        let origins = [self.configuration.origin_pattern()];
        if !self.permissions.request(&origins).await {
            debug!(origin = %origins[0], "Host permission denied");
            return false;
        }

        match self.probe().await {
            Ok(connected) => connected,
            Err(e) => {
                debug!(error = %e, "Connection test failed");
                false
            }
        }
    }

    async fn probe(&self) -> Result<bool, ApiError> {
        let limit = PROBE_PAGE_LIMIT.to_string();
        let url = self.endpoint(BOOKMARKS_PATH, &[("limit", &limit)]);
        let body: Value = self.get(Operation::TestConnection, &url).await?;
        Ok(body.get("results").map(is_truthy).unwrap_or(false))
    }
}

/// Percent-encode a query value the way browsers' `encodeURIComponent` does:
/// `urlencoding` escapes everything but `A-Z a-z 0-9 - _ . ~`, and
/// `encodeURIComponent` additionally leaves `! ' ( ) *` alone.
fn encode_component(value: &str) -> String {
    // Every '%' in the encoded output starts an escape triplet, so these
    // replacements can only hit whole escapes.
    urlencoding::encode(value)
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}

/// Rewrite floats with no fractional part as integers, so `1.0` renders as
/// `1` in validation messages the way a JavaScript UI would show it.
fn integral_floats_as_ints(value: Value) -> Value {
    match value {
        Value::Number(n) if !n.is_i64() && !n.is_u64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
                Value::from(f as i64)
            }
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(integral_floats_as_ints).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, integral_floats_as_ints(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::AutoGrant;
    use serde_json::json;

    fn api(base_url: &str) -> LinkdingApi {
        let config = Configuration::new(base_url, "token").unwrap();
        LinkdingApi::new(config, Arc::new(AutoGrant)).unwrap()
    }

    #[test]
    fn test_endpoint_without_query() {
        let api = api("https://links.example.com/");
        assert_eq!(
            api.endpoint("/api/bookmarks/42/", &[]),
            "https://links.example.com/api/bookmarks/42/"
        );
    }

    #[test]
    fn test_endpoint_encodes_query_values() {
        let api = api("https://links.example.com/linkding");
        assert_eq!(
            api.endpoint(BOOKMARKS_PATH, &[("q", "foo bar #rust"), ("limit", "100")]),
            "https://links.example.com/linkding/api/bookmarks/?q=foo%20bar%20%23rust&limit=100"
        );
        assert_eq!(
            api.endpoint(CHECK_PATH, &[("url", "https://a.example/?x=1&y=2")]),
            "https://links.example.com/linkding/api/bookmarks/check/?url=https%3A%2F%2Fa.example%2F%3Fx%3D1%26y%3D2"
        );
    }

    #[test]
    fn test_encode_component_matches_browser() {
        assert_eq!(encode_component("foo bar"), "foo%20bar");
        assert_eq!(encode_component("!unread (new)*'"), "!unread%20(new)*'");
        assert_eq!(encode_component("#rust & web"), "%23rust%20%26%20web");
        // A literal percent sign must not be mistaken for an escape
        assert_eq!(encode_component("%21"), "%2521");
        assert_eq!(encode_component("é"), "%C3%A9");
    }

    #[test]
    fn test_integral_floats_as_ints() {
        let body: Value = serde_json::from_str(r#"{"x":1.0,"y":"é","z":[2.5,-3.0],"n":7}"#).unwrap();
        let body = integral_floats_as_ints(body);
        assert_eq!(body, json!({"x": 1, "y": "é", "z": [2.5, -3], "n": 7}));
        assert_eq!(
            ApiError::Validation { body }.to_string(),
            r#"Validation error: {"x":1,"y":"é","z":[2.5,-3],"n":7}"#
        );
    }
}
