//! Payload types exchanged with the linkding API.
//!
//! Bookmarks, tags and profiles are passed through as raw JSON: the server
//! owns their shape and the client never rewrites them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A bookmark record as returned (or accepted) by the server.
pub type Bookmark = Value;

/// A tag record from the tag listing.
pub type Tag = Value;

/// The authenticated user's profile.
pub type UserProfile = Value;

/// Page size used by search when the caller gives none.
pub const DEFAULT_SEARCH_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SearchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl SearchOptions {
    pub fn with_limit(limit: u32) -> Self {
        Self { limit: Some(limit) }
    }

    /// The page size to request. A zero limit counts as unset.
    pub fn effective_limit(&self) -> u32 {
        self.limit.filter(|&limit| limit > 0).unwrap_or(DEFAULT_SEARCH_LIMIT)
    }
}

/// Envelope of the paginated list endpoints; only the first page is read.
#[derive(Debug, Deserialize)]
pub(crate) struct Page {
    pub results: Vec<Value>,
}

/// JavaScript-style truthiness, used for the `results` field of the
/// connection probe.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_effective_limit() {
        assert_eq!(SearchOptions::default().effective_limit(), 100);
        assert_eq!(SearchOptions::with_limit(0).effective_limit(), 100);
        assert_eq!(SearchOptions::with_limit(25).effective_limit(), 25);
    }

    #[test]
    fn test_search_options_from_json() {
        let opts: SearchOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts.limit, None);
        let opts: SearchOptions = serde_json::from_str(r#"{"limit": 10}"#).unwrap();
        assert_eq!(opts.limit, Some(10));
    }

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!(3)));
        assert!(is_truthy(&json!("x")));
    }
}
