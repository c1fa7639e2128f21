//! Query-string and path-segment encoding for endpoint paths.

use url::form_urlencoded;

/// Ordered query parameters. Empty values are dropped, so optional filters
/// can be passed through unconditionally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.pairs.push((key.into(), value));
        }
        self
    }

    pub fn param_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.param(key, value.to_string()),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `?k=v&…`, or an empty string when there are no parameters.
    pub fn to_query_string(&self) -> String {
        if self.pairs.is_empty() {
            return String::new();
        }
        // A non-empty serializer target would get a `&` before the first pair.
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish();
        format!("?{encoded}")
    }

    pub fn append_to(&self, path: &str) -> String {
        format!("{path}{}", self.to_query_string())
    }
}

/// Percent-encodes one path segment. `+` would read as a literal plus in a
/// path, so spaces become `%20`.
pub fn segment(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
