use std::collections::HashMap;
use std::time::Duration;

use derive_builder::Builder;

pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset = \"utf-8\"";
pub const DEFAULT_CONTENT_ENCODING: &str = "utf-8";

/// Defaults applied to every call made by a client
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(setter(into))]
pub struct Defaults {
    #[builder(default = "DEFAULT_CONTENT_TYPE.to_string()")]
    pub content_type: String,
    #[builder(default = "DEFAULT_CONTENT_ENCODING.to_string()")]
    pub content_encoding: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            content_encoding: DEFAULT_CONTENT_ENCODING.to_string(),
        }
    }
}

impl Defaults {
    /// Current wall-clock time in seconds
    pub fn timestamp() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Per-call options, each overriding the client defaults for that call only
#[derive(Debug, Clone, Default, PartialEq, Builder)]
#[builder(default, setter(into))]
pub struct CallOptions {
    pub headers: HashMap<String, String>,
    pub priority: Option<u8>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub timestamp: Option<i64>,
    /// Bound on the wait for a response, calls wait indefinitely when unset
    pub timeout: Option<Duration>,
}

impl CallOptionsBuilder {
    /// Add a single request header
    pub fn header<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> &mut Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let d = Defaults::default();
        assert_eq!(d.content_type, "text/plain; charset = \"utf-8\"");
        assert_eq!(d.content_encoding, "utf-8");

        assert_eq!(DefaultsBuilder::default().build().unwrap(), d);
        assert!(Defaults::timestamp() > 1_500_000_000);
    }

    #[test]
    fn test_build_options() {
        let o = CallOptionsBuilder::default()
            .header("X-One", "1")
            .header("X-Two", "2")
            .priority(5u8)
            .content_type("application/json".to_string())
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap();

        assert_eq!(o.headers.len(), 2);
        assert_eq!(o.headers["X-Two"], "2");
        assert_eq!(o.priority, Some(5));
        assert_eq!(o.content_type.as_deref(), Some("application/json"));
        assert_eq!(o.content_encoding, None);
        assert_eq!(o.timestamp, None);
        assert_eq!(o.timeout, Some(Duration::from_secs(3)));
    }
}
