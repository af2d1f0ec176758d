use std::fmt;

use serde::{Deserialize, Serialize};

/// Metric key, an ordered list of name segments.
///
/// Example: `["vault", "kv", "secret", "count"]`, displayed as
/// `vault.kv.secret.count`.
///
/// Emptiness is rejected when a [`GaugeConfig`](crate::GaugeConfig) is
/// built, not here, so sinks can hold arbitrary keys.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MetricKey(Vec<String>);

impl MetricKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl<S: Into<String>> FromIterator<S> for MetricKey {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// A named dimension attached to a sample.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// ------------------------------------------------------------
// Sampled value
// ------------------------------------------------------------
//
// One result row of a collection routine: the labels that identify
// the series, and its current value.
//
// The process labels configured on the gauge are NOT part of this;
// they are appended when the value is forwarded to the sink.
//
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GaugeLabelValues {
    pub labels: Vec<Label>,
    pub value: f64,
}

impl GaugeLabelValues {
    pub fn new(labels: Vec<Label>, value: f64) -> Self {
        Self { labels, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_key_displays_dot_joined() {
        let key = MetricKey::new(["example", "count"]);
        assert_eq!(key.to_string(), "example.count");
        assert_eq!(key.segments().len(), 2);
    }

    #[test]
    fn metric_key_serializes_as_plain_list() {
        let key: MetricKey = ["a", "b"].into_iter().collect();
        assert_eq!(serde_json::to_string(&key).unwrap(), r#"["a","b"]"#);
    }

    #[test]
    fn empty_metric_key_reports_empty() {
        assert!(MetricKey::new(Vec::<String>::new()).is_empty());
    }
}
