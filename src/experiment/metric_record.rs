//! Metric Record - latest value of a run metric as reported by the server

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Metric Record represents the latest logged value of one run metric.
///
/// The value is kept exactly as the tracking service delivered it (a JSON
/// scalar). Servers encode non-finite floats as strings such as `"NaN"`, and
/// a metric can come back null, so numeric interpretation happens on demand
/// through [`MetricRecord::numeric`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    key: String,
    value: serde_json::Value,
    step: i64,
    timestamp: DateTime<Utc>,
}

impl MetricRecord {
    /// Create a new metric record from a float value.
    ///
    /// # Arguments
    ///
    /// * `key` - Metric name/key (e.g., "loss", "accuracy")
    /// * `value` - Metric value
    /// * `step` - Training step or epoch number
    #[must_use]
    pub fn new(key: impl Into<String>, value: f64, step: i64) -> Self {
        let value = serde_json::Number::from_f64(value)
            .map_or_else(|| serde_json::Value::String(value.to_string()), serde_json::Value::Number);
        Self::builder(key, value).step(step).build()
    }

    /// Create a builder from a raw wire value.
    #[must_use]
    pub fn builder(key: impl Into<String>, value: serde_json::Value) -> MetricRecordBuilder {
        MetricRecordBuilder::new(key, value)
    }

    /// Get the metric key/name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the raw metric value.
    #[must_use]
    pub const fn raw_value(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get the step/epoch number.
    #[must_use]
    pub const fn step(&self) -> i64 {
        self.step
    }

    /// Get the timestamp when the metric was recorded.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether the value is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self.value, serde_json::Value::Null)
    }

    /// Interpret the value as a float.
    ///
    /// Returns `Ok(None)` for a null value.
    ///
    /// # Errors
    ///
    /// Returns `Error::Conversion` if the value is neither a number nor a
    /// string that parses as one
    pub fn numeric(&self) -> Result<Option<f64>> {
        match &self.value {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| self.conversion_error()),
            serde_json::Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| self.conversion_error()),
            _ => Err(self.conversion_error()),
        }
    }

    fn conversion_error(&self) -> Error {
        Error::Conversion {
            metric: self.key.clone(),
            value: self.value.to_string(),
        }
    }
}

/// Builder for `MetricRecord`.
#[derive(Debug)]
pub struct MetricRecordBuilder {
    key: String,
    value: serde_json::Value,
    step: i64,
    timestamp: DateTime<Utc>,
}

impl MetricRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
            step: 0,
            timestamp: Utc::now(),
        }
    }

    /// Set the step.
    #[must_use]
    pub const fn step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    /// Set a custom timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Build the `MetricRecord`.
    #[must_use]
    pub fn build(self) -> MetricRecord {
        MetricRecord {
            key: self.key,
            value: self.value,
            step: self.step,
            timestamp: self.timestamp,
        }
    }
}
