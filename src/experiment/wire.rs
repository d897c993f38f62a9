//! Lenient decoding of tracking server payload fields

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// int64 fields arrive as JSON numbers or, from some proxies, as strings.
pub(crate) fn de_opt_i64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<i64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Non-negative int64, e.g. a byte count.
pub(crate) fn de_opt_u64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<u64>, D::Error> {
    Ok(de_opt_i64(deserializer)?.and_then(|n| u64::try_from(n).ok()))
}

/// Epoch milliseconds.
pub(crate) fn de_opt_millis<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error> {
    Ok(de_opt_i64(deserializer)?.and_then(DateTime::from_timestamp_millis))
}
