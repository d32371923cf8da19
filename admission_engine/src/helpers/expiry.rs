use chrono::{Duration, NaiveDateTime};

/// Payment gateways report and accept times in this layout, in the merchant's local time zone.
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses a gateway timestamp. Some gateway responses use an ISO `T` separator, so both forms are accepted.
pub fn parse_gateway_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim().replacen('T', " ", 1);
    NaiveDateTime::parse_from_str(&value, EXPIRY_FORMAT).ok()
}

/// The expiry of a charge: the gateway's own expiry when it sent one, otherwise the charge time plus the configured
/// grace period.
pub fn compute_expiry(
    gateway_expiry: Option<NaiveDateTime>,
    transaction_time: NaiveDateTime,
    grace: Duration,
) -> NaiveDateTime {
    gateway_expiry.unwrap_or(transaction_time + grace)
}

/// Serde adapter for [`EXPIRY_FORMAT`] timestamps.
pub mod expiry_format {
    use chrono::NaiveDateTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::{parse_gateway_time, EXPIRY_FORMAT};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(EXPIRY_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_gateway_time(&s).ok_or_else(|| D::Error::custom(format!("Invalid timestamp: {s}")))
    }
}
