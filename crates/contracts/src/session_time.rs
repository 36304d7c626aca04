//! Session time - signed offset from the start of the data stream.
//!
//! `chrono::TimeDelta` has no serde support of its own, so the helper
//! modules below (de)serialize it as fractional seconds, which is also the
//! shape external consumers of the lap table expect.

use chrono::TimeDelta;

/// Duration since the start of the session's data stream.
pub type SessionTime = TimeDelta;

/// Build a session time from fractional seconds (microsecond precision).
pub fn from_secs_f64(secs: f64) -> SessionTime {
    TimeDelta::microseconds((secs * 1_000_000.0).round() as i64)
}

/// Convert a session time to fractional seconds.
pub fn as_secs_f64(time: SessionTime) -> f64 {
    time.num_seconds() as f64 + f64::from(time.subsec_nanos()) / 1e9
}

/// `#[serde(with = "contracts::serde_seconds")]` for `SessionTime` fields.
pub mod serde_seconds {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{as_secs_f64, from_secs_f64, SessionTime};

    pub fn serialize<S>(time: &SessionTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(as_secs_f64(*time))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SessionTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(from_secs_f64(secs))
    }
}

/// `#[serde(with = "contracts::serde_seconds_opt")]` for `Option<SessionTime>` fields.
pub mod serde_seconds_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{as_secs_f64, from_secs_f64, SessionTime};

    pub fn serialize<S>(time: &Option<SessionTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(t) => serializer.serialize_some(&as_secs_f64(*t)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SessionTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<f64>::deserialize(deserializer)?;
        Ok(secs.map(from_secs_f64))
    }
}
