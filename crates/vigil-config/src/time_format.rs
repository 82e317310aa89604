//! 时间（一天中的某个时刻）的序列化，格式为 `HH:MM` 或 `HH:MM:SS`

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serializer};

pub fn parse(value: &str) -> Result<NaiveTime, chrono::ParseError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S").or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
}

pub mod option {
    use super::*;

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&time.format("%H:%M:%S").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<String> = Option::deserialize(deserializer)?;
        value
            .map(|s| {
                parse(&s).map_err(|e| {
                    serde::de::Error::custom(format!("invalid time of day '{}': {}", s, e))
                })
            })
            .transpose()
    }
}
