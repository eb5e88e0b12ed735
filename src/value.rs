use chrono::{DateTime, NaiveDateTime, TimeZone};

/// Spark's timestamp wire format, always rendered with a literal `Z`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A call argument before wire encoding.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Wall-clock time, taken to be UTC.
    Timestamp(NaiveDateTime),
    List(Vec<Value>),
}

impl Value {
    pub fn null() -> Self {
        Self::Null
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn timestamp(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }

    /// JSON representation used in request bodies.
    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(value) => serde_json::Value::Bool(*value),
            Self::Integer(value) => serde_json::Value::from(*value),
            Self::Float(value) => serde_json::Value::from(*value),
            Self::Text(value) => serde_json::Value::String(value.clone()),
            Self::Timestamp(value) => serde_json::Value::String(format_timestamp(value)),
            Self::List(values) => values.iter().map(Value::to_json).collect(),
        }
    }

    /// Query-string text. `Null` has none.
    pub(crate) fn to_query_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(value) => Some(value.to_string()),
            Self::Integer(value) => Some(value.to_string()),
            Self::Float(value) => Some(value.to_string()),
            Self::Text(value) => Some(value.clone()),
            Self::Timestamp(value) => Some(format_timestamp(value)),
            Self::List(values) => Some(
                values
                    .iter()
                    .filter_map(Value::to_query_text)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }
}

pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

/// Keeps the wall-clock fields and drops the offset.
impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(value: DateTime<Tz>) -> Self {
        Self::Timestamp(value.naive_local())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
    use serde_json::json;

    use crate::Value;

    #[test]
    fn naive_timestamp_gets_millis_and_z() {
        let dt = NaiveDate::from_ymd_opt(2016, 7, 28)
            .and_then(|d| d.and_hms_opt(13, 14, 35))
            .expect("valid date");
        assert_eq!(
            Value::from(dt).to_json(),
            json!("2016-07-28T13:14:35.000Z")
        );
    }

    #[test]
    fn sub_second_timestamp_keeps_milliseconds() {
        let dt = NaiveDate::from_ymd_opt(2016, 7, 28)
            .and_then(|d| d.and_hms_micro_opt(13, 14, 35, 250_999))
            .expect("valid date");
        assert_eq!(
            Value::from(dt).to_query_text().as_deref(),
            Some("2016-07-28T13:14:35.250Z")
        );
    }

    #[test]
    fn aware_timestamp_keeps_wall_clock() {
        let utc = Utc.with_ymd_and_hms(2017, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            Value::from(utc).to_query_text().as_deref(),
            Some("2017-01-02T03:04:05.000Z")
        );

        let offset = FixedOffset::east_opt(2 * 3600).expect("valid offset");
        let local = offset.with_ymd_and_hms(2017, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            Value::from(local).to_query_text().as_deref(),
            Some("2017-01-02T03:04:05.000Z")
        );
    }

    #[test]
    fn text_is_passed_through_unchanged() {
        assert_eq!(Value::text("Grüße 👋").to_json(), json!("Grüße 👋"));
    }

    #[test]
    fn option_and_list_conversions() {
        assert_eq!(Value::from(None::<&str>), Value::Null);
        assert_eq!(Value::from(None::<&str>).to_query_text(), None);
        assert_eq!(
            Value::from(vec!["a", "b"]).to_json(),
            json!(["a", "b"])
        );
    }
}
