use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use wxlog_core::Units;
use wxlog_weather::DailyWeather;

/// A persisted weather request with its cached daily series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherRequestRecord {
    pub id: i64,
    pub location_query: String,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub units: Units,
    pub daily_series: Vec<DailyWeather>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything the store needs to write a record, minus the id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWeatherRequest {
    pub location_query: String,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub units: Units,
    pub daily_series: Vec<DailyWeather>,
}

/// Raw form input for creating or updating a request.
///
/// Fields are kept as text so validation can report the first problem it
/// finds. Missing `units` falls back to metric on create and to the stored
/// units on update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestInput {
    #[serde(deserialize_with = "null_as_empty")]
    pub location: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub start_date: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub end_date: String,
    pub units: Option<String>,
}

/// `null` reads as an empty string so it fails the same checks as a blank field.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl RequestInput {
    pub fn new(
        location: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            units: None,
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_input_deserializes_camel_case_with_defaults() {
        let input: RequestInput =
            serde_json::from_str(r#"{"location":"Boulder","startDate":"2024-06-01"}"#).unwrap();

        assert_eq!(input.location, "Boulder");
        assert_eq!(input.start_date, "2024-06-01");
        assert_eq!(input.end_date, "");
        assert!(input.units.is_none());
    }

    #[test]
    fn test_input_reads_null_as_blank() {
        let input: RequestInput = serde_json::from_str(
            r#"{"location":null,"startDate":"2024-06-01","endDate":null,"units":null}"#,
        )
        .unwrap();

        assert_eq!(input.location, "");
        assert_eq!(input.end_date, "");
        assert!(input.units.is_none());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let now = Utc::now();
        let record = WeatherRequestRecord {
            id: 3,
            location_query: "Boulder".into(),
            location_name: "Boulder, Colorado, United States".into(),
            latitude: 40.01499,
            longitude: -105.27055,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            units: Units::Imperial,
            daily_series: vec![],
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["locationQuery"], "Boulder");
        assert_eq!(json["startDate"], "2024-06-01");
        assert_eq!(json["units"], "imperial");
        assert!(json["dailySeries"].as_array().unwrap().is_empty());
    }
}
