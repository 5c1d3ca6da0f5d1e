//! Daily series assembly from the archive and forecast sources.
//!
//! Building a series is two explicit steps: [`plan_sub_ranges`] partitions the
//! requested range into typed sub-range requests relative to "today", then
//! [`DailySeriesBuilder`] fetches each one in order and [`merge_daily`] stitches
//! the results into a single date-sorted series.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Days, NaiveDate, Utc};
use tracing::instrument;
use wxlog_core::{Units, WeatherError};

use crate::provider::WeatherProvider;
use crate::types::DailyWeather;
use crate::validate::DateRange;

/// Which upstream source a sub-range is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Completed historical days.
    Archive,
    /// Today and future days.
    Forecast,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Archive => write!(f, "archive"),
            SourceKind::Forecast => write!(f, "forecast"),
        }
    }
}

/// One upstream request: an inclusive date span plus the source serving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubRange {
    pub kind: SourceKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Split `range` into at most two sub-ranges around `today`.
///
/// Archive never receives `today` or later; forecast always starts at `today`
/// or later.
pub fn plan_sub_ranges(range: &DateRange, today: NaiveDate) -> Vec<SubRange> {
    if range.end < today {
        return vec![SubRange {
            kind: SourceKind::Archive,
            start: range.start,
            end: range.end,
        }];
    }

    if range.start > today {
        return vec![SubRange {
            kind: SourceKind::Forecast,
            start: range.start,
            end: range.end,
        }];
    }

    let mut plan = Vec::with_capacity(2);
    if let Some(yesterday) = today.checked_sub_days(Days::new(1)) {
        if range.start <= yesterday {
            plan.push(SubRange {
                kind: SourceKind::Archive,
                start: range.start,
                end: yesterday,
            });
        }
    }
    plan.push(SubRange {
        kind: SourceKind::Forecast,
        start: today,
        end: range.end,
    });
    plan
}

/// Merge fetched batches into one series keyed by date.
///
/// Later batches overwrite earlier entries for the same date. Days outside
/// `range` are dropped. The result is strictly ascending by date.
pub fn merge_daily<I>(batches: I, range: &DateRange) -> Vec<DailyWeather>
where
    I: IntoIterator<Item = Vec<DailyWeather>>,
{
    let mut by_date: BTreeMap<NaiveDate, DailyWeather> = BTreeMap::new();
    for day in batches.into_iter().flatten() {
        if !range.contains(day.date) {
            tracing::debug!("Dropping out-of-range day {}", day.date);
            continue;
        }
        by_date.insert(day.date, day);
    }
    by_date.into_values().collect()
}

/// Inputs needed to build one daily series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub range: DateRange,
    pub units: Units,
}

#[derive(Debug, Clone)]
pub struct DailySeriesBuilder {
    provider: WeatherProvider,
}

impl DailySeriesBuilder {
    pub fn new(provider: WeatherProvider) -> Self {
        Self { provider }
    }

    /// Build the series relative to the current UTC date.
    pub async fn build_series(
        &self,
        request: &SeriesRequest,
    ) -> Result<Vec<DailyWeather>, WeatherError> {
        self.build_series_on(request, Utc::now().date_naive()).await
    }

    /// Build the series relative to a fixed `today`.
    ///
    /// Sub-ranges are fetched sequentially; the first failure aborts the
    /// whole build and no partial series is returned.
    #[instrument(skip(self), level = "info")]
    pub async fn build_series_on(
        &self,
        request: &SeriesRequest,
        today: NaiveDate,
    ) -> Result<Vec<DailyWeather>, WeatherError> {
        let plan = plan_sub_ranges(&request.range, today);
        tracing::debug!("Planned {} sub-range request(s)", plan.len());

        let mut batches = Vec::with_capacity(plan.len());
        for sub_range in &plan {
            let days = self
                .provider
                .fetch_daily(sub_range, request.latitude, request.longitude, request.units)
                .await?;
            batches.push(days);
        }

        let series = merge_daily(batches, &request.range);
        tracing::info!(
            "Built daily series with {} days for {}..{}",
            series.len(),
            request.range.start,
            request.range.end
        );
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::provider::mock_config;
    use crate::validate::validate_date_range;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range(start: &str, end: &str) -> DateRange {
        validate_date_range(start, end).unwrap()
    }

    fn day(s: &str, max: f64) -> DailyWeather {
        DailyWeather {
            date: date(s),
            temp_max: Some(max),
            temp_min: Some(max - 10.0),
            weather_code: Some(0),
        }
    }

    fn daily_body(dates: &[&str], max: f64) -> serde_json::Value {
        serde_json::json!({
            "daily": {
                "time": dates,
                "temperature_2m_max": vec![max; dates.len()],
                "temperature_2m_min": vec![max - 10.0; dates.len()],
                "weathercode": vec![1; dates.len()],
            }
        })
    }

    fn builder_for(server: &MockServer) -> DailySeriesBuilder {
        let provider = WeatherProvider::new(&mock_config(&server.uri())).unwrap();
        DailySeriesBuilder::new(provider)
    }

    fn request(range: DateRange) -> SeriesRequest {
        SeriesRequest {
            latitude: 40.0,
            longitude: -105.0,
            range,
            units: Units::Metric,
        }
    }

    #[test]
    fn test_plan_past_range_is_archive_only() {
        let plan = plan_sub_ranges(&range("2024-05-01", "2024-05-10"), date("2024-06-01"));
        assert_eq!(
            plan,
            vec![SubRange {
                kind: SourceKind::Archive,
                start: date("2024-05-01"),
                end: date("2024-05-10"),
            }]
        );
    }

    #[test]
    fn test_plan_future_range_is_forecast_only() {
        let plan = plan_sub_ranges(&range("2024-06-02", "2024-06-08"), date("2024-06-01"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].kind, SourceKind::Forecast);
    }

    #[test]
    fn test_plan_straddling_range_splits_at_today() {
        let plan = plan_sub_ranges(&range("2024-05-28", "2024-06-04"), date("2024-06-01"));
        assert_eq!(
            plan,
            vec![
                SubRange {
                    kind: SourceKind::Archive,
                    start: date("2024-05-28"),
                    end: date("2024-05-31"),
                },
                SubRange {
                    kind: SourceKind::Forecast,
                    start: date("2024-06-01"),
                    end: date("2024-06-04"),
                },
            ]
        );
    }

    #[test]
    fn test_plan_starting_today_is_forecast_only() {
        let plan = plan_sub_ranges(&range("2024-06-01", "2024-06-03"), date("2024-06-01"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].kind, SourceKind::Forecast);
        assert_eq!(plan[0].start, date("2024-06-01"));
    }

    #[test]
    fn test_plan_ending_today_uses_both_sources() {
        let plan = plan_sub_ranges(&range("2024-05-30", "2024-06-01"), date("2024-06-01"));
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].end, date("2024-05-31"));
        assert_eq!(plan[1].start, date("2024-06-01"));
        assert_eq!(plan[1].end, date("2024-06-01"));
    }

    #[test]
    fn test_merge_later_batch_wins_and_sorts() {
        let merged = merge_daily(
            vec![
                vec![day("2024-06-02", 20.0), day("2024-06-01", 18.0)],
                vec![day("2024-06-02", 25.0), day("2024-06-03", 21.0)],
            ],
            &range("2024-06-01", "2024-06-03"),
        );

        let dates: Vec<_> = merged.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date("2024-06-01"), date("2024-06-02"), date("2024-06-03")]);
        assert_eq!(merged[1].temp_max, Some(25.0));
    }

    #[test]
    fn test_merge_drops_days_outside_range() {
        let merged = merge_daily(
            vec![vec![day("2024-05-31", 1.0), day("2024-06-01", 2.0)]],
            &range("2024-06-01", "2024-06-01"),
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].date, date("2024-06-01"));
    }

    #[tokio::test]
    async fn test_build_past_range_issues_one_archive_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/archive"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(daily_body(&["2024-05-01", "2024-05-02"], 15.0)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let series = builder_for(&mock_server)
            .build_series_on(&request(range("2024-05-01", "2024-05-02")), date("2024-06-01"))
            .await
            .unwrap();

        assert_eq!(series.len(), 2);
    }

    #[tokio::test]
    async fn test_build_future_range_issues_one_forecast_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("start_date", "2024-06-05"))
            .and(query_param("end_date", "2024-06-06"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(daily_body(&["2024-06-05", "2024-06-06"], 22.0)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/archive"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let series = builder_for(&mock_server)
            .build_series_on(&request(range("2024-06-05", "2024-06-06")), date("2024-06-01"))
            .await
            .unwrap();

        assert_eq!(series.len(), 2);
    }

    #[tokio::test]
    async fn test_build_straddling_range_is_gapless_and_sorted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/archive"))
            .and(query_param("start_date", "2024-05-30"))
            .and(query_param("end_date", "2024-05-31"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(daily_body(&["2024-05-31", "2024-05-30"], 10.0)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("start_date", "2024-06-01"))
            .and(query_param("end_date", "2024-06-02"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(daily_body(&["2024-06-01", "2024-06-02"], 20.0)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let series = builder_for(&mock_server)
            .build_series_on(&request(range("2024-05-30", "2024-06-02")), date("2024-06-01"))
            .await
            .unwrap();

        let dates: Vec<_> = series.iter().map(|d| d.date).collect();
        assert_eq!(
            dates,
            vec![
                date("2024-05-30"),
                date("2024-05-31"),
                date("2024-06-01"),
                date("2024-06-02"),
            ]
        );
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(series[0].temp_max, Some(10.0));
        assert_eq!(series[3].temp_max, Some(20.0));
    }

    #[tokio::test]
    async fn test_build_aborts_on_upstream_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/archive"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(daily_body(&["2024-05-31"], 10.0)),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let result = builder_for(&mock_server)
            .build_series_on(&request(range("2024-05-31", "2024-06-01")), date("2024-06-01"))
            .await;

        assert!(matches!(result, Err(WeatherError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_build_skips_response_without_time_axis() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/archive"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(daily_body(&["2024-06-01"], 19.0)),
            )
            .mount(&mock_server)
            .await;

        let series = builder_for(&mock_server)
            .build_series_on(&request(range("2024-05-31", "2024-06-01")), date("2024-06-01"))
            .await
            .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, date("2024-06-01"));
    }
}
