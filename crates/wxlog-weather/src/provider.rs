//! HTTP client for the Open-Meteo geocoding, archive and forecast endpoints.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;
use wxlog_core::{ReqwestErrorExt, Units, WeatherConfig, WeatherError};

use crate::series::{SourceKind, SubRange};
use crate::types::{CurrentConditions, DailyWeather};

const USER_AGENT: &str = concat!("wxlog/", env!("CARGO_PKG_VERSION"));
const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,weathercode";
const CURRENT_FIELDS: &str =
    "temperature_2m,apparent_temperature,relative_humidity_2m,weather_code,wind_speed_10m";

/// First match returned by the geocoding search.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingMatch {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub admin1: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingMatch>>,
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    daily: Option<DailyBlock>,
}

/// Column-oriented daily arrays as both weather sources return them.
#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Option<Vec<String>>,
    temperature_2m_max: Option<Vec<Option<f64>>>,
    temperature_2m_min: Option<Vec<Option<f64>>>,
    weathercode: Option<Vec<Option<i32>>>,
}

impl DailyBlock {
    /// Zip the arrays into rows. No time axis means no rows.
    fn into_days(self) -> Vec<DailyWeather> {
        let Some(time) = self.time.as_ref() else {
            return Vec::new();
        };

        time.iter()
            .enumerate()
            .filter_map(|(i, raw)| {
                let date = match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Skipping unparseable date '{}': {}", raw, e);
                        return None;
                    }
                };
                Some(DailyWeather {
                    date,
                    temp_max: value_at(&self.temperature_2m_max, i),
                    temp_min: value_at(&self.temperature_2m_min, i),
                    weather_code: value_at(&self.weathercode, i),
                })
            })
            .collect()
    }
}

fn value_at<T: Copy>(values: &Option<Vec<Option<T>>>, index: usize) -> Option<T> {
    values.as_ref().and_then(|v| v.get(index)).copied().flatten()
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: Option<CurrentBlock>,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    time: String,
    temperature_2m: Option<f64>,
    apparent_temperature: Option<f64>,
    relative_humidity_2m: Option<f64>,
    weather_code: Option<i32>,
    wind_speed_10m: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    geocoding_url: String,
    archive_url: String,
    forecast_url: String,
}

impl WeatherProvider {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ReqwestErrorExt::into_weather_error)?;

        Ok(Self {
            client: Arc::new(client),
            geocoding_url: config.geocoding_url.clone(),
            archive_url: config.archive_url.clone(),
            forecast_url: config.forecast_url.clone(),
        })
    }

    fn daily_url(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Archive => &self.archive_url,
            SourceKind::Forecast => &self.forecast_url,
        }
    }

    /// Look up a place name, returning the best match if there is one.
    #[instrument(skip(self), level = "info")]
    pub async fn search_location(
        &self,
        name: &str,
    ) -> Result<Option<GeocodingMatch>, WeatherError> {
        let url = format!(
            "{}?name={}&count=1&language=en&format=json",
            self.geocoding_url,
            urlencoding::encode(name)
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::warn!("Geocoding request failed: {}", e);
            WeatherError::Geocoding(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Geocoding returned status {}", status);
            return Err(WeatherError::Geocoding(format!("status {}", status)));
        }

        let body: GeocodingResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Geocoding(format!("JSON parse error: {}", e)))?;

        Ok(body.results.and_then(|results| results.into_iter().next()))
    }

    /// Fetch the daily max/min temperature and weather code arrays for one sub-range.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_daily(
        &self,
        sub_range: &SubRange,
        latitude: f64,
        longitude: f64,
        units: Units,
    ) -> Result<Vec<DailyWeather>, WeatherError> {
        let url = format!(
            "{}?latitude={}&longitude={}&start_date={}&end_date={}\
             &daily={}&temperature_unit={}&timezone=auto",
            self.daily_url(sub_range.kind),
            latitude,
            longitude,
            sub_range.start.format("%Y-%m-%d"),
            sub_range.end.format("%Y-%m-%d"),
            DAILY_FIELDS,
            units.temperature_unit(),
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ReqwestErrorExt::into_weather_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("{} source returned status {}", sub_range.kind, status);
            return Err(WeatherError::Upstream(format!(
                "{} source returned {}",
                sub_range.kind, status
            )));
        }

        let body: DailyResponse = response
            .json()
            .await
            .map_err(ReqwestErrorExt::into_weather_error)?;

        let days = body.daily.map(DailyBlock::into_days).unwrap_or_default();
        tracing::debug!("{} source returned {} days", sub_range.kind, days.len());
        Ok(days)
    }

    /// Current conditions at a point from the forecast source.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_current(
        &self,
        latitude: f64,
        longitude: f64,
        units: Units,
    ) -> Result<CurrentConditions, WeatherError> {
        let url = format!(
            "{}?latitude={}&longitude={}&current={}\
             &temperature_unit={}&windspeed_unit={}&timezone=auto",
            self.forecast_url,
            latitude,
            longitude,
            CURRENT_FIELDS,
            units.temperature_unit(),
            units.wind_speed_unit(),
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ReqwestErrorExt::into_weather_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Upstream(format!(
                "forecast source returned {}",
                status
            )));
        }

        let body: CurrentResponse = response
            .json()
            .await
            .map_err(ReqwestErrorExt::into_weather_error)?;

        let current = body.current.ok_or_else(|| {
            WeatherError::InvalidResponse("response has no current block".to_string())
        })?;

        Ok(CurrentConditions {
            time: current.time,
            temperature: current.temperature_2m,
            apparent_temperature: current.apparent_temperature,
            relative_humidity: current.relative_humidity_2m,
            wind_speed: current.wind_speed_10m,
            weather_code: current.weather_code,
            units,
        })
    }
}

/// Weather settings pointing every endpoint at a mock server.
#[cfg(test)]
pub(crate) fn mock_config(base_uri: &str) -> WeatherConfig {
    WeatherConfig {
        geocoding_url: format!("{}/v1/search", base_uri),
        archive_url: format!("{}/v1/archive", base_uri),
        forecast_url: format!("{}/v1/forecast", base_uri),
        timeout_secs: 5,
        default_units: Units::Metric,
    }
}
