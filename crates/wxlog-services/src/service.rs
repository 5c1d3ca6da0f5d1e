//! Request orchestration: validate, resolve, fetch, persist.
//!
//! `WeatherRequestService` is the single entry point for the CRUD surface.
//! All input checks run before any network call. The store is reached via
//! `spawn_blocking` so SQLite work never blocks the async runtime.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::instrument;
use wxlog_core::{AppError, Config, Units, ValidationError};
use wxlog_weather::{
    map_link, validate_date_range, CurrentConditions, DailySeriesBuilder, DailyWeather,
    DateRange, LocationResolver, MapView, ResolvedLocation, SeriesRequest, WeatherLabel,
    WeatherProvider,
};

use crate::export;
use crate::record::{NewWeatherRequest, RequestInput, WeatherRequestRecord};
use crate::request_store::{RequestStore, RequestStoreResult};

/// Number of days in the forecast view and in a quick search, today included.
pub const FORECAST_DAYS: u64 = 5;

/// `today` through the last day of the forecast window.
pub fn forecast_range(today: NaiveDate) -> DateRange {
    DateRange {
        start: today,
        end: today
            .checked_add_days(Days::new(FORECAST_DAYS - 1))
            .unwrap_or(today),
    }
}

/// Input that passed every local check.
#[derive(Debug, Clone, PartialEq)]
struct CheckedInput {
    /// Location text exactly as entered; stored as the record's query.
    query: String,
    range: DateRange,
    units: Units,
}

impl CheckedInput {
    fn location(&self) -> &str {
        self.query.trim()
    }
}

fn parse_units(raw: Option<&str>, fallback: Units) -> Result<Units, ValidationError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => value.parse(),
        None => Ok(fallback),
    }
}

/// Location first, then units, then the date range.
fn check_input(
    input: &RequestInput,
    fallback_units: Units,
) -> Result<CheckedInput, ValidationError> {
    if input.location.trim().is_empty() {
        return Err(ValidationError::MissingLocation);
    }

    let units = parse_units(input.units.as_deref(), fallback_units)?;
    let range = validate_date_range(input.start_date.trim(), input.end_date.trim())?;

    Ok(CheckedInput {
        query: input.location.clone(),
        range,
        units,
    })
}

/// A forecast day with its condition spelled out for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDay {
    #[serde(flatten)]
    pub day: DailyWeather,
    pub condition: WeatherLabel,
}

impl From<DailyWeather> for ForecastDay {
    fn from(day: DailyWeather) -> Self {
        Self {
            condition: WeatherLabel::for_code(day.weather_code),
            day,
        }
    }
}

/// Current conditions and the next few days for a resolved place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentWeatherView {
    pub location: ResolvedLocation,
    pub current: CurrentConditions,
    pub condition: WeatherLabel,
    pub forecast: Vec<ForecastDay>,
}

#[derive(Clone)]
pub struct WeatherRequestService {
    store: Arc<Mutex<RequestStore>>,
    provider: WeatherProvider,
    resolver: LocationResolver,
    series: DailySeriesBuilder,
    default_units: Units,
}

impl WeatherRequestService {
    pub fn new(store: RequestStore, provider: WeatherProvider, default_units: Units) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            resolver: LocationResolver::new(provider.clone()),
            series: DailySeriesBuilder::new(provider.clone()),
            provider,
            default_units,
        }
    }

    /// Open the configured database and build the weather clients.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let store = RequestStore::open(&config.database.path)?;
        let provider = WeatherProvider::new(&config.weather)?;
        Ok(Self::new(store, provider, config.weather.default_units))
    }

    async fn with_store<T, F>(&self, op: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&RequestStore) -> RequestStoreResult<T> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || op(&store.lock()))
            .await
            .map_err(|e| AppError::Other(anyhow::anyhow!("store task failed: {}", e)))?
            .map_err(AppError::from)
    }

    /// Resolve the location and build the daily series for checked input.
    async fn fetch_for(&self, input: CheckedInput) -> Result<NewWeatherRequest, AppError> {
        let location = self.resolver.resolve(input.location()).await?;
        let daily_series = self
            .series
            .build_series(&SeriesRequest {
                latitude: location.latitude,
                longitude: location.longitude,
                range: input.range,
                units: input.units,
            })
            .await?;

        Ok(NewWeatherRequest {
            location_query: input.query,
            location_name: location.name,
            latitude: location.latitude,
            longitude: location.longitude,
            start_date: input.range.start,
            end_date: input.range.end,
            units: input.units,
            daily_series,
        })
    }

    #[instrument(skip(self), level = "info")]
    pub async fn create(&self, input: RequestInput) -> Result<WeatherRequestRecord, AppError> {
        let checked = check_input(&input, self.default_units)?;
        let request = self.fetch_for(checked).await?;

        let record = self.with_store(move |store| store.create(&request)).await?;
        tracing::info!("Saved weather request {} for {}", record.id, record.location_name);
        Ok(record)
    }

    pub async fn get(&self, id: i64) -> Result<WeatherRequestRecord, AppError> {
        self.with_store(move |store| store.get(id)).await
    }

    /// All records, newest first.
    pub async fn list(&self) -> Result<Vec<WeatherRequestRecord>, AppError> {
        self.with_store(|store| store.list()).await
    }

    /// Re-validate, re-resolve and re-fetch, then overwrite record `id`.
    ///
    /// A missing record is reported before any input problem. Omitted units
    /// keep the record's existing units.
    #[instrument(skip(self), level = "info")]
    pub async fn update(
        &self,
        id: i64,
        input: RequestInput,
    ) -> Result<WeatherRequestRecord, AppError> {
        let existing = self.get(id).await?;
        let checked = check_input(&input, existing.units)?;
        let request = self.fetch_for(checked).await?;

        let record = self.with_store(move |store| store.update(id, &request)).await?;
        tracing::info!("Updated weather request {}", record.id);
        Ok(record)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.with_store(move |store| store.delete(id)).await?;
        tracing::info!("Deleted weather request {}", id);
        Ok(())
    }

    pub async fn count(&self) -> Result<usize, AppError> {
        self.with_store(|store| store.count()).await
    }

    pub async fn export_csv(&self) -> Result<String, AppError> {
        self.with_store(|store| export::to_csv(&store.list()?)).await
    }

    pub fn map_link(&self, latitude: f64, longitude: f64) -> Result<MapView, AppError> {
        Ok(map_link(latitude, longitude)?)
    }

    /// Resolve `location` and fetch its current conditions and forecast.
    pub async fn current_conditions(
        &self,
        location: &str,
        units: Option<&str>,
    ) -> Result<CurrentWeatherView, AppError> {
        self.current_conditions_on(location, units, Utc::now().date_naive())
            .await
    }

    /// Like `current_conditions`, with the forecast window starting at `today`.
    #[instrument(skip(self), level = "info")]
    pub async fn current_conditions_on(
        &self,
        location: &str,
        units: Option<&str>,
        today: NaiveDate,
    ) -> Result<CurrentWeatherView, AppError> {
        let query = location.trim();
        if query.is_empty() {
            return Err(ValidationError::MissingLocation.into());
        }
        let units = parse_units(units, self.default_units)?;

        let location = self.resolver.resolve(query).await?;
        let current = self
            .provider
            .fetch_current(location.latitude, location.longitude, units)
            .await?;
        let forecast = self
            .series
            .build_series_on(
                &SeriesRequest {
                    latitude: location.latitude,
                    longitude: location.longitude,
                    range: forecast_range(today),
                    units,
                },
                today,
            )
            .await?;

        Ok(CurrentWeatherView {
            condition: WeatherLabel::for_code(current.weather_code),
            forecast: forecast.into_iter().map(ForecastDay::from).collect(),
            location,
            current,
        })
    }
}
