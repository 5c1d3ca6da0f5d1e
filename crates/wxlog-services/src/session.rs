use chrono::{NaiveDate, Utc};
use wxlog_core::AppError;
use wxlog_weather::ResolvedLocation;

use crate::record::{RequestInput, WeatherRequestRecord};
use crate::service::{forecast_range, WeatherRequestService};

/// Per-client form state.
///
/// Tracks which record (if any) the user is editing and the last place a
/// request was saved for. Each client owns its own session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientSession {
    editing_id: Option<i64>,
    last_location: Option<ResolvedLocation>,
}

impl ClientSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn editing_id(&self) -> Option<i64> {
        self.editing_id
    }

    pub fn last_location(&self) -> Option<&ResolvedLocation> {
        self.last_location.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.editing_id.is_some()
    }

    /// Enter edit mode for `record` and return its values as form input.
    pub fn begin_edit(&mut self, record: &WeatherRequestRecord) -> RequestInput {
        self.editing_id = Some(record.id);
        RequestInput::new(
            record.location_query.clone(),
            record.start_date.format("%Y-%m-%d").to_string(),
            record.end_date.format("%Y-%m-%d").to_string(),
        )
        .with_units(record.units.as_str())
    }

    pub fn cancel_edit(&mut self) {
        self.editing_id = None;
    }

    /// Update the record being edited, or create a new one.
    ///
    /// Edit mode is cleared only when the save succeeds.
    pub async fn submit(
        &mut self,
        service: &WeatherRequestService,
        input: RequestInput,
    ) -> Result<WeatherRequestRecord, AppError> {
        let record = match self.editing_id {
            Some(id) => service.update(id, input).await?,
            None => service.create(input).await?,
        };

        self.editing_id = None;
        self.remember(&record);
        Ok(record)
    }

    /// Look up `location` and save it as a request covering the forecast window.
    ///
    /// Always creates a new record, even while editing; edit mode is left as is.
    pub async fn search(
        &mut self,
        service: &WeatherRequestService,
        location: &str,
        units: Option<&str>,
    ) -> Result<WeatherRequestRecord, AppError> {
        self.search_on(service, location, units, Utc::now().date_naive())
            .await
    }

    /// Like `search`, with the window starting at `today`.
    pub async fn search_on(
        &mut self,
        service: &WeatherRequestService,
        location: &str,
        units: Option<&str>,
        today: NaiveDate,
    ) -> Result<WeatherRequestRecord, AppError> {
        let range = forecast_range(today);
        let mut input = RequestInput::new(
            location,
            range.start.format("%Y-%m-%d").to_string(),
            range.end.format("%Y-%m-%d").to_string(),
        );
        input.units = units.map(str::to_string);

        let record = service.create(input).await?;
        tracing::debug!("Search saved request {} for {}", record.id, record.location_name);
        self.remember(&record);
        Ok(record)
    }

    fn remember(&mut self, record: &WeatherRequestRecord) {
        self.last_location = Some(ResolvedLocation {
            latitude: record.latitude,
            longitude: record.longitude,
            name: record.location_name.clone(),
        });
    }
}
