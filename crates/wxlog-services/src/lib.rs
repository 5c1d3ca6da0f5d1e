pub mod export;
pub mod record;
pub mod request_store;
pub mod service;
pub mod session;

pub use export::{to_csv, CSV_HEADERS};
pub use record::{NewWeatherRequest, RequestInput, WeatherRequestRecord};
pub use request_store::{RequestStore, RequestStoreError, RequestStoreResult};
pub use service::{
    forecast_range, CurrentWeatherView, ForecastDay, WeatherRequestService, FORECAST_DAYS,
};
pub use session::ClientSession;
