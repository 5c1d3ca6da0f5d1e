//! Centralized error types for wxlog.
//!
//! This module provides a typed error hierarchy that:
//! - Separates client input problems from upstream and storage failures
//! - Provides short user-facing messages for API responses
//! - Maps every failure onto a status class (400, 404 or 500)

use thiserror::Error;

/// Top-level application error type.
///
/// Every failure surfaced by the CRUD operations converts into this type.
/// Use `user_message()` for the text shown to callers and `status_code()`
/// for the severity class.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a short message suitable for an API error body.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.user_message(),
            AppError::Weather(e) => e.user_message().to_string(),
            AppError::Database(e) => e.user_message().to_string(),
            AppError::Config(e) => e.user_message().to_string(),
            AppError::NotFound(_) => "Record not found.".to_string(),
            AppError::Other(_) => "Server error.".to_string(),
        }
    }

    /// Severity class of the error expressed as an HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::Weather(WeatherError::LocationNotFound(_)) => 400,
            AppError::NotFound(_) => 404,
            AppError::Weather(_)
            | AppError::Database(_)
            | AppError::Config(_)
            | AppError::Other(_) => 500,
        }
    }

    /// Whether the caller supplied bad input (as opposed to a server-side failure).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

/// Client input errors. Always detected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("date is not a valid YYYY-MM-DD calendar date")]
    InvalidFormat,

    #[error("start date is after end date")]
    OrderingError,

    #[error("date range exceeds {max_days} days")]
    RangeTooLarge { max_days: i64 },

    #[error("location is required")]
    MissingLocation,

    #[error("unknown units: {0}")]
    InvalidUnits(String),

    #[error("lat and lon are required")]
    MissingCoordinates,

    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("malformed request body: {0}")]
    InvalidBody(String),
}

impl ValidationError {
    pub fn user_message(&self) -> String {
        match self {
            ValidationError::InvalidFormat => "Dates must be in YYYY-MM-DD format.".to_string(),
            ValidationError::OrderingError => "Start date must be before end date.".to_string(),
            ValidationError::RangeTooLarge { max_days } => {
                format!("Date range must be {max_days} days or fewer.")
            }
            ValidationError::MissingLocation => "Location is required.".to_string(),
            ValidationError::InvalidUnits(_) => {
                "Units must be either metric or imperial.".to_string()
            }
            ValidationError::MissingCoordinates => "lat and lon are required.".to_string(),
            ValidationError::InvalidCoordinates(detail) => {
                format!("Invalid coordinates: {detail}.")
            }
            ValidationError::InvalidBody(_) => {
                "Request body must be a JSON object with location, startDate and endDate."
                    .to_string()
            }
        }
    }
}

/// Errors raised while talking to the geocoding and weather services.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Geocoding service failed: {0}")]
    Geocoding(String),

    #[error("Weather service failed: {0}")]
    Upstream(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::LocationNotFound(_) => "Location not found. Try another search.",
            WeatherError::Geocoding(_) => "Geocoding service error. Please try again.",
            WeatherError::Upstream(_) | WeatherError::InvalidResponse(_) => {
                "Weather service error. Please try again later."
            }
        }
    }

    /// True for failures caused by an unreachable or misbehaving collaborator.
    pub fn is_upstream(&self) -> bool {
        !matches!(self, WeatherError::LocationNotFound(_))
    }
}

/// Database/storage errors (SQLite).
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

impl DatabaseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DatabaseError::ConnectionFailed(_) => "Unable to access local data.",
            DatabaseError::QueryFailed(_) => "A data operation failed. Please try again.",
            DatabaseError::Corruption(_) => "Stored data may be corrupted.",
            DatabaseError::MigrationFailed(_) => "Failed to update the local database schema.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Configuration file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration not found. Using defaults.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::Io(_) => "Unable to read or write the configuration file.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_weather_error(self) -> WeatherError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_weather_error(self) -> WeatherError {
        if self.is_decode() {
            WeatherError::InvalidResponse(self.to_string())
        } else {
            WeatherError::Upstream(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_database_error(self) -> DatabaseError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_database_error(self) -> DatabaseError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                DatabaseError::Corruption(self.to_string())
            }
            _ => DatabaseError::QueryFailed(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_match_form_wording() {
        assert_eq!(
            ValidationError::InvalidFormat.user_message(),
            "Dates must be in YYYY-MM-DD format."
        );
        assert_eq!(
            ValidationError::RangeTooLarge { max_days: 31 }.user_message(),
            "Date range must be 31 days or fewer."
        );
    }

    #[test]
    fn test_status_classes() {
        assert_eq!(AppError::from(ValidationError::OrderingError).status_code(), 400);
        assert_eq!(
            AppError::from(WeatherError::LocationNotFound("Atlantis".into())).status_code(),
            400
        );
        assert_eq!(AppError::NotFound("7".into()).status_code(), 404);
        assert_eq!(AppError::from(WeatherError::Upstream("503".into())).status_code(), 500);
        assert_eq!(
            AppError::from(DatabaseError::QueryFailed("locked".into())).status_code(),
            500
        );
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::from(WeatherError::Geocoding("timeout".into()));
        assert_eq!(app_err.user_message(), "Geocoding service error. Please try again.");
        assert!(!app_err.is_client_error());
    }

    #[test]
    fn test_coordinate_messages_distinguish_missing_from_out_of_range() {
        assert_eq!(
            ValidationError::MissingCoordinates.user_message(),
            "lat and lon are required."
        );
        let out_of_range =
            ValidationError::InvalidCoordinates("latitude must be between -90 and 90".into());
        assert_eq!(
            out_of_range.user_message(),
            "Invalid coordinates: latitude must be between -90 and 90."
        );
        assert_eq!(AppError::from(out_of_range).status_code(), 400);
    }

    #[test]
    fn test_config_error_converts_to_server_error() {
        let app_err = AppError::from(ConfigError::ParseError("line 3".into()));
        assert_eq!(app_err.status_code(), 500);
        assert_eq!(
            app_err.user_message(),
            "Configuration file is malformed. Check your settings."
        );
    }

    #[test]
    fn test_location_not_found_is_not_upstream() {
        assert!(!WeatherError::LocationNotFound("x".into()).is_upstream());
        assert!(WeatherError::Upstream("x".into()).is_upstream());
    }
}
