use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use wxlog_core::Units;

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    MainlyClear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
    Unknown,
}

impl WeatherCondition {
    /// Convert WMO weather code to WeatherCondition
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1 => Self::MainlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::Sleet, // Freezing drizzle
            61 | 63 | 80 | 81 => Self::Rain,
            65 | 82 => Self::HeavyRain,
            66 | 67 => Self::Sleet, // Freezing rain
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Unknown,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear sky",
            Self::MainlyClear => "Mainly clear",
            Self::PartlyCloudy => "Partly cloudy",
            Self::Cloudy => "Overcast",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy rain",
            Self::Snow => "Snow",
            Self::Sleet => "Freezing rain",
            Self::Thunderstorm => "Thunderstorm",
            Self::Unknown => "Unknown",
        }
    }

    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clear | Self::MainlyClear => "sun",
            Self::PartlyCloudy => "cloud_sun",
            Self::Cloudy | Self::Unknown => "cloud",
            Self::Fog => "cloud_fog",
            Self::Drizzle | Self::Rain | Self::HeavyRain => "cloud_rain",
            Self::Snow | Self::Sleet => "cloud_snow",
            Self::Thunderstorm => "cloud_lightning",
        }
    }
}

/// Display form of a condition: its category, description and icon name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeatherLabel {
    pub condition: WeatherCondition,
    pub description: &'static str,
    pub icon: &'static str,
}

impl From<WeatherCondition> for WeatherLabel {
    fn from(condition: WeatherCondition) -> Self {
        Self {
            condition,
            description: condition.description(),
            icon: condition.icon_name(),
        }
    }
}

impl WeatherLabel {
    /// Label for an optional WMO code; a missing code reads as `Unknown`.
    pub fn for_code(code: Option<i32>) -> Self {
        code.map_or(WeatherCondition::Unknown, WeatherCondition::from_wmo_code)
            .into()
    }
}

/// One day of a daily series.
///
/// Temperatures are in the unit system of the owning request. Any value the
/// upstream source left out is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyWeather {
    pub date: NaiveDate,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    #[serde(rename = "weathercode")]
    pub weather_code: Option<i32>,
}

impl DailyWeather {
    pub fn condition(&self) -> Option<WeatherCondition> {
        self.weather_code.map(WeatherCondition::from_wmo_code)
    }
}

/// Coordinates plus a display name for a user's location query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

/// Current conditions at a point, as reported by the forecast source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    pub time: String,
    pub temperature: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    #[serde(rename = "weathercode")]
    pub weather_code: Option<i32>,
    pub units: Units,
}

impl CurrentConditions {
    pub fn condition(&self) -> Option<WeatherCondition> {
        self.weather_code.map(WeatherCondition::from_wmo_code)
    }
}
