// Weather lookups for wxlog: date validation, geocoding, daily series and map links.

pub mod geocode;
pub mod map;
pub mod provider;
pub mod series;
pub mod types;
pub mod validate;

pub use geocode::{compose_place_name, parse_coordinates, LocationResolver};
pub use map::{map_link, MapView};
pub use provider::{GeocodingMatch, WeatherProvider};
pub use series::{
    merge_daily, plan_sub_ranges, DailySeriesBuilder, SeriesRequest, SourceKind, SubRange,
};
pub use types::{
    CurrentConditions, DailyWeather, ResolvedLocation, WeatherCondition, WeatherLabel,
};
pub use validate::{parse_iso_date, validate_date_range, DateRange, MAX_RANGE_DAYS};
