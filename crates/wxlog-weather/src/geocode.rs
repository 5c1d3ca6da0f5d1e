//! Resolution of free-text location queries into coordinates.

use tracing::instrument;
use wxlog_core::WeatherError;

use crate::provider::WeatherProvider;
use crate::types::ResolvedLocation;

/// Accepts `-?digits(.digits)?`.
fn is_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (unsigned, None),
    };

    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(whole) && fraction.map_or(true, digits)
}

/// Parse a literal `"lat, lon"` query.
///
/// Whitespace around either number is allowed. The display name echoes the
/// numbers exactly as typed. No range check happens here.
pub fn parse_coordinates(query: &str) -> Option<ResolvedLocation> {
    let (lat_text, lon_text) = query.split_once(',')?;
    let (lat_text, lon_text) = (lat_text.trim(), lon_text.trim());
    if !is_decimal(lat_text) || !is_decimal(lon_text) {
        return None;
    }

    let latitude = lat_text.parse::<f64>().ok()?;
    let longitude = lon_text.parse::<f64>().ok()?;

    Some(ResolvedLocation {
        latitude,
        longitude,
        name: format!("Coordinates ({}, {})", lat_text, lon_text),
    })
}

/// `name[, admin1][, country]`, skipping absent or blank parts.
pub fn compose_place_name(name: &str, admin1: Option<&str>, country: Option<&str>) -> String {
    [Some(name), admin1, country]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    provider: WeatherProvider,
}

impl LocationResolver {
    pub fn new(provider: WeatherProvider) -> Self {
        Self { provider }
    }

    /// Turn a query into coordinates and a display name.
    ///
    /// Literal coordinates short-circuit without touching the network.
    /// Otherwise the first geocoding match wins.
    #[instrument(skip(self), level = "info")]
    pub async fn resolve(&self, query: &str) -> Result<ResolvedLocation, WeatherError> {
        if let Some(location) = parse_coordinates(query) {
            tracing::debug!("Using literal coordinates for '{}'", query);
            return Ok(location);
        }

        let found = self
            .provider
            .search_location(query.trim())
            .await?
            .ok_or_else(|| WeatherError::LocationNotFound(query.to_string()))?;

        Ok(ResolvedLocation {
            latitude: found.latitude,
            longitude: found.longitude,
            name: compose_place_name(
                &found.name,
                found.admin1.as_deref(),
                found.country.as_deref(),
            ),
        })
    }
}
