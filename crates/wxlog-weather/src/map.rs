//! OpenStreetMap links for a resolved point.

use serde::Serialize;
use wxlog_core::ValidationError;

/// Half-width of the bounding box, in degrees.
pub const MAP_PADDING_DEGREES: f64 = 0.05;

const EMBED_BASE: &str = "https://www.openstreetmap.org/export/embed.html";
const PAGE_BASE: &str = "https://www.openstreetmap.org/";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    /// `left,bottom,right,top` with five decimals.
    pub bbox: String,
    pub map_embed_url: String,
    pub map_link: String,
}

pub fn map_link(latitude: f64, longitude: f64) -> Result<MapView, ValidationError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(ValidationError::InvalidCoordinates(
            "latitude must be between -90 and 90".into(),
        ));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(ValidationError::InvalidCoordinates(
            "longitude must be between -180 and 180".into(),
        ));
    }

    let bbox = format!(
        "{:.5},{:.5},{:.5},{:.5}",
        longitude - MAP_PADDING_DEGREES,
        latitude - MAP_PADDING_DEGREES,
        longitude + MAP_PADDING_DEGREES,
        latitude + MAP_PADDING_DEGREES,
    );

    Ok(MapView {
        map_embed_url: format!(
            "{}?bbox={}&layer=mapnik&marker={},{}",
            EMBED_BASE, bbox, latitude, longitude
        ),
        map_link: format!(
            "{}?mlat={}&mlon={}#map=11/{}/{}",
            PAGE_BASE, latitude, longitude, latitude, longitude
        ),
        bbox,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_map_link_bbox_and_urls() {
        let view = map_link(40.0, -105.0).unwrap();

        assert_eq!(view.bbox, "-105.05000,39.95000,-104.95000,40.05000");
        assert_eq!(
            view.map_embed_url,
            "https://www.openstreetmap.org/export/embed.html\
             ?bbox=-105.05000,39.95000,-104.95000,40.05000&layer=mapnik&marker=40,-105"
        );
        assert_eq!(
            view.map_link,
            "https://www.openstreetmap.org/?mlat=40&mlon=-105#map=11/40/-105"
        );
    }

    #[test]
    fn test_map_link_json_keys() {
        let json = serde_json::to_value(map_link(51.5, -0.12).unwrap()).unwrap();
        assert!(json["mapEmbedUrl"].is_string());
        assert!(json["mapLink"].as_str().unwrap().contains("mlat=51.5"));
    }

    #[test]
    fn test_map_link_rejects_out_of_range() {
        assert!(matches!(
            map_link(91.0, 0.0),
            Err(ValidationError::InvalidCoordinates(_))
        ));
        assert!(map_link(0.0, f64::NAN).is_err());

        let err = map_link(0.0, 180.5).unwrap_err();
        assert_eq!(
            err.user_message(),
            "Invalid coordinates: longitude must be between -180 and 180."
        );
    }
}
