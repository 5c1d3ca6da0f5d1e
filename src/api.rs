use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use wxlog_core::{AppError, ValidationError};
use wxlog_services::{
    CurrentWeatherView, RequestInput, WeatherRequestRecord, WeatherRequestService,
};
use wxlog_weather::MapView;

const CSV_FILENAME: &str = "weather-requests.csv";

/// An `AppError` rendered as `{"error": "..."}` with its status class.
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Rejected request: {}", self.0);
        }

        (status, Json(json!({ "error": self.0.user_message() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// A body axum could not read as `T` (bad JSON, wrong content type) is a 400.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ValidationError::InvalidBody(rejection.body_text()).into()),
    }
}

/// An id that is not an integer cannot name a stored record.
fn record_id(id: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    match id {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => Err(AppError::NotFound(rejection.body_text()).into()),
    }
}

pub fn router(service: WeatherRequestService) -> Router {
    Router::new()
        .route("/requests", get(list_requests).post(create_request))
        .route(
            "/requests/{id}",
            get(get_request).put(update_request).delete(delete_request),
        )
        .route("/export.csv", get(export_csv))
        .route("/map", get(map_view))
        .route("/current", get(current_weather))
        .with_state(service)
}

async fn list_requests(
    State(service): State<WeatherRequestService>,
) -> ApiResult<Json<Vec<WeatherRequestRecord>>> {
    Ok(Json(service.list().await?))
}

async fn get_request(
    State(service): State<WeatherRequestService>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<WeatherRequestRecord>> {
    Ok(Json(service.get(record_id(id)?).await?))
}

async fn create_request(
    State(service): State<WeatherRequestService>,
    payload: Result<Json<RequestInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<WeatherRequestRecord>)> {
    let record = service.create(json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_request(
    State(service): State<WeatherRequestService>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RequestInput>, JsonRejection>,
) -> ApiResult<Json<WeatherRequestRecord>> {
    let id = record_id(id)?;
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => {
            // A missing record is reported ahead of a bad body.
            service.get(id).await?;
            return Err(ValidationError::InvalidBody(rejection.body_text()).into());
        }
    };
    Ok(Json(service.update(id, input).await?))
}

async fn delete_request(
    State(service): State<WeatherRequestService>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    service.delete(record_id(id)?).await?;
    Ok(Json(json!({ "success": true })))
}

async fn export_csv(State(service): State<WeatherRequestService>) -> ApiResult<impl IntoResponse> {
    let csv = service.export_csv().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", CSV_FILENAME),
            ),
        ],
        csv,
    ))
}

#[derive(Debug, Deserialize)]
struct MapParams {
    lat: Option<String>,
    lon: Option<String>,
}

fn parse_coordinate(raw: Option<&str>, name: &str) -> Result<f64, ValidationError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::MissingCoordinates)?;

    raw.parse::<f64>()
        .map_err(|_| ValidationError::InvalidCoordinates(format!("{} must be a number", name)))
}

async fn map_view(
    State(service): State<WeatherRequestService>,
    Query(params): Query<MapParams>,
) -> ApiResult<Json<MapView>> {
    let lat = parse_coordinate(params.lat.as_deref(), "lat")?;
    let lon = parse_coordinate(params.lon.as_deref(), "lon")?;
    Ok(Json(service.map_link(lat, lon)?))
}

#[derive(Debug, Deserialize)]
struct CurrentParams {
    #[serde(default)]
    location: String,
    units: Option<String>,
}

async fn current_weather(
    State(service): State<WeatherRequestService>,
    Query(params): Query<CurrentParams>,
) -> ApiResult<Json<CurrentWeatherView>> {
    let view = service
        .current_conditions(&params.location, params.units.as_deref())
        .await?;
    Ok(Json(view))
}
