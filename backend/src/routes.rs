use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, error::InternalError, web};
use futures_util::TryStreamExt;
use serde_json::json;
use shared::{ApiError, CropCategory, ErrorKind, ScanResponse};
use std::str::FromStr;

use crate::auth::middleware::{AuthMiddleware, AuthenticatedUser};
use crate::auth::routes as auth_routes;
use crate::history::models::NewScan;
use crate::history::service::HistoryService;
use crate::inference::registry::ModelRegistry;
use crate::scan::{ScanError, scan};

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const MAX_TEXT_FIELD_BYTES: usize = 256;

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::DecodeError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ModelUnavailable
        | ErrorKind::StorageUnavailable
        | ErrorKind::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::InferenceFailed | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
        ErrorKind::InvalidCredentials | ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
    }
}

pub fn error_response(kind: ErrorKind, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status_for(kind)).json(ApiError::new(kind, message))
}

fn scan_error_response(err: &ScanError) -> HttpResponse {
    let kind = match err {
        ScanError::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
        ScanError::Decode(_) => ErrorKind::DecodeError,
        ScanError::Inference(_) => ErrorKind::InferenceFailed,
    };
    error_response(kind, err.to_string())
}

fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &HttpRequest,
) -> actix_web::Error {
    let response = error_response(ErrorKind::ValidationError, err.to_string());
    InternalError::from_response(err, response).into()
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, auth_middleware: AuthMiddleware) {
    cfg.route("/health", web::get().to(health))
        .service(
            web::scope("/auth")
                .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                .route("/register", web::post().to(auth_routes::register))
                .route("/login", web::post().to(auth_routes::login)),
        )
        .service(
            web::scope("/api")
                .wrap(auth_middleware)
                .route("/crops", web::get().to(list_crops))
                .route("/scan", web::post().to(scan_leaf))
                .route("/history", web::get().to(scan_history)),
        );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn list_crops(registry: web::Data<ModelRegistry>) -> HttpResponse {
    HttpResponse::Ok().json(registry.crops())
}

#[derive(Debug, thiserror::Error)]
enum UploadError {
    #[error("Missing '{0}' field")]
    MissingField(&'static str),
    #[error("Field '{field}' exceeds the {limit} byte limit")]
    TooLarge { field: String, limit: usize },
    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),
}

#[derive(Default)]
struct ScanUpload {
    crop: Option<String>,
    image: Option<Vec<u8>>,
}

async fn read_field(field: &mut Field, name: &str, limit: usize) -> Result<Vec<u8>, UploadError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.try_next().await? {
        if data.len() + chunk.len() > limit {
            return Err(UploadError::TooLarge {
                field: name.to_string(),
                limit,
            });
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

async fn read_upload(mut payload: Multipart) -> Result<ScanUpload, UploadError> {
    let mut upload = ScanUpload::default();

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "crop" => {
                let raw = read_field(&mut field, &name, MAX_TEXT_FIELD_BYTES).await?;
                upload.crop = Some(String::from_utf8_lossy(&raw).trim().to_string());
            }
            "image" => {
                upload.image = Some(read_field(&mut field, &name, MAX_IMAGE_BYTES).await?);
            }
            other => {
                log::debug!("Ignoring unexpected upload field '{}'", other);
                read_field(&mut field, &name, MAX_IMAGE_BYTES).await?;
            }
        }
    }

    Ok(upload)
}

async fn scan_leaf(
    user: AuthenticatedUser,
    registry: web::Data<ModelRegistry>,
    history: web::Data<HistoryService>,
    payload: Multipart,
) -> HttpResponse {
    let upload = match read_upload(payload).await {
        Ok(upload) => upload,
        Err(e) => {
            log::info!("Rejected scan upload from {}: {}", user.0, e);
            return error_response(ErrorKind::ValidationError, e.to_string());
        }
    };

    let crop = match upload.crop.as_deref() {
        None => {
            return error_response(
                ErrorKind::ValidationError,
                UploadError::MissingField("crop").to_string(),
            );
        }
        Some(name) => match CropCategory::from_str(name) {
            Ok(crop) => crop,
            Err(_) => {
                return error_response(
                    ErrorKind::ValidationError,
                    format!("Unknown crop category '{}'", name),
                );
            }
        },
    };
    // An empty image part is left to the preprocessor, which reports it as a decode error.
    let Some(image) = upload.image else {
        return error_response(
            ErrorKind::ValidationError,
            UploadError::MissingField("image").to_string(),
        );
    };

    let worker_registry = registry.clone();
    let outcome = web::block(move || scan(&worker_registry, crop, &image)).await;
    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            log::warn!("{} scan for {} failed: {}", crop, user.0, e);
            return scan_error_response(&e);
        }
        Err(e) => {
            log::error!("Scan worker failed: {}", e);
            return error_response(ErrorKind::InferenceFailed, "Scan could not be completed");
        }
    };

    let (saved, warning) = match history.record(&user.0, NewScan::from(&result)).await {
        Ok(record) => {
            log::info!(
                "Recorded {} scan {} for {}",
                record.plant,
                record.id,
                record.user_id
            );
            (true, None)
        }
        Err(e) => {
            log::error!("Could not save scan for {}: {}", user.0, e);
            (
                false,
                Some("Scan completed but could not be saved to your history".to_string()),
            )
        }
    };

    HttpResponse::Ok().json(ScanResponse {
        result,
        saved,
        warning,
    })
}

async fn scan_history(user: AuthenticatedUser, history: web::Data<HistoryService>) -> HttpResponse {
    match history.overview(&user.0).await {
        Ok(overview) => HttpResponse::Ok().json(overview),
        Err(e) => {
            log::error!("History read for {} failed: {}", user.0, e);
            error_response(ErrorKind::StorageUnavailable, e.to_string())
        }
    }
}
