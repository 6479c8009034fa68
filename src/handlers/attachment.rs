use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse, Result};
use chrono::Utc;
use futures_util::TryStreamExt;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::handlers::auth::{current_actor, current_claims};
use crate::models::board::BoardVariant;
use crate::models::card::{Attachment, Card};
use crate::models::response::ApiResponse;
use crate::services::BoardRegistry;
use crate::utils::errors::ServiceError;

const ALLOWED_EXTENSIONS: [&str; 14] = [
    "jpg", "jpeg", "png", "gif", "pdf", "doc", "docx", "txt", "zip", "rar", "json", "xml", "csv", "xlsx",
];

/// Multipart body of an upload; only used for the OpenAPI document.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadFileRequest {
    #[schema(value_type = String, format = Binary)]
    pub file: String,
}

pub async fn ensure_upload_dir(config: &AppConfig) -> Result<PathBuf, ServiceError> {
    let upload_dir = PathBuf::from(&config.upload_dir);
    tokio::fs::create_dir_all(&upload_dir).await.map_err(|e| {
        log::error!("Failed to create upload directory: {}", e);
        ServiceError::InternalError("Failed to create upload directory".to_string())
    })?;
    Ok(upload_dir)
}

fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default()
}

/// Checks the extension against the whitelist and returns the MIME type.
pub fn validate_file(file_name: &str, file_size: usize, max_bytes: usize) -> Result<String, ServiceError> {
    if file_size == 0 {
        return Err(ServiceError::ValidationError("File is empty".to_string()));
    }
    if file_size > max_bytes {
        return Err(ServiceError::ValidationError(format!(
            "File size exceeds {} bytes limit",
            max_bytes
        )));
    }

    let extension = extension_of(file_name);
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ServiceError::ValidationError(format!(
            "File type '{}' not allowed",
            extension
        )));
    }

    let mime_type = match extension.as_str() {
        "jpg" | "jpeg" => mime::IMAGE_JPEG.to_string(),
        "png" => mime::IMAGE_PNG.to_string(),
        "gif" => mime::IMAGE_GIF.to_string(),
        "pdf" => mime::APPLICATION_PDF.to_string(),
        "txt" => mime::TEXT_PLAIN.to_string(),
        "csv" => mime::TEXT_CSV.to_string(),
        "json" => mime::APPLICATION_JSON.to_string(),
        "xml" => "application/xml".to_string(),
        "doc" => "application/msword".to_string(),
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document".to_string(),
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
        "zip" => "application/zip".to_string(),
        "rar" => "application/x-rar-compressed".to_string(),
        _ => mime::APPLICATION_OCTET_STREAM.to_string(),
    };

    Ok(mime_type)
}

/// Deletes a stored upload; a missing file is only logged.
pub async fn remove_stored_file(config: &AppConfig, stored_name: &str) {
    let file_path = Path::new(&config.upload_dir).join(stored_name);
    if let Err(e) = tokio::fs::remove_file(&file_path).await {
        log::warn!("Failed to delete file {}: {}", file_path.display(), e);
    }
}

/// Upload a file attachment to a card
#[utoipa::path(
    post,
    path = "/api/{variant}/cards/{id}/attachments",
    tag = "attachments",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID")
    ),
    request_body(
        content = inline(UploadFileRequest),
        description = "File to upload as multipart/form-data",
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 201, description = "File uploaded successfully", body = ApiResponse<Attachment>),
        (status = 400, description = "Validation error", body = crate::models::response::ErrorResponse),
        (status = 404, description = "Card not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn upload_file(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    mut payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    let (variant, id) = path.into_inner();
    log::info!("POST /api/{}/cards/{}/attachments - Uploading file", variant, id);
    let actor = current_actor(&req, &config)?;

    // fail fast before reading the body
    registry.read(variant, |ws| ws.card(&id).map(|_| ())).await?;

    let upload_dir = ensure_upload_dir(&config).await?;

    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        log::error!("Multipart error: {}", e);
        ServiceError::ValidationError("Invalid multipart data".to_string())
    })? {
        let file_name = match field.content_disposition().and_then(|cd| cd.get_filename()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        log::info!("Processing file: {}", file_name);

        let mut file_data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| {
            log::error!("File chunk error: {}", e);
            ServiceError::ValidationError("Error reading file data".to_string())
        })? {
            file_data.extend_from_slice(&chunk);
            if file_data.len() > config.max_upload_bytes {
                return Err(ServiceError::ValidationError(format!(
                    "File size exceeds {} bytes limit",
                    config.max_upload_bytes
                )));
            }
        }

        let mime_type = validate_file(&file_name, file_data.len(), config.max_upload_bytes)?;
        let attachment_id = Uuid::new_v4().to_string();
        let stored_name = format!("{}_{}.{}", id, attachment_id, extension_of(&file_name));
        let file_path = upload_dir.join(&stored_name);

        tokio::fs::write(&file_path, &file_data).await.map_err(|e| {
            log::error!("Failed to write file: {}", e);
            ServiceError::InternalError("Failed to save file".to_string())
        })?;

        let attachment = Attachment {
            url: format!("/api/{}/cards/{}/attachments/{}/download", variant, id, attachment_id),
            id: attachment_id,
            name: file_name.clone(),
            stored_name: stored_name.clone(),
            mime_type,
            size: file_data.len() as u64,
            uploaded_by: actor.username.clone(),
            created_at: Utc::now(),
        };

        let saved = attachment.clone();
        if let Err(e) = registry
            .mutate(variant, |ws| ws.add_attachment(&id, saved, &actor))
            .await
        {
            // the card may have been deleted while the body was streaming
            remove_stored_file(&config, &stored_name).await;
            return Err(e.into());
        }

        log::info!("File uploaded successfully: {} ({})", file_name, stored_name);
        return Ok(HttpResponse::Created().json(ApiResponse::success("File uploaded successfully", attachment)));
    }

    Err(ServiceError::ValidationError("No file found in request".to_string()))
}

/// Get all attachments for a card
#[utoipa::path(
    get,
    path = "/api/{variant}/cards/{id}/attachments",
    tag = "attachments",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID")
    ),
    responses(
        (status = 200, description = "Attachments retrieved successfully", body = ApiResponse<Vec<Attachment>>),
        (status = 404, description = "Card not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn get_card_attachments(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, id) = path.into_inner();
    log::info!("GET /api/{}/cards/{}/attachments", variant, id);
    current_claims(&req, &config)?;

    let attachments = registry
        .read(variant, |ws| ws.card(&id).map(|c| c.attachments.clone()))
        .await?;

    log::info!("Retrieved {} attachments for card {}", attachments.len(), id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Attachments retrieved successfully", attachments)))
}

fn find_attachment(card: &Card, attachment_id: &str) -> Result<Attachment, ServiceError> {
    card.attachments
        .iter()
        .find(|a| a.id == attachment_id)
        .cloned()
        .ok_or_else(|| {
            log::warn!("Attachment not found: {} for card {}", attachment_id, card.id);
            ServiceError::NotFound("Attachment not found".to_string())
        })
}

/// Download a file attachment
#[utoipa::path(
    get,
    path = "/api/{variant}/cards/{id}/attachments/{attachment_id}/download",
    tag = "attachments",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID"),
        ("attachment_id" = String, Path, description = "Attachment ID")
    ),
    responses(
        (status = 200, description = "File download", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn download_file(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, id, attachment_id) = path.into_inner();
    log::info!("GET /api/{}/cards/{}/attachments/{}/download", variant, id, attachment_id);
    current_claims(&req, &config)?;

    let card = registry.read(variant, |ws| ws.card(&id).cloned()).await?;
    let attachment = find_attachment(&card, &attachment_id)?;

    let file_path = Path::new(&config.upload_dir).join(&attachment.stored_name);
    let file_data = tokio::fs::read(&file_path).await.map_err(|e| {
        log::error!("Failed to read file {}: {}", file_path.display(), e);
        ServiceError::NotFound("File not found on disk".to_string())
    })?;

    log::info!("File downloaded: {} ({} bytes)", attachment.name, file_data.len());

    Ok(HttpResponse::Ok()
        .content_type(attachment.mime_type.as_str())
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", attachment.name.replace('"', "")),
        ))
        .body(file_data))
}

/// Delete a file attachment
#[utoipa::path(
    delete,
    path = "/api/{variant}/cards/{id}/attachments/{attachment_id}",
    tag = "attachments",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID"),
        ("attachment_id" = String, Path, description = "Attachment ID")
    ),
    responses(
        (status = 200, description = "Attachment deleted successfully", body = ApiResponse<bool>),
        (status = 404, description = "Attachment not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn delete_attachment(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, id, attachment_id) = path.into_inner();
    log::info!("DELETE /api/{}/cards/{}/attachments/{}", variant, id, attachment_id);
    let actor = current_actor(&req, &config)?;

    let removed = registry
        .mutate(variant, |ws| ws.remove_attachment(&id, &attachment_id, &actor))
        .await?;
    remove_stored_file(&config, &removed.stored_name).await;

    log::info!("Attachment deleted successfully: {}", attachment_id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Attachment deleted successfully", true)))
}

pub fn attachment_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/cards/{id}/attachments")
            .route("", web::post().to(upload_file))
            .route("", web::get().to(get_card_attachments))
            .route("/{attachment_id}/download", web::get().to(download_file))
            .route("/{attachment_id}", web::delete().to(delete_attachment)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_checks_extension_and_size() {
        assert_eq!(validate_file("certidao.PDF", 10, 100).unwrap(), "application/pdf");
        assert_eq!(validate_file("foto.jpeg", 10, 100).unwrap(), "image/jpeg");
        assert!(validate_file("script.exe", 10, 100).is_err());
        assert!(validate_file("noextension", 10, 100).is_err());
        assert!(validate_file("big.pdf", 101, 100).is_err());
        assert!(validate_file("empty.pdf", 0, 100).is_err());
    }
}
