use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{error, warn};

use crate::app_state::AppState;
use crate::db::queries;
use crate::models::image::{Image, ImageKind};
use crate::models::result_set::ResultSet;

/// POST /api/v1/projects/{id}/images — upload one or more images.
///
/// Each part named `image` (or `images`) is content-sniffed, stored under a
/// generated name, and recorded as one row. Anything outside the png/jpg
/// allow-list is rejected before any file of the request is stored.
///
/// Persistence is per file, not per batch: a storage or insert failure
/// partway through returns 500 with the earlier files of the request kept.
/// The image listing shows what landed; re-uploading the remainder is safe
/// because stored names are generated per file.
pub async fn upload_images(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<Image>>), StatusCode> {
    queries::get_project(&state.db, project_id)
        .await
        .map_err(|e| {
            error!(project_id = %project_id, error = %e, "project fetch failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let mut uploads: Vec<(String, ImageKind, Vec<u8>)> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        if !matches!(field.name(), Some("image") | Some("images")) {
            continue;
        }
        let original_name = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        let kind =
            sniff_kind(&original_name, &data).ok_or(StatusCode::UNSUPPORTED_MEDIA_TYPE)?;
        uploads.push((original_name, kind, data.to_vec()));
    }

    if uploads.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut stored = Vec::with_capacity(uploads.len());
    for (original_name, kind, data) in uploads {
        let file_name = state
            .storage
            .save(project_id, kind, &data)
            .await
            .map_err(|e| {
                error!(project_id = %project_id, error = %e, "image store failed");
                StatusCode::INTERNAL_SERVER_ERROR
            })?;

        let image =
            queries::create_image(&state.db, project_id, &file_name, &original_name, kind)
                .await
                .map_err(|e| {
                    error!(project_id = %project_id, error = %e, "image row insert failed");
                    StatusCode::INTERNAL_SERVER_ERROR
                })?;

        if let Err(e) = queries::bump_image_total(&state.db, project_id, 1).await {
            warn!(project_id = %project_id, error = %e, "image count update failed");
        }

        metrics::counter!("docsight_uploads_total").increment(1);
        stored.push(image);
    }

    Ok((StatusCode::CREATED, Json(stored)))
}

/// GET /api/v1/projects/{id}/images — list a project's images.
pub async fn list_images(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<Json<Vec<Image>>, StatusCode> {
    queries::get_project(&state.db, project_id)
        .await
        .map_err(|e| {
            error!(project_id = %project_id, error = %e, "project fetch failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let images = queries::list_images(&state.db, project_id)
        .await
        .map_err(|e| {
            error!(project_id = %project_id, error = %e, "image listing failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(images))
}

/// DELETE /api/v1/images/{id} — delete one image and its stored file.
pub async fn delete_image(
    State(state): State<AppState>,
    Path(image_id): Path<i64>,
) -> Result<StatusCode, StatusCode> {
    let image = queries::delete_image(&state.db, image_id)
        .await
        .map_err(|e| {
            error!(image_id = %image_id, error = %e, "image deletion failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    if let Err(e) = state.storage.delete(image.project_id, &image.file_name).await {
        warn!(image_id = %image_id, error = %e, "stored file cleanup failed");
    }
    if let Err(e) = queries::bump_image_total(&state.db, image.project_id, -1).await {
        warn!(project_id = %image.project_id, error = %e, "image count update failed");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/images/{id}/results — the persisted pipeline results.
pub async fn get_image_results(
    State(state): State<AppState>,
    Path(image_id): Path<i64>,
) -> Result<Json<ResultSet>, StatusCode> {
    let result_set = queries::get_result_set_by_image(&state.db, image_id)
        .await
        .map_err(|e| {
            error!(image_id = %image_id, error = %e, "result set fetch failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    result_set.map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Determine the stored file-type tag from the actual bytes, preferring the
/// claimed extension only where it agrees with the sniffed format.
fn sniff_kind(original_name: &str, data: &[u8]) -> Option<ImageKind> {
    let format = image::guess_format(data).ok()?;
    let claimed = original_name
        .rsplit_once('.')
        .and_then(|(_, ext)| ImageKind::from_extension(ext));

    match format {
        image::ImageFormat::Png => Some(ImageKind::Png),
        image::ImageFormat::Jpeg => Some(
            claimed
                .filter(|k| matches!(k, ImageKind::Jpg | ImageKind::Jpeg))
                .unwrap_or(ImageKind::Jpg),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n rest";
    const JPEG_MAGIC: &[u8] = b"\xFF\xD8\xFF\xE0 rest";

    #[test]
    fn sniffs_png_regardless_of_claimed_name() {
        assert_eq!(sniff_kind("photo.jpg", PNG_MAGIC), Some(ImageKind::Png));
        assert_eq!(sniff_kind("photo.png", PNG_MAGIC), Some(ImageKind::Png));
    }

    #[test]
    fn jpeg_keeps_claimed_spelling_when_consistent() {
        assert_eq!(sniff_kind("a.jpeg", JPEG_MAGIC), Some(ImageKind::Jpeg));
        assert_eq!(sniff_kind("a.jpg", JPEG_MAGIC), Some(ImageKind::Jpg));
        assert_eq!(sniff_kind("a.png", JPEG_MAGIC), Some(ImageKind::Jpg));
    }

    #[test]
    fn non_image_bytes_are_rejected() {
        assert_eq!(sniff_kind("a.png", b"just text"), None);
        assert_eq!(sniff_kind("a.pdf", b"%PDF-1.4"), None);
    }
}
