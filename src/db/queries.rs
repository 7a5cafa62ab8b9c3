use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::models::ai_model::AiModel;
use crate::models::image::{Image, ImageKind};
use crate::models::project::{Project, ProjectStatus};
use crate::models::result_set::ResultSet;

const PROJECT_COLUMNS: &str =
    "id, name, model_id, image_total, status, created_at, updated_at";
const IMAGE_COLUMNS: &str =
    "id, project_id, file_name, original_name, file_type, created_at, updated_at";

fn project_from_row(row: &PgRow) -> Result<Project, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Project {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        model_id: row.try_get("model_id")?,
        image_total: row.try_get("image_total")?,
        status: status.parse().unwrap_or(ProjectStatus::Pending),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn image_from_row(row: &PgRow) -> Result<Image, sqlx::Error> {
    let file_type: String = row.try_get("file_type")?;
    Ok(Image {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        file_name: row.try_get("file_name")?,
        original_name: row.try_get("original_name")?,
        file_type: ImageKind::from_extension(&file_type).unwrap_or(ImageKind::Png),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Register a new AI model.
pub async fn create_model(
    pool: &PgPool,
    name: &str,
    description: Option<&str>,
) -> Result<AiModel, sqlx::Error> {
    sqlx::query_as::<_, AiModel>(
        r#"
        INSERT INTO ai_models (name, description)
        VALUES ($1, $2)
        RETURNING id, name, description, created_at, updated_at
        "#,
    )
    .bind(name)
    .bind(description)
    .fetch_one(pool)
    .await
}

/// List registered models, oldest first.
pub async fn list_models(pool: &PgPool) -> Result<Vec<AiModel>, sqlx::Error> {
    sqlx::query_as::<_, AiModel>(
        r#"
        SELECT id, name, description, created_at, updated_at
        FROM ai_models
        ORDER BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Insert a new project, status `PENDING`.
pub async fn create_project(
    pool: &PgPool,
    name: &str,
    model_id: Option<i64>,
) -> Result<Project, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO projects (name, model_id)
        VALUES ($1, $2)
        RETURNING {PROJECT_COLUMNS}
        "#,
    ))
    .bind(name)
    .bind(model_id)
    .fetch_one(pool)
    .await?;

    project_from_row(&row)
}

/// Get a project by id.
pub async fn get_project(pool: &PgPool, project_id: i64) -> Result<Option<Project>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {PROJECT_COLUMNS}
        FROM projects
        WHERE id = $1
        "#,
    ))
    .bind(project_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(project_from_row).transpose()
}

/// List projects, newest first.
pub async fn list_projects(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {PROJECT_COLUMNS}
        FROM projects
        ORDER BY created_at DESC
        "#,
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(project_from_row).collect()
}

/// Delete a project; its images go with it via the cascade.
pub async fn delete_project(pool: &PgPool, project_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(project_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Record a status transition for a project.
pub async fn update_project_status(
    pool: &PgPool,
    project_id: i64,
    status: ProjectStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE projects SET status = $1 WHERE id = $2")
        .bind(status.to_string())
        .bind(project_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert one uploaded image row.
pub async fn create_image(
    pool: &PgPool,
    project_id: i64,
    file_name: &str,
    original_name: &str,
    file_type: ImageKind,
) -> Result<Image, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO images (project_id, file_name, original_name, file_type)
        VALUES ($1, $2, $3, $4)
        RETURNING {IMAGE_COLUMNS}
        "#,
    ))
    .bind(project_id)
    .bind(file_name)
    .bind(original_name)
    .bind(file_type.to_string())
    .fetch_one(pool)
    .await?;

    image_from_row(&row)
}

/// Get one image by id.
pub async fn get_image(pool: &PgPool, image_id: i64) -> Result<Option<Image>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {IMAGE_COLUMNS}
        FROM images
        WHERE id = $1
        "#,
    ))
    .bind(image_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(image_from_row).transpose()
}

/// All images of a project, in upload order.
pub async fn list_images(pool: &PgPool, project_id: i64) -> Result<Vec<Image>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {IMAGE_COLUMNS}
        FROM images
        WHERE project_id = $1
        ORDER BY id ASC
        "#,
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(image_from_row).collect()
}

/// Delete one image row, returning it so the caller can remove the file.
pub async fn delete_image(pool: &PgPool, image_id: i64) -> Result<Option<Image>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        DELETE FROM images
        WHERE id = $1
        RETURNING {IMAGE_COLUMNS}
        "#,
    ))
    .bind(image_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(image_from_row).transpose()
}

/// Adjust a project's denormalized image count.
pub async fn bump_image_total(
    pool: &PgPool,
    project_id: i64,
    delta: i64,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        UPDATE projects
        SET image_total = GREATEST(image_total + $1, 0)
        WHERE id = $2
        RETURNING image_total
        "#,
    )
    .bind(delta)
    .bind(project_id)
    .fetch_one(pool)
    .await?;

    row.try_get("image_total")
}

/// Fetch the persisted result set for one image, if any.
pub async fn get_result_set_by_image(
    pool: &PgPool,
    image_id: i64,
) -> Result<Option<ResultSet>, sqlx::Error> {
    sqlx::query_as::<_, ResultSet>(
        r#"
        SELECT id, image_id, project_id, detection, recognition, interpretation,
               detection_image_path, recognition_image_path, interpretation_image_path,
               created_at, updated_at
        FROM result_sets
        WHERE image_id = $1
        "#,
    )
    .bind(image_id)
    .fetch_optional(pool)
    .await
}
