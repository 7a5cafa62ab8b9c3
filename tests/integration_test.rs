use docsight::db::result_store::{PgResultStore, ResultStore, StoreError};
use docsight::db::{self, queries};
use docsight::models::image::ImageKind;
use docsight::models::project::ProjectStatus;
use docsight::models::result_set::NewResultSet;
use uuid::Uuid;

/// Integration test: full persistence flow
///
/// This test verifies the complete integration:
/// 1. Database connection and schema migrations
/// 2. Model registration
/// 3. Project lifecycle (create/fetch/status transitions)
/// 4. Image rows and the denormalized image count
/// 5. Result set persistence and the one-per-image invariant
/// 6. Cascading cleanup
///
/// Note: This requires a running PostgreSQL instance configured
/// via the DATABASE_URL environment variable.
#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_full_persistence_flow() {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let db_pool = db::init_pool(&database_url)
        .await
        .expect("Failed to connect to database");

    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run migrations");

    // 1. Register a model
    let model_name = format!("test-model-{}", Uuid::new_v4());
    let model = queries::create_model(&db_pool, &model_name, Some("integration test model"))
        .await
        .expect("Failed to create model");
    assert_eq!(model.name, model_name);

    // 2. Create a project bound to it
    let project = queries::create_project(&db_pool, "integration test project", Some(model.id))
        .await
        .expect("Failed to create project");
    assert_eq!(project.status, ProjectStatus::Pending);
    assert_eq!(project.model_id, Some(model.id));
    assert_eq!(project.image_total, 0);

    // 3. Attach two images and bump the count
    let first = queries::create_image(
        &db_pool,
        project.id,
        &format!("{}.png", Uuid::new_v4()),
        "scan_01.png",
        ImageKind::Png,
    )
    .await
    .expect("Failed to create image");

    let second = queries::create_image(
        &db_pool,
        project.id,
        &format!("{}.jpg", Uuid::new_v4()),
        "scan_02.jpg",
        ImageKind::Jpg,
    )
    .await
    .expect("Failed to create image");

    let total = queries::bump_image_total(&db_pool, project.id, 2)
        .await
        .expect("Failed to bump image total");
    assert_eq!(total, 2);

    let images = queries::list_images(&db_pool, project.id)
        .await
        .expect("Failed to list images");
    assert_eq!(images.len(), 2);
    assert_eq!(images[0].id, first.id); // upload order
    assert_eq!(images[1].file_type, ImageKind::Jpg);

    // 4. Status transitions round-trip through the uppercase column
    queries::update_project_status(&db_pool, project.id, ProjectStatus::Processing)
        .await
        .expect("Failed to update status");

    let fetched = queries::get_project(&db_pool, project.id)
        .await
        .expect("Failed to get project")
        .expect("Project not found");
    assert_eq!(fetched.status, ProjectStatus::Processing);
    assert_eq!(fetched.image_total, 2);

    // 5. Persist a result set; a second insert for the same image is rejected
    let store = PgResultStore::new(db_pool.clone());
    let new = NewResultSet {
        image_id: first.id,
        project_id: project.id,
        detection: serde_json::json!({"boxes": [[0, 0, 10, 10]]}),
        recognition: serde_json::json!({"text": "hello"}),
        interpretation: serde_json::json!({"fields": {}}),
        detection_image_path: Some(format!(
            "outputs/project_{}/scan_01/detection/final/visual/scan_01.png",
            project.id
        )),
        recognition_image_path: None,
        interpretation_image_path: None,
    };

    store
        .create_result_set(new.clone())
        .await
        .expect("Failed to persist result set");

    match store.create_result_set(new).await {
        Err(StoreError::Duplicate(id)) => assert_eq!(id, first.id),
        other => panic!("expected duplicate rejection, got {other:?}"),
    }

    let stored = queries::get_result_set_by_image(&db_pool, first.id)
        .await
        .expect("Failed to fetch result set")
        .expect("Result set not found");
    assert_eq!(stored.recognition["text"], "hello");
    assert_eq!(stored.project_id, project.id);
    assert!(stored.recognition_image_path.is_none());

    assert!(queries::get_result_set_by_image(&db_pool, second.id)
        .await
        .expect("Failed to fetch result set")
        .is_none());

    // 6. Deleting an image returns the row; deleting the project cascades
    let removed = queries::delete_image(&db_pool, second.id)
        .await
        .expect("Failed to delete image")
        .expect("Image not found");
    assert_eq!(removed.file_name, second.file_name);

    assert!(queries::delete_project(&db_pool, project.id)
        .await
        .expect("Failed to delete project"));
    assert!(queries::get_project(&db_pool, project.id)
        .await
        .expect("Failed to get project")
        .is_none());
    assert!(queries::get_image(&db_pool, first.id)
        .await
        .expect("Failed to get image")
        .is_none());
    assert!(queries::get_result_set_by_image(&db_pool, first.id)
        .await
        .expect("Failed to fetch result set")
        .is_none());

    println!("✅ All persistence integration tests passed!");
}
