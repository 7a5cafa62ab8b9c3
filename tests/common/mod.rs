//! Shared helpers for batch orchestration tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use docsight::db::result_store::{ResultStore, StoreError};
use docsight::models::image::{Image, ImageKind};
use docsight::models::project::{Project, ProjectStatus};
use docsight::models::result_set::NewResultSet;

/// In-memory result store enforcing the same one-per-image invariant as the
/// real one, so tests can inspect what got persisted.
#[derive(Default)]
pub struct RecordingStore {
    pub created: Mutex<Vec<NewResultSet>>,
}

#[async_trait]
impl ResultStore for RecordingStore {
    async fn create_result_set(&self, new: NewResultSet) -> Result<(), StoreError> {
        let mut created = self.created.lock().unwrap();
        if created.iter().any(|r| r.image_id == new.image_id) {
            return Err(StoreError::Duplicate(new.image_id));
        }
        created.push(new);
        Ok(())
    }
}

/// Result store standing in for a database outage.
pub struct FailingStore;

#[async_trait]
impl ResultStore for FailingStore {
    async fn create_result_set(&self, _new: NewResultSet) -> Result<(), StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }
}

pub fn project(id: i64, model_id: Option<i64>) -> Project {
    Project {
        id,
        name: format!("project {id}"),
        model_id,
        image_total: 0,
        status: ProjectStatus::Pending,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn image(id: i64, project_id: i64, file_name: &str) -> Image {
    Image {
        id,
        project_id,
        file_name: file_name.to_string(),
        original_name: file_name.to_string(),
        file_type: ImageKind::Png,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Write an executable stand-in for the external AI pipeline.
///
/// The script reads the job descriptor it is handed and fabricates stage
/// artifacts under the descriptor's output directory. Behavior is keyed off
/// the image file name:
///   - contains `boom`:    exit non-zero without writing anything
///   - contains `slow`:    sleep far past any test timeout
///   - contains `pause`:   sleep 0.4s, then produce full artifacts
///   - contains `partial`: omit the interpretation results
///   - contains `garbled`: write invalid JSON for recognition
///   - otherwise:          full artifacts, visuals for all three stages
pub fn fake_pipeline(dir: &Path) -> PathBuf {
    let script = r#"#!/bin/sh
cfg="$1"
out_dir=$(sed -n 's/^ *"output_dir": "\([^"]*\)".*/\1/p' "$cfg")
image=$(sed -n 's/^ *"image_file_name": "\([^"]*\)".*/\1/p' "$cfg")

case "$image" in
  *boom*) exit 1 ;;
  *slow*) sleep 30 ;;
  *pause*) sleep 0.4 ;;
esac

for stage in detection recognition interpretation; do
  mkdir -p "$out_dir/$stage/final/visual"
done

printf '{"boxes": ["%s"]}' "$image" > "$out_dir/detection/final/results.json"

case "$image" in
  *garbled*) printf 'not json' > "$out_dir/recognition/final/results.json" ;;
  *) printf '{"text": "ok"}' > "$out_dir/recognition/final/results.json" ;;
esac

case "$image" in
  *partial*) ;;
  *) printf '{"fields": {}}' > "$out_dir/interpretation/final/results.json" ;;
esac

for stage in detection recognition interpretation; do
  printf 'png bytes' > "$out_dir/$stage/final/visual/$image"
done

exit 0
"#;

    let path = dir.join("fake_pipeline.sh");
    std::fs::write(&path, script).expect("Failed to write fake pipeline script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to mark fake pipeline executable");
    path
}

/// Write a pipeline stand-in that records its process id and then stalls
/// until it is killed, so tests can observe cancellation.
pub fn stalling_pipeline(dir: &Path, pid_file: &Path) -> PathBuf {
    let script = format!(
        "#!/bin/sh\necho $$ > \"{}\"\nexec sleep 30\n",
        pid_file.display()
    );

    let path = dir.join("stalling_pipeline.sh");
    std::fs::write(&path, script).expect("Failed to write stalling pipeline script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to mark stalling pipeline executable");
    path
}
