use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Upload formats accepted for project images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpg,
    Jpeg,
}

impl ImageKind {
    /// Parse a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        ext.to_ascii_lowercase().parse().ok()
    }
}

/// One uploaded image belonging to a project.
///
/// `file_name` is the generated on-disk name (`<uuid>.<ext>`), unique across
/// the project; `original_name` is whatever the client called the file.
/// Immutable once created except for deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub project_id: i64,
    pub file_name: String,
    pub original_name: String,
    pub file_type: ImageKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_parsing_is_case_insensitive() {
        assert_eq!(ImageKind::from_extension("PNG"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_extension("jpeg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_extension("gif"), None);
        assert_eq!(ImageKind::from_extension(""), None);
    }

    #[test]
    fn kind_displays_as_extension() {
        assert_eq!(ImageKind::Jpg.to_string(), "jpg");
    }
}
