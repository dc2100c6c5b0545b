//! Built-in media handling: file classification, capture time, job collection and the
//! organizer handler used by the CLI.

pub mod cleanup;
pub mod collect;
pub mod metadata;
pub mod organize;

pub use cleanup::{cleanup_empty_dirs, find_empty_dirs};
pub use collect::{CollectedJobs, collect_jobs};
pub use metadata::{FsMetadata, MetadataSource, date_from_file_name};
pub use organize::{Organizer, Placement, destination_dir, target_file_name};

use std::fmt;
use std::path::Path;

use crate::engine::tools::extension_lower;
use crate::utils::config::{PHOTO_EXTENSIONS, VIDEO_EXTENSIONS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Classify by extension (case-insensitive). `None` for anything else.
    pub fn of(path: &Path) -> Option<MediaKind> {
        let ext = extension_lower(path)?;
        if PHOTO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Photo)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Photo => f.write_str("Photo"),
            MediaKind::Video => f.write_str("Video"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(MediaKind::of(Path::new("a/IMG_1.JPG")), Some(MediaKind::Photo));
        assert_eq!(MediaKind::of(Path::new("clip.MOV")), Some(MediaKind::Video));
        assert_eq!(MediaKind::of(Path::new("notes.txt")), None);
        assert_eq!(MediaKind::of(Path::new("README")), None);
    }
}
