//! Capture time lookup.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use std::path::Path;

use crate::JobError;

/// Source of a file's capture time. Implementations must be safe to call from any worker.
pub trait MetadataSource: Send + Sync + 'static {
    fn capture_time(&self, path: &Path) -> Result<NaiveDateTime, JobError>;
}

/// Filesystem-only source: an already organized name (`YYYY-MM-DD[-HHMM]...`) wins, else
/// the file's modification time in local time.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsMetadata;

impl MetadataSource for FsMetadata {
    fn capture_time(&self, path: &Path) -> Result<NaiveDateTime, JobError> {
        if let Some(ts) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(date_from_file_name)
        {
            return Ok(ts);
        }
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| JobError::metadata(path, e))?;
        Ok(DateTime::<Local>::from(modified).naive_local())
    }
}

/// Parse a leading `YYYY-MM-DD` with optional `-HHMM`. Midnight when no time is present.
pub fn date_from_file_name(name: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(name.get(..10)?, "%Y-%m-%d").ok()?;
    let time = name
        .get(10..15)
        .and_then(|t| t.strip_prefix('-'))
        .filter(|t| t.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|t| NaiveTime::parse_from_str(t, "%H%M").ok())
        .unwrap_or_default();
    Some(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_organized_names() {
        let ts = date_from_file_name("2023-07-04-1830.jpg").unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M").to_string(), "2023-07-04 18:30");
        let day = date_from_file_name("2023-07-04-paris.jpg").unwrap();
        assert_eq!(day.format("%H%M").to_string(), "0000");
        assert!(date_from_file_name("IMG_0001.jpg").is_none());
        assert!(date_from_file_name("2023-13-40.jpg").is_none());
    }

    #[test]
    fn missing_file_is_metadata_error() {
        let err = FsMetadata
            .capture_time(Path::new("/definitely/not/here.jpg"))
            .unwrap_err();
        assert_eq!(err.kind, crate::JobErrorKind::Metadata);
    }
}
