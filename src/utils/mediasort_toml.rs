//! Load `.mediasort.toml` from the source directory (CLI only). Library callers build
//! `EngineOpts` themselves.

use serde::Deserialize;
use std::path::Path;

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MediasortToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    workers: Option<usize>,
    dry_run: Option<bool>,
    progress: Option<bool>,
    verbose: Option<bool>,
    follow_links: Option<bool>,
    exclude: Option<Vec<String>>,
    grace_secs: Option<u64>,
    tick_ms: Option<u64>,
    /// `process` copies instead of moving (same as `merge`).
    copy: Option<bool>,
}

impl MediasortToml {
    pub(crate) fn copy(&self) -> bool {
        self.settings.copy.unwrap_or(false)
    }
}

/// Load the config file from `dir` if present. `None` if missing or unreadable; parse errors
/// are logged and ignored.
pub(crate) fn load_mediasort_toml(dir: &Path) -> Option<MediasortToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_mediasort_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub(crate) fn parse_mediasort_toml(s: &str) -> Result<MediasortToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($section:expr, $opts:expr, $field:ident => Some) => {
        if let Some(v) = $section.$field {
            $opts.$field = Some(v);
        }
    };
    ($section:expr, $opts:expr, $field:ident) => {
        if let Some(v) = $section.$field {
            $opts.$field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags.
pub(crate) fn apply_file_to_opts(file: &MediasortToml, opts: &mut Opts) {
    let s = &file.settings;
    apply_file_opt!(s, opts, workers => Some);
    apply_file_opt!(s, opts, dry_run);
    apply_file_opt!(s, opts, progress);
    apply_file_opt!(s, opts, verbose);
    apply_file_opt!(s, opts, follow_links);
    if let Some(ref v) = s.exclude {
        opts.exclude = v.clone();
    }
    apply_file_opt!(s, opts, grace_secs => Some);
    apply_file_opt!(s, opts, tick_ms => Some);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_only_override_present_fields() {
        let file = parse_mediasort_toml(
            r#"
            [settings]
            workers = 8
            exclude = ["*.tmp"]
            copy = true
            "#,
        )
        .unwrap();
        let mut opts = Opts {
            progress: true,
            grace_secs: Some(5),
            ..Opts::default()
        };
        apply_file_to_opts(&file, &mut opts);
        assert_eq!(opts.workers, Some(8));
        assert_eq!(opts.exclude, vec!["*.tmp".to_string()]);
        assert!(opts.progress);
        assert_eq!(opts.grace_secs, Some(5));
        assert!(file.copy());
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let file = parse_mediasort_toml("").unwrap();
        assert!(!file.copy());
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts);
        assert!(opts.workers.is_none());
    }
}
