//! Directory provisioning and video discovery.

use std::fs;
use std::path::{Path, PathBuf};

use crate::configuration::PipelineConfig;
use crate::error::PipelineError;

/// Create every directory the run reads from or writes into.
///
/// Idempotent: existing directories are left alone.
pub fn provision_directories(config: &PipelineConfig) -> Result<(), PipelineError> {
    for directory in config.required_directories() {
        fs::create_dir_all(directory).map_err(|source| PipelineError::Directory {
            path: directory.to_path_buf(),
            source,
        })?;
        log::info!("Created/verified directory: {}", directory.display());
    }
    Ok(())
}

/// List the videos directly inside `directory`, sorted by file name.
///
/// Only regular files whose extension matches one of `extensions`
/// (case-insensitive, leading dot optional) are returned. Hidden files
/// (names starting with `.`, such as macOS `._clip.mp4` resource forks) and
/// subdirectories are skipped.
pub fn discover_videos<S: AsRef<str>>(
    directory: &Path,
    extensions: &[S],
) -> Result<Vec<PathBuf>, PipelineError> {
    let wanted: Vec<String> = extensions
        .iter()
        .map(|extension| extension.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|extension| !extension.is_empty())
        .collect();

    let discovery_error = |source: std::io::Error| PipelineError::Discovery {
        path: directory.to_path_buf(),
        source,
    };

    let mut videos = Vec::new();
    for entry in fs::read_dir(directory).map_err(discovery_error)? {
        let path = entry.map_err(discovery_error)?.path();
        if !path.is_file() || is_hidden(&path) {
            continue;
        }
        let matches = path
            .extension()
            .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|extension| wanted.contains(&extension));
        if matches {
            videos.push(path);
        }
    }

    videos.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    log::debug!("Discovered {} video(s) in {}", videos.len(), directory.display());
    Ok(videos)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn provisioning_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::rooted_at(dir.path());
        provision_directories(&config).unwrap();
        provision_directories(&config).unwrap();
        assert!(dir.path().join("videos").is_dir());
        assert!(dir.path().join("frames").is_dir());
        assert!(dir.path().join("predict").is_dir());
    }

    #[test]
    fn provisioning_creates_the_manifest_parent() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::rooted_at(dir.path())
            .with_output_csv(dir.path().join("reports/nested/inspection.csv"));
        provision_directories(&config).unwrap();
        assert!(dir.path().join("reports/nested").is_dir());
    }

    #[test]
    fn discovery_filters_by_extension_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.avi", "a.mp4", "C.MP4", "notes.txt", "noext", "._a.mp4", ".hidden.avi"] {
            touch(&dir.path().join(name));
        }
        fs::create_dir(dir.path().join("nested.mp4")).unwrap();
        touch(&dir.path().join("nested.mp4").join("inner.mp4"));

        let videos = discover_videos(dir.path(), &[".mp4", "avi"]).unwrap();
        let names: Vec<_> = videos
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["C.MP4", "a.mp4", "b.avi"]);
    }

    #[test]
    fn only_hidden_videos_discover_nothing() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("._clip.mp4"));
        assert!(discover_videos(dir.path(), &["mp4"]).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_a_discovery_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = discover_videos(&dir.path().join("absent"), &["mp4"]);
        assert!(matches!(result, Err(PipelineError::Discovery { .. })));
    }
}
