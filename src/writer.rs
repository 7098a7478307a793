//! Manifest serialization.
//!
//! The manifest is a CSV file in the spreadsheet dialect: comma separated,
//! `\r\n` line endings, and fields quoted only when they contain a comma, a
//! double quote, or a line break. The header is always
//! `video,frame,frame_path,predict_path,status`.
//!
//! Rows are written to a temporary file next to the target which is then
//! renamed over it, so a failed or interrupted write never leaves a partial
//! manifest behind.

use std::borrow::Cow;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};

use crate::error::PipelineError;
use crate::manifest::Manifest;
use crate::record::FrameRecord;

/// Manifest columns, in file order.
pub const MANIFEST_COLUMNS: [&str; 5] = ["video", "frame", "frame_path", "predict_path", "status"];

const LINE_TERMINATOR: &str = "\r\n";

/// Writes a [`Manifest`] to a CSV file.
#[derive(Debug, Clone)]
pub struct ManifestWriter {
    path: PathBuf,
}

impl ManifestWriter {
    /// A writer targeting `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// The manifest path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mark every record processed and replace the file at the target path.
    ///
    /// Returns the number of rows written, header excluded.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ManifestWrite`] if the temporary file cannot be
    /// created, written, or moved into place. The target is untouched in
    /// that case.
    pub fn write(&self, manifest: &mut Manifest) -> Result<usize, PipelineError> {
        for record in manifest.records_mut() {
            record.mark_processed();
        }

        let write_error = |source: std::io::Error| PipelineError::ManifestWrite {
            path: self.path.clone(),
            source,
        };

        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staging = staging_file(directory).map_err(write_error)?;

        let rows = {
            let mut out = BufWriter::new(staging.as_file_mut());
            write_row(&mut out, MANIFEST_COLUMNS.iter().map(|&column| Cow::Borrowed(column)))
                .map_err(write_error)?;
            let mut rows = 0;
            for record in manifest.records() {
                write_row(&mut out, record_fields(record)).map_err(write_error)?;
                rows += 1;
            }
            out.flush().map_err(write_error)?;
            rows
        };
        staging.as_file().sync_all().map_err(write_error)?;
        // A replaced manifest keeps the permissions it already had.
        if let Ok(existing) = fs::metadata(&self.path) {
            staging
                .as_file()
                .set_permissions(existing.permissions())
                .map_err(write_error)?;
        }
        staging
            .persist(&self.path)
            .map_err(|error| write_error(error.error))?;

        log::info!("Created inspection CSV: {} ({rows} rows)", self.path.display());
        Ok(rows)
    }
}

/// Create the temporary file the manifest is staged in.
///
/// On unix it is opened with mode `0o666` so the process umask applies,
/// exactly as for a file created with [`fs::File::create`].
fn staging_file(directory: &Path) -> std::io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix(".inspection-").suffix(".csv.tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(directory)
}

fn record_fields(record: &FrameRecord) -> [Cow<'_, str>; 5] {
    [
        Cow::Borrowed(record.video()),
        Cow::Owned(record.frame().to_string()),
        record.frame_path().to_string_lossy(),
        record.predict_path().to_string_lossy(),
        Cow::Borrowed(record.status().as_str()),
    ]
}

fn write_row<'a, W, I>(out: &mut W, fields: I) -> std::io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = Cow<'a, str>>,
{
    for (position, field) in fields.into_iter().enumerate() {
        if position > 0 {
            out.write_all(b",")?;
        }
        out.write_all(escape_field(&field).as_bytes())?;
    }
    out.write_all(LINE_TERMINATOR.as_bytes())
}

/// Quote a field if it contains a delimiter, quote, or line break.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_with(stem: &str, frames: &[u64]) -> Manifest {
        let mut manifest = Manifest::new();
        manifest.add_video(
            0,
            frames
                .iter()
                .map(|&frame| FrameRecord::sampled(stem, frame, Path::new("frames"), Path::new("predict")))
                .collect(),
        );
        manifest
    }

    #[test]
    fn escaping_is_minimal() {
        assert_eq!(escape_field("clip"), "clip");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inspection.csv");
        let mut manifest = manifest_with("clip", &[0, 30]);

        let rows = ManifestWriter::new(&path).write(&mut manifest).unwrap();
        assert_eq!(rows, 2);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "video,frame,frame_path,predict_path,status\r\n\
             clip,0,frames/clip_frame_0000.jpg,predict/clip_predict_0000.jpg,processed\r\n\
             clip,30,frames/clip_frame_0030.jpg,predict/clip_predict_0030.jpg,processed\r\n"
        );
        assert!(manifest.records().all(|record| record.status().as_str() == "processed"));
    }

    #[test]
    fn empty_manifest_still_has_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inspection.csv");
        let rows = ManifestWriter::new(&path).write(&mut Manifest::new()).unwrap();
        assert_eq!(rows, 0);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "video,frame,frame_path,predict_path,status\r\n"
        );
    }

    #[test]
    fn overwrites_an_existing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inspection.csv");
        fs::write(&path, "stale contents that are much longer than the new manifest\n").unwrap();

        ManifestWriter::new(&path)
            .write(&mut manifest_with("clip", &[0]))
            .unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("stale"));
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn stems_with_commas_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inspection.csv");
        ManifestWriter::new(&path)
            .write(&mut manifest_with("take 1, wide", &[0]))
            .unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"take 1, wide\",0,\"frames/take 1, wide_frame_0000.jpg\""));
    }

    #[test]
    fn failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/inspection.csv");
        let error = ManifestWriter::new(&path)
            .write(&mut manifest_with("clip", &[0]))
            .unwrap_err();
        assert!(matches!(error, PipelineError::ManifestWrite { .. }));
        assert!(error.is_output_failure());
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn new_manifest_gets_the_same_mode_as_a_created_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("reference.csv");
        fs::File::create(&reference).unwrap();
        let path = dir.path().join("inspection.csv");

        ManifestWriter::new(&path).write(&mut Manifest::new()).unwrap();
        let mode = |path: &Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&path), mode(&reference));
    }

    #[cfg(unix)]
    #[test]
    fn replaced_manifest_keeps_its_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inspection.csv");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();

        ManifestWriter::new(&path)
            .write(&mut manifest_with("clip", &[0]))
            .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn staging_file_is_removed_after_the_rename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inspection.csv");
        ManifestWriter::new(&path).write(&mut Manifest::new()).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("inspection.csv")]);
    }
}
