//! Accumulation of manifest rows across videos.
//!
//! Records arrive per video, tagged with the video's position in discovery
//! order. Batches may be added in any order (parallel workers finish when
//! they finish); [`Manifest::records`] always yields them by discovery
//! ordinal and, within a video, in the order the sampler produced them.

use std::collections::BTreeMap;
use std::path::Path;

use crate::record::FrameRecord;

/// The ordered, append-only collection of rows for one run.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    batches: BTreeMap<usize, Vec<FrameRecord>>,
}

impl Manifest {
    /// An empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the records of the video at `ordinal` in discovery order.
    ///
    /// Adding the same ordinal twice appends to the existing batch.
    pub fn add_video(&mut self, ordinal: usize, records: Vec<FrameRecord>) {
        debug_assert!(
            records.windows(2).all(|pair| pair[0].frame() < pair[1].frame()),
            "records of one video must be strictly ascending by frame"
        );
        self.batches.entry(ordinal).or_default().extend(records);
    }

    /// Insert the placeholder row used when discovery finds no videos.
    ///
    /// Ignored if the manifest already holds rows.
    pub fn add_sentinel(&mut self, frame_dir: &Path, predict_dir: &Path) {
        if self.is_empty() {
            self.batches
                .insert(0, vec![FrameRecord::sentinel(frame_dir, predict_dir)]);
        }
    }

    /// Number of rows, header excluded.
    pub fn len(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }

    /// Whether no row has been added yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows in manifest order.
    pub fn records(&self) -> impl Iterator<Item = &FrameRecord> {
        self.batches.values().flatten()
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = &mut FrameRecord> {
        self.batches.values_mut().flatten()
    }

    /// Consume the manifest, returning its rows in manifest order.
    pub fn into_records(self) -> Vec<FrameRecord> {
        self.batches.into_values().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(stem: &str, frames: &[u64]) -> Vec<FrameRecord> {
        frames
            .iter()
            .map(|&frame| FrameRecord::sampled(stem, frame, Path::new("f"), Path::new("p")))
            .collect()
    }

    fn keys(manifest: &Manifest) -> Vec<(String, u64)> {
        manifest
            .records()
            .map(|record| (record.video().to_string(), record.frame()))
            .collect()
    }

    #[test]
    fn order_follows_discovery_not_arrival() {
        let mut manifest = Manifest::new();
        manifest.add_video(2, records("c", &[0]));
        manifest.add_video(0, records("a", &[0, 30]));
        manifest.add_video(1, records("b", &[0, 30, 60]));

        assert_eq!(manifest.len(), 6);
        assert_eq!(
            keys(&manifest),
            vec![
                ("a".to_string(), 0),
                ("a".to_string(), 30),
                ("b".to_string(), 0),
                ("b".to_string(), 30),
                ("b".to_string(), 60),
                ("c".to_string(), 0),
            ]
        );
    }

    #[test]
    fn repeated_ordinal_extends_its_batch() {
        let mut manifest = Manifest::new();
        manifest.add_video(1, records("b", &[0]));
        manifest.add_video(0, records("a", &[0]));
        manifest.add_video(0, records("a", &[30]));
        assert_eq!(
            keys(&manifest),
            vec![("a".to_string(), 0), ("a".to_string(), 30), ("b".to_string(), 0)]
        );
    }

    #[test]
    fn sentinel_only_fills_an_empty_manifest() {
        let mut manifest = Manifest::new();
        manifest.add_sentinel(Path::new("frames"), Path::new("predict"));
        manifest.add_sentinel(Path::new("frames"), Path::new("predict"));
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.records().next().unwrap().video(), "sample_video");

        let mut populated = Manifest::new();
        populated.add_video(0, records("a", &[0]));
        populated.add_sentinel(Path::new("frames"), Path::new("predict"));
        assert_eq!(keys(&populated), vec![("a".to_string(), 0)]);
    }

    #[test]
    fn videos_without_records_leave_the_manifest_empty() {
        let mut manifest = Manifest::new();
        manifest.add_video(0, Vec::new());
        assert!(manifest.is_empty());
        assert!(manifest.into_records().is_empty());
    }
}
