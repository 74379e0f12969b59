use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error, warn};

use crate::config::constants;

/// The numbered stills and intermediate video inside the working directory.
///
/// Frame files are named `image-{index:015}.jpg`, so lexical order equals
/// numeric order and ffmpeg's `image-%015d.jpg` pattern reads them in
/// capture order.
#[derive(Debug, Clone)]
pub struct FrameStore {
    dir: PathBuf,
}

impl FrameStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name of the still with the given sequence number.
    pub fn frame_file_name(index: u64) -> String {
        format!(
            "{}{:0width$}{}",
            constants::FRAME_PREFIX,
            index,
            constants::FRAME_SUFFIX,
            width = constants::FRAME_INDEX_WIDTH
        )
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(Self::frame_file_name(index))
    }

    /// Where ffmpeg writes the assembled video before it is renamed.
    pub fn video_path(&self) -> PathBuf {
        self.dir.join(constants::VIDEO_FILE)
    }

    fn is_frame(name: &str) -> bool {
        name.starts_with(constants::FRAME_PREFIX) && name.ends_with(constants::FRAME_SUFFIX)
    }

    /// All stills currently on disk, in sequence order.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let mut frames = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?
        {
            let entry = entry?;
            if entry
                .file_name()
                .to_str()
                .is_some_and(Self::is_frame)
            {
                frames.push(entry.path());
            }
        }
        frames.sort();
        Ok(frames)
    }

    /// Move the assembled video to `{name}_{timestamp}.mp4`.
    ///
    /// Spaces in the print name are replaced with underscores.
    pub fn finalize_video(&self, print_name: &str, timestamp: &str) -> Result<PathBuf> {
        let target = self.dir.join(Self::video_file_name(print_name, timestamp));
        fs::rename(self.video_path(), &target).with_context(|| {
            format!(
                "Failed to move {} to {}",
                self.video_path().display(),
                target.display()
            )
        })?;
        Ok(target)
    }

    pub fn video_file_name(print_name: &str, timestamp: &str) -> String {
        format!("{}_{}.mp4", print_name.replace(' ', "_"), timestamp)
    }

    /// Warn about stills left behind by an earlier, interrupted run.
    ///
    /// ffmpeg reads the sequence contiguously from 0, so leftovers numbered
    /// past the next print's last still end up in its video. Returns how many
    /// were found.
    pub fn report_leftovers(&self) -> Result<usize> {
        let leftovers = self.list()?.len();
        if leftovers > 0 {
            warn!(
                "{} still image(s) from a previous run found in {}; they will be included in the next video unless removed",
                leftovers,
                self.dir.display()
            );
        }
        Ok(leftovers)
    }

    /// Delete every still in the directory.
    ///
    /// A file that cannot be removed is logged and skipped. Returns the number
    /// of files deleted.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for frame in self.list()? {
            debug!("Deleting {}", frame.display());
            match fs::remove_file(&frame) {
                Ok(()) => removed += 1,
                Err(e) => error!("Error removing {}: {}", frame.display(), e),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_names_are_fifteen_digits() {
        assert_eq!(FrameStore::frame_file_name(0), "image-000000000000000.jpg");
        assert_eq!(FrameStore::frame_file_name(42), "image-000000000000042.jpg");
    }

    #[test]
    fn list_is_numeric_order_and_ignores_other_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FrameStore::new(dir.path());
        for index in [10, 2, 1] {
            fs::write(store.frame_path(index), b"jpg").expect("write frame");
        }
        fs::write(dir.path().join("benchy_2024.mp4"), b"mp4").expect("write video");

        let names: Vec<_> = store
            .list()
            .expect("list")
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect();
        assert_eq!(
            names,
            vec![
                FrameStore::frame_file_name(1),
                FrameStore::frame_file_name(2),
                FrameStore::frame_file_name(10),
            ]
        );
    }

    #[test]
    fn finalize_renames_with_underscored_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FrameStore::new(dir.path());
        fs::write(store.video_path(), b"mp4").expect("write video");

        let target = store
            .finalize_video("benchy hull", "2026_10_16_09_30_00")
            .expect("rename");
        assert_eq!(target, dir.path().join("benchy_hull_2026_10_16_09_30_00.mp4"));
        assert!(target.exists());
        assert!(!store.video_path().exists());
    }

    #[test]
    fn finalize_without_video_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FrameStore::new(dir.path());
        assert!(store.finalize_video("part", "now").is_err());
    }

    #[test]
    fn leftovers_from_previous_run_are_counted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FrameStore::new(dir.path());
        assert_eq!(store.report_leftovers().expect("scan"), 0);

        fs::write(store.frame_path(7), b"stale").expect("write");
        fs::write(store.frame_path(8), b"stale").expect("write");
        assert_eq!(store.report_leftovers().expect("scan"), 2);
        // reporting never deletes
        assert_eq!(store.list().expect("list").len(), 2);
    }

    #[test]
    fn clear_removes_only_frames() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FrameStore::new(dir.path());
        fs::write(store.frame_path(0), b"a").expect("write");
        fs::write(store.frame_path(1), b"b").expect("write");
        fs::write(dir.path().join("notes.txt"), b"keep").expect("write");

        assert_eq!(store.clear().expect("clear"), 2);
        assert!(store.list().expect("list").is_empty());
        assert!(dir.path().join("notes.txt").exists());
    }
}
