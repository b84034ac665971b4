// SPDX-License-Identifier: GPL-3.0-only

//! Output directory and file naming for captures

use crate::constants::APP_NAME;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Media directory for captures: `<Pictures>/snapcam`, created if missing.
///
/// Falls back to `<local data>/snapcam`, then to the working directory, when
/// a candidate cannot be created. An explicit `override_dir` wins.
pub fn output_directory(override_dir: Option<&Path>) -> PathBuf {
    let candidates = match override_dir {
        Some(dir) => vec![dir.to_path_buf()],
        None => [dirs::picture_dir(), dirs::data_local_dir()]
            .into_iter()
            .flatten()
            .map(|base| base.join(APP_NAME))
            .collect(),
    };
    first_creatable(&candidates).unwrap_or_else(|| PathBuf::from("."))
}

/// First candidate directory that exists or can be created
pub fn first_creatable(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find_map(|dir| match std::fs::create_dir_all(dir) {
        Ok(()) => {
            debug!(path = %dir.display(), "Using output directory");
            Some(dir.clone())
        }
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Cannot use output directory");
            None
        }
    })
}

/// Path of a new capture in `dir`, named from `at` with `format` + `extension`.
///
/// Only the path is produced; the capture writes the file.
pub fn create_file(dir: &Path, format: &str, extension: &str, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}{}", at.format(format), extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{FILENAME_FORMAT, PHOTO_EXTENSION};
    use chrono::TimeZone;

    #[test]
    fn test_file_name_format() {
        let at = Local
            .with_ymd_and_hms(2024, 3, 7, 9, 5, 2)
            .single()
            .unwrap()
            + chrono::TimeDelta::milliseconds(42);
        let path = create_file(Path::new("/tmp/pics"), FILENAME_FORMAT, PHOTO_EXTENSION, at);
        assert_eq!(path, PathBuf::from("/tmp/pics/2024-03-07-09-05-02-042.jpg"));
    }

    #[test]
    fn test_first_creatable_skips_bad_candidates() {
        let base = std::env::temp_dir().join(format!("snapcam-storage-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&base);
        std::fs::create_dir_all(&base).unwrap();

        // A regular file cannot hold a directory
        let blocker = base.join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let good = base.join("good");

        let chosen = first_creatable(&[blocker.join("sub"), good.clone()]);
        assert_eq!(chosen, Some(good.clone()));
        assert!(good.is_dir());
        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn test_override_directory() {
        let dir = std::env::temp_dir().join(format!("snapcam-override-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        assert_eq!(output_directory(Some(&dir)), dir);
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
