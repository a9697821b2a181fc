// Copyright (C) 2024 Bellande Artificial Intelligence Computer Vision Research Innovation Center, Ronaldson Bellande

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::core::{error::TrainingError, phase::Phase};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Lists every `<root>/<phase>/<class>/*.jpg` file.
///
/// Exactly one directory level sits between the phase directory and the
/// image. Hidden files and directories are skipped. A missing directory
/// yields an empty list.
pub fn make_datapath_list(root: &Path, phase: Phase) -> Result<Vec<PathBuf>, TrainingError> {
    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
    let target_path = format!(
        "{}/{}/*/*.jpg",
        escaped_root.trim_end_matches('/'),
        phase.as_str()
    );
    info!("Listing {} images matching {}", phase, target_path);

    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..Default::default()
    };

    let mut path_list = Vec::new();
    for entry in glob::glob_with(&target_path, options)? {
        match entry {
            Ok(path) if path.is_file() => path_list.push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable path {}: {}", e.path().display(), e.error()),
        }
    }

    info!("Found {} {} images", path_list.len(), phase);
    Ok(path_list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"not really a jpeg").unwrap();
    }

    #[test]
    fn lists_two_level_jpgs_for_phase() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("train/ants/a1.jpg"));
        touch(&root.join("train/bees/b1.jpg"));
        touch(&root.join("train/bees/notes.txt"));
        touch(&root.join("train/top_level.jpg"));
        touch(&root.join("train/ants/nested/deep.jpg"));
        touch(&root.join("val/ants/v1.jpg"));

        let train = make_datapath_list(root, Phase::Train).unwrap();
        assert_eq!(
            train,
            vec![root.join("train/ants/a1.jpg"), root.join("train/bees/b1.jpg")]
        );

        let val = make_datapath_list(root, Phase::Val).unwrap();
        assert_eq!(val, vec![root.join("val/ants/v1.jpg")]);
    }

    #[test]
    fn hidden_files_and_directories_are_skipped() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("train/ants/a.jpg"));
        touch(&root.join("train/ants/._a.jpg"));
        touch(&root.join("train/.cache/c.jpg"));

        let train = make_datapath_list(root, Phase::Train).unwrap();
        assert_eq!(train, vec![root.join("train/ants/a.jpg")]);
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let paths = make_datapath_list(&dir.path().join("nowhere"), Phase::Train).unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn root_with_glob_metacharacters_is_escaped() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data[1]");
        touch(&root.join("val/bees/b.jpg"));
        let paths = make_datapath_list(&root, Phase::Val).unwrap();
        assert_eq!(paths, vec![root.join("val/bees/b.jpg")]);
    }
}
