/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::fs;
use std::path::Path;

use srtai::file_utils::FileManager;
use crate::common;

/// Test recursive discovery of subtitle files
#[test]
fn test_find_files_withNestedDirectories_shouldFindSortedMatches() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("season1");
    fs::create_dir_all(&nested)?;

    common::create_test_file(temp_dir.path(), "b.srt", "")?;
    common::create_test_file(temp_dir.path(), "notes.txt", "")?;
    common::create_test_file(&nested, "a.SRT", "")?;

    let files = FileManager::find_files(temp_dir.path(), "srt")?;
    assert_eq!(files.len(), 2);
    assert!(files.windows(2).all(|w| w[0] <= w[1]));
    assert!(files.iter().any(|f| f.ends_with("season1/a.SRT")));
    Ok(())
}

/// Test that writes create the parent directory and replace content
#[test]
fn test_write_to_file_withMissingParent_shouldCreateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let target = temp_dir.path().join("out/deeper/file.srt");

    FileManager::write_to_file(&target, "first")?;
    FileManager::write_to_file(&target, "second")?;

    assert_eq!(FileManager::read_to_string(&target)?, "second");
    assert!(FileManager::file_exists(&target));
    Ok(())
}

/// Test export names
#[test]
fn test_generate_export_path_withVariousInputs_shouldAppendSuffix() {
    let path = FileManager::generate_export_path("clips/show.ep2.srt", None::<&Path>);
    assert_eq!(path, Path::new("clips/show.ep2_translated.srt"));

    let path = FileManager::generate_export_path("show.srt", None::<&Path>);
    assert_eq!(path, Path::new("show_translated.srt"));
}
