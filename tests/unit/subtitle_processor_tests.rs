/*!
 * Tests for the cue model and SRT codec
 */

use anyhow::Result;

use srtai::file_utils::FileManager;
use srtai::subtitle_processor::{Cue, CueState, CueStore};
use crate::common;

/// Test that an untouched file serializes back byte for byte
#[test]
fn test_round_trip_withWellFormedFile_shouldReproduceInput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "sample.srt")?;

    let store = CueStore::from_srt_file(&input)?;
    assert_eq!(store.len(), 3);
    assert_eq!(store.to_srt_string(), common::SAMPLE_SRT);

    let output = temp_dir.path().join("copy.srt");
    store.write_to_srt(&output)?;
    assert_eq!(FileManager::read_to_string(&output)?, common::SAMPLE_SRT);
    Ok(())
}

/// Test that indices are kept as written, even when not contiguous
#[test]
fn test_parse_withSparseIndices_shouldKeepFileOrderAndIndices() {
    let content = "7\n00:00:01,000 --> 00:00:02,000\nseven\n\n3\n00:00:03,000 --> 00:00:04,000\nthree\n";
    let cues = CueStore::parse_srt_string(content);
    let indices: Vec<usize> = cues.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![7, 3]);
}

/// Test that malformed blocks are skipped without failing the file
#[test]
fn test_parse_withMalformedBlocks_shouldSkipThem() {
    let content = "\
x
00:00:01,000 --> 00:00:02,000
bad index

2
00:00:03,000 --> 00:00:04,000

3
00:00:05,000 --> 00:00:06,000
good
";
    let cues = CueStore::parse_srt_string(content);
    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].original, "good");
}

/// Test that timestamps stay verbatim
#[test]
fn test_parse_withUnusualTimestamps_shouldKeepThemOpaque() {
    let cues = CueStore::parse_srt_string("1\n0:0:1.5 --> later\nhi\n");
    assert_eq!(cues[0].start, "0:0:1.5");
    assert_eq!(cues[0].end, "later");
}

/// Test the display text precedence
#[test]
fn test_display_text_withEachState_shouldPickNewestText() {
    let mut cue = Cue::new(1, "a", "b", "original");
    assert_eq!(cue.state(), CueState::Untranslated);
    assert_eq!(cue.display_text(), "original");

    cue.set_translation("translation");
    assert_eq!(cue.display_text(), "translation");

    cue.set_fixed_text("fixed");
    assert_eq!(cue.state(), CueState::Fixed);
    assert_eq!(cue.display_text(), "fixed");

    cue.clear_translation();
    assert!(!cue.has_translation());
    assert_eq!(cue.display_text(), "original");
}

/// Test serialization of translated cues
#[test]
fn test_to_srt_string_withTranslations_shouldWriteDisplayText() {
    let mut store = CueStore::new(common::sample_cues(2));
    store.cues[0].set_translation("ligne 1");
    store.cues[1].set_translation("ligne 2");
    store.cues[1].set_fixed_text("ligne deux");

    let parsed = CueStore::parse_srt_string(&store.to_srt_string());
    assert_eq!(parsed[0].original, "ligne 1");
    assert_eq!(parsed[1].original, "ligne deux");
    assert_eq!(store.translated_count(), 2);
}

/// Test file info and validity checks
#[test]
fn test_file_info_withSampleFile_shouldCountCues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "sample.srt")?;
    let empty = common::create_test_file(temp_dir.path(), "empty.srt", "")?;
    let text = common::create_test_file(temp_dir.path(), "sample.txt", common::SAMPLE_SRT)?;

    let info = CueStore::file_info(&input)?;
    assert_eq!(info.subtitle_count, 3);
    assert_eq!(info.translated_count, 0);
    assert_eq!(info.size, common::SAMPLE_SRT.len() as u64);

    assert!(CueStore::is_valid_srt_file(&input));
    assert!(!CueStore::is_valid_srt_file(&empty));
    assert!(!CueStore::is_valid_srt_file(&text));
    Ok(())
}

/// Test that invalid UTF-8 does not prevent loading
#[test]
fn test_from_srt_file_withInvalidUtf8_shouldReplaceBytes() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("latin1.srt");
    std::fs::write(&path, b"1\n00:00:01,000 --> 00:00:02,000\ncaf\xe9\n")?;

    let store = CueStore::from_srt_file(&path)?;
    assert_eq!(store.len(), 1);
    assert!(store.cues[0].original.starts_with("caf"));
    Ok(())
}
