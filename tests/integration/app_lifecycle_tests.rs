/*!
 * End-to-end tests for the application controller
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;

use srtai::app_config::Config;
use srtai::app_controller::{Controller, FileResult, FolderSummary, RunOptions};
use srtai::errors::ProviderError;
use srtai::providers::mock::MockProvider;
use srtai::subtitle_processor::CueStore;
use srtai::translation::Mode;
use crate::common;

fn quiet() -> RunOptions {
    RunOptions {
        show_progress: false,
        ..RunOptions::default()
    }
}

fn controller(provider: Arc<MockProvider>) -> Controller {
    Controller::with_provider(common::test_config(2), provider)
}

/// Translating a file writes the export next to it
#[tokio::test]
async fn test_process_file_withWorkingProvider_shouldWriteExport() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let provider = Arc::new(MockProvider::working());

    let result = controller(provider.clone()).process_file(&input, Mode::Translate, &quiet()).await?;

    let expected = temp_dir.path().join("episode_translated.srt");
    assert_eq!(result, FileResult::Written(expected.clone()));
    assert_eq!(provider.request_count(), 3);
    assert!(provider.was_closed());

    let written = CueStore::from_srt_file(&expected)?;
    assert_eq!(written.len(), 3);
    assert_eq!(written.cues[0].original, "[TRANSLATED] This is a test subtitle.");
    assert_eq!(written.cues[2].original, "[TRANSLATED] For testing purposes.\nSecond line.");
    assert_eq!(written.cues[2].start, "00:00:10,000");

    // Source file is untouched
    assert_eq!(fs::read_to_string(&input)?, common::SAMPLE_SRT);
    Ok(())
}

/// An existing export is kept unless overwriting is forced
#[tokio::test]
async fn test_process_file_withExistingOutput_shouldSkipUnlessForced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let existing = common::create_test_file(temp_dir.path(), "movie_translated.srt", "keep me")?;
    let provider = Arc::new(MockProvider::working());
    let controller = controller(provider.clone());

    let result = controller.process_file(&input, Mode::Translate, &quiet()).await?;
    assert_eq!(result, FileResult::Skipped(existing.clone()));
    assert_eq!(provider.request_count(), 0);
    assert_eq!(fs::read_to_string(&existing)?, "keep me");

    let forced = RunOptions {
        force_overwrite: true,
        ..quiet()
    };
    let result = controller.process_file(&input, Mode::Translate, &forced).await?;
    assert_eq!(result, FileResult::Written(existing.clone()));
    assert!(fs::read_to_string(&existing)?.contains("[TRANSLATED]"));
    Ok(())
}

/// An explicit output path and an output directory are honored
#[tokio::test]
async fn test_process_file_withOutputLocations_shouldWriteThere() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.srt")?;
    let controller = controller(Arc::new(MockProvider::working()));

    let explicit = temp_dir.path().join("out").join("custom.srt");
    let options = RunOptions {
        output: Some(explicit.clone()),
        ..quiet()
    };
    assert_eq!(
        controller.process_file(&input, Mode::Translate, &options).await?,
        FileResult::Written(explicit.clone())
    );
    assert!(explicit.is_file());

    let out_dir = temp_dir.path().join("exports");
    let options = RunOptions {
        output_dir: Some(out_dir.clone()),
        ..quiet()
    };
    assert_eq!(
        controller.process_file(&input, Mode::Translate, &options).await?,
        FileResult::Written(out_dir.join("talk_translated.srt"))
    );
    Ok(())
}

/// A failed batch leaves no export behind
#[tokio::test]
async fn test_process_file_withFailingProvider_shouldNotWriteOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "broken.srt")?;
    let controller = controller(Arc::new(MockProvider::failing()));

    let err = controller
        .process_file(&input, Mode::Translate, &quiet())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("failed"));
    assert!(!temp_dir.path().join("broken_translated.srt").exists());
    Ok(())
}

/// With keep_partial the finished rows are written out
#[tokio::test]
async fn test_process_file_withKeepPartial_shouldWriteFinishedRows() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "partial.srt")?;
    let provider = Arc::new(MockProvider::scripted(|request| {
        if request.user_text().starts_with("For testing") {
            Err(ProviderError::ConnectionError("connection reset".to_string()))
        } else {
            Ok(MockProvider::completion(format!("ok {}", request.user_text()), 1, 1))
        }
    }));
    let controller = Controller::with_provider(common::test_config(1), provider);
    let options = RunOptions {
        keep_partial: true,
        ..quiet()
    };

    assert!(controller.process_file(&input, Mode::Translate, &options).await.is_err());

    let written = CueStore::from_srt_file(temp_dir.path().join("partial_translated.srt"))?;
    assert_eq!(written.cues[0].original, "ok This is a test subtitle.");
    assert_eq!(written.cues[1].original, "ok It contains multiple entries.");
    assert_eq!(written.cues[2].original, "For testing purposes.\nSecond line.");
    Ok(())
}

/// Translate followed by fix exports the fixed text
#[tokio::test]
async fn test_process_file_withThenFix_shouldExportFixedText() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "twopass.srt")?;
    let provider = Arc::new(MockProvider::working());
    let options = RunOptions {
        then_fix: true,
        ..quiet()
    };

    controller(provider.clone()).process_file(&input, Mode::Translate, &options).await?;

    assert_eq!(provider.request_count(), 6);
    let written = CueStore::from_srt_file(temp_dir.path().join("twopass_translated.srt"))?;
    assert_eq!(written.cues[1].original, "[TRANSLATED] [TRANSLATED] It contains multiple entries.");
    Ok(())
}

/// Folder mode skips earlier exports and counts results
#[tokio::test]
async fn test_run_folder_withMixedFiles_shouldSummarize() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_subtitle(temp_dir.path(), "a.srt")?;
    common::create_test_subtitle(temp_dir.path(), "b.srt")?;
    common::create_test_subtitle(temp_dir.path(), "c.srt")?;
    common::create_test_file(temp_dir.path(), "c_translated.srt", common::SAMPLE_SRT)?;
    common::create_test_file(temp_dir.path(), "notes.txt", "not a subtitle")?;
    let provider = Arc::new(MockProvider::working());

    let summary = controller(provider.clone())
        .run_folder(temp_dir.path(), Mode::Translate, &quiet())
        .await?;

    assert_eq!(
        summary,
        FolderSummary {
            processed: 2,
            skipped: 1,
            failed: 0,
        }
    );
    assert_eq!(provider.request_count(), 6);
    assert!(temp_dir.path().join("a_translated.srt").is_file());
    assert!(!temp_dir.path().join("c_translated_translated.srt").exists());
    Ok(())
}

/// A folder without subtitles is an error
#[tokio::test]
async fn test_run_folder_withNoSubtitles_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "readme.txt", "hello")?;

    let result = controller(Arc::new(MockProvider::working()))
        .run_folder(temp_dir.path(), Mode::Translate, &quiet())
        .await;
    assert!(result.is_err());
    Ok(())
}

/// A configuration without a key is rejected before any call
#[tokio::test]
async fn test_process_file_withInvalidConfig_shouldFailEarly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "nokey.srt")?;
    let provider = Arc::new(MockProvider::working());
    let controller = Controller::with_provider(Config::default(), provider.clone());

    assert!(controller.process_file(&input, Mode::Translate, &quiet()).await.is_err());
    assert_eq!(provider.request_count(), 0);
    assert!(!temp_dir.path().join("nokey_translated.srt").exists());
    Ok(())
}

/// File info counts cues
#[test]
fn test_file_info_withSampleFile_shouldCountCues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "info.srt")?;

    let info = controller(Arc::new(MockProvider::working())).file_info(&input)?;
    assert_eq!(info.subtitle_count, 3);
    assert_eq!(info.translated_count, 0);
    assert!(info.size > 0);
    Ok(())
}

/// Connection test goes through the provider
#[tokio::test]
async fn test_test_connection_withWorkingProvider_shouldReply() -> Result<()> {
    let provider = Arc::new(MockProvider::working());
    let reply = controller(provider.clone()).test_connection().await?;
    assert_eq!(reply, "[TRANSLATED] Hello.");
    assert!(provider.was_closed());
    Ok(())
}
