/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use srtai::app_config::{Config, ConfigStore, LogLevel, PromptConfig};
use crate::common;

/// Test that a saved configuration loads back unchanged
#[test]
fn test_config_store_withSaveThenLoad_shouldRoundTrip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let store = ConfigStore::new(temp_dir.path().join("nested/main.config.json"));

    let config = Config {
        api_key: "sk-123".to_string(),
        base_url: "http://localhost:8080/v1".to_string(),
        concurrency: 3,
        log_level: LogLevel::Debug,
        prompts: PromptConfig {
            translate: "Into {lang}".to_string(),
            ..PromptConfig::default()
        },
        ..Config::default()
    };
    store.save(&config)?;

    let loaded = store.read()?;
    assert_eq!(loaded.api_key, "sk-123");
    assert_eq!(loaded.base_url, "http://localhost:8080/v1");
    assert_eq!(loaded.concurrency, 3);
    assert_eq!(loaded.log_level, LogLevel::Debug);
    assert_eq!(loaded.prompts.translate, "Into {lang}");
    Ok(())
}

/// Test that saving refuses an unusable configuration
#[test]
fn test_config_store_withInvalidConfig_shouldNotSave() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let store = ConfigStore::new(temp_dir.path().join("main.config.json"));

    let result = store.save(&Config::default());
    assert!(result.is_err(), "Missing API key should be rejected");
    assert!(!store.path().exists());
    Ok(())
}

/// Test that a missing or broken file falls back to defaults
#[test]
fn test_config_store_withMissingOrBrokenFile_shouldLoadDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let missing = ConfigStore::new(temp_dir.path().join("absent.json"));
    assert_eq!(missing.load().model, Config::default().model);

    let broken_path = common::create_test_file(temp_dir.path(), "broken.json", "{ not json")?;
    let broken = ConfigStore::new(broken_path);
    assert!(broken.read().is_err());
    assert_eq!(broken.load().target_lang, "中文");
    Ok(())
}

/// Test backup and restore of the configuration file
#[test]
fn test_config_store_withBackupThenRestore_shouldRecoverOldFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let store = ConfigStore::new(temp_dir.path().join("main.config.json"));

    store.save(&common::test_config(2))?;
    let backup = store.backup()?;
    assert_eq!(backup, temp_dir.path().join("main.config.backup.json"));

    store.save(&common::test_config(7))?;
    assert_eq!(store.read()?.concurrency, 7);

    store.restore()?;
    assert_eq!(store.read()?.concurrency, 2);
    Ok(())
}

/// Test that restore without a backup is an error
#[test]
fn test_config_store_withoutBackup_shouldFailRestore() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let store = ConfigStore::new(temp_dir.path().join("main.config.json"));
    assert!(store.restore().is_err());
    assert!(store.backup().is_err());
    Ok(())
}

/// Test base URL validation
#[test]
fn test_config_validation_withVariousBaseUrls_shouldValidateCorrectly() {
    let mut config = common::test_config(8);

    for ok in ["", "  ", "https://api.openai.com/v1", "http://127.0.0.1:1234/v1"] {
        config.base_url = ok.to_string();
        assert!(config.validate().is_ok(), "{:?} should be accepted", ok);
    }

    for bad in ["ftp://example.com", "example.com/v1", "/v1"] {
        config.base_url = bad.to_string();
        assert!(config.validate().is_err(), "{:?} should be rejected", bad);
    }
}
