use anyhow::{anyhow, Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::file_utils::{FileManager, EXPORT_SUFFIX};
use crate::providers::Provider;
use crate::session::Workspace;
use crate::subtitle_processor::{CueStore, SubtitleFileInfo};
use crate::translation::{
    BatchEvent, BatchOutcome, BatchTranslator, ClientSettings, Mode, PromptPolicy, TranslationClient,
};

// @module: Application controller for subtitle processing

/// Options for one translate or fix run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    // @field: Explicit output file, single-file mode only
    pub output: Option<PathBuf>,

    // @field: Directory for generated export names
    pub output_dir: Option<PathBuf>,

    // @field: Overwrite existing output files
    pub force_overwrite: bool,

    // @field: Follow a translate batch with a fix batch
    pub then_fix: bool,

    // @field: Write partial results of a failed batch instead of rolling back
    pub keep_partial: bool,

    // @field: Draw progress bars
    pub show_progress: bool,
}

/// Result of processing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileResult {
    Written(PathBuf),
    Skipped(PathBuf),
}

/// Counts from a folder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Main application controller for subtitle translation
#[derive(Debug)]
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Provider override, the configured endpoint when None
    provider: Option<Arc<dyn Provider>>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            provider: None,
        }
    }

    /// Controller whose calls go to `provider` instead of the configured endpoint
    pub fn with_provider(config: Config, provider: Arc<dyn Provider>) -> Self {
        Self {
            config,
            provider: Some(provider),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build a client for the current configuration
    pub fn client(&self) -> TranslationClient {
        match &self.provider {
            Some(provider) => TranslationClient::with_provider(
                provider.clone(),
                ClientSettings::from_config(&self.config),
                PromptPolicy::from_config(&self.config),
            ),
            None => TranslationClient::from_config(&self.config),
        }
    }

    /// Check endpoint, key and model with one short call
    pub async fn test_connection(&self) -> Result<String> {
        self.config.validate()?;
        let reply = self
            .client()
            .test_connection()
            .await
            .context("Connection test failed")?;
        info!("Connection OK, model replied: {}", reply);
        Ok(reply)
    }

    /// Summary of a subtitle file
    pub fn file_info<P: AsRef<Path>>(&self, path: P) -> Result<SubtitleFileInfo> {
        CueStore::file_info(path)
    }

    /// Run one batch over the workspace and apply its events as they arrive
    ///
    /// On failure the workspace is rolled back to its pre-batch state unless
    /// `keep_partial` is set. Ctrl-C cancels the batch.
    pub async fn run_batch(
        &self,
        workspace: &mut Workspace,
        mode: Mode,
        options: &RunOptions,
        progress: &MultiProgress,
    ) -> Result<BatchOutcome> {
        let snapshot = workspace.begin_batch(mode, &self.config.model);
        let total = snapshot.len();
        let translator = BatchTranslator::new(self.client(), self.config.effective_concurrency());
        let mut handle = translator.spawn(snapshot, mode);

        let progress_bar = if options.show_progress {
            let bar = progress.add(ProgressBar::new(total as u64));
            bar.set_style(Self::bar_style("cues"));
            bar.set_message(match mode {
                Mode::Translate => "Translating",
                Mode::Fix => "Fixing",
            });
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut interrupted = false;
        loop {
            tokio::select! {
                event = handle.events.recv() => {
                    let Some(event) = event else { break };
                    if let BatchEvent::Progress { completed, .. } = &event {
                        progress_bar.set_position(*completed as u64);
                    }
                    workspace.apply(&event);
                }
                _ = tokio::signal::ctrl_c(), if !interrupted => {
                    warn!("Interrupted, cancelling the running batch");
                    handle.cancel.cancel();
                    interrupted = true;
                }
            }
        }
        progress_bar.finish_and_clear();

        let outcome = handle.join.await.context("Batch task failed")?;
        if let BatchOutcome::Failed { kind, message } = &outcome {
            error!("{} batch failed ({}): {}", mode, kind, message);
            if options.keep_partial {
                info!("Keeping partial results ({} cues translated)", workspace.store().translated_count());
            } else if workspace.undo() {
                info!("Rolled back to the state before the batch");
            }
        } else {
            info!("{}", workspace.token_stats().summary());
        }

        Ok(outcome)
    }

    /// Translate or fix one file and write the export
    pub async fn process_file(&self, input_file: &Path, mode: Mode, options: &RunOptions) -> Result<FileResult> {
        self.process_file_with_progress(input_file, mode, options, &MultiProgress::new()).await
    }

    async fn process_file_with_progress(
        &self,
        input_file: &Path,
        mode: Mode,
        options: &RunOptions,
        progress: &MultiProgress,
    ) -> Result<FileResult> {
        let start_time = Instant::now();

        if !input_file.is_file() {
            return Err(anyhow!("Input file does not exist: {}", input_file.display()));
        }
        self.config.validate().context("Configuration is not usable")?;

        let output_path = self.output_path(input_file, options)?;
        if output_path.exists() && !options.force_overwrite {
            warn!(
                "Skipping {}, {} already exists (use -f to force overwrite)",
                input_file.display(),
                output_path.display()
            );
            return Ok(FileResult::Skipped(output_path));
        }

        let mut workspace = Workspace::open(input_file)?;
        if workspace.store().is_empty() {
            warn!("No cues found in {}", input_file.display());
        }

        let mut outcome = self.run_batch(&mut workspace, mode, options, progress).await?;
        if mode == Mode::Translate && options.then_fix && outcome.is_success() {
            outcome = self.run_batch(&mut workspace, Mode::Fix, options, progress).await?;
        }

        if let BatchOutcome::Failed { message, .. } = outcome {
            if options.keep_partial {
                workspace.store().write_to_srt(&output_path)?;
                warn!("Partial result written to {}", output_path.display());
            }
            return Err(anyhow!("{} failed for {}: {}", mode, input_file.display(), message));
        }

        workspace.store().write_to_srt(&output_path)?;
        info!(
            "Success: {} ({})",
            output_path.display(),
            Self::format_duration(start_time.elapsed())
        );
        Ok(FileResult::Written(output_path))
    }

    /// Process every `.srt` file below `input_dir`, skipping earlier exports
    pub async fn run_folder(&self, input_dir: &Path, mode: Mode, options: &RunOptions) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !input_dir.is_dir() {
            return Err(anyhow!("Input directory does not exist: {}", input_dir.display()));
        }

        let files: Vec<PathBuf> = FileManager::find_files(input_dir, "srt")?
            .into_iter()
            .filter(|path| !Self::is_export(path))
            .collect();
        if files.is_empty() {
            return Err(anyhow!("No subtitle files found in directory: {}", input_dir.display()));
        }

        let options = RunOptions {
            output: None,
            ..options.clone()
        };
        let multi_progress = MultiProgress::new();
        let folder_pb = if options.show_progress {
            let bar = multi_progress.add(ProgressBar::new(files.len() as u64));
            bar.set_style(Self::bar_style("files"));
            bar.set_message("Processing files");
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut summary = FolderSummary::default();
        for file in &files {
            let file_name = file
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            match self.process_file_with_progress(file, mode, &options, &multi_progress).await {
                Ok(FileResult::Written(_)) => summary.processed += 1,
                Ok(FileResult::Skipped(_)) => summary.skipped += 1,
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    summary.failed += 1;
                }
            }
            folder_pb.inc(1);
        }
        folder_pb.finish_with_message("Folder processing complete");

        info!(
            "Folder processing completed in {}: {} processed, {} skipped, {} errors",
            Self::format_duration(start_time.elapsed()),
            summary.processed,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }

    fn output_path(&self, input_file: &Path, options: &RunOptions) -> Result<PathBuf> {
        if let Some(output) = &options.output {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                FileManager::ensure_dir(parent)?;
            }
            return Ok(output.clone());
        }
        if let Some(dir) = &options.output_dir {
            FileManager::ensure_dir(dir)?;
        }
        Ok(FileManager::generate_export_path(input_file, options.output_dir.as_ref()))
    }

    fn is_export(path: &Path) -> bool {
        path.file_stem()
            .is_some_and(|stem| stem.to_string_lossy().ends_with(EXPORT_SUFFIX))
    }

    fn bar_style(unit: &str) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
                unit
            ))
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
