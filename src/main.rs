// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use srtai::app_config::{self, Config, ConfigStore, CONFIG_FILENAME, SUPPORTED_LANGUAGES, SUPPORTED_MODELS};
use srtai::app_controller::{Controller, FileResult, RunOptions};
use srtai::translation::Mode;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate subtitle files into the target language
    Translate(TranslateArgs),

    /// Polish existing translations without changing their meaning
    Fix(BatchArgs),

    /// Show cue counts and file details of a subtitle file
    Info {
        /// Subtitle file to inspect
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions for srtai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Replace an existing file
        #[arg(short, long)]
        force_overwrite: bool,
    },
    /// Check the configuration and report every problem
    Validate {
        /// Also send one short request to the endpoint
        #[arg(long)]
        test_connection: bool,
    },
    /// Copy the configuration to its backup file
    Backup,
    /// Replace the configuration with its backup file
    Restore,
    /// Print the effective configuration, API key masked
    Show,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Subtitle file or directory of subtitle files
    #[arg(value_name = "INPUT")]
    input_path: PathBuf,

    /// Output file (single file input only)
    #[arg(short, long, conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Directory for `<name>_translated.srt` exports
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Model name to use
    #[arg(short, long)]
    model: Option<String>,

    /// Target language (e.g. '中文', 'English')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Number of concurrent requests
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Base URL of an OpenAI-compatible endpoint
    #[arg(long, env = "SRTAI_BASE_URL")]
    base_url: Option<String>,

    /// Write partial results when a batch fails instead of rolling back
    #[arg(long)]
    keep_partial: bool,

    /// Hide progress bars
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct TranslateArgs {
    #[command(flatten)]
    batch: BatchArgs,

    /// Run a fix pass after a successful translation
    #[arg(long)]
    then_fix: bool,
}

/// SRTAI - subtitle translation and polishing with LLMs
///
/// Sends every subtitle line to an OpenAI-compatible chat completions
/// endpoint, several lines at a time, and writes the result next to the input.
#[derive(Parser, Debug)]
#[command(name = "srtai")]
#[command(version)]
#[command(about = "LLM-powered SRT subtitle translation tool")]
#[command(long_about = format!("srtai translates SRT subtitles line by line through an OpenAI-compatible API.

EXAMPLES:
    srtai config init                          # Write a default main.config.json
    srtai translate movie.srt                  # Writes movie_translated.srt
    srtai translate -t English -j 4 movie.srt  # Other language, 4 concurrent calls
    srtai translate --then-fix movie.srt       # Translate, then polish
    srtai fix movie_translated.srt -f          # Polish an existing translation
    srtai translate /subs/ --output-dir out/   # Every .srt file below /subs/
    srtai completions bash > srtai.bash        # Generate bash completions

SUPPORTED MODELS:
    {}

SUPPORTED LANGUAGES:
    {}", SUPPORTED_MODELS.join(", "), SUPPORTED_LANGUAGES.join(", ")))]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = CONFIG_FILENAME)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    // @field: Optional plain-text copy of every line
    file: Mutex<Option<File>>,
}

static LOGGER: Lazy<CustomLogger> = Lazy::new(|| CustomLogger { file: Mutex::new(None) });

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_logger(&*LOGGER)?;
        log::set_max_level(level);
        Ok(())
    }

    // @attaches: Append log lines to a file as well
    fn attach_file(path: &Path) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        *LOGGER.file.lock() = Some(file);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = chrono::Local::now();
        let _ = writeln!(
            std::io::stderr(),
            "{}{} {} {}\x1B[0m",
            Self::get_color_for_level(record.level()),
            now.format("%H:%M:%S.%3f"),
            Self::get_emoji_for_level(record.level()),
            record.args()
        );

        if let Some(file) = self.file.lock().as_mut() {
            let _ = writeln!(
                file,
                "{} [{}] {}: {}",
                now.format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.flush();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info level until the config has been read
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();
    let store = ConfigStore::new(&cli.config_path);

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "srtai", &mut std::io::stdout());
            Ok(())
        }
        Commands::Config { action } => run_config(&store, action, cli.log_level).await,
        Commands::Info { input } => {
            let config = store.load();
            setup_logging(&config, cli.log_level);
            run_info(&Controller::with_config(config), &input)
        }
        Commands::Translate(args) => {
            let then_fix = args.then_fix;
            run_batch(&store, args.batch, Mode::Translate, then_fix, cli.log_level).await
        }
        Commands::Fix(args) => run_batch(&store, args, Mode::Fix, false, cli.log_level).await,
    }
}

// Level from the command line wins over the config; the file sink comes from the config
fn setup_logging(config: &Config, cli_level: Option<CliLogLevel>) {
    let level: app_config::LogLevel = match cli_level {
        Some(level) => level.into(),
        None => config.log_level,
    };
    log::set_max_level(level.to_level_filter());

    if let Some(log_file) = config.log_file.as_deref().filter(|f| !f.trim().is_empty()) {
        if let Err(e) = CustomLogger::attach_file(Path::new(log_file)) {
            warn!("Cannot write log file {}: {}", log_file, e);
        }
    }
}

async fn run_batch(
    store: &ConfigStore,
    args: BatchArgs,
    mode: Mode,
    then_fix: bool,
    cli_level: Option<CliLogLevel>,
) -> Result<()> {
    if !store.path().exists() {
        warn!(
            "Config file not found at '{}', using defaults (run `srtai config init` to create one)",
            store.path().display()
        );
    }
    let mut config = store.load();

    // Override config with CLI options if provided
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(target_language) = args.target_language {
        config.target_lang = target_language;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }

    setup_logging(&config, cli_level);
    config.validate().context("Configuration validation failed")?;

    let options = RunOptions {
        output: args.output,
        output_dir: args.output_dir,
        force_overwrite: args.force_overwrite,
        then_fix,
        keep_partial: args.keep_partial,
        show_progress: !args.no_progress,
    };
    let controller = Controller::with_config(config);

    if args.input_path.is_file() {
        match controller.process_file(&args.input_path, mode, &options).await? {
            FileResult::Written(path) => info!("Output written to {}", path.display()),
            FileResult::Skipped(path) => info!("Nothing to do, {} exists", path.display()),
        }
        Ok(())
    } else if args.input_path.is_dir() {
        if options.output.is_some() {
            return Err(anyhow!("--output cannot be used with a directory, use --output-dir"));
        }
        let summary = controller.run_folder(&args.input_path, mode, &options).await?;
        if summary.failed > 0 {
            return Err(anyhow!("{} file(s) failed", summary.failed));
        }
        Ok(())
    } else {
        Err(anyhow!("Input path does not exist: {}", args.input_path.display()))
    }
}

fn run_info(controller: &Controller, input: &Path) -> Result<()> {
    let info = controller.file_info(input)?;
    let modified = info
        .modified
        .map(|m| chrono::DateTime::<chrono::Local>::from(m).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("Path:        {}", info.path.display());
    println!("Size:        {} bytes", info.size);
    println!("Modified:    {}", modified);
    println!("Cues:        {}", info.subtitle_count);
    println!("Translated:  {}", info.translated_count);
    Ok(())
}

async fn run_config(store: &ConfigStore, action: ConfigAction, cli_level: Option<CliLogLevel>) -> Result<()> {
    let config = store.load();
    setup_logging(&config, cli_level);

    match action {
        ConfigAction::Init { force_overwrite } => {
            if store.path().exists() && !force_overwrite {
                return Err(anyhow!(
                    "{} already exists (use -f to overwrite)",
                    store.path().display()
                ));
            }
            store.write_unchecked(&Config::default())?;
            info!("Default configuration written to {}, set api_key before translating", store.path().display());
        }
        ConfigAction::Validate { test_connection } => {
            let config = store.read()?;
            let errors = config.validation_errors();
            if !errors.is_empty() {
                for problem in &errors {
                    warn!("{}", problem);
                }
                return Err(anyhow!("{} problem(s) in {}", errors.len(), store.path().display()));
            }
            info!("{} is valid", store.path().display());
            if test_connection {
                Controller::with_config(config).test_connection().await?;
            }
        }
        ConfigAction::Backup => {
            let backup = store.backup()?;
            info!("Backup written to {}", backup.display());
        }
        ConfigAction::Restore => {
            store.restore()?;
            info!("Configuration restored from {}", store.backup_path().display());
        }
        ConfigAction::Show => {
            let mut shown = config;
            if !shown.api_key.is_empty() {
                shown.api_key = mask_key(&shown.api_key);
            }
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
    }
    Ok(())
}

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{}", visible)
}
