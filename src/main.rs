// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use interlayer::app_config::{self, Config, TranslationProvider};
use interlayer::{connect_backend, AdapterError, TranslationBackend, TranslationRequest};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    GoogleCloud,
    GoogleFree,
    Yandex,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::GoogleCloud => TranslationProvider::GoogleCloud,
            CliTranslationProvider::GoogleFree => TranslationProvider::GoogleFree,
            CliTranslationProvider::Yandex => TranslationProvider::Yandex,
        }
    }
}

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
    /// Detect the language of a text
    Detect {
        /// Text to inspect
        text: String,
    },

    /// List the languages supported by the provider
    Languages,

    /// Translate a text
    Translate {
        /// Text to translate
        text: String,

        /// Target language code
        #[arg(short, long)]
        target_language: String,

        /// Source language code, auto-detected when omitted
        #[arg(short, long)]
        source_language: Option<String>,

        /// Return oversized output and retry once when rate-limited
        #[arg(short, long)]
        distorting: bool,
    },
}

/// Interlayer - translate through interchangeable backends
#[derive(Parser, Debug)]
#[command(name = "interlayer")]
#[command(version)]
#[command(about = "Translate and detect languages through interchangeable backends")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long = "config", default_value = "conf.json", env = "INTERLAYER_CONFIG")]
    config_path: PathBuf,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation, filtered by the global max level
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
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
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Load the config file, or fall back to defaults when it does not exist
fn load_config(path: &Path, options: &CommandLineOptions) -> Result<Config> {
    let mut config = if path.exists() {
        Config::from_file(path)?
    } else {
        warn!("Config file not found at '{}', using defaults.", path.display());
        Config::default()
    };

    if let Some(provider) = &options.provider {
        config.provider = provider.clone().into();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

/// Print a classified error; fatal ones end the session
fn report(error: &AdapterError) -> ExitCode {
    if error.is_fatal() {
        error!("{} - the session cannot continue", error);
        return ExitCode::from(2);
    }
    if let Some(signal) = &error.signal {
        info!("Provider signal: {}", signal);
    }
    eprintln!("{}", error.kind);
    ExitCode::from(1)
}

async fn run(backend: &dyn TranslationBackend, command: Commands) -> Result<(), AdapterError> {
    match command {
        Commands::Detect { text } => {
            println!("{}", backend.detect_language(&text).await?);
        }
        Commands::Languages => {
            let catalog = backend.list_languages().await?;
            for (code, name) in catalog.sorted() {
                println!("{}\t{}", code, name);
            }
        }
        Commands::Translate {
            text,
            target_language,
            source_language,
            distorting,
        } => {
            let mut request = TranslationRequest::new(text, target_language).distorting(distorting);
            request.source_language = source_language;
            let result = backend.translate(&request).await?;
            println!("{}", result.text);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    CustomLogger::init(LevelFilter::Info)?;

    let options = CommandLineOptions::parse();
    let config = load_config(&options.config_path, &options)?;
    log::set_max_level(config.log_level.clone().into());

    info!("Using {} backend", config.provider.display_name());

    let backend = match connect_backend(&config).await {
        Ok(backend) => backend,
        Err(e) => {
            error!("Backend initialisation failed: {} - the session cannot continue", e);
            return Ok(ExitCode::from(2));
        }
    };

    match run(backend.as_ref(), options.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => Ok(report(&e)),
    }
}
