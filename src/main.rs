// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use locale_cascade::app_config::{self, Config, DispatchModeSetting, TranslationProvider};
use locale_cascade::database::{DatabaseConnection, SqliteStore};
use locale_cascade::translation::{CascadeReport, TranslationService};
use locale_cascade::{Locale, LocalizedRecordStore};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    Mock,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::Mock => TranslationProvider::Mock,
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
    /// Edit fields of one locale and cascade the change
    Set {
        /// Model name as declared in the configuration
        model: String,
        /// Host record id
        id: String,
        /// Locale being edited (e.g. 'en', 'pt-BR')
        locale: String,
        /// Values to write, as FIELD=TEXT
        #[arg(value_name = "FIELD=TEXT", required = true)]
        values: Vec<String>,
    },

    /// Print every stored locale of a record with its automatic flags
    Show {
        model: String,
        id: String,
    },

    /// Pin a translation so source edits no longer overwrite it
    Pin {
        model: String,
        id: String,
        /// Accessor name, e.g. 'title_fr_automatic'
        accessor: String,
        /// Hand the translation back to automatic maintenance instead
        #[arg(long)]
        release: bool,
    },

    /// Translate one field into a locale right away
    Translate {
        model: String,
        id: String,
        field: String,
        /// Locale to translate into
        to: String,
        /// Source locale; picked automatically when omitted
        #[arg(long)]
        from: Option<String>,
    },

    /// Copy the automatic flags of a record to a new record
    Duplicate {
        model: String,
        id: String,
        /// Id of the copy; a random UUID when omitted
        new_id: Option<String>,
    },

    /// Generate shell completions for locale-cascade
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// locale-cascade - cascading automatic translation of record fields
///
/// Keeps the per-locale variants of translatable fields in sync: editing a
/// source locale translates the change into every automatic target locale,
/// while pinned translations are left alone.
#[derive(Parser, Debug)]
#[command(name = "locale-cascade")]
#[command(version = "0.1.0")]
#[command(about = "Cascading automatic translation of per-locale record fields")]
#[command(long_about = "locale-cascade stores per-locale field values and keeps automatic translations in sync.

EXAMPLES:
    locale-cascade set post 1 en title=Hello          # Edit English title, cascade to targets
    locale-cascade show post 1                        # Print every locale and flag
    locale-cascade pin post 1 title_fr_automatic      # Keep the French title as edited
    locale-cascade translate post 1 title fr          # Re-translate the French title now
    locale-cascade duplicate post 1 2                 # Copy flags of post 1 to post 2
    locale-cascade -p mock set post 1 en title=Hi     # Use the offline mock translator
    locale-cascade completions bash > lc.bash         # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Translator backend to use
    #[arg(short, long, value_enum, global = true)]
    provider: Option<CliTranslationProvider>,

    /// SQLite database file
    #[arg(short, long, env = "LOCALE_CASCADE_DB", global = true)]
    database: Option<PathBuf>,

    /// Run translations on the background queue
    #[arg(short, long, global = true)]
    background: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // Filtering is left to log::max_level so it can change after init
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
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

    // @returns: ANSI colour for log level
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
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // The level is updated after loading the config
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "locale-cascade", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.into());

    let service = build_service(&config, &cli)?;
    let result = run_command(&service, cli.command).await;

    if let Some(stats) = service.shutdown().await {
        info!("Background queue drained: {}", stats);
    }
    result
}

/// Load conf.json, writing the defaults first if it does not exist
fn load_config(options: &CommandLineOptions) -> Result<Config> {
    let config_path = Path::new(&options.config_path);
    let mut config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        warn!(
            "Config file not found at '{}', creating default config.",
            config_path.display()
        );
        let config = Config::default();
        config.save(config_path)?;
        config
    };

    // Override config with CLI options if provided
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
    if let Some(database) = &options.database {
        config.database.path = Some(database.display().to_string());
    }
    if options.background {
        config.dispatch.mode = DispatchModeSetting::Background;
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

fn build_service(config: &Config, options: &CommandLineOptions) -> Result<TranslationService> {
    let store = match config.database_path() {
        Some(path) => SqliteStore::new(DatabaseConnection::new(path)?),
        None => SqliteStore::new_default()?,
    };
    let registry = config.build_registry()?;
    let translator = config.build_translator()?;

    let service = TranslationService::new(Arc::new(store), registry, translator);
    if config.dispatch.mode == DispatchModeSetting::Background {
        service.start_background(config.dispatch.concurrent_jobs, config.dispatch.queue_capacity);
        info!(
            "Background dispatch: {} concurrent job(s){}",
            config.dispatch.concurrent_jobs,
            if options.background { " (from command line)" } else { "" }
        );
    }
    Ok(service)
}

async fn run_command(service: &TranslationService, command: Commands) -> Result<()> {
    match command {
        Commands::Set {
            model,
            id,
            locale,
            values,
        } => {
            let locale = Locale::parse(&locale)?;
            let values = parse_assignments(&values)?;

            let mut record = service.record(&model, id)?;
            let mut mutation = record.edit(locale);
            for (field, text) in values {
                mutation = mutation.set(field, text);
            }
            let report = service.commit(mutation).await?;
            print_report(&report);
        }
        Commands::Show { model, id } => {
            let record = service.record(&model, id)?;
            let rows = service.store().load_all(record.key()).await?;
            if rows.is_empty() {
                println!("{} has no stored translations", record.key());
            }
            for row in &rows {
                println!(
                    "[{}] version {}, updated {}",
                    row.locale,
                    row.lock_version,
                    row.updated_at.as_deref().unwrap_or("-")
                );
                for (field, value) in &row.fields {
                    println!("    {} = {}", field, value);
                }
            }
            for name in record.accessor_names() {
                println!("{} = {}", name, record.accessor(&name).await?);
            }
        }
        Commands::Pin {
            model,
            id,
            accessor,
            release,
        } => {
            let record = service.record(&model, id)?;
            record.set_accessor(&accessor, release).await?;
            record.save().await?;
            println!("{} = {}", accessor, record.accessor(&accessor).await?);
        }
        Commands::Translate {
            model,
            id,
            field,
            to,
            from,
        } => {
            let to = Locale::parse(&to)?;
            let from = from.as_deref().map(Locale::parse).transpose()?;

            let record = service.record(&model, id)?;
            let outcome = service.retranslate(&record, &field, &to, from).await?;
            println!("{}: {:?}", outcome.request, outcome.status);
        }
        Commands::Duplicate { model, id, new_id } => {
            let new_id = new_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

            let record = service.record(&model, id)?;
            let copy = record.duplicate(new_id).await?;
            let saved = copy.save().await?;
            println!("Created {} with {} locale row(s)", copy.key(), saved);
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}

/// Split `FIELD=TEXT` arguments
fn parse_assignments(values: &[String]) -> Result<Vec<(String, String)>> {
    values
        .iter()
        .map(|value| {
            value
                .split_once('=')
                .filter(|(field, _)| !field.trim().is_empty())
                .map(|(field, text)| (field.trim().to_string(), text.to_string()))
                .ok_or_else(|| anyhow!("Expected FIELD=TEXT, got '{}'", value))
        })
        .collect()
}

fn print_report(report: &CascadeReport) {
    if report.changed_fields.is_empty() {
        println!("{} ({}): nothing changed", report.record, report.locale);
        return;
    }

    println!(
        "{} ({}): changed {}",
        report.record,
        report.locale,
        report.changed_fields.join(", ")
    );
    for request in &report.pinned {
        println!("    {}: pinned", request);
    }
    for outcome in &report.outcomes {
        println!("    {}: {:?}", outcome.request, outcome.status);
    }
}
