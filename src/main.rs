//! codeshot - render code screenshots from the command line
//!
//! Reads and writes the same settings file a desktop front end would use,
//! so a look can be tweaked here and exported without a browser.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use codeshot_renderer::{
    Configurable, FileBackend, Platform, SettingKey, SettingsStore, Studio, StudioError,
    SyntectHighlighter,
};

#[derive(Parser, Debug)]
#[command(name = "codeshot", version, about = "Render syntax-highlighted code screenshots")]
struct CliArgs {
    /// Settings file (defaults to the platform configuration directory)
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one setting
    Get { key: SettingKey },

    /// Change one setting
    Set { key: SettingKey, value: String },

    /// Use the contents of a file as the code
    Code { file: PathBuf },

    /// Upload a background image
    Background {
        file: PathBuf,

        /// Client user agent; Safari-family agents get JPEG instead of WebP
        #[arg(long, value_name = "UA")]
        user_agent: Option<String>,
    },

    /// Revert to the built-in background
    ClearBackground,

    /// Print every setting as JSON
    Show,

    /// Render the screenshot and save it
    Export {
        /// Output directory
        #[arg(long, value_name = "DIR", default_value = ".")]
        out: PathBuf,
    },
}

fn main() {
    init_logging();

    if let Err(err) = run(CliArgs::parse()) {
        match err.downcast_ref::<StudioError>() {
            Some(studio_err) => eprintln!("error: {}", studio_err.user_message()),
            None => eprintln!("error: {err}"),
        }
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
        std::process::exit(1);
    }
}

/// Initialize the logging system, defaulting to `info`.
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn open_settings(path: Option<PathBuf>) -> Result<SettingsStore<FileBackend>> {
    let backend = match path {
        Some(path) => FileBackend::open(path)?,
        None => FileBackend::open_default()?,
    };
    log::debug!("using settings at {}", backend.path().display());
    Ok(SettingsStore::new(backend))
}

fn run(args: CliArgs) -> Result<()> {
    let mut settings = open_settings(args.settings)?;

    match args.command {
        Command::Get { key } => {
            println!("{}", settings.get_display(key));
        }
        Command::Set { key, value } => {
            settings.set_from_str(key, &value)?;
            log::info!("{key} updated");
        }
        Command::Code { file } => {
            let code = fs::read_to_string(&file)
                .with_context(|| format!("could not read {}", file.display()))?;
            settings.set_code(code)?;
            log::info!("code loaded from {}", file.display());
        }
        Command::Background { file, user_agent } => {
            let bytes =
                fs::read(&file).with_context(|| format!("could not read {}", file.display()))?;
            let platform = Platform::from_user_agent(user_agent.unwrap_or_default());
            let mut studio = Studio::new(settings, SyntectHighlighter::new()).with_platform(platform);
            studio.upload_background(&bytes)?;
        }
        Command::ClearBackground => {
            settings.clear_background()?;
        }
        Command::Show => {
            let json = settings.export_snapshot().to_json_pretty()?;
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
        Command::Export { out } => {
            // Pick a theme matching the stored scheme on first use
            let prefers_dark = settings.color_scheme().is_dark();
            settings.ensure_theme(prefers_dark)?;

            let mut studio = Studio::new(settings, SyntectHighlighter::new());
            studio.refresh()?;
            let path = studio.export_to(&out)?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
