//! CLI binary for hwocr.
//!
//! A thin shim over the library crate: `serve` runs the web form, `scan`
//! runs one image through the pipeline, `strip` exposes the Markdown
//! stripper on its own.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hwocr::config::{ENV_MODEL, ENV_PROVIDER};
use hwocr::{strip_markdown, App, AppConfig, HwOcrError, ImagePayload, OutputFormat, RunOptions, Scan, NO_TEXT_MESSAGE};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the web form on port 8080
  hwocr serve --addr 0.0.0.0:8080

  # OCR one photo to stdout
  HWOCR_PASSWORD_INPUT=rahasia hwocr scan catatan.jpg

  # OCR, tidy up with Gemini, keep the Markdown
  hwocr scan catatan.png --refine --format markdown -o hasil_rapi.txt

  # Strip Markdown from a file (or stdin)
  hwocr strip jawaban.md

ENVIRONMENT VARIABLES:
  password                              Access password (required)
  GOOGLE_APPLICATION_CREDENTIALS_JSON   Service-account key JSON (required)
  GEMINI_API_KEY                        Gemini API key (required)
  HWOCR_MODEL                           Model ID (default gemini-2.0-flash)
  HWOCR_PROVIDER                        LLM provider (default gemini)
  HWOCR_OCR_TIMEOUT                     OCR call timeout, seconds (default 60)
  HWOCR_REFINE_TIMEOUT                  AI call timeout, seconds (default 120)
  HWOCR_LANGUAGE_HINTS                  Comma-separated Vision hints, e.g. id,en
  HWOCR_PASSWORD_INPUT                  Password submitted by `scan`
"#;

/// Handwriting OCR with Google Cloud Vision and optional AI clean-up.
#[derive(Parser, Debug)]
#[command(
    name = "hwocr",
    version,
    about = "Handwriting OCR with Google Cloud Vision and optional AI clean-up",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// LLM model ID used for clean-up.
    #[arg(long, global = true, env = "HWOCR_MODEL")]
    model: Option<String>,

    /// LLM provider (gemini, openai, anthropic, ...).
    #[arg(long, global = true, env = "HWOCR_PROVIDER")]
    provider: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "HWOCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "HWOCR_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the password-protected web form.
    #[cfg(feature = "web")]
    Serve {
        /// Listen address.
        #[arg(long, env = "HWOCR_ADDR", default_value = "127.0.0.1:8501")]
        addr: std::net::SocketAddr,
    },

    /// Run OCR on one image, optionally followed by AI clean-up.
    Scan {
        /// PNG or JPEG image.
        image: PathBuf,

        /// Password to check against the configured one.
        #[arg(long, env = "HWOCR_PASSWORD_INPUT", hide_env_values = true)]
        password: String,

        /// Tidy up the recognised text with the generative model.
        #[arg(long)]
        refine: bool,

        /// Output variant for refined text: plain or markdown.
        #[arg(long, default_value = "plain")]
        format: OutputFormat,

        /// Write the result to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable the spinner.
        #[arg(long, env = "HWOCR_NO_PROGRESS")]
        no_progress: bool,
    },

    /// Strip Markdown emphasis and bullets from a file or stdin.
    Strip {
        /// Input file; reads stdin when omitted.
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // Credential provisioning exports an env var, so the app is built while
    // this is still the only thread.
    let app = match cli.command {
        Command::Strip { .. } => None,
        _ => Some(build_app(cli.model.as_deref(), cli.provider.as_deref())?),
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?
        .block_on(run(cli, app))
}

async fn run(cli: Cli, app: Option<App>) -> Result<()> {
    match cli.command {
        #[cfg(feature = "web")]
        Command::Serve { addr } => {
            hwocr::web::serve(addr, std::sync::Arc::new(app.context("services were not initialised")?))
                .await
                .context("Web server failed")?;
        }

        Command::Scan {
            ref image,
            ref password,
            refine,
            format,
            ref output,
            no_progress,
        } => {
            let app = app.context("services were not initialised")?;
            app.authorize(password).context("Access denied")?;

            let payload = ImagePayload::from_path(image)
                .await
                .with_context(|| format!("Failed to load {}", image.display()))?;

            let progress = (!cli.quiet && !no_progress).then(spinner);
            if let Some(ref bar) = progress {
                bar.set_message("Memproses OCR…");
            }
            let result = app.run(&payload, RunOptions { refine, format }).await;
            if let Some(bar) = progress {
                bar.finish_and_clear();
            }

            let session = match result.context("OCR failed")? {
                Scan::NoText => {
                    eprintln!("{} {}", yellow("⚠"), NO_TEXT_MESSAGE);
                    return Ok(());
                }
                Scan::Text(session) => session,
            };

            let text = session
                .display()
                .unwrap_or_else(|| session.recognized().as_str());
            emit(text, output.as_deref(), cli.quiet)?;
        }

        Command::Strip { ref file } => {
            let input = match file {
                Some(path) => tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read stdin")?;
                    buf
                }
            };
            emit(&strip_markdown(&input), None, true)?;
        }
    }

    Ok(())
}

/// Build the app from the environment, letting CLI flags override model
/// and provider.
fn build_app(model: Option<&str>, provider: Option<&str>) -> Result<App> {
    let config = AppConfig::from_lookup(|key| match key {
        ENV_MODEL if model.is_some() => model.map(str::to_string),
        ENV_PROVIDER if provider.is_some() => provider.map(str::to_string),
        _ => std::env::var(key).ok(),
    })
    .context("Invalid configuration")?;
    App::from_config(config).context("Failed to initialise services")
}

fn spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Print to stdout, or write atomically to `output`.
fn emit(text: &str, output: Option<&Path>, quiet: bool) -> Result<()> {
    match output {
        Some(path) => {
            write_atomic(path, text)?;
            if !quiet {
                eprintln!(
                    "{}  {} chars  →  {}",
                    green("✔"),
                    text.chars().count(),
                    path.display()
                );
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            if !text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
            if !quiet {
                eprintln!("{}", dim(&format!("{} chars", text.chars().count())));
            }
        }
    }
    Ok(())
}

/// Write via a sibling temp file and rename so readers never see a partial file.
fn write_atomic(path: &Path, text: &str) -> Result<(), HwOcrError> {
    let tmp = path.with_extension("txt.tmp");
    let write = || -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, path)
    };
    write().map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        HwOcrError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        }
    })
}
