//! Sequential file uploader entry point.

mod app;
mod config;

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use fileuploader_protocol::UploadOptions;
use tracing_subscriber::EnvFilter;

use config::FileConfig;

/// Upload files one at a time to an HTTP endpoint
#[derive(Parser, Debug)]
#[command(name = "fileuploader")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Files to upload, in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Upload endpoint
    #[arg(short, long)]
    server: Option<String>,

    /// Form field the file is sent under
    #[arg(long)]
    field_name: Option<String>,

    /// Extra form field, as NAME=VALUE (repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_pair)]
    params: Vec<(String, String)>,

    /// Request header, as NAME=VALUE (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_pair)]
    headers: Vec<(String, String)>,

    /// Start uploading as soon as the files are queued
    #[arg(short, long)]
    auto: bool,

    /// Send the raw file bytes instead of a multipart form
    #[arg(long)]
    binary: bool,

    /// Keep cookies for the upload endpoint
    #[arg(long)]
    with_credentials: bool,

    /// Accept more than one file
    #[arg(short, long)]
    multiple: bool,

    /// Accepted MIME types, comma-separated
    #[arg(long)]
    accept: Option<String>,

    /// Maximum file size in bytes
    #[arg(long)]
    max_size: Option<u64>,

    /// Keep going after a connection-level failure
    #[arg(long)]
    keep_going: bool,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{s}`"))?;
    if name.is_empty() {
        return Err(format!("empty name in `{s}`"));
    }
    Ok((name.to_string(), value.to_string()))
}

impl Cli {
    /// Options set on the command line; everything else comes from the file.
    fn overrides(&self) -> UploadOptions {
        let mut options = UploadOptions {
            server: self.server.clone(),
            field_name: self.field_name.clone(),
            accept: self.accept.clone(),
            file_size_limit: self.max_size,
            ..Default::default()
        };
        if !self.params.is_empty() {
            options.post_params = Some(self.params.iter().cloned().collect::<BTreeMap<_, _>>());
        }
        if !self.headers.is_empty() {
            options.headers = Some(self.headers.iter().cloned().collect::<BTreeMap<_, _>>());
        }
        if self.auto {
            options.auto = Some(true);
        }
        if self.binary {
            options.use_form_data = Some(false);
        }
        if self.with_credentials {
            options.with_credentials = Some(true);
        }
        if self.multiple {
            options.multiple = Some(true);
        }
        if self.keep_going {
            options.advance_on_transport_error = Some(true);
        }
        options
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting fileuploader");

    let settings = FileConfig::load(cli.config.as_deref())?.resolve(cli.overrides())?;
    tracing::info!(server = %settings.upload.server, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(app::run(settings, cli.files))?;

    println!(
        "queued {}, rejected {}, uploaded {}, failed {}",
        report.queued, report.rejected, report.succeeded, report.failed
    );
    if !report.is_clean() {
        anyhow::bail!("some files were not uploaded");
    }
    Ok(())
}
