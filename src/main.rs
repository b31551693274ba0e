use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use ticketcard::assets::{default_asset, DEFAULT_BACKGROUND_PATH, DEFAULT_LOGO_PATH};
use ticketcard::export::DOCUMENT_FILE_NAME;
use ticketcard::form::{EVENT_OPTIONS, EVENT_SELECT_PLACEHOLDER};
use ticketcard::{
    Artifact, AssetSource, DirectorySink, DownloadSink, ExportConfig, Exporter, FieldName,
    FilenamePolicy, TicketFields, TicketSession, Variant,
};

#[derive(Parser)]
#[command(name = "ticketcard", version, about = "Event ticket generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save the ticket as `<name>.png`
    Image(ExportArgs),
    /// Generate a single-page PDF ticket
    Pdf(ExportArgs),
    /// List the selectable events
    Events,
}

#[derive(Args)]
struct ExportArgs {
    /// Person name
    #[arg(long)]
    name: Option<String>,
    /// Event name (see `ticketcard events`)
    #[arg(long)]
    event: Option<String>,
    /// Number of attendees
    #[arg(long)]
    attendees: Option<String>,
    /// Local date and time, e.g. 2024-05-01T19:30
    #[arg(long)]
    date_time: Option<String>,
    /// Event address
    #[arg(long)]
    address: Option<String>,
    /// JSON file with camelCase ticket fields; flags override its values
    #[arg(long)]
    fields: Option<PathBuf>,
    /// Logo image (path or URL); defaults to public/logo.png when present
    #[arg(long)]
    logo: Option<AssetSource>,
    /// Background image (path or URL); defaults to public/bg.jpg when present
    #[arg(long)]
    background: Option<AssetSource>,
    /// Do not fall back to the assets under public/
    #[arg(long)]
    no_default_assets: bool,
    /// Directory the ticket is saved into
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// Skip required-field validation
    #[arg(long)]
    force: bool,
    /// Use the person name as the file name without sanitizing it
    #[arg(long)]
    raw_filename: bool,
    #[arg(long)]
    ticket_number: Option<String>,
    /// Oversampling factor
    #[arg(long, default_value_t = 2)]
    scale: u32,
    /// Card width in CSS pixels
    #[arg(long, default_value_t = 512)]
    card_width: u32,
    #[arg(long, default_value_t = 30000)]
    asset_timeout_ms: u64,
    /// Also print the ticket as a data: URL
    #[arg(long)]
    data_url: bool,
}

/// Directory sink that can also echo the artifact as a data URL.
struct CliSink {
    inner: DirectorySink,
    data_url: bool,
}

impl DownloadSink for CliSink {
    fn save(&self, artifact: &Artifact) -> ticketcard::Result<PathBuf> {
        let path = self.inner.save(artifact)?;
        if self.data_url {
            println!("{}", artifact.to_data_url());
        }
        Ok(path)
    }
}

fn read_fields(path: &Path) -> Result<TicketFields> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading fields from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing fields in {}", path.display()))
}

async fn run_export(args: ExportArgs, variant: Variant) -> Result<()> {
    let base = match &args.fields {
        Some(path) => read_fields(path)?,
        None => TicketFields::default(),
    };

    let cwd = Path::new(".");
    let fallback = |relative: &str| {
        if args.no_default_assets {
            None
        } else {
            default_asset(cwd, relative)
        }
    };
    let logo = args.logo.or_else(|| fallback(DEFAULT_LOGO_PATH));
    let background = args.background.or_else(|| fallback(DEFAULT_BACKGROUND_PATH));

    let mut config = ExportConfig {
        card_width: args.card_width,
        scale: args.scale,
        logo,
        background,
        asset_timeout_ms: args.asset_timeout_ms,
        filename_policy: if args.raw_filename {
            FilenamePolicy::PassThrough
        } else {
            FilenamePolicy::Sanitize
        },
        ..Default::default()
    };
    if let Some(number) = args.ticket_number {
        config.ticket_number = number;
    }

    let exporter = Exporter::new(Some(config)).await?;
    let sink = CliSink {
        inner: DirectorySink::new(&args.out_dir),
        data_url: args.data_url,
    };
    let mut session = TicketSession::new(exporter.clone(), Arc::new(sink));

    for name in FieldName::ALL {
        session.set_field(name, base.get(name));
    }
    let overrides = [
        (FieldName::PersonName, args.name),
        (FieldName::EventName, args.event),
        (FieldName::NumberOfAttendees, args.attendees),
        (FieldName::DateTime, args.date_time),
        (FieldName::Address, args.address),
    ];
    for (name, value) in overrides {
        if let Some(value) = value {
            session.set_field(name, value);
        }
    }

    session.mount().await.context("loading ticket assets")?;

    let saved = if args.force {
        session.submit_forced(variant).await
    } else {
        session.submit(variant).await?
    };
    exporter.close().await?;

    match saved {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        // the failure has already been logged
        None => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Image(args) => run_export(args, Variant::Image).await,
        Commands::Pdf(args) => {
            log::debug!("document exports are saved as {}", DOCUMENT_FILE_NAME);
            run_export(args, Variant::Document).await
        }
        Commands::Events => {
            println!("{}", EVENT_SELECT_PLACEHOLDER);
            for event in EVENT_OPTIONS {
                println!("  {}", event);
            }
            Ok(())
        }
    }
}
