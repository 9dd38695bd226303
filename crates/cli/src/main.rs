#![forbid(unsafe_code)]

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use curate_core::{
    ContentKind, CoreError, EditPatch, EffectiveItem, ItemFilter, ItemId, ReviewStatus, export,
};
use curate_engine::{
    DirectTransport, ReviewSession, SessionConfig, SyncEvent, load_catalog,
};
use curate_storage::SqliteRemoteStore;

/// Rounds of pumping before a mutating command gives up on the remote.
const SETTLE_ROUNDS: usize = 16;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "curate: review a content catalog against a shared overlay store",
    long_about = None
)]
struct Cli {
    /// Catalog document (JSON array of items).
    #[arg(long, global = true, env = "CURATE_CATALOG", default_value = "catalog.json")]
    catalog: PathBuf,

    /// SQLite database holding review overlays.
    #[arg(long, global = true, env = "CURATE_DB", default_value = "curate.db")]
    db: PathBuf,

    /// Review session id.
    #[arg(long, global = true, env = "CURATE_REVIEW", default_value = "default")]
    review: String,

    /// Session config (TOML).
    #[arg(long, global = true, env = "CURATE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List effective items.
    List {
        #[arg(long, value_parser = parse_status)]
        status: Option<ReviewStatus>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = Content::All)]
        content: Content,
    },
    /// Show review progress.
    Progress,
    /// Export effective items.
    Export {
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        /// Write to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Choose a status. Choosing the current status again clears it.
    Status {
        item: String,
        #[arg(value_parser = parse_status)]
        status: ReviewStatus,
    },
    /// Override item fields.
    Edit {
        item: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        link: Option<String>,
    },
    /// Drop every field override for an item.
    Reset { item: String },
    /// Set the reviewer comment. An empty string clears it.
    Comment { item: String, text: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Content {
    All,
    Images,
    Text,
}

impl From<Content> for ContentKind {
    fn from(content: Content) -> Self {
        match content {
            Content::All => ContentKind::All,
            Content::Images => ContentKind::Images,
            Content::Text => ContentKind::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

fn parse_status(s: &str) -> Result<ReviewStatus, CoreError> {
    ReviewStatus::parse(s)
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CURATE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "curate=debug,info"
        } else {
            "warn"
        })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn open_session(cli: &Cli) -> anyhow::Result<ReviewSession> {
    let config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    let catalog = load_catalog(&cli.catalog)?;
    let db = cli
        .db
        .to_str()
        .context("database path is not valid UTF-8")?;
    let store = SqliteRemoteStore::open(db)
        .with_context(|| format!("opening {}", cli.db.display()))?;

    let session = ReviewSession::builder(cli.review.as_str(), catalog)
        .remote(DirectTransport::new(store))
        .config(config)
        .open()?;
    Ok(session)
}

/// Drive outstanding calls to completion and surface the first failure.
fn settle(session: &mut ReviewSession) -> anyhow::Result<()> {
    let events = session.settle(SETTLE_ROUNDS);
    if !session.sync().is_settled() {
        bail!("{} remote call(s) still pending", session.sync().in_flight());
    }
    for event in events {
        if let SyncEvent::Failed(err) = event {
            return Err(err.into());
        }
    }
    Ok(())
}

fn print_items(items: &[EffectiveItem]) {
    for item in items {
        let marker = match (item.is_edited, item.has_comment()) {
            (true, true) => "*#",
            (true, false) => "* ",
            (false, true) => " #",
            (false, false) => "  ",
        };
        println!(
            "{:<10} {marker} {:<16} {}",
            item.status.as_str(),
            item.id.as_str(),
            item.title
        );
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut session = open_session(&cli)?;

    match cli.command {
        Commands::List {
            status,
            category,
            search,
            content,
        } => {
            let filter = ItemFilter {
                status,
                category,
                search,
                content: content.into(),
            };
            print_items(&session.filtered(&filter));
        }
        Commands::Progress => {
            let progress = session.progress();
            println!(
                "{}/{} reviewed ({}%)",
                progress.reviewed,
                progress.total,
                progress.percent()
            );
            println!(
                "use {}  like {}  remove {}  edited {}  commented {}",
                progress.use_count,
                progress.like_count,
                progress.remove_count,
                progress.edited,
                progress.commented
            );
        }
        Commands::Export { format, output } => {
            let items = session.items();
            let rendered = match format {
                Format::Json => export::to_json(&items)?,
                Format::Csv => export::to_csv(&items),
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), items = items.len(), "export written");
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    writeln!(stdout, "{rendered}")?;
                }
            }
        }
        Commands::Status { item, status } => {
            let applied = session.set_status(&ItemId::new(&item), status)?;
            settle(&mut session)?;
            println!("{item}: {applied}");
        }
        Commands::Edit {
            item,
            title,
            category,
            description,
            link,
        } => {
            let patch = EditPatch {
                title,
                category,
                description,
                link,
            };
            if patch.is_empty() {
                info!(%item, "empty edit: item will be marked edited with no overrides");
            }
            session.save_edits(&ItemId::new(&item), patch)?;
            settle(&mut session)?;
            println!("{item}: edited");
        }
        Commands::Reset { item } => {
            session.reset_edits(&ItemId::new(&item))?;
            settle(&mut session)?;
            println!("{item}: edits reset");
        }
        Commands::Comment { item, text } => {
            session.save_comment(&ItemId::new(&item), text)?;
            settle(&mut session)?;
            println!("{item}: comment saved");
        }
    }

    session.close();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli)
}
