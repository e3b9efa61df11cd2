use std::sync::Arc;

use clap::{Parser, Subcommand};
use emoji_art::config::EditorConfig;
use emoji_art::doc::ItemId;
use emoji_art::error::{ConfigError, StoreError};
use emoji_art::fetch::{FetchStatus, HttpTransport, Transport};
use emoji_art::session::{EditorSession, SessionOptions};
use emoji_art::store::{DocumentId, DocumentStore, JsonFileStore};
use reqwest::Url;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("document {0} not found")]
    DocumentNotFound(DocumentId),
    #[error("item {0} not found")]
    ItemNotFound(ItemId),
    #[error("document {0} has no item ids left")]
    IdsExhausted(DocumentId),
    #[error("scale factor must be a positive number, got {0}")]
    InvalidFactor(f64),
    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("background failed: {0}")]
    Background(String),
}

#[derive(Parser, Debug)]
#[command(name = "emoji-art", about = "EmojiArt document editor")]
struct Cli {
    /// Overrides EMOJI_ART_STORE_DIR.
    #[arg(long)]
    store_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the built-in palette.
    Palette,
    /// List stored documents.
    List,
    /// Create an empty document and print its id.
    New,
    /// Print a document snapshot as JSON.
    Show { document: Uuid },
    /// Add a glyph at a document-space location.
    #[command(allow_negative_numbers = true)]
    Add {
        document: Uuid,
        content: String,
        #[arg(long, default_value_t = 0)]
        x: i64,
        #[arg(long, default_value_t = 0)]
        y: i64,
        #[arg(long)]
        size: Option<i64>,
    },
    /// Move an item by a document-space offset.
    #[command(allow_negative_numbers = true)]
    Move { document: Uuid, item: u64, dx: f64, dy: f64 },
    /// Multiply an item's size.
    Scale { document: Uuid, item: u64, factor: f64 },
    /// Remove an item.
    Remove { document: Uuid, item: u64 },
    /// Set (or with no URL, clear) the background and wait for it to load.
    Background { document: Uuid, url: Option<String> },
}

struct Editor {
    config: EditorConfig,
    store: JsonFileStore,
    transport: Arc<dyn Transport>,
}

impl Editor {
    fn open(&self, id: DocumentId) -> Result<EditorSession, CliError> {
        EditorSession::open(id, &self.store, Arc::clone(&self.transport), SessionOptions::from(&self.config))
            .map_err(CliError::from)
    }

    fn open_existing(&self, id: DocumentId) -> Result<EditorSession, CliError> {
        if self.store.load(id)?.is_none() {
            return Err(CliError::DocumentNotFound(id));
        }
        self.open(id)
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!(error = %e, "failed to read .env");
        }
    }

    let cli = Cli::parse();
    let mut config = EditorConfig::from_env()?;
    if let Some(dir) = cli.store_dir {
        config.store_dir = dir;
    }
    let editor = Editor {
        store: JsonFileStore::new(&config.store_dir),
        transport: Arc::new(HttpTransport::new(config.timeouts)?),
        config,
    };

    match cli.command {
        Command::Palette => {
            println!("{}", emoji_art::PALETTE);
            Ok(())
        }
        Command::List => run_list(&editor),
        Command::New => run_new(&editor),
        Command::Show { document } => run_show(&editor, DocumentId(document)),
        Command::Add { document, content, x, y, size } => run_add(&editor, DocumentId(document), content, x, y, size),
        Command::Move { document, item, dx, dy } => {
            let mut session = editor.open_existing(DocumentId(document))?;
            if !session.move_item(ItemId(item), dx, dy) {
                return Err(CliError::ItemNotFound(ItemId(item)));
            }
            save(&editor, &session)
        }
        Command::Scale { document, item, factor } => {
            let mut session = editor.open_existing(DocumentId(document))?;
            if !session.document().contains(ItemId(item)) {
                return Err(CliError::ItemNotFound(ItemId(item)));
            }
            if !session.scale_item(ItemId(item), factor) {
                return Err(CliError::InvalidFactor(factor));
            }
            save(&editor, &session)
        }
        Command::Remove { document, item } => {
            let mut session = editor.open_existing(DocumentId(document))?;
            if !session.remove_item(ItemId(item)) {
                return Err(CliError::ItemNotFound(ItemId(item)));
            }
            save(&editor, &session)
        }
        Command::Background { document, url } => run_background(&editor, DocumentId(document), url).await,
    }
}

fn save(editor: &Editor, session: &EditorSession) -> Result<(), CliError> {
    session.save(&editor.store)?;
    info!(document = %session.document_id(), items = session.document().len(), "document saved");
    Ok(())
}

fn run_list(editor: &Editor) -> Result<(), CliError> {
    for id in editor.store.list()? {
        println!("{id}");
    }
    Ok(())
}

fn run_new(editor: &Editor) -> Result<(), CliError> {
    let session = editor.open(DocumentId::new())?;
    save(editor, &session)?;
    println!("{}", session.document_id());
    Ok(())
}

fn run_show(editor: &Editor, id: DocumentId) -> Result<(), CliError> {
    let Some(snapshot) = editor.store.load(id)? else {
        return Err(CliError::DocumentNotFound(id));
    };
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn run_add(
    editor: &Editor,
    id: DocumentId,
    content: String,
    x: i64,
    y: i64,
    size: Option<i64>,
) -> Result<(), CliError> {
    let mut session = editor.open(id)?;
    let size = size.unwrap_or_else(|| emoji_art::doc::round_half_even(editor.config.default_emoji_size));
    let Some(item) = session.add_item(content, x, y, size) else {
        return Err(CliError::IdsExhausted(id));
    };
    save(editor, &session)?;
    println!("{item}");
    Ok(())
}

async fn run_background(editor: &Editor, id: DocumentId, url: Option<String>) -> Result<(), CliError> {
    let url = match url {
        Some(raw) => Some(Url::parse(&raw).map_err(|e| CliError::InvalidUrl { url: raw, message: e.to_string() })?),
        None => None,
    };
    let mut session = editor.open(id)?;
    session.set_background_url(url);
    session.wait_for_background().await;
    save(editor, &session)?;

    match session.fetch_status() {
        FetchStatus::Failed { error, .. } => Err(CliError::Background(error.to_string())),
        FetchStatus::Succeeded { url } => {
            if let Some(image) = session.background_image() {
                println!("{url} {}x{}", image.width(), image.height());
            }
            Ok(())
        }
        FetchStatus::Idle | FetchStatus::Fetching { .. } => {
            println!("background cleared");
            Ok(())
        }
    }
}
