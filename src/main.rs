use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use simplelog::{Config, WriteLogger};

use pagewright::address::{
    ByteAddress, current_address, element_for_address, page_for_address, total_length,
};
use pagewright::content::html::{Chapter, SectionAssembler};
use pagewright::content::{ContentTree, MemoryTree, Viewport};
use pagewright::display::{
    DisplayMode, PageCursor, PageMovement, apply_page_offset, set_display_mode,
};
use pagewright::links::{LinkKind, anchors, normalize_href};
use pagewright::normalize::normalize_and_flatten;
use pagewright::pages::{count_pages, count_pages_vertical};
use pagewright::progress::ProgressStore;
use pagewright::sections::{section_ids, section_start_page};
use pagewright::settings::{self, Settings};

#[derive(Parser)]
#[command(name = "pagewright")]
#[command(version)]
#[command(about = "Paginate HTML chapters and track reading positions", long_about = None)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Viewport width in pixels
    #[arg(long, global = true)]
    width: Option<f64>,

    /// Viewport height in pixels
    #[arg(long, global = true)]
    height: Option<f64>,

    /// Display mode: single, double or scroll
    #[arg(long, global = true)]
    mode: Option<DisplayMode>,

    /// Log level override
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Where log output goes
    #[arg(long, global = true, value_name = "FILE", default_value = "pagewright.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count pages and show where each chapter starts
    Pages {
        /// Chapter files in reading order
        #[arg(value_name = "FILE", required = true)]
        chapters: Vec<PathBuf>,
    },

    /// Reading position at a scroll offset
    Locate {
        #[arg(value_name = "FILE", required = true)]
        chapters: Vec<PathBuf>,

        /// Horizontal scroll offset in pixels
        #[arg(long, allow_negative_numbers = true)]
        offset: f64,
    },

    /// Page and element holding a reading position
    Seek {
        #[arg(value_name = "FILE", required = true)]
        chapters: Vec<PathBuf>,

        /// Address in text units
        #[arg(long)]
        address: usize,
    },

    /// List links with their kind and normalized target
    Links {
        #[arg(value_name = "FILE", required = true)]
        chapters: Vec<PathBuf>,
    },

    /// Record or restore reading progress
    Resume {
        #[arg(value_name = "FILE", required = true)]
        chapters: Vec<PathBuf>,

        /// Progress file
        #[arg(long, value_name = "FILE", default_value = "progress.json")]
        progress: PathBuf,

        /// Record the position at this scroll offset instead of restoring
        #[arg(long, allow_negative_numbers = true)]
        record: Option<f64>,
    },
}

impl Commands {
    fn chapters(&self) -> &[PathBuf] {
        match self {
            Commands::Pages { chapters }
            | Commands::Locate { chapters, .. }
            | Commands::Seek { chapters, .. }
            | Commands::Links { chapters }
            | Commands::Resume { chapters, .. } => chapters,
        }
    }
}

/// Chapters assembled, laid out and normalized for one viewport.
struct Book {
    key: String,
    tree: MemoryTree,
    viewport: Viewport,
    settings: Settings,
}

impl Book {
    fn load(chapters: &[PathBuf], settings: Settings, viewport: Viewport) -> Result<Self> {
        let mut assembler = SectionAssembler::new();
        for (index, path) in chapters.iter().enumerate() {
            let html = fs::read_to_string(path)
                .with_context(|| format!("Failed to read chapter {}", path.display()))?;
            assembler.push_chapter(&Chapter::new(index as i64, html))?;
        }
        let mut tree = assembler.finish();

        let mut layout = settings.flow_layout(viewport);
        if settings.display_mode.is_scroll() {
            layout = layout.continuous();
        }
        layout.apply(&mut tree);

        let report = normalize_and_flatten(&mut tree, viewport, &settings.normalize_options());
        if report.changed_structure() || report.spacing_shrunk > 0 {
            debug!("Re-running layout after normalization: {report:?}");
            layout.apply(&mut tree);
        }
        set_display_mode(&mut tree, Some(settings.display_mode));

        let key = chapters
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join("+");
        info!("Loaded {} chapters as {key}", chapters.len());

        Ok(Self {
            key,
            tree,
            viewport,
            settings,
        })
    }

    fn page_count(&self) -> usize {
        if self.settings.display_mode.is_scroll() {
            count_pages_vertical(&self.tree, self.viewport)
        } else {
            count_pages(&self.tree, self.viewport)
        }
    }

    fn require_paginated(&self, what: &str) -> Result<()> {
        if self.settings.display_mode.is_scroll() {
            bail!("{what} needs a paginated display mode");
        }
        Ok(())
    }

    fn describe(&self, address: ByteAddress) -> String {
        let page = page_for_address(&self.tree, address.byte_count, self.viewport);
        let element = element_for_address(&self.tree, address.byte_count);
        let preview: String = element
            .map(|node| self.tree.text_content(node))
            .unwrap_or_default()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(60)
            .collect();
        match page {
            Some(page) => format!("{address} on page {page}: {preview}"),
            None => format!("{address} is past the end of the content"),
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => settings::load_or_create(path)?,
        None => settings::load_settings()?,
    };
    if let Some(width) = cli.width {
        settings.viewport_width = width;
    }
    if let Some(height) = cli.height {
        settings.viewport_height = height;
    }
    if let Some(mode) = cli.mode {
        settings.display_mode = mode;
    }
    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
    }
    Ok(settings)
}

fn init_logging(path: &Path, settings: &Settings) -> Result<()> {
    WriteLogger::init(
        settings.level_filter(),
        Config::default(),
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
    )?;
    Ok(())
}

fn main() -> Result<()> {
    better_panic::install();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    init_logging(&cli.log_file, &settings)?;
    info!("Starting pagewright");

    let viewport = settings.viewport()?;
    let book = Book::load(cli.command.chapters(), settings, viewport)?;

    match &cli.command {
        Commands::Pages { .. } => run_pages(&book),
        Commands::Locate { offset, .. } => run_locate(&book, *offset)?,
        Commands::Seek { address, .. } => run_seek(&book, *address)?,
        Commands::Links { .. } => run_links(&book),
        Commands::Resume {
            progress, record, ..
        } => run_resume(book, progress, *record)?,
    }

    info!("Shutting down pagewright");
    Ok(())
}

fn run_pages(book: &Book) {
    println!(
        "{} pages ({} mode, {} text units)",
        book.page_count(),
        book.settings.display_mode,
        total_length(&book.tree)
    );
    if book.settings.display_mode.is_scroll() {
        return;
    }
    for id in section_ids(&book.tree) {
        if let Some(page) = section_start_page(&book.tree, id, book.viewport) {
            println!("  chapter {id} starts on page {page}");
        }
    }
}

fn run_locate(book: &Book, offset: f64) -> Result<()> {
    book.require_paginated("locate")?;
    match current_address(&book.tree, offset) {
        Some(address) => println!("{}", book.describe(address)),
        None => println!("no content past offset {offset}"),
    }
    Ok(())
}

fn run_seek(book: &Book, address: usize) -> Result<()> {
    book.require_paginated("seek")?;
    println!("{}", book.describe(ByteAddress::new(address, None)));
    Ok(())
}

fn run_links(book: &Book) {
    for anchor in anchors(&book.tree) {
        let kind = match anchor.kind() {
            LinkKind::External => "external",
            LinkKind::InternalAnchor => "anchor",
            LinkKind::InternalSection => "section",
        };
        let request = anchor.navigation(&book.key);
        println!(
            "{kind:<8} {} -> {}",
            request.target,
            normalize_href(&request.target)
        );
    }
}

fn run_resume(mut book: Book, progress: &Path, record: Option<f64>) -> Result<()> {
    book.require_paginated("resume")?;
    let mut store = ProgressStore::open_or_empty(progress);

    if let Some(offset) = record {
        let Some(address) = current_address(&book.tree, offset) else {
            bail!("no content past offset {offset}");
        };
        let page = page_for_address(&book.tree, address.byte_count, book.viewport).unwrap_or(1);
        if store.record(&book.key, address, page)? {
            println!("recorded {address} (page {page})");
        } else {
            println!("already at {address}");
        }
        return Ok(());
    }

    let Some(saved) = store.position(&book.key) else {
        println!("no saved position for {}", book.key);
        return Ok(());
    };
    let address = saved.address;
    let page = page_for_address(&book.tree, address.byte_count, book.viewport).unwrap_or(1);

    let cursor = restored_cursor(book.page_count(), book.settings.page_movement, page);
    let gap = book.settings.column_gap;
    apply_page_offset(&mut book.tree, cursor.viewing_page(), gap);

    println!(
        "last read {}: {}",
        saved.last_read.format("%Y-%m-%d %H:%M"),
        book.describe(address)
    );
    if let Some(left) = book.tree.style(book.tree.root(), "left") {
        debug!("Restored page offset: left {left}");
    }
    Ok(())
}

/// Cursor on the 1-based `page`, clamped to the last page when the layout
/// has fewer pages than when the position was saved.
fn restored_cursor(page_count: usize, movement: PageMovement, page: usize) -> PageCursor {
    let mut cursor = PageCursor::new(page_count, movement);
    if !cursor.set_page(page.saturating_sub(1)) {
        warn!(
            "Saved page {page} is past the last of {} pages, showing the last page",
            cursor.page_count()
        );
        cursor.set_last_page();
    }
    cursor
}
