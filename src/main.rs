use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use log::{info, warn};
use url::Url;

use catalog::{glose::Glose, parse::parse_with, BookRecord, Catalog, ModuleLocator};
use covers::{CoverBinder, CoverLoader, LoadedCover};
use presenter::Presenter;

mod catalog;
mod covers;
mod presenter;

#[derive(Parser)]
struct Cli {
    /// Catalog endpoint to fetch the free books from.
    #[arg(long, env = "FREE_BOOKS_URL", default_value = catalog::glose::FREE_BOOKS_URL)]
    url: Url,

    /// Request timeout in seconds.
    #[arg(long, env = "FREE_BOOKS_TIMEOUT", default_value_t = 15)]
    timeout: u64,

    /// Position of the books module in the response, or `auto` to look it up.
    #[arg(long, default_value_t = ModuleLocator::default())]
    module: ModuleLocator,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and list the free books.
    Books {
        #[arg(long)]
        json: bool,
    },
    /// List the books of a catalog response saved on disk.
    Parse {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Fetch the list and load every cover.
    Covers {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Open the book at the given row.
    Open { position: usize },
}

fn print_books(books: &[BookRecord], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(books)?);
    } else {
        for (i, book) in books.iter().enumerate() {
            println!("{:>3}. {}\t{}", i, book.display_label(), book.image_url());
        }
    }
    Ok(())
}

async fn load_presenter(cli: &Cli) -> Result<Presenter<Glose>, Box<dyn std::error::Error>> {
    let glose = Glose::new(cli.url.clone(), Duration::from_secs(cli.timeout), cli.module)?;
    let mut presenter = Presenter::new(glose);
    if let Err(err) = presenter.load().await {
        sentry::capture_error(&err);
        eprintln!("{}", presenter.render());
        return Err(err.into());
    }
    Ok(presenter)
}

async fn covers(
    books: &[BookRecord],
    timeout: Duration,
    output: Option<&PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(dir) = output {
        tokio::fs::create_dir_all(dir).await?;
    }

    let mut binder = CoverBinder::new(CoverLoader::new(timeout)?);
    for (row, book) in books.iter().enumerate() {
        binder.bind(row, book.image_url());
    }
    info!("loading {} covers", binder.pending());

    while let Some(LoadedCover { row, result }) = binder.next_loaded().await {
        let label = books[row].display_label();
        match result {
            Ok(cover) => {
                println!("{:>3}. {} ({} bytes)", row, label, cover.bytes.len());
                if let Some(dir) = output {
                    let file = dir.join(format!("{}.{}", row, cover.extension()));
                    tokio::fs::write(&file, &cover.bytes).await?;
                }
            }
            Err(err) => {
                warn!("Failed to load cover for row {}: {}, skipping", row, err);
                println!("{:>3}. {} (no cover)", row, label);
            }
        }
    }

    Ok(())
}

fn open<C: Catalog>(
    presenter: &Presenter<C>,
    position: usize,
) -> Result<&'static str, Box<dyn std::error::Error>> {
    presenter.click(position).ok_or_else(|| {
        format!(
            "no book at row {} ({} listed)",
            position,
            presenter.records().len()
        )
        .into()
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("free_books_rs=info".parse()?),
        )
        .init();

    // Reporting stays off unless SENTRY_DSN is set.
    let _sentry = sentry::init(sentry::ClientOptions {
        release: sentry::release_name!(),
        ..Default::default()
    });

    match &cli.command {
        Commands::Books { json } => {
            let presenter = load_presenter(&cli).await?;
            if *json {
                print_books(presenter.records(), true)?;
            } else {
                println!("{}", presenter.render());
            }
        }
        Commands::Parse { path, json } => {
            let raw = tokio::fs::read_to_string(path).await?;
            let books = parse_with(&raw, cli.module)?;
            print_books(&books, *json)?;
        }
        Commands::Covers { output } => {
            let presenter = load_presenter(&cli).await?;
            covers(
                presenter.records(),
                Duration::from_secs(cli.timeout),
                output.as_ref(),
            )
            .await?;
        }
        Commands::Open { position } => {
            let presenter = load_presenter(&cli).await?;
            println!("{}", open(&presenter, *position)?);
        }
    }

    Ok(())
}
