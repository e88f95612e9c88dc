use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use oliva::catalog::{LoadOutcome, ProductRepository, RemoteCatalog};
use oliva::config::Config;
use oliva::mirror::FileMirror;
use oliva::store::{ProductStore, SettingsStore};

#[derive(Parser, Debug)]
#[command(name = "oliva")]
#[command(about = "Offline-first catalog and preferences for the olive oil shop")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/oliva/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Load the catalog (cache-first) and list the products
  Products,
  /// Show the bottle count and subscription state
  Status,
  /// Add one bottle
  Inc,
  /// Remove one bottle
  Dec,
  /// Subscribe to the newsletter
  Subscribe,
  /// Write the cached catalog to external storage
  Export,
  /// Read the catalog back from external storage
  Import,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
  let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
  tracing::subscriber::set_global_default(subscriber)?;

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;

  match args.command {
    Command::Products => {
      let store = Arc::new(ProductStore::open(&config.product_store_path()?)?);
      let source = RemoteCatalog::new(&config)?;
      let repository = ProductRepository::new(source, store.clone());

      match repository.load_catalog().await? {
        LoadOutcome::AlreadyCached => {
          if let Some(cached_at) = store.last_cached_at()? {
            println!("Serving catalog cached at {}", cached_at.format("%Y-%m-%d %H:%M:%S UTC"));
          }
        }
        LoadOutcome::Fetched { count } => println!("Fetched {} products", count),
        LoadOutcome::FetchFailed(reason) => eprintln!("Fetch failed: {}", reason),
      }

      for product in store.all()? {
        println!("{}: {}", product.name, product.description);
      }
    }
    Command::Status => {
      let settings = SettingsStore::open(&config.settings_store_path()?)?;
      println!("Bottles: {}", settings.quantity()?);
      println!("Subscribed: {}", settings.subscribed()?);
    }
    Command::Inc => {
      let settings = SettingsStore::open(&config.settings_store_path()?)?;
      settings.increment().await?;
      println!("Bottles: {}", settings.quantity()?);
    }
    Command::Dec => {
      let settings = SettingsStore::open(&config.settings_store_path()?)?;
      settings.decrement().await?;
      println!("Bottles: {}", settings.quantity()?);
    }
    Command::Subscribe => {
      let settings = SettingsStore::open(&config.settings_store_path()?)?;
      settings.mark_subscribed().await?;
      println!("Subscribed to the newsletter");
    }
    Command::Export => {
      let mirror = FileMirror::new(config.external_dir.clone());
      if !mirror.is_available() {
        println!("External storage unavailable, nothing exported");
        return Ok(());
      }

      let store = ProductStore::open(&config.product_store_path()?)?;
      let products = store.all()?;
      mirror.export(&products)?;
      println!("Exported {} products", products.len());
    }
    Command::Import => {
      let mirror = FileMirror::new(config.external_dir.clone());
      let products = mirror.import()?;
      if products.is_empty() {
        println!("No mirrored catalog found");
      }
      for product in products {
        println!("{}: {}", product.name, product.description);
      }
    }
  }

  Ok(())
}
