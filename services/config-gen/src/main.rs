//! Resource-configuration generator.
//!
//! Reads the cached metadata store and emits one resource entry per
//! data-cube product, suitable for the hosting framework's YAML
//! configuration. Entries can be merged into an existing config file
//! by resource key.

mod resource;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cube_catalog::MetadataStore;

#[derive(Parser, Debug)]
#[command(name = "config-gen")]
#[command(about = "Create resource entries for each data-cube product")]
struct Args {
    /// Existing config YAML to merge the generated resources into
    #[arg(short, long)]
    infile: Option<PathBuf>,

    /// Output YAML file name
    #[arg(short, long, default_value = "config_auto.yml")]
    outfile: PathBuf,

    /// Comma separated list of product names to exclude
    #[arg(long, value_delimiter = ',')]
    exclude_products: Vec<String>,

    /// Metadata cache artifact to read
    #[arg(long, env = "CUBE_METADATA_CACHE")]
    cache: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cache_path = args
        .cache
        .clone()
        .unwrap_or_else(MetadataStore::default_cache_path);
    info!(cache = %cache_path.display(), "loading metadata store");
    let store = MetadataStore::load_from_cache(&cache_path)
        .with_context(|| format!("loading metadata cache from {}", cache_path.display()))?;

    let resources = resource::resources_for_store(&store, &args.exclude_products)?;
    info!(
        products = store.list_product_names().len(),
        resources = resources.len(),
        "generated resource entries"
    );

    let mut document = resource::wrap_resources(resources);
    if let Some(infile) = &args.infile {
        let existing = std::fs::read_to_string(infile)
            .with_context(|| format!("reading config file {}", infile.display()))?;
        document = resource::merge_config(&existing, document)?;
    }

    let yaml = serde_yaml::to_string(&document)?;
    std::fs::write(&args.outfile, yaml)
        .with_context(|| format!("writing config file {}", args.outfile.display()))?;
    info!(outfile = %args.outfile.display(), "finished writing configuration");

    Ok(())
}
