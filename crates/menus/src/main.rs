//! Menu engine command-line tool.
//!
//! Loads data-defined menu sources from a JSON file, renders the menu for a
//! request, and administers the shared menu cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cms_menus::modifier::LevelLimit;
use cms_menus::services::{FixedSite, PrefixLanguages};
use cms_menus::source::SourceDefinition;
use cms_menus::{MenuConfig, MenuPool, MenuRequest, MenuServices, SiteId, Toolbar, UserContext};

#[derive(Debug, Parser)]
#[command(name = "menus", about = "Build, inspect and invalidate CMS navigation menus")]
struct Cli {
    /// Site the request belongs to.
    #[arg(long, default_value_t = 1, global = true)]
    site: SiteId,

    /// Comma-separated site languages; the first is the default.
    #[arg(long, default_value = "en", global = true)]
    languages: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render the menu for a request path.
    Render {
        /// JSON file with an array of source definitions.
        #[arg(long)]
        file: PathBuf,
        /// Request path.
        #[arg(long, default_value = "/")]
        path: String,
        /// Authenticated user id.
        #[arg(long)]
        user: Option<String>,
        /// Render in edit mode.
        #[arg(long)]
        edit: bool,
        /// Show staff notices.
        #[arg(long)]
        staff: bool,
        /// Drop nodes deeper than this level.
        #[arg(long)]
        max_level: Option<usize>,
        /// Render a breadcrumb instead of a menu.
        #[arg(long)]
        breadcrumb: bool,
    },
    /// Validate a source definition file.
    Check {
        /// JSON file with an array of source definitions.
        #[arg(long)]
        file: PathBuf,
    },
    /// Invalidate cached menus.
    Clear {
        /// Only this language.
        #[arg(long)]
        language: Option<String>,
        /// Only the site given with --site.
        #[arg(long)]
        this_site: bool,
        /// Everything, ignoring filters.
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = MenuConfig::from_env().context("failed to load configuration")?;

    let languages: Vec<String> = cli
        .languages
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let services = MenuServices::connect(
        config,
        Arc::new(FixedSite(cli.site)),
        Arc::new(PrefixLanguages::new(languages)),
    )
    .await
    .context("failed to initialize menu services")?;

    let pool = MenuPool::new(services);

    match cli.command {
        Command::Render {
            file,
            path,
            user,
            edit,
            staff,
            max_level,
            breadcrumb,
        } => {
            register_file(&pool, &file)?;
            if let Some(level) = max_level {
                pool.register_modifier(Arc::new(LevelLimit::new(level)));
            }

            let request = MenuRequest::new(path)
                .with_user(user.map(UserContext::authenticated).unwrap_or_default())
                .with_toolbar(Toolbar {
                    edit_mode_active: edit,
                    preview_mode_active: false,
                    is_staff: staff,
                });

            let renderer = pool.renderer(request).await?;
            let menu = renderer.get_nodes(None, None, breadcrumb).await;

            for notice in &menu.notices {
                println!("! {notice}");
            }
            for node in menu.iter() {
                let marker = if node.selected {
                    "*"
                } else if node.ancestor {
                    ">"
                } else {
                    "-"
                };
                println!(
                    "{}{marker} {} ({})",
                    "  ".repeat(node.level),
                    node.title,
                    node.url
                );
            }
            info!(
                key = %renderer.cache_key(),
                nodes = menu.len(),
                "menu rendered"
            );
        }
        Command::Check { file } => {
            let count = register_file(&pool, &file)?;
            pool.initialize()?;
            let sources = pool.registered_sources(false).await;
            println!("{count} source definitions OK");
            for source in sources {
                println!("  {} [{}]", source.namespace(), source.source().label());
            }
        }
        Command::Clear {
            language,
            this_site,
            all,
        } => {
            let site = this_site.then_some(cli.site);
            let cleared = pool.clear(site, language.as_deref(), all).await;
            println!("cleared {cleared} cached menus");
        }
    }

    Ok(())
}

/// Register every source defined in a JSON file, returning how many.
fn register_file(pool: &MenuPool, file: &Path) -> Result<usize> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let definitions = serde_json::from_str::<Vec<SourceDefinition>>(&json)
        .with_context(|| format!("failed to parse {}", file.display()))?;

    let count = definitions.len();
    for definition in definitions {
        let (name, source) = definition.into_source()?;
        pool.register_source(name, source)?;
    }
    Ok(count)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
