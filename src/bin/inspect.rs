//! sitefix-inspect: CLI tool for inspecting rule texts and resolving sites.

use clap::{Parser, Subcommand};
use sitefix::{
    CategoryStatus, ConfigManager, FileFetcher, HttpFetcher, LoadOptions, ManagerConfig,
    RuleCategory,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sitefix-inspect")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "Inspect site fix rule texts and resolve URLs against them", long_about = None)]
struct Cli {
    /// Directory holding the bundled rule files
    #[arg(short, long, default_value = "config")]
    dir: PathBuf,

    /// YAML manager configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fetch configured remote locations first
    #[arg(short, long)]
    remote: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print index statistics of every category
    Stats,

    /// Print the fixes that apply to a URL as JSON
    Resolve {
        /// URL or host to resolve
        url: String,

        /// Limit output to one category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Check URLs against the dark-site list
    Dark {
        /// URLs or hosts to check
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => ManagerConfig::from_file(path)?,
        None => ManagerConfig::default(),
    };

    let mut manager = ConfigManager::new(config, Arc::new(FileFetcher::new(&cli.dir)));
    let options = if cli.remote {
        manager = manager.with_remote(Arc::new(HttpFetcher::new()?));
        LoadOptions::remote()
    } else {
        LoadOptions::local()
    };
    manager.load(options).await;

    match cli.command {
        Commands::Stats => print_stats(&manager)?,
        Commands::Resolve { url, category } => {
            let categories = match category {
                Some(name) => vec![RuleCategory::parse(&name)
                    .ok_or_else(|| format!("unknown category: {}", name))?],
                None => vec![
                    RuleCategory::DynamicThemeFixes,
                    RuleCategory::InversionFixes,
                    RuleCategory::StaticThemes,
                ],
            };

            let mut output = serde_json::Map::new();
            output.insert(
                "dark".to_string(),
                serde_json::Value::Bool(manager.is_url_in_dark_list(&url)),
            );
            for category in categories {
                let fixes = manager.fixes_for(category, &url);
                output.insert(category.as_str().to_string(), serde_json::to_value(fixes)?);
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Dark { urls } => {
            for url in urls {
                let verdict = if manager.is_url_in_dark_list(&url) {
                    "dark"
                } else {
                    "-"
                };
                println!("{}\t{}", verdict, url);
            }
        }
    }

    manager.shutdown();
    Ok(())
}

fn print_stats(manager: &ConfigManager) -> Result<(), Box<dyn std::error::Error>> {
    for category in RuleCategory::ALL {
        let status = match manager.state(category) {
            CategoryStatus::Failed(reason) => format!("failed: {}", reason),
            other => format!("{:?}", other).to_lowercase(),
        };
        println!("{} ({})", category.display_name(), status);

        if let Some(stats) = manager.index_stats(category) {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        if category == RuleCategory::ColorSchemes {
            if let Some(schemes) = manager.color_schemes() {
                println!(
                    "  {} schemes ({} light, {} dark)",
                    schemes.len(),
                    schemes.light.len(),
                    schemes.dark.len()
                );
            }
        }
    }
    Ok(())
}
