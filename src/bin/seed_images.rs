use std::path::PathBuf;

use anyhow::{Context, Result};
use breaddie::{
    backend::SupabaseClient,
    config::ConfigLoader,
    seed::{self, SeedData},
    telemetry,
    urls::{RECIPE_IMAGES_BUCKET, StorageUrls},
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "breaddie-seed", about = "Seed and inspect storage buckets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload the avatar and recipe images referenced by the seed data
    Upload {
        /// Seed data file
        #[arg(long = "seed", default_value = "supabase/seed-recipes.json")]
        seed_file: PathBuf,

        /// Directory containing public/users and public/recipes
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Leave objects that already exist in storage untouched
        #[arg(long)]
        no_overwrite: bool,
    },

    /// List bucket contents and probe a public image URL
    Check {
        /// Object in the recipe image bucket to fetch anonymously
        #[arg(long, default_value = "f0f1f2f3-f4f5-f6f7-f8f9-fafbfcfdfeff-thumbnail.png")]
        probe: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new().load().context("loading configuration")?;
    telemetry::init_tracing(&config).context("initializing tracing")?;
    let storage = SupabaseClient::from_config(&config).context("building storage client")?;

    match cli.command {
        Command::Upload {
            seed_file,
            root,
            no_overwrite,
        } => {
            let raw = tokio::fs::read_to_string(&seed_file)
                .await
                .with_context(|| format!("reading {}", seed_file.display()))?;
            let data: SeedData = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", seed_file.display()))?;

            let plan = seed::plan_uploads(&data, &root);
            let report = seed::upload_images(&storage, &plan, !no_overwrite).await;
            println!(
                "uploaded {}, overwritten {}, already present {}, missing locally {}, failed {}",
                report.uploaded,
                report.overwritten,
                report.skipped_existing,
                report.skipped_missing,
                report.failed
            );
        }
        Command::Check { probe } => {
            for (bucket, listing) in seed::list_buckets(&storage).await {
                match listing {
                    Ok(files) if files.is_empty() => println!("{bucket}: no files"),
                    Ok(files) => {
                        println!("{bucket}: {} files", files.len());
                        for file in files {
                            let size = file
                                .size()
                                .map_or_else(|| "unknown size".to_string(), |s| format!("{s} bytes"));
                            println!("  - {} ({size})", file.name);
                        }
                    }
                    Err(err) => println!("{bucket}: error listing bucket: {err}"),
                }
            }

            let url = StorageUrls::new(config.supabase_url.clone(), false)
                .public_object(RECIPE_IMAGES_BUCKET, &probe);
            println!("probing {url}");
            match reqwest::get(&url).await {
                Ok(response) if response.status().is_success() => {
                    println!("{}: image accessible", response.status())
                }
                Ok(response) => println!("{}: image not accessible", response.status()),
                Err(err) => println!("request failed: {err}"),
            }
        }
    }

    Ok(())
}
