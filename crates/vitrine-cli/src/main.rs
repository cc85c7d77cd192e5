//! Vitrine CLI: runs local image files through an upload profile.
//!
//! Pipeline settings come from VITRINE_* environment variables (or `.env`);
//! flags given on the command line take precedence.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use vitrine_cli::{init_tracing, load_source, DirectorySink};
use vitrine_core::{CropSettings, PipelineConfig, ProfileRegistry, QualityPolicy};
use vitrine_processing::{CenteredCrop, CropPrompt, DeclineCrop, UploadPipeline};

#[derive(Parser)]
#[command(name = "vitrine", about = "Validate, crop and compress product images")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the built-in upload profiles as JSON
    Profiles,
    /// Process image files with an upload profile
    Process {
        /// Profile id: product, avatar, banner, logo, gallery or default
        #[arg(long, default_value = "default")]
        profile: String,
        /// Directory receiving the outputs and manifest.json
        #[arg(long)]
        out: PathBuf,
        /// Crop rectangle applied to every file, as x,y,width,height
        #[arg(long, conflicts_with = "auto_crop")]
        crop: Option<CropSettings>,
        /// Confirm a centered crop whenever the profile asks for one
        #[arg(long)]
        auto_crop: bool,
        /// Quality policy: profile or size-heuristic
        #[arg(long)]
        quality_policy: Option<String>,
        /// Image files to process
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let registry = ProfileRegistry::builtin().context("Failed to build profile registry")?;

    match cli.command {
        Commands::Profiles => {
            let profiles: Vec<_> = registry.iter().collect();
            print_json(&profiles)?;
        }
        Commands::Process {
            profile,
            out,
            crop,
            auto_crop,
            quality_policy,
            files,
        } => {
            let mut config = PipelineConfig::from_env().context("Invalid pipeline configuration")?;
            if let Some(policy) = quality_policy {
                config.quality_policy = QualityPolicy::parse(&policy)?;
            }

            let profile = registry.resolve(&profile).clone();
            let prompt: Arc<dyn CropPrompt> = if auto_crop {
                Arc::new(CenteredCrop)
            } else {
                Arc::new(DeclineCrop)
            };

            let mut sources = Vec::with_capacity(files.len());
            for path in &files {
                sources.push(load_source(path).await?);
            }

            tracing::info!(
                profile = %profile.id(),
                files = sources.len(),
                quality_policy = ?config.quality_policy,
                "Processing files"
            );

            let mut pipeline = UploadPipeline::new(profile, config, prompt);
            let ids = pipeline.add_files(sources)?;
            if let Some(crop) = crop {
                for id in ids.iter().copied() {
                    if pipeline.get(id).is_none() {
                        continue;
                    }
                    pipeline.set_crop(id, crop)?;
                }
            }

            let sink = DirectorySink::new(out);
            pipeline.finalize(&sink).await?;
            pipeline.teardown();

            println!("{}", sink.out_dir().join(vitrine_cli::MANIFEST_FILE).display());
        }
    }

    Ok(())
}
