use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use canvas_fx::{
    assets::{AssetManager, ImageFetcher, LocalAssetStore},
    audio::AudioEffect,
    config::Config,
    overlay::{self, parse_specs, OverlayRegistry},
    transfer::run_nst,
    video::{ClipAudioEditor, VideoClip},
};

#[derive(Parser)]
#[command(
    name = "canvas-fx",
    version,
    about = "Overlays, clip audio effects and neural style transfer",
    long_about = "canvas-fx stamps text, watermarks and emojis onto images, applies volume, normalization and fade effects to video soundtracks, and repaints photos in the style of another image with neural style transfer."
)]
struct Cli {
    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Repaint a content image in the style of another image
    Stylize {
        /// Content image (path, file:// or http(s):// URL)
        #[arg(long)]
        content: String,

        /// Style image (path, file:// or http(s):// URL)
        #[arg(long)]
        style: String,

        /// Output image path
        #[arg(short, long)]
        output: PathBuf,

        /// Number of optimizer iterations (overrides the config)
        #[arg(short, long)]
        iterations: Option<usize>,

        /// Pretrained VGG19 weights (overrides the config)
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Publish intermediate snapshots to the asset store
        #[arg(long)]
        snapshots: bool,
    },

    /// Apply a named overlay (text, emoji) with a JSON parameter list
    Overlay {
        /// Input image
        #[arg(short, long)]
        input: PathBuf,

        /// Overlay name
        #[arg(short, long)]
        name: String,

        /// Parameters as a JSON array, e.g. '["Hi", "DejaVuSans.ttf", 32, [10, 10], [255, 255, 255]]'
        #[arg(short, long)]
        specs: String,

        /// Output image path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Stamp a watermark image onto an image
    Watermark {
        /// Input image
        #[arg(short, long)]
        input: PathBuf,

        /// Watermark image (path, file:// or http(s):// URL)
        #[arg(short, long)]
        watermark: String,

        /// Parameters as a JSON array: '[[x, y], size, opacity]'
        #[arg(short, long)]
        specs: String,

        /// Output image path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Apply an audio effect to a video clip
    Audio {
        /// Input video clip
        #[arg(short, long)]
        input: PathBuf,

        /// Output video clip
        #[arg(short, long)]
        output: PathBuf,

        /// Multiply the volume by this factor
        #[arg(long, conflicts_with_all = ["normalize", "fade_in", "fade_out"])]
        volume: Option<f32>,

        /// Normalize the peak to full scale
        #[arg(long, conflicts_with_all = ["fade_in", "fade_out"])]
        normalize: bool,

        /// Fade in duration in seconds
        #[arg(long)]
        fade_in: Option<f64>,

        /// Fade out duration in seconds
        #[arg(long)]
        fade_out: Option<f64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    info!("Starting canvas-fx v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => Config::default(),
    };
    config.validate()?;

    match cli.command {
        Commands::Stylize {
            content,
            style,
            output,
            iterations,
            weights,
            snapshots,
        } => {
            let mut config = config;
            if let Some(iterations) = iterations {
                config.transfer.iterations = iterations;
            }
            if let Some(weights) = weights {
                config.transfer.weights_path = Some(weights);
            }

            let store = LocalAssetStore::from_config(&config.assets);
            let assets: Option<&dyn AssetManager> = if snapshots { Some(&store) } else { None };

            let result = run_nst(&content, &style, assets, &config).map_err(|e| anyhow::anyhow!(e.user_message()))?;
            result
                .image
                .save(&output)
                .with_context(|| format!("Failed to save {:?}", output))?;

            for url in &result.snapshot_urls {
                info!("Snapshot: {}", url);
            }
            info!("Stylized image saved to: {:?}", output);
        }

        Commands::Overlay {
            input,
            name,
            specs,
            output,
        } => {
            let image = image::open(&input).with_context(|| format!("Failed to open {:?}", input))?;
            let specs = parse_specs(&specs)?;

            let registry = OverlayRegistry::new(&config.overlay);
            let result = registry
                .apply(&name, &image, &specs)
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;

            overlay::store_image(&result, &output)?;
            info!("Saved {:?}", output);
        }

        Commands::Watermark {
            input,
            watermark,
            specs,
            output,
        } => {
            let image = image::open(&input).with_context(|| format!("Failed to open {:?}", input))?;
            let watermark_path = ImageFetcher::from_config(&config.assets).resolve(&watermark)?;
            let watermark = image::open(&watermark_path)
                .with_context(|| format!("Failed to open {:?}", watermark_path))?;
            let specs = parse_specs(&specs)?;

            let result = overlay::try_add_watermark_image(&image, &watermark, &specs)?;
            overlay::store_image(&result, &output)?;
            info!("Saved {:?}", output);
        }

        Commands::Audio {
            input,
            output,
            volume,
            normalize,
            fade_in,
            fade_out,
        } => {
            let effect = match (volume, normalize, fade_in, fade_out) {
                (Some(factor), _, _, _) => AudioEffect::Volume(factor),
                (None, true, _, _) => AudioEffect::Normalize,
                (None, false, None, None) => {
                    anyhow::bail!("Choose an effect: --volume, --normalize, --fade-in or --fade-out")
                }
                (None, false, fade_in, fade_out) => AudioEffect::Fade {
                    fade_in: fade_in.unwrap_or(0.0),
                    fade_out: fade_out.unwrap_or(0.0),
                },
            };

            let mut editor = ClipAudioEditor::new(&config.audio)?;
            editor
                .apply(&VideoClip::new(&input), effect, &output)
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            info!("Saved {:?}", output);
        }
    }

    Ok(())
}
