use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use stock_tag::config::{self, AppConfig};
use stock_tag::generator::TagRequest;
use stock_tag::inventory::Inventory;
use stock_tag::session::ScanOutcome;
use stock_tag::web::{self, AppState};
use stock_tag::{TagError, generator::CodeGenerator, telemetry};
use tag_scale::presets::PreviewPreset;

/// Clothing inventory tagging:
/// - register garments and render their QR tags
/// - scan tags back from a camera, snapshot URL or image folder
#[derive(Parser, Debug)]
#[command(name = "stock-tag", version)]
#[command(about = "🏷️ Generate and read QR tags for clothing stock")]
#[command(long_about = "Generate QR tags for clothing stock and read them back from a camera.
Run `serve` for the web interface, or use `generate` and `scan` from the terminal.")]
struct Args {
    /// Config file (defaults to ./stock-tag.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, help = "error, warn, info, debug or trace")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the web interface
    Serve {
        /// Listen address, e.g. 0.0.0.0:5000
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Render one tag into the static directory
    Generate {
        #[arg(long)]
        product: String,
        #[arg(long, help = "P, M, G, GG, XG or XGG")]
        size: String,
        #[arg(long)]
        color: String,
        #[arg(long)]
        fabric: String,
        #[arg(long)]
        price: String,
    },
    /// Scan until a tag is read and print its payload
    Scan {
        /// Source: camera:<n>, http(s)://snapshot-url or frames:<dir>
        #[arg(long)]
        camera: Option<String>,

        /// Give up after this long: 30s, 2m, 1h
        #[arg(short, long, default_value = "30s",
              help = "How long to look for a tag: 30s (30 seconds), 2m (2 minutes), 0 (no limit)")]
        timeout: String,

        /// Preview size
        #[arg(short, long, value_enum, default_value = "large")]
        preview: PreviewPreset,

        /// Keep the latest preview JPEG at this path
        #[arg(long)]
        save_preview: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, sources) = config::load(args.config.as_deref())?;
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    telemetry::init(&config.log_level)?;
    tracing::debug!(files = ?sources.files, env = ?sources.env_overrides, "configuration loaded");

    match args.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            config.validate()?;
            let state = Arc::new(AppState::new(config)?);
            web::serve(state).await
        }
        Command::Generate {
            product,
            size,
            color,
            fabric,
            price,
        } => {
            let request = TagRequest {
                product,
                size,
                color,
                fabric,
                price,
            };
            generate(&config, &request)
        }
        Command::Scan {
            camera,
            timeout,
            preview,
            save_preview,
        } => {
            if let Some(camera) = camera {
                config.scan.camera = camera;
            }
            config.scan.preview_max_side = preview.max_side().unwrap_or(0);
            config.validate()?;
            let timeout = match parse_duration(&timeout)? {
                0 => None,
                seconds => Some(Duration::from_secs(seconds)),
            };
            scan(&config, timeout, save_preview).await
        }
    }
}

fn generate(config: &AppConfig, request: &TagRequest) -> Result<()> {
    let generator = CodeGenerator::new(config.server.static_dir.clone(), Arc::new(Inventory::new()))?
        .with_tag_side(config.server.tag_side);
    match generator.generate(request) {
        Ok(tag) => {
            println!("QR Code gerado com sucesso!");
            println!("{}", tag.path.display());
            println!("{}", tag.payload);
            Ok(())
        }
        Err(e) => Err(user_facing(e)),
    }
}

async fn scan(config: &AppConfig, timeout: Option<Duration>, save_preview: Option<PathBuf>) -> Result<()> {
    let mut frames = 0u64;
    let outcome = stock_tag::scan_once(config, timeout, |preview| {
        frames += 1;
        if let Some(path) = &save_preview {
            if let Err(e) = std::fs::write(path, &preview.jpeg) {
                tracing::warn!(path = %path.display(), error = %e, "preview not saved");
            }
        }
    })
    .await
    .map_err(user_facing)?;

    match outcome {
        ScanOutcome::Found(payload) => {
            tracing::info!(frames, "tag read");
            println!("Informações do QR code: {}", payload);
            Ok(())
        }
        ScanOutcome::Cancelled => Err(anyhow::anyhow!("scan cancelled after {} frames", frames)),
        ScanOutcome::DeviceUnavailable(e) => Err(user_facing(e).context("Erro ao acessar a câmera")),
    }
}

fn user_facing(error: TagError) -> anyhow::Error {
    let message = error.user_message();
    anyhow::Error::new(error).context(message)
}

/// Parse duration string like "30s", "2m", "1h" into seconds
fn parse_duration(duration: &str) -> Result<u64> {
    if let Ok(seconds) = duration.parse::<u64>() {
        return Ok(seconds);
    }

    let len = duration.len();
    if len < 2 {
        return Err(anyhow::anyhow!("Invalid duration format: {}", duration));
    }

    let (num_str, unit) = duration.split_at(len - 1);
    let num: u64 = num_str
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid number in duration: {}", num_str))?;

    let factor = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => {
            return Err(anyhow::anyhow!(
                "Invalid duration unit: {}. Use 's' for seconds, 'm' for minutes, 'h' for hours",
                unit
            ));
        }
    };

    num.checked_mul(factor)
        .ok_or_else(|| anyhow::anyhow!("Duration too large: {}", duration))
}
