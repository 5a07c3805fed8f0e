use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "resurface", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw an image into a canvas, lose the context, restore, and write the result.
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Input image (PNG or any format the decoder detects).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path for the restored canvas.
    #[arg(long)]
    out: PathBuf,

    /// Graphics options JSON. Falls back to environment overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Make the canvas volatile (it restores empty).
    #[arg(long, default_value_t = false)]
    volatile: bool,

    /// Canvas margin around the drawn image, in pixels.
    #[arg(long, default_value_t = 8)]
    margin: u32,
}

#[derive(serde::Serialize, Debug)]
struct SimulateReport {
    input: PathBuf,
    output: PathBuf,
    width: u32,
    height: u32,
    volatile: bool,
    pending_draws: usize,
    stats: Option<resurface::RestoreStats>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Simulate(args) => cmd_simulate(args),
    }
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let opts = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read config '{}'", path.display()))?;
            resurface::GraphicsOpts::from_json(&text)?
        }
        None => resurface::GraphicsOpts {
            restore: resurface::RestoreOpts::from_env(),
        },
    };

    let decoded = resurface::load_image(&args.in_path)?;
    let backend = Arc::new(resurface::SoftwareBackend::new(
        resurface::SoftwareBackendOpts::default(),
    ));
    let graphics = resurface::Graphics::new(backend.clone(), opts);

    let source = graphics.new_image_from_dynamic(&decoded, resurface::Filter::Nearest)?;
    let (src_w, src_h) = source.size();
    let width = src_w + 2 * args.margin;
    let height = src_h + 2 * args.margin;
    let canvas = if args.volatile {
        graphics.new_volatile_image(width, height, resurface::Filter::Nearest)?
    } else {
        graphics.new_image(width, height, resurface::Filter::Nearest)?
    };

    canvas.fill(resurface::Rgba8Premul::opaque(32, 32, 32))?;
    let margin = f64::from(args.margin);
    canvas.draw_image(&source, &resurface::DrawImageOptions::at(margin, margin))?;
    let pending_draws = canvas.store().history_len();

    backend.reset_context();
    let stats = graphics.restore_if_needed()?;

    let pixels = canvas.read_pixels()?;
    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &pixels,
        width,
        height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    let report = SimulateReport {
        input: args.in_path,
        output: args.out,
        width,
        height,
        volatile: args.volatile,
        pending_draws,
        stats,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
