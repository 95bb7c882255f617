//! Generate study markers and dual-exposure frame pairs.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use frame_creator::color::{adjust_brightness, mean_luminance};
use frame_creator::embed::DualExposure;
use frame_creator::marker::aruco::generate_image_marker;
use frame_creator::marker::cache::FALLBACK_ID;
use frame_creator::marker::{
    create_marker, dot, ArucoDictionary, FifoIdSource, IdSource, MarkerCache, MarkerFrame,
    MarkerSpec, MarkerType, StaticIdSource,
};
use frame_creator::sheet::{render_sheet, SheetLayout};
use image::imageops::{self, FilterType};
use image::RgbImage;
use shared::image_size::ImageSize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "frame_creator")]
#[command(author, version, about = "Marker and dual-exposure frame generator")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a QR, dot or ArUco marker frame
    Marker(MarkerArgs),

    /// Write a single ArUco tag and optionally the overlay sheet
    Aruco {
        /// Tag dictionary
        #[arg(short, long, value_enum, default_value = "4x4_1000")]
        dictionary: ArucoDictionary,

        /// Marker id
        #[arg(short, long, default_value = "1")]
        id: usize,

        /// Tag side length in pixels
        #[arg(short, long, default_value = "300")]
        size: u32,

        /// Black border width in marker bits
        #[arg(long, default_value = "1")]
        border_bits: usize,

        /// Output PNG for the single tag
        #[arg(short, long, default_value = "aruco_1.png")]
        output: PathBuf,

        /// Also write a full-HD sheet of 5x3 tags to this path
        #[arg(long)]
        sheet: Option<PathBuf>,
    },

    /// Hide a marker in a background frame as a bright/dark image pair
    Embed(EmbedArgs),

    /// Shift the HSV brightness of an image
    Brightness {
        /// Input image
        input: PathBuf,

        /// Output image
        output: PathBuf,

        /// Value added to the HSV value channel (-255..=255)
        #[arg(short, long, default_value = "30", allow_hyphen_values = true)]
        value: i16,
    },
}

#[derive(ClapArgs, Debug)]
struct MarkerArgs {
    /// Marker family
    #[arg(short = 't', long = "type", value_enum, default_value = "qr")]
    marker_type: MarkerType,

    /// Payload to encode (the marker id for ArUco)
    #[arg(short, long, required_unless_present = "window_name")]
    payload: Option<String>,

    /// Pixels per module
    #[arg(short, long, default_value = "8")]
    scale: u32,

    /// Black border around the marker in pixels
    #[arg(short, long, default_value = "4")]
    border: u32,

    /// Tile the marker over the whole window
    #[arg(short, long)]
    repeat: bool,

    /// Display window size
    #[arg(short, long, default_value = "1920x1080")]
    window: ImageSize,

    /// Dictionary for ArUco markers
    #[arg(short, long, value_enum, default_value = "4x4_1000")]
    dictionary: ArucoDictionary,

    /// Write the negative of the marker
    #[arg(long)]
    invert: bool,

    /// Build the payload from the machine id and this window name.
    /// Only the payload comes from the window cache; polarity follows --invert
    #[arg(long)]
    window_name: Option<String>,

    /// Machine id; read from the id FIFO when not given
    #[arg(long, requires = "window_name")]
    machine_id: Option<String>,

    /// FIFO the machine id is read from
    #[arg(long, default_value = "datafifo")]
    id_fifo: PathBuf,

    /// Decode a generated dot marker and compare it with the payload
    #[arg(long)]
    verify: bool,

    /// Output PNG
    #[arg(short, long, default_value = "marker.png")]
    output: PathBuf,
}

#[derive(ClapArgs, Debug)]
struct EmbedArgs {
    /// Background frame
    #[arg(short, long, default_value = "frame.png")]
    frame: PathBuf,

    /// Marker image; generated from --payload when not given
    #[arg(short, long, conflicts_with = "payload")]
    marker: Option<PathBuf>,

    /// Payload of a marker generated in-process
    #[arg(short, long)]
    payload: Option<String>,

    /// Marker family for --payload
    #[arg(short = 't', long = "type", value_enum, default_value = "qr")]
    marker_type: MarkerType,

    /// Pixels per module for --payload
    #[arg(long, default_value = "8")]
    scale: u32,

    /// Total brightness delta between the two frames
    #[arg(long, default_value = "60")]
    delta: f32,

    /// Top-left corner of the marker in the frame
    #[arg(long, default_value = "500,150", value_parser = parse_offset)]
    offset: (u32, u32),

    /// Marker resize in percent
    #[arg(long, default_value = "100")]
    marker_scale_percent: u32,

    /// First output frame
    #[arg(long, default_value = "output1.png")]
    output1: PathBuf,

    /// Second output frame
    #[arg(long, default_value = "output2.png")]
    output2: PathBuf,
}

fn parse_offset(s: &str) -> Result<(u32, u32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{s}'"))?;
    let x = x.trim().parse().map_err(|e| format!("invalid x '{x}': {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("invalid y '{y}': {e}"))?;
    Ok((x, y))
}

fn save_frame(frame: &MarkerFrame, path: &Path) -> Result<()> {
    frame
        .to_gray_image()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn cmd_marker(args: MarkerArgs) -> Result<()> {
    let spec = MarkerSpec {
        marker_type: args.marker_type,
        border_px: args.border,
        scale: args.scale,
        repeated: args.repeat,
        dictionary: args.dictionary,
        ..MarkerSpec::default()
    };

    let (payload, mut frame) = match (&args.window_name, &args.payload) {
        (Some(window), _) => {
            // Read the id once so the logged payload matches the rendered one
            let id = match &args.machine_id {
                Some(id) => id.clone(),
                None => FifoIdSource::new(&args.id_fifo)
                    .machine_id()
                    .unwrap_or_else(|e| {
                        warn!("Failed to read machine id: {e}");
                        FALLBACK_ID.to_string()
                    }),
            };
            let mut cache = MarkerCache::new(spec.clone(), args.window, StaticIdSource(id));
            (cache.payload_for(window), cache.frame_for(window)?)
        }
        (None, Some(payload)) => (
            payload.clone(),
            create_marker(payload, &spec, args.window)?,
        ),
        (None, None) => bail!("Either --payload or --window-name is required"),
    };

    if args.verify {
        if spec.marker_type != MarkerType::Dot {
            bail!("--verify is only supported for dot markers");
        }
        let decoded = dot::decode(&dot::encode(&payload)?)
            .context("Dot marker could not be decoded")?;
        if decoded != payload {
            bail!("Dot marker decoded to '{decoded}', expected '{payload}'");
        }
        info!("Dot marker verified");
    }

    // The cache hands out the negative on first use; only --invert decides here
    frame.negative = args.invert;
    save_frame(&frame, &args.output)?;
    info!(
        payload = %payload,
        size = %frame.size(),
        "Wrote marker to {}",
        args.output.display()
    );
    Ok(())
}

fn cmd_aruco(
    dictionary: ArucoDictionary,
    id: usize,
    size: u32,
    border_bits: usize,
    output: &Path,
    sheet: Option<&Path>,
) -> Result<()> {
    let tag = generate_image_marker(dictionary, id, size, border_bits)?;
    tag.save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote {dictionary} id {id} to {}", output.display());

    if let Some(path) = sheet {
        let image = render_sheet(dictionary, id, &SheetLayout::default())?;
        image
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote overlay sheet to {}", path.display());
    }
    Ok(())
}

fn load_rgb(path: &Path) -> Result<RgbImage> {
    Ok(image::open(path)
        .with_context(|| format!("Failed to read {}", path.display()))?
        .to_rgb8())
}

fn cmd_embed(args: EmbedArgs) -> Result<()> {
    let background = load_rgb(&args.frame)?;

    let marker = match (&args.marker, &args.payload) {
        (Some(path), _) => load_rgb(path)?,
        (None, Some(payload)) => {
            let spec = MarkerSpec {
                marker_type: args.marker_type,
                scale: args.scale,
                ..MarkerSpec::default()
            };
            create_marker(payload, &spec, ImageSize::of(&background))?.to_rgb_image()
        }
        (None, None) => bail!("Either --marker or --payload is required"),
    };

    let marker = if args.marker_scale_percent == 100 {
        marker
    } else {
        let width = marker.width() * args.marker_scale_percent / 100;
        let height = marker.height() * args.marker_scale_percent / 100;
        if width == 0 || height == 0 {
            bail!("Marker scale of {}% leaves no pixels", args.marker_scale_percent);
        }
        imageops::resize(&marker, width, height, FilterType::Nearest)
    };

    let exposure = DualExposure::with_delta(args.delta);
    let pair = exposure.embed_marker(&background, &marker, args.offset)?;

    for (image, path) in [(&pair.first, &args.output1), (&pair.second, &args.output2)] {
        image
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!(
            "{}: mean luminance {:.4}",
            path.display(),
            mean_luminance(image)
        );
    }
    Ok(())
}

fn cmd_brightness(input: &Path, output: &Path, value: i16) -> Result<()> {
    let image = load_rgb(input)?;
    adjust_brightness(&image, value)
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Adjusted brightness by {value}, wrote {}", output.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Marker(marker) => cmd_marker(marker),
        Command::Aruco {
            dictionary,
            id,
            size,
            border_bits,
            output,
            sheet,
        } => cmd_aruco(dictionary, id, size, border_bits, &output, sheet.as_deref()),
        Command::Embed(embed) => cmd_embed(embed),
        Command::Brightness {
            input,
            output,
            value,
        } => cmd_brightness(&input, &output, value),
    }
}
