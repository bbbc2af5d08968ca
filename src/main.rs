use clap::{ArgAction, Parser};
use image::Rgb;
use imgtool::config::{self, ToolConfig};
use imgtool::imaging::RustCodec;
use imgtool::output;
use imgtool::pipeline::{PipelineBuilder, PipelineError, Report};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, debug};

fn version_string() -> &'static str {
    let on_tag = env!("IMGTOOL_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("IMGTOOL_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "imgtool")]
#[command(about = "Resize, watermark and re-encode a single image")]
#[command(long_about = "\
Resize, watermark and re-encode a single image

The output format follows the output file's extension. Without an output
file, the result is written next to the input with a suffix added:

  imgtool photo.jpg -p 50              # → photo_edited.jpg at half size
  imgtool photo.jpg -w 800 out.webp    # 800px wide, height from aspect ratio
  imgtool photo.jpg -t '(c) 2024' -r   # tile a watermark over the image
  imgtool photo.jpg -p 25 -n           # report the result, write nothing

Defaults can be kept in a TOML file passed with --config. Run
'imgtool --print-config' for a documented template.")]
#[command(version = version_string())]
struct Cli {
    /// Image to read
    #[arg(required_unless_present = "print_config")]
    input: Option<PathBuf>,

    /// Where to write the result (default: input name plus suffix)
    output: Option<PathBuf>,

    /// Target width in pixels (0 = keep aspect ratio from height)
    #[arg(short, long, default_value_t = 0)]
    width: u32,

    /// Target height in pixels (0 = keep aspect ratio from width)
    #[arg(short = 'H', long, default_value_t = 0)]
    height: u32,

    /// Scale in percent of the source; overrides width and height (negative = unset)
    #[arg(short, long, value_name = "PERCENT", allow_negative_numbers = true)]
    pct_scale: Option<f64>,

    /// Lossy encode quality, 1-100 [default: 85]
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Suffix for the derived output name [default: _edited]
    #[arg(short, long)]
    suffix: Option<String>,

    /// Watermark text
    #[arg(short, long)]
    text: Option<String>,

    /// Watermark opacity, 0-1 [default: 0.7]
    #[arg(short, long, allow_hyphen_values = true)]
    opacity: Option<String>,

    /// Tile the watermark across the whole image
    #[arg(short, long)]
    replicate: bool,

    /// Dry run: process and report, but write nothing
    #[arg(short = 'n', long = "no-op")]
    no_op: bool,

    /// Increase log detail (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbosity: u8,

    /// TOML file with default settings
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print a documented imgtool.toml and exit
    #[arg(long)]
    print_config: bool,

    /// Watermark color as R,G,B [default: 255,255,255]
    #[arg(long, value_parser = parse_color)]
    color: Option<Rgb<u8>>,

    /// Watermark font family [default: sans-serif]
    #[arg(long, value_name = "FAMILY")]
    font: Option<String>,

    /// Watermark font size in points [default: 12]
    #[arg(long, value_name = "PT")]
    font_size: Option<f32>,
}

/// Parse `R,G,B` into a color.
fn parse_color(s: &str) -> Result<Rgb<u8>, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let &[r, g, b] = parts.as_slice() else {
        return Err(format!("expected R,G,B, got '{s}'"));
    };
    let channel = |v: &str| {
        v.parse::<u8>()
            .map_err(|_| format!("color channel '{v}' is not 0-255"))
    };
    Ok(Rgb([channel(r)?, channel(g)?, channel(b)?]))
}

fn log_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if cli.print_config {
        print!("{}", config::stock_config_toml());
        return ExitCode::SUCCESS;
    }

    match run(cli) {
        Ok(report) => {
            output::print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("imgtool: error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Report, PipelineError> {
    let tool_config = config::load_config(cli.config.as_deref())?;
    let pipeline = builder_from_cli(cli, &tool_config)?.build()?;
    debug!(config = ?pipeline.config(), "pipeline configured");
    pipeline.run(&RustCodec::new())
}

/// Layer command-line flags over the loaded config.
fn builder_from_cli(cli: Cli, tool_config: &ToolConfig) -> Result<PipelineBuilder, PipelineError> {
    let input = cli
        .input
        .ok_or_else(|| PipelineError::Argument("no input file given".into()))?;

    let mut builder = PipelineBuilder::from_config(input, tool_config)
        .width(cli.width)
        .height(cli.height)
        .dry_run(cli.no_op);

    if let Some(output) = cli.output {
        builder = builder.output(output);
    }
    if let Some(percent) = cli.pct_scale {
        builder = builder.pct_scale(percent / 100.0);
    }
    if let Some(quality) = cli.quality {
        builder = builder.quality(quality);
    }
    if let Some(suffix) = &cli.suffix {
        builder = builder.suffix(suffix);
    }
    if let Some(text) = cli.text {
        builder = builder.watermark(text);
    }
    if let Some(opacity) = &cli.opacity {
        builder = builder.opacity_input(opacity);
    }
    if cli.replicate {
        builder = builder.replicate(true);
    }
    if let Some(color) = cli.color {
        builder = builder.color(color);
    }
    if let Some(font) = &cli.font {
        builder = builder.font(font);
    }
    if let Some(size) = cli.font_size {
        builder = builder.font_size(size);
    }

    Ok(builder)
}
