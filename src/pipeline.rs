//! Single-image finishing pipeline.
//!
//! ```text
//! Init → Loaded → (Resized) → (Watermarked) → Encoded → (Written | DryRun) → Done
//! ```
//!
//! A [`Pipeline`] is built once through [`PipelineBuilder`] and is immutable
//! afterwards. [`Pipeline::run`] borrows it together with an
//! [`ImageCodec`], moves the image by value through each stage, and returns a
//! [`Report`] describing what happened. The first failing stage aborts the
//! run; images held by earlier stages are dropped on the way out.
//!
//! Encoding always completes before anything touches the output path, and a
//! dry run encodes as usual so the report can show the real output size.

use crate::config::{ConfigError, ToolConfig};
use crate::imaging::{
    CodecError, CompositeError, DimensionSpec, EncodeParams, ImageCodec, Opacity, Quality,
    WatermarkSpec, apply_watermark, plan_resize, resolve_dimensions,
};
use crate::naming::{NamingError, derive_output_path};
use image::{ImageFormat, Rgb};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid arguments: {0}")]
    Argument(String),
    #[error("Cannot load {path}: {reason}")]
    Resource { path: PathBuf, reason: String },
    #[error("Watermark failed: {0}")]
    Composite(#[from] CompositeError),
    #[error("Encoding failed: {0}")]
    Encode(String),
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<NamingError> for PipelineError {
    fn from(e: NamingError) -> Self {
        PipelineError::Argument(e.to_string())
    }
}

impl From<ConfigError> for PipelineError {
    fn from(e: ConfigError) -> Self {
        PipelineError::Argument(e.to_string())
    }
}

/// A step the pipeline has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Loaded,
    Resized,
    Watermarked,
    Encoded,
    Written,
    DryRun,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Loaded => "loaded",
            Stage::Resized => "resized",
            Stage::Watermarked => "watermarked",
            Stage::Encoded => "encoded",
            Stage::Written => "written",
            Stage::DryRun => "dry-run",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_dimensions: (u32, u32),
    pub output_dimensions: (u32, u32),
    /// Size of the input file on disk.
    pub input_bytes: u64,
    /// Size of the encoded output, whether or not it was written.
    pub output_bytes: u64,
    pub dry_run: bool,
    /// Stages visited, in order.
    pub stages: Vec<Stage>,
}

/// Immutable description of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub dimensions: DimensionSpec,
    /// `None` skips the watermark stage.
    pub watermark: Option<WatermarkSpec>,
    pub dry_run: bool,
}

/// Collects options for a [`Pipeline`].
///
/// Every setter has a stock default, so only the input path is required.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    input: PathBuf,
    output: Option<PathBuf>,
    suffix: String,
    dimensions: DimensionSpec,
    watermark: WatermarkSpec,
    stamp: bool,
    dry_run: bool,
}

impl PipelineBuilder {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            suffix: "_edited".to_string(),
            dimensions: DimensionSpec::default(),
            watermark: WatermarkSpec::new(""),
            stamp: false,
            dry_run: false,
        }
    }

    /// Start from the values in a loaded config file.
    pub fn from_config(input: impl Into<PathBuf>, config: &ToolConfig) -> Self {
        let [r, g, b] = config.watermark.color;
        Self::new(input)
            .suffix(&config.output.suffix)
            .quality(config.output.quality)
            .opacity(config.watermark.opacity)
            .replicate(config.watermark.replicate)
            .color(Rgb([r, g, b]))
            .font(&config.watermark.font)
            .font_size(config.watermark.font_size)
            .font_file(config.watermark.font_file.clone())
    }

    /// Explicit output path. Without one, the path is derived from the input
    /// and the suffix.
    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.to_string();
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.dimensions.width = width;
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.dimensions.height = height;
        self
    }

    /// Scale as a fraction of the source (`0.5` = half). Overrides width and
    /// height when positive.
    pub fn pct_scale(mut self, fraction: f64) -> Self {
        self.dimensions.pct_scale = fraction;
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.dimensions.quality = Quality::new(quality);
        self
    }

    /// Enable the watermark stage with `text`. Empty text still runs the
    /// blend with a blank mask.
    pub fn watermark(mut self, text: impl Into<String>) -> Self {
        self.watermark.text = text.into();
        self.stamp = true;
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.watermark.opacity = Opacity::new(opacity);
        self
    }

    /// Set opacity from raw user input. Non-numeric input is logged and
    /// ignored, keeping the current value.
    pub fn opacity_input(mut self, input: &str) -> Self {
        let (opacity, accepted) = self.watermark.opacity.parse_or_keep(input);
        if !accepted {
            warn!(
                input,
                kept = opacity.value(),
                "ignoring non-numeric opacity"
            );
        }
        self.watermark.opacity = opacity;
        self
    }

    pub fn replicate(mut self, replicate: bool) -> Self {
        self.watermark.replicate = replicate;
        self
    }

    pub fn color(mut self, color: Rgb<u8>) -> Self {
        self.watermark.color = color;
        self
    }

    pub fn font(mut self, family: &str) -> Self {
        self.watermark.font_family = family.to_string();
        self
    }

    pub fn font_size(mut self, points: f32) -> Self {
        self.watermark.font_size = points;
        self
    }

    pub fn font_file(mut self, path: Option<PathBuf>) -> Self {
        self.watermark.font_file = path;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Resolve the output path and freeze the configuration.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        if self.input.as_os_str().is_empty() {
            return Err(PipelineError::Argument("no input file given".into()));
        }
        if !(self.watermark.font_size.is_finite() && self.watermark.font_size > 0.0) {
            return Err(PipelineError::Argument(format!(
                "font size must be positive, got {}",
                self.watermark.font_size
            )));
        }

        let output = match self.output {
            Some(path) if path.as_os_str().is_empty() => {
                return Err(PipelineError::Argument("output path is empty".into()));
            }
            Some(path) => path,
            None => derive_output_path(&self.input, &self.suffix)?,
        };

        Ok(Pipeline {
            config: PipelineConfig {
                input: self.input,
                output,
                dimensions: self.dimensions,
                watermark: self.stamp.then_some(self.watermark),
                dry_run: self.dry_run,
            },
        })
    }
}

/// A configured, ready-to-run pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage against `codec`.
    pub fn run(&self, codec: &impl ImageCodec) -> Result<Report, PipelineError> {
        let cfg = &self.config;
        let mut stages = vec![Stage::Init];
        debug!(input = %cfg.input.display(), output = %cfg.output.display(), "pipeline start");

        let resource_error = |reason: String| PipelineError::Resource {
            path: cfg.input.clone(),
            reason,
        };

        // Load
        let bytes = fs::read(&cfg.input).map_err(|e| resource_error(e.to_string()))?;
        let input_bytes = bytes.len() as u64;
        let mut image = codec
            .decode(&bytes)
            .map_err(|e| resource_error(e.to_string()))?;
        drop(bytes);
        let input_dimensions = (image.width(), image.height());
        enter(&mut stages, Stage::Loaded);
        info!(
            width = input_dimensions.0,
            height = input_dimensions.1,
            bytes = input_bytes,
            "loaded {}",
            cfg.input.display()
        );

        // Resize
        let target = resolve_dimensions(input_dimensions, &cfg.dimensions);
        if let Some((width, height)) = plan_resize(input_dimensions, target) {
            image = codec
                .resize(image, width, height)
                .map_err(|e| resize_error(&cfg.input, e))?;
            enter(&mut stages, Stage::Resized);
            info!(width, height, "resized");
        }

        // Watermark
        if let Some(spec) = &cfg.watermark {
            image = apply_watermark(codec, image, spec)?;
            enter(&mut stages, Stage::Watermarked);
            info!(
                opacity = spec.opacity.value(),
                replicate = spec.replicate,
                "watermarked"
            );
        }

        // Encode
        let format = output_format(&cfg.output)?;
        let params = EncodeParams {
            format,
            quality: cfg.dimensions.quality,
        };
        let output_dimensions = (image.width(), image.height());
        let encoded = codec
            .encode(&image, &params)
            .map_err(|e| PipelineError::Encode(e.to_string()))?;
        drop(image);
        enter(&mut stages, Stage::Encoded);
        info!(format = ?format, bytes = encoded.len(), "encoded");

        // Write
        if cfg.dry_run {
            enter(&mut stages, Stage::DryRun);
            info!("dry run, not writing {}", cfg.output.display());
        } else {
            fs::write(&cfg.output, &encoded).map_err(|source| PipelineError::Write {
                path: cfg.output.clone(),
                source,
            })?;
            enter(&mut stages, Stage::Written);
            info!("wrote {}", cfg.output.display());
        }

        enter(&mut stages, Stage::Done);

        Ok(Report {
            input: cfg.input.clone(),
            output: cfg.output.clone(),
            input_dimensions,
            output_dimensions,
            input_bytes,
            output_bytes: encoded.len() as u64,
            dry_run: cfg.dry_run,
            stages,
        })
    }
}

fn enter(stages: &mut Vec<Stage>, stage: Stage) {
    debug!(%stage, "stage reached");
    stages.push(stage);
}

fn resize_error(input: &Path, e: CodecError) -> PipelineError {
    PipelineError::Resource {
        path: input.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Encoder format for `path`, from its extension.
fn output_format(path: &Path) -> Result<ImageFormat, PipelineError> {
    ImageFormat::from_path(path).map_err(|_| {
        PipelineError::Encode(format!(
            "unsupported output format for {}",
            path.display()
        ))
    })
}
