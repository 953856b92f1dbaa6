use clap::Args;
use coalesced_bin::{detect::DETECT_LENGTH, Direction};
use coalesced_ini::{CoalescedFormat, Document};
use miette::{miette, Context, IntoDiagnostic, Result};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::commands::output::{self, WriteOptions};

#[derive(Args)]
pub struct ConvertArgs {
    /// An input archive or text export
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Write the result here instead of next to the input
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Use this format instead of detecting it
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<CoalescedFormat>,

    /// Do all processing but write nothing
    #[arg(short, long, default_value_t = false)]
    what_if: bool,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Replace a binary target without keeping a copy of it first
    #[arg(long, default_value_t = false)]
    no_backup: bool,
}

impl ConvertArgs {
    #[instrument(skip_all, fields(input = %self.input.display()))]
    pub fn handle(&self, direction: Option<Direction>) -> Result<()> {
        let data = std::fs::read(&self.input)
            .into_diagnostic()
            .context(format!("path: {}", self.input.display()))?;

        let (direction, format) = resolve(&self.input, &data, direction, self.format)?;
        info!(?direction, "converting {}", self.input.display());

        let (target, bytes) = match direction {
            Direction::ToText => {
                let format = format.ok_or_else(|| unknown_format(&self.input))?;
                let document = coalesced_bin::decode(format, data.as_slice())
                    .context(format!("decoding {} as {format}", self.input.display()))?;

                let target = self.target(|| output::text_path(&self.input));
                (target, document.save(Vec::new())?)
            }
            Direction::ToBinary => {
                let document = load_text(&data, format)
                    .context(format!("reading {}", self.input.display()))?;

                let mut bytes = Vec::new();
                coalesced_bin::encode(&document, &mut bytes)
                    .context(format!("encoding {} as {}", self.input.display(), document.format))?;

                let target = self.target(|| output::binary_path(&self.input, document.format));
                (target, bytes)
            }
        };

        output::write_target(
            &target,
            &bytes,
            WriteOptions {
                what_if: self.what_if,
                overwrite: self.overwrite,
                backup: !self.no_backup && direction == Direction::ToBinary,
            },
        )
    }

    fn target(&self, default: impl FnOnce() -> PathBuf) -> PathBuf {
        self.out.clone().unwrap_or_else(default)
    }
}

/// Settle the direction and format of `data`, preferring what was asked for over what was detected.
///
/// Text keeps its format in its header, so the format may stay unknown when converting to binary.
pub fn resolve(
    path: &Path,
    data: &[u8],
    direction: Option<Direction>,
    format: Option<CoalescedFormat>,
) -> Result<(Direction, Option<CoalescedFormat>)> {
    let detected = coalesced_bin::detect(&data[..data.len().min(DETECT_LENGTH)]);

    let direction = direction
        .or(detected.map(|d| d.direction))
        .ok_or_else(|| unknown_format(path))?;

    let format = format.or(detected
        .filter(|d| d.direction == direction)
        .map(|d| d.format));

    Ok((direction, format))
}

/// Read a text export, as `format` when one is forced
pub fn load_text(data: &[u8], format: Option<CoalescedFormat>) -> Result<Document> {
    let document = match format {
        Some(format) => Document::load_as(data, format)?,
        None => Document::load(data)?,
    };
    Ok(document)
}

fn unknown_format(path: &Path) -> miette::Report {
    miette!(
        help = "pass --format with one of compact, legacy or compressed",
        "unable to detect the format of {}",
        path.display()
    )
}
