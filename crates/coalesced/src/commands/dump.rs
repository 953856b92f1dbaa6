use clap::Args;
use coalesced_bin::Direction;
use coalesced_ini::CoalescedFormat;
use miette::{miette, Context, IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::commands::convert::{load_text, resolve};

#[derive(Args)]
pub struct DumpArgs {
    /// An input archive or text export
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Use this format instead of detecting it
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<CoalescedFormat>,

    /// Print on a single line
    #[arg(long, default_value_t = false)]
    compact: bool,
}

impl DumpArgs {
    pub fn handle(&self) -> Result<()> {
        let data = std::fs::read(&self.input)
            .into_diagnostic()
            .context(format!("path: {}", self.input.display()))?;

        let document = match resolve(&self.input, &data, None, self.format)? {
            (Direction::ToText, Some(format)) => coalesced_bin::decode(format, data.as_slice())?,
            (Direction::ToBinary, format) => load_text(&data, format)?,
            (Direction::ToText, None) => {
                return Err(miette!("unable to detect the format of {}", self.input.display()))
            }
        };

        let json = if self.compact {
            serde_json::to_string(&document)
        } else {
            serde_json::to_string_pretty(&document)
        }
        .into_diagnostic()?;

        println!("{json}");
        Ok(())
    }
}
