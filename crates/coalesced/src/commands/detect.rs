use clap::Args;
use coalesced_bin::{detect::DETECT_LENGTH, Direction};
use miette::{miette, Context, IntoDiagnostic, Result};
use owo_colors::{OwoColorize, Stream};
use std::{fs::File, io::Read, path::PathBuf};

#[derive(Args)]
pub struct DetectArgs {
    /// Files to identify
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,
}

impl DetectArgs {
    pub fn handle(&self) -> Result<()> {
        let mut unknown = 0;

        for path in &self.files {
            let mut prefix = Vec::with_capacity(DETECT_LENGTH);
            File::open(path)
                .into_diagnostic()
                .context(format!("path: {}", path.display()))?
                .take(DETECT_LENGTH as u64)
                .read_to_end(&mut prefix)
                .into_diagnostic()?;

            match coalesced_bin::detect(&prefix) {
                Some(detected) => {
                    let kind = match detected.direction {
                        Direction::ToText => "binary",
                        Direction::ToBinary => "text",
                    };
                    println!("{}: {} {kind}", path.display(), detected.format);
                }
                None => {
                    unknown += 1;
                    println!(
                        "{}: {}",
                        path.display(),
                        "unknown".if_supports_color(Stream::Stdout, |text| text.red())
                    );
                }
            }
        }

        if unknown > 0 {
            return Err(miette!("{unknown} file(s) are not coalesced archives or exports"));
        }
        Ok(())
    }
}
