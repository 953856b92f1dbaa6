pub mod convert;
pub mod detect;
pub mod dump;
pub mod output;

use coalesced_bin::Direction;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Export a binary archive as editable text
    Decode(convert::ConvertArgs),
    /// Build a binary archive from a text export
    Encode(convert::ConvertArgs),
    /// Convert a file in whichever direction its contents call for
    Convert(convert::ConvertArgs),
    /// Print the format of files
    Detect(detect::DetectArgs),
    /// Print a binary archive or text export as JSON
    Dump(dump::DumpArgs),
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Decode(args) => args.handle(Some(Direction::ToText)),
            Commands::Encode(args) => args.handle(Some(Direction::ToBinary)),
            Commands::Convert(args) => args.handle(None),
            Commands::Detect(args) => args.handle(),
            Commands::Dump(args) => args.handle(),
        }
    }
}
