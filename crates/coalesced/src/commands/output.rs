//! Naming and writing of conversion results

use coalesced_ini::CoalescedFormat;
use miette::{miette, Context, IntoDiagnostic, Result};
use owo_colors::{OwoColorize, Stream};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Suffix of the stem of text exports
pub const EXPORT_SUFFIX: &str = "-export";

/// Suffix of the stem of backups
pub const BACKUP_SUFFIX: &str = "-backup";

/// Suffix used when an encoded archive would replace its own text
pub const COALESCED_SUFFIX: &str = "-coalesced";

#[derive(Debug, Default, Copy, Clone)]
pub struct WriteOptions {
    /// Only report what would be written
    pub what_if: bool,

    /// Replace an existing target even without a backup
    pub overwrite: bool,

    /// Keep a copy of an existing target before replacing it
    pub backup: bool,
}

/// `<stem>-export.ini` beside `input`
pub fn text_path(input: &Path) -> PathBuf {
    input.with_file_name(format!("{}{EXPORT_SUFFIX}.ini", file_stem(input)))
}

/// The archive a text export came from: `-export` is dropped from the stem and the extension of
/// `format` is used, unless that names `input` itself.
pub fn binary_path(input: &Path, format: CoalescedFormat) -> PathBuf {
    let stem = file_stem(input);
    let stem = stem.strip_suffix(EXPORT_SUFFIX).unwrap_or(&*stem);
    let extension = format.extension();

    let target = input.with_file_name(format!("{stem}.{extension}"));
    if target == input {
        input.with_file_name(format!("{stem}{COALESCED_SUFFIX}.{extension}"))
    } else {
        target
    }
}

/// `<stem>-backup<ext>` beside `target`
pub fn backup_path(target: &Path) -> PathBuf {
    let name = match target.extension() {
        Some(extension) => format!(
            "{}{BACKUP_SUFFIX}.{}",
            file_stem(target),
            extension.to_string_lossy()
        ),
        None => format!("{}{BACKUP_SUFFIX}", file_stem(target)),
    };
    target.with_file_name(name)
}

/// Copy `target` to its backup path unless a backup is already there.
pub fn ensure_backup(target: &Path) -> Result<PathBuf> {
    let backup = backup_path(target);
    if backup.exists() {
        info!("keeping existing backup {}", backup.display());
        return Ok(backup);
    }

    std::fs::copy(target, &backup)
        .into_diagnostic()
        .context(format!("backing up {} to {}", target.display(), backup.display()))?;
    info!("backed up {} to {}", target.display(), backup.display());
    Ok(backup)
}

/// Write a finished conversion to `target`
pub fn write_target(target: &Path, bytes: &[u8], options: WriteOptions) -> Result<()> {
    if options.what_if {
        info!("would write {} bytes to {}", bytes.len(), target.display());
        info!("No changes made");
        return Ok(());
    }

    if target.exists() {
        if options.backup {
            ensure_backup(target)?;
        } else if !options.overwrite {
            return Err(miette!(
                help = "pass --overwrite to replace it",
                "{} already exists",
                target.display()
            ));
        }
        warn!("replacing {}", target.display());
    }

    std::fs::write(target, bytes)
        .into_diagnostic()
        .context(format!("writing {}", target.display()))?;

    info!("wrote {} bytes to {}", bytes.len(), target.display());
    info!(
        "{}",
        "Success".if_supports_color(Stream::Stdout, |text| text.green())
    );
    Ok(())
}

fn file_stem(path: &Path) -> Cow<'_, str> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default()
}
