//! CSV export and import commands

use std::path::Path;

use anyhow::{Context, Result};
use spendie_core::{Command, DateRange, Outcome};

use super::App;

/// Write expenses as CSV to a file, or to stdout without one
pub fn cmd_export(
    app: &App,
    output: Option<&Path>,
    period: Option<&str>,
    category: Option<&str>,
) -> Result<()> {
    let range = period
        .map(|p| DateRange::parse(p, app.today))
        .transpose()?;
    let command = Command::ExportCsv {
        range,
        category: category.map(str::to_string),
    };

    let Outcome::Csv { csv, rows } = app.execute(command)? else {
        anyhow::bail!("export returned no CSV");
    };

    match output {
        Some(path) => {
            std::fs::write(path, &csv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("📤 Exported {} expenses to {}", rows, path.display());
        }
        None => print!("{}", csv),
    }

    Ok(())
}

pub fn cmd_import(app: &App, file: &Path) -> Result<()> {
    println!("📥 Importing expenses from {}...", file.display());

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    app.run(Command::ImportCsv { content })?;

    Ok(())
}
