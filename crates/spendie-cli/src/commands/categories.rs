//! Category command implementations

use anyhow::Result;
use spendie_core::Command;

use super::App;

pub fn cmd_categories_list(app: &App) -> Result<()> {
    app.run(Command::ListCategories)?;
    Ok(())
}

pub fn cmd_categories_add(app: &App, name: &str, parent: Option<&str>) -> Result<()> {
    let command = Command::AddCategory {
        name: name.to_string(),
        parent: parent.map(str::to_string),
    };
    app.run(command)?;
    Ok(())
}

pub fn cmd_categories_delete(app: &App, name: &str, reassign_to: Option<&str>) -> Result<()> {
    let command = Command::DeleteCategory {
        name: name.to_string(),
        reassign_to: reassign_to.map(str::to_string),
    };
    app.run(command)?;
    Ok(())
}
