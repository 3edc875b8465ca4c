//! `foundry version` command

use anyhow::Result;

use crate::commands::Session;

pub fn execute(session: &Session) -> Result<()> {
    let recipe = session.load_recipe()?;
    let version = recipe.version(&session.source_dir);

    match version.as_str() {
        Some(v) => println!("{} {}", recipe.name(), v),
        None => println!("{} ({})", recipe.name(), version),
    }

    Ok(())
}
