//! `foundry options` command
//!
//! Lists every declared option with its domain, default and the value it
//! resolves to for the requested configuration.

use anyhow::Result;

use crate::cli::OptionsArgs;
use crate::commands::{platform, Session};

pub fn execute(session: &Session, args: OptionsArgs) -> Result<()> {
    let recipe = session.load_recipe()?;
    let platform = platform(&args.config.settings)?;

    let overrides = recipe.schema.parse_overrides(&args.config.options)?;
    let resolved = recipe.schema.resolve_for_platform(&overrides, &platform)?;

    println!("{} options for {}:", recipe.name(), platform);
    for def in recipe.schema.definitions() {
        let value = match resolved.get(&def.name) {
            Some(v) => v.to_string(),
            None => format!("(unavailable on {})", platform.os),
        };
        let excluded = if recipe.identity_exclusions.contains(&def.name) {
            " [not in identity]"
        } else {
            ""
        };

        println!(
            "  {:<20} = {:<10} default: {}, {}{}",
            def.name, value, def.default, def.domain, excluded
        );
    }

    Ok(())
}
