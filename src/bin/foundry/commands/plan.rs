//! `foundry plan` command
//!
//! Prints the full evaluation without running anything.

use anyhow::Result;

use crate::cli::QueryArgs;
use crate::commands::Session;

pub fn execute(session: &Session, args: QueryArgs) -> Result<()> {
    let recipe = session.load_recipe()?;
    let evaluation = session.evaluate(&recipe, &args.config, |r| r)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
        return Ok(());
    }

    println!("{} {}", evaluation.name, evaluation.version);
    println!("platform: {}", evaluation.platform);
    println!("options:  {}", evaluation.options);
    println!("identity: {}", evaluation.identity);

    for command in &evaluation.system_packages {
        println!("system:   {}", command.display_command(false));
    }

    for (i, step) in evaluation.plan.iter().enumerate() {
        println!("{}. {:<9} {}", i + 1, step.name(), step.command());
    }
    println!("install:  {}", evaluation.install.command);

    Ok(())
}
