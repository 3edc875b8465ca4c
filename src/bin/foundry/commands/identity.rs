//! `foundry identity` command

use anyhow::Result;

use crate::cli::QueryArgs;
use crate::commands::Session;

pub fn execute(session: &Session, args: QueryArgs) -> Result<()> {
    let recipe = session.load_recipe()?;
    let evaluation = session.evaluate(&recipe, &args.config, |r| r)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&evaluation.identity)?);
    } else {
        println!("{}", evaluation.identity);
        for (name, value) in evaluation.identity.options().iter() {
            println!("  {}={}", name, value);
        }
    }

    Ok(())
}
