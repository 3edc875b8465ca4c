//! `foundry requirements` command

use anyhow::Result;

use crate::cli::QueryArgs;
use crate::commands::Session;

pub fn execute(session: &Session, args: QueryArgs) -> Result<()> {
    let recipe = session.load_recipe()?;
    let evaluation = session.evaluate(&recipe, &args.config, |r| r)?;

    if args.json {
        let out = serde_json::json!({
            "requirements": evaluation.requirements,
            "system_packages": evaluation.system_packages,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for requirement in &evaluation.requirements {
        let options: Vec<String> = requirement
            .options
            .iter()
            .map(|(k, v)| format!("{}:{}={}", requirement.name, k, v))
            .collect();

        if options.is_empty() {
            println!("{}", requirement);
        } else {
            println!("{} [{}]", requirement, options.join(" "));
        }
    }

    for command in &evaluation.system_packages {
        println!("system: {}", command.display_command(false));
    }

    Ok(())
}
