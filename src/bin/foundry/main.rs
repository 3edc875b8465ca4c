//! Foundry CLI - package recipe evaluation and build orchestration

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use foundry::builder::StepFailure;
use foundry::core::ValidationError;
use foundry::util::diagnostic::{emit, suggestions, Diagnostic};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;

    if let Err(e) = run(cli) {
        report(&e, color);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("foundry=debug")
    } else {
        EnvFilter::new("foundry=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let session = commands::Session::new(&cli);

    match cli.command {
        Commands::Version => commands::version::execute(&session),
        Commands::Options(args) => commands::options::execute(&session, args),
        Commands::Requirements(args) => commands::requirements::execute(&session, args),
        Commands::Plan(args) => commands::plan::execute(&session, args),
        Commands::Identity(args) => commands::identity::execute(&session, args),
        Commands::Build(args) => commands::build::execute(&session, args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

fn report(e: &anyhow::Error, color: bool) {
    if let Some(validation) = e.downcast_ref::<ValidationError>() {
        emit(&validation.to_diagnostic(), color);
    } else if let Some(failure) = e.downcast_ref::<StepFailure>() {
        let diag = Diagnostic::error(format!("{} step failed: `{}`", failure.step, failure.command))
            .with_context(format!("exit code: {:?}", failure.code))
            .with_suggestion(suggestions::STEP_FAILED);
        eprint!("{}", failure.output);
        emit(&diag, color);
    } else {
        eprintln!("error: {:#}", e);
    }
}
