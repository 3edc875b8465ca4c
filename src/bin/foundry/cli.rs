//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Foundry - package recipe evaluation and build orchestration
#[derive(Parser)]
#[command(name = "foundry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Source tree to evaluate
    #[arg(long, global = true, env = "FOUNDRY_SOURCE_DIR", default_value = ".")]
    pub source_dir: PathBuf,

    /// Recipe file, or the name of a built-in recipe (defaults to <source-dir>/Foundry.toml)
    #[arg(long, global = true, env = "FOUNDRY_RECIPE")]
    pub recipe: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the version declared by the build description
    Version,

    /// List the recipe's options
    Options(OptionsArgs),

    /// List the requirements for a configuration
    Requirements(QueryArgs),

    /// Show the build plan for a configuration
    Plan(QueryArgs),

    /// Show the package identity for a configuration
    Identity(QueryArgs),

    /// Install tooling, build, test and package
    Build(BuildArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// The requested configuration.
#[derive(Args, Clone, Default)]
pub struct ConfigArgs {
    /// Override an option
    #[arg(short = 'o', long = "option", value_name = "NAME=VALUE")]
    pub options: Vec<String>,

    /// Override a platform setting (os, compiler, compiler.version, arch, build_type, package_manager)
    #[arg(short = 's', long = "setting", value_name = "KEY=VALUE")]
    pub settings: Vec<String>,
}

#[derive(Args)]
pub struct OptionsArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Args)]
pub struct QueryArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// CMake generator
    #[arg(short = 'G', long)]
    pub generator: Option<String>,

    /// Build directory, relative to the source tree
    #[arg(long)]
    pub build_dir: Option<PathBuf>,

    /// Install prefix, relative to the source tree
    #[arg(long)]
    pub package_dir: Option<PathBuf>,

    /// Directory holding installed requirements, one subdirectory per name
    #[arg(long, env = "FOUNDRY_DEPS_DIR")]
    pub deps_dir: Option<PathBuf>,

    /// Print advised system package commands instead of running them
    #[arg(long)]
    pub no_system_packages: bool,

    /// Run system package commands with sudo
    #[arg(long)]
    pub sudo: bool,

    /// Stop after the build plan; skip install and packaging
    #[arg(long)]
    pub no_package: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
