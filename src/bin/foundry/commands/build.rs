//! `foundry build` command

use std::time::Instant;

use anyhow::{bail, Result};

use crate::cli::BuildArgs;
use crate::commands::Session;
use foundry::builder::cmake::is_cmake_project;
use foundry::builder::TestOutcome;
use foundry::ops::{build, BuildOptions};

pub fn execute(session: &Session, args: BuildArgs) -> Result<()> {
    let start = Instant::now();
    let recipe = session.load_recipe()?;

    if !is_cmake_project(&session.source_dir) {
        bail!(
            "no CMakeLists.txt in {}\nhelp: Pass the source tree with `--source-dir`",
            session.source_dir.display()
        );
    }

    let evaluation = session.evaluate(&recipe, &args.config, |mut request| {
        if args.generator.is_some() {
            request.generator = args.generator.clone();
        }
        if args.jobs.is_some() {
            request.jobs = args.jobs;
        }
        if let Some(ref dir) = args.build_dir {
            request.layout = request.layout.with_build_dir(dir);
        }
        if let Some(ref dir) = args.package_dir {
            request.layout = request.layout.with_package_dir(dir);
        }
        if let Some(ref dir) = args.deps_dir {
            request.layout = request.layout.with_deps_dir(dir);
        }
        request
    })?;

    let mut opts = BuildOptions::from_config(&session.config());
    if args.no_system_packages {
        opts.install_system_packages = false;
    }
    if args.sudo {
        opts.sudo = true;
    }
    opts.package = !args.no_package;

    eprintln!(
        "   Compiling {} {} ({})",
        evaluation.name, evaluation.version, evaluation.platform
    );

    let outcome = build(&recipe, &evaluation, &opts)?;
    session.warn_all(&outcome.warnings);

    if outcome.report.test == TestOutcome::Passed {
        eprintln!("      Tested {}", evaluation.name);
    }

    if let Some(ref package) = outcome.package {
        eprintln!(
            "    Packaged {} [{}] in {}",
            evaluation.name,
            evaluation.identity,
            package.prefix.display()
        );
    }

    eprintln!("    Finished in {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
