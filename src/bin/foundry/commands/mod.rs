//! Command implementations

pub mod build;
pub mod completions;
pub mod identity;
pub mod options;
pub mod plan;
pub mod requirements;
pub mod version;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::cli::{Cli, ConfigArgs};
use foundry::core::recipe::BUILTIN_RECIPES;
use foundry::core::{find_recipe, PlatformDescriptor, Recipe, ValidationError};
use foundry::ops::{evaluate, EvaluateRequest, Evaluation};
use foundry::util::config::{global_config_path, load_config, project_config_path};
use foundry::util::diagnostic::{emit, suggestions, Diagnostic};
use foundry::Config;

/// Global arguments shared by every command.
pub struct Session {
    pub source_dir: PathBuf,
    pub recipe: Option<String>,
    pub color: bool,
}

impl Session {
    pub fn new(cli: &Cli) -> Self {
        Session {
            source_dir: cli.source_dir.clone(),
            recipe: cli.recipe.clone(),
            color: !cli.no_color,
        }
    }

    /// `--recipe` as a path or built-in name, else `<source-dir>/Foundry.toml`.
    pub fn load_recipe(&self) -> Result<Recipe> {
        if let Some(ref arg) = self.recipe {
            let path = Path::new(arg);
            if path.is_file() {
                return Recipe::load(path);
            }
            if let Some(recipe) = Recipe::builtin(arg) {
                return recipe.with_context(|| format!("built-in recipe `{}` is invalid", arg));
            }
            bail!(
                "no recipe file or built-in recipe named `{}`\n\
                 built-in recipes: {}",
                arg,
                BUILTIN_RECIPES.join(", ")
            );
        }

        match find_recipe(&self.source_dir) {
            Some(path) => Recipe::load(&path),
            None => bail!(
                "could not find {} in {}\n{}",
                foundry::core::RECIPE_FILE,
                self.source_dir.display(),
                suggestions::NO_RECIPE
            ),
        }
    }

    /// Global config merged under the source tree's project config.
    pub fn config(&self) -> Config {
        load_config(
            global_config_path().as_deref(),
            &project_config_path(&self.source_dir),
        )
    }

    /// Evaluate the recipe for `args`, printing advisory warnings.
    pub fn evaluate(
        &self,
        recipe: &Recipe,
        args: &ConfigArgs,
        customize: impl FnOnce(EvaluateRequest) -> EvaluateRequest,
    ) -> Result<Evaluation> {
        let platform = platform(&args.settings)?;
        let config = self.config();

        let mut request = EvaluateRequest::new(&self.source_dir, platform).overrides(&args.options);
        request.generator = config.build.generator.clone();
        request.jobs = config.build.jobs;
        if let Some(ref dir) = config.build.build_dir {
            request.layout = request.layout.with_build_dir(dir);
        }

        let evaluation = evaluate(recipe, &customize(request))?;
        self.warn_all(&evaluation.warnings);
        Ok(evaluation)
    }

    pub fn warn_all(&self, warnings: &[Diagnostic]) {
        for warning in warnings {
            emit(warning, self.color);
        }
    }
}

/// Host platform adjusted by `key=value` settings.
pub fn platform(settings: &[String]) -> Result<PlatformDescriptor> {
    let mut platform = PlatformDescriptor::host();

    for setting in settings {
        let (key, value) = setting
            .split_once('=')
            .map(|(k, v)| (k.trim(), v.trim()))
            .filter(|(k, _)| !k.is_empty())
            .ok_or_else(|| ValidationError::InvalidSetting {
                setting: setting.clone(),
                value: String::new(),
                expected: "a `key=value` setting".to_string(),
            })?;
        platform.apply_setting(key, value)?;
    }

    tracing::debug!("platform: {}", platform);
    Ok(platform)
}
