//! Scoped run environment for the test step.
//!
//! Tests link against the installed requirements, so their `bin` and `lib`
//! directories have to be on the search paths while ctest runs. An
//! [`EnvScope`] appends them to the process environment and puts the previous
//! values back when it is dropped, on success, error or unwind alike.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::requirement::RequirementSpec;

/// Search-path variables and the directories appended to each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RunEnvironment {
    vars: BTreeMap<String, Vec<PathBuf>>,
}

impl RunEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime paths for `requirements` installed under `deps_dir/<name>`.
    ///
    /// Only directories that exist are added.
    pub fn for_requirements(requirements: &[RequirementSpec], deps_dir: &Path) -> Self {
        let mut env = RunEnvironment::new();

        for requirement in requirements {
            let root = deps_dir.join(&requirement.name);

            let bin = root.join("bin");
            if bin.is_dir() {
                env = env.append("PATH", bin);
            }

            let lib = root.join("lib");
            if lib.is_dir() {
                env = env
                    .append("LD_LIBRARY_PATH", lib.clone())
                    .append("DYLD_LIBRARY_PATH", lib);
            }
        }

        env
    }

    /// Append `path` to the search variable `var`.
    pub fn append(mut self, var: &str, path: PathBuf) -> Self {
        self.vars.entry(var.to_string()).or_default().push(path);
        self
    }

    pub fn get(&self, var: &str) -> Option<&[PathBuf]> {
        self.vars.get(var).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Apply to the process environment until the returned guard drops.
    pub fn enter(&self) -> Result<EnvScope> {
        EnvScope::acquire(self)
    }
}

/// Guard holding the values the scope replaced.
#[derive(Debug)]
pub struct EnvScope {
    saved: Vec<(String, Option<OsString>)>,
}

impl EnvScope {
    /// Append every path of `env` to the current process environment.
    pub fn acquire(env: &RunEnvironment) -> Result<Self> {
        let mut scope = EnvScope { saved: Vec::new() };

        for (var, paths) in &env.vars {
            let previous = std::env::var_os(var);

            let mut joined: Vec<PathBuf> = previous
                .as_ref()
                .map(|p| std::env::split_paths(p).collect())
                .unwrap_or_default();
            joined.extend(paths.iter().cloned());

            // On error, `scope` drops here and restores what was already set
            let value = std::env::join_paths(&joined)
                .with_context(|| format!("invalid path in {}", var))?;

            tracing::debug!("{} += {}", var, display_paths(paths));
            scope.saved.push((var.clone(), previous));
            std::env::set_var(var, value);
        }

        Ok(scope)
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        for (var, previous) in self.saved.drain(..).rev() {
            match previous {
                Some(value) => std::env::set_var(&var, value),
                None => std::env::remove_var(&var),
            }
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::requirement::RequirementKind;
    use tempfile::TempDir;

    #[test]
    fn test_scope_restores_previous_value() {
        std::env::set_var("FOUNDRY_ENV_TEST_SET", "/usr/bin");

        let env = RunEnvironment::new().append("FOUNDRY_ENV_TEST_SET", PathBuf::from("/opt/dep/bin"));
        {
            let _scope = env.enter().unwrap();
            let value = std::env::var_os("FOUNDRY_ENV_TEST_SET").unwrap();
            let paths: Vec<PathBuf> = std::env::split_paths(&value).collect();
            assert_eq!(paths, vec![PathBuf::from("/usr/bin"), PathBuf::from("/opt/dep/bin")]);
        }

        assert_eq!(std::env::var("FOUNDRY_ENV_TEST_SET").unwrap(), "/usr/bin");
        std::env::remove_var("FOUNDRY_ENV_TEST_SET");
    }

    #[test]
    fn test_scope_removes_unset_variable() {
        std::env::remove_var("FOUNDRY_ENV_TEST_UNSET");

        let env = RunEnvironment::new().append("FOUNDRY_ENV_TEST_UNSET", PathBuf::from("/opt/dep/lib"));
        {
            let _scope = env.enter().unwrap();
            assert!(std::env::var_os("FOUNDRY_ENV_TEST_UNSET").is_some());
        }

        assert!(std::env::var_os("FOUNDRY_ENV_TEST_UNSET").is_none());
    }

    #[test]
    fn test_scope_restores_on_unwind() {
        std::env::remove_var("FOUNDRY_ENV_TEST_PANIC");

        let result = std::panic::catch_unwind(|| {
            let env = RunEnvironment::new().append("FOUNDRY_ENV_TEST_PANIC", PathBuf::from("/x"));
            let _scope = env.enter().unwrap();
            panic!("test step blew up");
        });

        assert!(result.is_err());
        assert!(std::env::var_os("FOUNDRY_ENV_TEST_PANIC").is_none());
    }

    #[test]
    fn test_for_requirements_uses_existing_dirs() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("khronos-opencl-icd-loader/lib")).unwrap();
        std::fs::create_dir_all(tmp.path().join("lyra/bin")).unwrap();

        let requirements = vec![
            RequirementSpec::parse(
                "khronos-opencl-icd-loader/20190827@bincrafters/stable",
                RequirementKind::RunTime,
            )
            .unwrap(),
            RequirementSpec::parse("lyra/1.1.0", RequirementKind::BuildTime).unwrap(),
            RequirementSpec::parse("doctest/2.3.4", RequirementKind::BuildTime).unwrap(),
        ];

        let env = RunEnvironment::for_requirements(&requirements, tmp.path());
        assert_eq!(env.get("PATH"), Some(&[tmp.path().join("lyra/bin")][..]));
        assert_eq!(
            env.get("LD_LIBRARY_PATH"),
            Some(&[tmp.path().join("khronos-opencl-icd-loader/lib")][..])
        );
        assert_eq!(env.get("LD_LIBRARY_PATH"), env.get("DYLD_LIBRARY_PATH"));
    }

    #[test]
    fn test_no_deps_is_empty() {
        let tmp = TempDir::new().unwrap();
        let requirements = vec![RequirementSpec::parse("lyra/1.1.0", RequirementKind::BuildTime).unwrap()];
        assert!(RunEnvironment::for_requirements(&requirements, tmp.path()).is_empty());
    }
}
