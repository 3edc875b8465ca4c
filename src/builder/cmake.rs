//! CMake invocation builder.
//!
//! Turns one evaluation (recipe, version, resolved options, platform and
//! directory layout) into the configure/build/test plan and the install step.
//! Nothing here runs a command.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::builder::plan::{BuildPlan, BuildStep, InstallStep, StepCommand};
use crate::core::options::ResolvedOptions;
use crate::core::platform::PlatformDescriptor;
use crate::core::recipe::Recipe;
use crate::core::version::Version;

/// Option that enables the test step.
pub const TESTING_OPTION: &str = "build_testing";

const CMAKE: &str = "cmake";
const CTEST: &str = "ctest";

/// Directories one build works in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildLayout {
    /// Source tree containing the build description
    pub source_dir: PathBuf,
    /// CMake binary directory
    pub build_dir: PathBuf,
    /// Install prefix for the produced package
    pub package_dir: PathBuf,
    /// Root of installed requirements, one subdirectory per name
    pub deps_dir: PathBuf,
}

impl BuildLayout {
    /// Default layout: everything under `<source>/.foundry/`.
    pub fn new(source_dir: &Path) -> Self {
        let root = source_dir.join(".foundry");
        BuildLayout {
            source_dir: source_dir.to_path_buf(),
            build_dir: root.join("build"),
            package_dir: root.join("package"),
            deps_dir: root.join("deps"),
        }
    }

    /// Use `dir` as the build directory; relative paths are taken from the source tree.
    pub fn with_build_dir(mut self, dir: &Path) -> Self {
        self.build_dir = self.source_dir.join(dir);
        self
    }

    pub fn with_package_dir(mut self, dir: &Path) -> Self {
        self.package_dir = self.source_dir.join(dir);
        self
    }

    pub fn with_deps_dir(mut self, dir: &Path) -> Self {
        self.deps_dir = self.source_dir.join(dir);
        self
    }
}

/// Explicit context for assembling CMake commands.
pub struct CMakeInvocation<'a> {
    recipe: &'a Recipe,
    version: &'a Version,
    options: &'a ResolvedOptions,
    platform: &'a PlatformDescriptor,
    layout: &'a BuildLayout,
    generator: Option<String>,
    jobs: Option<usize>,
}

impl<'a> CMakeInvocation<'a> {
    pub fn new(
        recipe: &'a Recipe,
        version: &'a Version,
        options: &'a ResolvedOptions,
        platform: &'a PlatformDescriptor,
        layout: &'a BuildLayout,
    ) -> Self {
        CMakeInvocation {
            recipe,
            version,
            options,
            platform,
            layout,
            generator: None,
            jobs: None,
        }
    }

    /// Set the CMake generator (e.g. "Ninja").
    pub fn generator(mut self, generator: Option<String>) -> Self {
        self.generator = generator;
        self
    }

    /// Set the number of parallel build jobs.
    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// `-D` cache definitions for the configure step.
    pub fn definitions(&self) -> Vec<String> {
        let mut defs = vec![
            format!("-DCMAKE_BUILD_TYPE={}", self.platform.build_mode.as_cmake()),
            format!("-DCMAKE_INSTALL_PREFIX={}", self.layout.package_dir.display()),
            format!("-DFOUNDRY_PACKAGE_NAME={}", self.recipe.name()),
        ];

        if let Some(version) = self.version.as_str() {
            defs.push(format!("-DFOUNDRY_PACKAGE_VERSION={}", version));
        }

        for (name, value) in self.options.iter() {
            defs.push(format!(
                "-D{}={}",
                self.recipe.definition_for(name),
                value.as_cmake()
            ));
        }

        defs
    }

    fn configure_step(&self) -> StepCommand {
        let mut cmd = StepCommand::new(CMAKE)
            .arg("-S")
            .arg(self.layout.source_dir.display().to_string())
            .arg("-B")
            .arg(self.layout.build_dir.display().to_string());

        if let Some(ref generator) = self.generator {
            cmd = cmd.arg("-G").arg(generator.clone());
        }

        for def in self.definitions() {
            cmd = cmd.arg(def);
        }

        cmd
    }

    fn build_step(&self) -> StepCommand {
        let mut cmd = StepCommand::new(CMAKE)
            .arg("--build")
            .arg(self.layout.build_dir.display().to_string())
            .arg("--config")
            .arg(self.platform.build_mode.as_cmake())
            .arg("--parallel");

        if let Some(jobs) = self.jobs {
            cmd = cmd.arg(jobs.to_string());
        }

        cmd
    }

    fn test_step(&self) -> StepCommand {
        StepCommand::new(CTEST)
            .arg("-C")
            .arg(self.platform.build_mode.as_cmake())
            .arg("--output-on-failure")
            .env("CTEST_OUTPUT_ON_FAILURE", "1")
            .cwd(&self.layout.build_dir)
    }

    /// Configure and build, plus test when `build_testing` is true.
    pub fn build_plan(&self) -> BuildPlan {
        let mut steps = vec![
            BuildStep::Configure(self.configure_step()),
            BuildStep::Build(self.build_step()),
        ];

        if self.options.is_true(TESTING_OPTION) {
            steps.push(BuildStep::Test(self.test_step()));
        }

        BuildPlan { steps }
    }

    /// The install invocation into the package directory.
    pub fn install_step(&self) -> InstallStep {
        let command = StepCommand::new(CMAKE)
            .arg("--install")
            .arg(self.layout.build_dir.display().to_string())
            .arg("--config")
            .arg(self.platform.build_mode.as_cmake())
            .arg("--prefix")
            .arg(self.layout.package_dir.display().to_string());

        InstallStep {
            command,
            prefix: self.layout.package_dir.clone(),
        }
    }
}

/// Check if a directory contains a CMake project.
pub fn is_cmake_project(dir: &Path) -> bool {
    dir.join("CMakeLists.txt").exists()
}
