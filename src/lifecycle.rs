//! Lifecycle orchestration for the recipe.
//!
//! The phase sequence is fixed and strictly ordered:
//! export -> export-sources -> generate -> build -> package.
//! No phase is retried and no phase re-enters mid-process; the first failure
//! aborts the remaining lifecycle. Every phase is idempotent, so an aborted
//! run can be resumed by re-running the aborted phase from scratch.

use std::fmt;
use std::process::Command;

use anyhow::{Context as _, Result};
use thiserror::Error;

use crate::context::Context;
use crate::copy::{apply_all, CopyRule};
use crate::deps::{DependencyResolver, RequirementGraph};
use crate::generate::{generate_all, GenerateInput, TOOLCHAIN_FILE};
use crate::identity::PackageIdentity;
use crate::layout::{plan_for, LayoutPhase};
use crate::options::{BuildOptions, OptionSet};

/// One stage of the fixed lifecycle sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Export,
    ExportSources,
    Generate,
    Build,
    Package,
}

impl Phase {
    /// All phases, in execution order.
    pub const ALL: [Phase; 5] = [
        Phase::Export,
        Phase::ExportSources,
        Phase::Generate,
        Phase::Build,
        Phase::Package,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Export => "export",
            Phase::ExportSources => "export-sources",
            Phase::Generate => "generate",
            Phase::Build => "build",
            Phase::Package => "package",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("`{program}` exited with {status}\n{stderr}")]
    CommandFailed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

/// The external native build system, invoked as an opaque
/// configure-then-build step. Its exit status is authoritative.
pub trait BuildSystem {
    fn configure(&self, ctx: &Context) -> Result<(), BuildError>;
    fn build(&self, ctx: &Context) -> Result<(), BuildError>;
}

/// CMake-backed build: configure against the generated toolchain and
/// dependency files, then drive the parallel build.
pub struct CMakeBuild;

impl BuildSystem for CMakeBuild {
    fn configure(&self, ctx: &Context) -> Result<(), BuildError> {
        let mut cmd = Command::new("cmake");
        cmd.arg("-S")
            .arg(&ctx.source_folder)
            .arg("-B")
            .arg(&ctx.build_folder)
            .arg(format!(
                "-DCMAKE_TOOLCHAIN_FILE={}",
                ctx.build_folder.join(TOOLCHAIN_FILE).display()
            ))
            .arg(format!(
                "-DCMAKE_PROJECT_INCLUDE={}",
                ctx.build_folder.join(crate::generate::DEPS_FILE).display()
            ));
        run(cmd, ctx.verbose)
    }

    fn build(&self, ctx: &Context) -> Result<(), BuildError> {
        let mut cmd = Command::new("cmake");
        cmd.arg("--build")
            .arg(&ctx.build_folder)
            .arg("--parallel")
            .arg(ctx.jobs.to_string());
        run(cmd, ctx.verbose)
    }
}

fn run(mut cmd: Command, verbose: bool) -> Result<(), BuildError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    if verbose {
        eprintln!("[exec] {:?}", cmd);
    }

    let output = cmd.output().map_err(|source| BuildError::Spawn {
        program: program.clone(),
        source,
    })?;

    if !output.status.success() {
        return Err(BuildError::CommandFailed {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

/// Sequences the lifecycle phases over the other components.
pub struct LifecycleRunner<'a> {
    ctx: &'a Context,
    identity: PackageIdentity,
    options: OptionSet,
    graph: RequirementGraph,
    resolver: &'a dyn DependencyResolver,
    build_system: &'a dyn BuildSystem,
}

impl<'a> LifecycleRunner<'a> {
    /// Build a runner for the given invocation. Option overrides are
    /// validated here, before any phase runs.
    pub fn new(
        ctx: &'a Context,
        resolver: &'a dyn DependencyResolver,
        build_system: &'a dyn BuildSystem,
    ) -> Result<Self> {
        let mut options = OptionSet::standard();
        for spec in &ctx.option_overrides {
            options.apply_override(spec)?;
        }

        Ok(Self {
            identity: PackageIdentity::new(&ctx.recipe_folder, ctx.version.clone()),
            options,
            graph: RequirementGraph::standard(ctx.tests_enabled()),
            ctx,
            resolver,
            build_system,
        })
    }

    pub fn identity(&self) -> &PackageIdentity {
        &self.identity
    }

    /// Run a single phase.
    pub fn run(&self, phase: Phase) -> Result<()> {
        match phase {
            Phase::Export => self.export(),
            Phase::ExportSources => self.export_sources(),
            Phase::Generate => self.generate(),
            Phase::Build => self.build(),
            Phase::Package => self.package(),
        }
        .with_context(|| format!("{} phase failed", phase))
    }

    /// Run the full lifecycle in order, stopping at the first failure.
    pub fn create(&self) -> Result<()> {
        for phase in Phase::ALL {
            crate::output::sub_action(&phase.to_string());
            self.run(phase)?;
        }
        Ok(())
    }

    /// Persist the package identity (with resolved version) as recipe
    /// metadata for later invocations and consumers.
    fn export(&self) -> Result<()> {
        self.identity.resolve()?;
        self.identity.persist(&self.ctx.export_folder)?;
        Ok(())
    }

    /// Verbatim copy of the recipe-adjacent source, header, and test trees
    /// into the export location, relative paths preserved.
    fn export_sources(&self) -> Result<()> {
        let recipe = &self.ctx.recipe_folder;
        let export = &self.ctx.export_folder;
        let rules = [
            CopyRule::tree("CMakeLists.txt", recipe, export),
            CopyRule::tree("*", recipe.join("src"), export.join("src")),
            CopyRule::tree("*", recipe.join("include"), export.join("include")),
            CopyRule::tree("*", recipe.join("tests"), export.join("tests")).optional(),
        ];
        apply_all(&rules)?;
        Ok(())
    }

    /// Validate options, resolve the dependency graph, and fan out one
    /// artifact per generator backend into the build folder.
    fn generate(&self) -> Result<()> {
        let options = BuildOptions::from_set(&self.options)?;
        let version = self.identity.resolve()?;
        let deps = self
            .graph
            .resolve_all(self.resolver, self.ctx.tests_enabled())?;

        let input = GenerateInput {
            package_name: &self.identity.name,
            version,
            options,
            deps: &deps,
            tests_enabled: self.ctx.tests_enabled(),
            toolchain: self.ctx.toolchain,
            runtime: self.ctx.runtime,
        };
        generate_all(&input, &self.ctx.build_folder)?;
        Ok(())
    }

    /// Delegate to the external build system; its exit status is surfaced
    /// unchanged.
    fn build(&self) -> Result<()> {
        self.build_system.configure(self.ctx)?;
        self.build_system.build(self.ctx)?;
        Ok(())
    }

    /// Classify and relocate build outputs into the package layout:
    /// license and headers keep their relative structure, compiled
    /// artifacts are flattened to their final filename.
    fn package(&self) -> Result<()> {
        let plan = plan_for(LayoutPhase::Package);
        let pkg = &self.ctx.package_folder;
        let lib_dir = pkg.join(&plan.lib_dirs[0]);
        let bin_dir = pkg.join(&plan.bin_dirs[0]);
        let include_dir = pkg.join(&plan.include_dirs[0]);
        let licenses_dir = plan
            .licenses_dir
            .as_ref()
            .map(|d| pkg.join(d))
            .unwrap_or_else(|| pkg.join("licenses"));

        let source = &self.ctx.source_folder;
        let build = &self.ctx.build_folder;
        let rules = [
            CopyRule::tree("LICENSE*", source, &licenses_dir),
            CopyRule::tree("*.h", source.join("include"), &include_dir),
            CopyRule::artifacts("*.a", build, &lib_dir),
            CopyRule::artifacts("*.so", build, &lib_dir),
            CopyRule::artifacts("*.lib", build, &lib_dir),
            CopyRule::artifacts("*.dylib", build, &lib_dir),
            CopyRule::artifacts("*.dll", build, &bin_dir),
        ];
        apply_all(&rules)?;
        Ok(())
    }
}
