//! Recipe CLI - drives the formulae-engine build and packaging lifecycle
//!
//! Usage:
//!   recipe export                  Persist recipe metadata
//!   recipe export-sources          Copy source trees to the export folder
//!   recipe generate                Emit build-system input files
//!   recipe build                   Configure and build via CMake
//!   recipe package                 Copy build outputs into the package layout
//!   recipe create                  Run the full lifecycle

use anyhow::Result;
use clap::{Parser, Subcommand};
use formulae_recipe::context::{Context, RuntimeLinkage, ToolchainFamily};
use formulae_recipe::deps::CacheResolver;
use formulae_recipe::lifecycle::{CMakeBuild, LifecycleRunner, Phase};
use formulae_recipe::output;
use semver::Version;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "recipe")]
#[command(about = "Build and packaging recipe for the formulae-engine library")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Folder containing the recipe and its sources
    #[arg(short = 'r', long, global = true, default_value = ".")]
    recipe_folder: PathBuf,

    /// Build folder (defaults to <recipe>/build)
    #[arg(short, long, global = true)]
    build_folder: Option<PathBuf>,

    /// Package folder (defaults to <recipe>/package)
    #[arg(short, long, global = true)]
    package_folder: Option<PathBuf>,

    /// Export folder (defaults to <recipe>/export)
    #[arg(long, global = true)]
    export_folder: Option<PathBuf>,

    /// Local dependency cache consulted by the resolver
    #[arg(long, global = true, env = "RECIPE_CACHE")]
    cache: Option<PathBuf>,

    /// Package version (otherwise read from exported recipe metadata)
    #[arg(long = "pkg-version", global = true)]
    pkg_version: Option<Version>,

    /// Option overrides, e.g. -o with_apps=true
    #[arg(short = 'o', long = "option", global = true)]
    options: Vec<String>,

    /// Skip test building and drop test-only dependencies
    #[arg(long, global = true, env = "RECIPE_SKIP_TESTS")]
    skip_tests: bool,

    /// Toolchain family: gnu, clang, apple-clang, msvc
    #[arg(long, global = true, default_value_t = ToolchainFamily::host())]
    toolchain: ToolchainFamily,

    /// Link the MSVC runtime statically instead of as a DLL
    #[arg(long, global = true)]
    static_runtime: bool,

    /// Parallel jobs for the external build
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    /// Print external commands as they run
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Persist package identity as recipe metadata
    Export,
    /// Copy recipe-adjacent source trees into the export folder
    ExportSources,
    /// Generate build-system input files
    Generate,
    /// Configure and build with the external build system
    Build,
    /// Copy build outputs into the versioned package layout
    Package,
    /// Run the full lifecycle: export through package
    Create,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut ctx = Context::new(&cli.recipe_folder)
        .toolchain(cli.toolchain)
        .runtime(if cli.static_runtime {
            RuntimeLinkage::Static
        } else {
            RuntimeLinkage::Dynamic
        })
        .skip_tests(cli.skip_tests);

    if let Some(dir) = cli.build_folder {
        ctx = ctx.build_folder(dir);
    }
    if let Some(dir) = cli.package_folder {
        ctx = ctx.package_folder(dir);
    }
    if let Some(dir) = cli.export_folder {
        ctx = ctx.export_folder(dir);
    }
    if let Some(dir) = cli.cache {
        ctx = ctx.cache_folder(dir);
    }
    if let Some(version) = cli.pkg_version {
        ctx = ctx.version(version);
    }
    if let Some(jobs) = cli.jobs {
        ctx.jobs = jobs;
    }
    ctx.verbose = cli.verbose;
    ctx.option_overrides = cli.options;

    let resolver = CacheResolver::new(&ctx.cache_folder);
    let runner = LifecycleRunner::new(&ctx, &resolver, &CMakeBuild)?;

    match cli.command {
        Commands::Export => {
            runner.run(Phase::Export)?;
            let version = runner.identity().resolve()?;
            output::success(&format!(
                "exported {}/{} to {}",
                runner.identity().name,
                version,
                ctx.export_folder.display()
            ));
        }
        Commands::ExportSources => {
            runner.run(Phase::ExportSources)?;
            output::success(&format!("sources exported to {}", ctx.export_folder.display()));
        }
        Commands::Generate => {
            runner.run(Phase::Generate)?;
            output::success(&format!("generators written to {}", ctx.build_folder.display()));
        }
        Commands::Build => {
            let spinner = output::build_spinner("building with cmake");
            let result = runner.run(Phase::Build);
            spinner.finish_and_clear();
            result?;
            output::success("build finished");
        }
        Commands::Package => {
            runner.run(Phase::Package)?;
            output::success(&format!("packaged into {}", ctx.package_folder.display()));
        }
        Commands::Create => {
            output::action(&format!("Creating {}", runner.identity().name));
            runner.create()?;
            let version = runner.identity().resolve()?;
            output::success(&format!(
                "{}/{} packaged into {}",
                runner.identity().name,
                version,
                ctx.package_folder.display()
            ));
        }
    }

    Ok(())
}
