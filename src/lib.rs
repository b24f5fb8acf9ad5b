//! Recipe driver for the formulae-engine native library.
//!
//! Drives the build, packaging, and distribution lifecycle of the C++
//! formula parser/evaluator library: resolves the package version,
//! translates build options into toolchain configuration, declares the
//! dependency graph, generates build-system input files, delegates
//! compilation to CMake, and relocates build outputs into a stable package
//! layout.
//!
//! # Lifecycle
//!
//! Phases run in a fixed order, each completing fully before the next:
//!
//! 1. `export` - persist package identity (name, resolved version, ...) as
//!    recipe metadata
//! 2. `export-sources` - verbatim copy of recipe-adjacent source trees
//! 3. `generate` - emit toolchain variables, dependency locations, and
//!    build/run environment scripts
//! 4. `build` - configure-then-build via the external build system
//! 5. `package` - classify build outputs into `licenses/`, `include/`,
//!    `lib/`, and `bin/`
//!
//! The external build system, the dependency packages, and the package index
//! are collaborators, not part of this crate: compilation is an opaque
//! CMake invocation behind the [`lifecycle::BuildSystem`] seam, and
//! dependency location goes through [`deps::DependencyResolver`].
//!
//! # Example
//!
//! ```no_run
//! use formulae_recipe::{
//!     context::Context,
//!     deps::CacheResolver,
//!     lifecycle::{CMakeBuild, LifecycleRunner},
//! };
//!
//! let ctx = Context::new(".").version("5.11.0".parse().unwrap());
//! let resolver = CacheResolver::new(&ctx.cache_folder);
//! let runner = LifecycleRunner::new(&ctx, &resolver, &CMakeBuild)?;
//! runner.create()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod context;
pub mod copy;
pub mod deps;
pub mod generate;
pub mod identity;
pub mod layout;
pub mod lifecycle;
pub mod options;
pub mod output;

pub use context::Context;
pub use deps::{CacheResolver, DependencyRef, DependencyResolver, RequirementGraph};
pub use identity::PackageIdentity;
pub use lifecycle::{BuildSystem, CMakeBuild, LifecycleRunner, Phase};
pub use options::{BuildOptions, OptionSet};
