//! `firmkit build`: discover the toolchain, set up flags, resolve libraries.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use firmkit_deps::{CompilerDependencyLister, DependencyLister};
use firmkit_env::discovery::keys;
use firmkit_env::{Environment, EnvironmentSettings};

use crate::flags;

/// Run the build configuration for `board_model`, or the default model.
pub fn run(settings: EnvironmentSettings, board_model: Option<&str>) -> Result<()> {
    let mut env = Environment::new(settings);
    let model = board_model
        .map(str::to_string)
        .unwrap_or_else(|| env.settings().default_board_model.clone());

    prepare(&mut env, &model)?;
    let variant = configure(&mut env, &model)?;

    let compiler = env.found(keys::CXX)?.to_path_buf();
    let lister = CompilerDependencyLister::new(compiler, env.cflags.clone());
    resolve(&mut env, &lister, variant.as_deref())?;

    print_summary(&env, &model);
    Ok(())
}

/// Pick and create the build directory, then pick up the previous run's
/// snapshot if there is one.
fn prepare(env: &mut Environment, model: &str) -> Result<()> {
    let build_dir = env.select_build_dir(Some(model));
    fs::create_dir_all(&build_dir)
        .with_context(|| format!("creating {}", build_dir.display()))?;
    if env.restore()? {
        log::info!("reusing environment from {}", env.snapshot_path()?.display());
    }
    Ok(())
}

fn configure(env: &mut Environment, model: &str) -> Result<Option<std::path::PathBuf>> {
    env.check_board_model(model)?;
    let board = env.board(model)?;
    flags::configure(env, model, &board)
}

fn resolve(env: &mut Environment, lister: &dyn DependencyLister, variant: Option<&Path>) -> Result<()> {
    env.resolve_libraries(lister, variant)
        .context("resolving library dependencies")?;
    env.dump()?;
    Ok(())
}

fn print_summary(env: &Environment, model: &str) {
    println!("Board: {model}");
    if let Some(build_dir) = &env.build_dir {
        println!("Build directory: {}", build_dir.display());
    }
    if let Some(bin) = &env.bin_path {
        println!("Firmware: {}", bin.display());
    }
    if env.used_libs.is_empty() {
        println!("Libraries: none");
    } else {
        println!("Libraries (link order):");
        for lib in &env.used_libs {
            println!("  {:<16} {}", lib.name(), lib.path().display());
        }
    }
}
