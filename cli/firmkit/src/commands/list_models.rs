//! `firmkit list-models`: print the board catalogue.

use anyhow::Result;
use firmkit_env::{Environment, EnvironmentSettings};

pub fn run(settings: EnvironmentSettings) -> Result<()> {
    print!("{}", render(settings)?);
    Ok(())
}

fn render(settings: EnvironmentSettings) -> Result<String> {
    let mut env = Environment::new(settings);
    Ok(env.board_models()?.format())
}
