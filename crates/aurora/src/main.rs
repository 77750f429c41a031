mod check;
mod cli;
mod paths;
mod run;

use anyhow::Result;
use cli::Command;
use paths::{AppPaths, ConfigLocation};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Check(args)) => {
            let paths = AppPaths::discover()?;
            let file = paths.locate_config(cli.run.config.as_deref()).load()?;
            check::run_check(&args, &file)
        }
        Some(Command::Where) => run_where(cli.run.config.as_deref()),
        None => run::run(cli.run),
    }
}

fn run_where(flag: Option<&std::path::Path>) -> Result<()> {
    let paths = AppPaths::discover()?;
    let location = paths.locate_config(flag);
    println!("Configuration:");
    println!(
        "  directory: {}{}",
        paths.config_dir().display(),
        if paths.is_overridden() {
            format!(" (from {})", paths::ENV_CONFIG_DIR)
        } else {
            String::new()
        }
    );
    let (kind, path) = match &location {
        ConfigLocation::Explicit(path) => ("--config", path),
        ConfigLocation::Default(path) => ("default", path),
    };
    println!(
        "  file:      {} [{kind}, {}]",
        path.display(),
        if path.exists() { "present" } else { "missing" }
    );
    Ok(())
}
