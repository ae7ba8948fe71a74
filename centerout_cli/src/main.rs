mod check;
mod cli;
mod error_fmt;
mod logging;
mod run;

use crate::cli::{Cli, Commands, JSON_MODE, SourceArgs};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use centerout_config::Config;
use centerout_core::ControllerSettings;
use clap::Parser;
use eyre::WrapErr;

fn main() {
    if let Err(e) = real_main() {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main() -> eyre::Result<()> {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let cfg = match cli.config.as_deref() {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("read settings {}", path.display()))?;
            let cfg: Config = toml::from_str(&text)
                .wrap_err_with(|| format!("parse settings {}", path.display()))?;
            cfg.validate()?;
            cfg
        }
        None => Config::default(),
    };

    logging::init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    let _ = color_eyre::install();

    match cli.cmd {
        Commands::Run { sources, seed } => {
            let (params, targets) = resolve_sources(&sources, &cfg)?;
            let settings = ControllerSettings {
                seed,
                ..ControllerSettings::from(&cfg)
            };
            run::run(settings, &params, &targets)
        }
        Commands::Check { sources } => {
            let (params, targets) = resolve_sources(&sources, &cfg)?;
            check::check(cfg.canvas.center(), &params, &targets, cli.json)
        }
    }
}

/// Command-line sources win over `[sources]`.
fn resolve_sources(args: &SourceArgs, cfg: &Config) -> eyre::Result<(String, String)> {
    let params = args
        .params
        .clone()
        .or_else(|| cfg.sources.params.clone())
        .ok_or_else(|| eyre::eyre!("no parameter source: pass --params or set sources.params"))?;
    let targets = args
        .targets
        .clone()
        .or_else(|| cfg.sources.targets.clone())
        .ok_or_else(|| eyre::eyre!("no target source: pass --targets or set sources.targets"))?;
    Ok((params, targets))
}
