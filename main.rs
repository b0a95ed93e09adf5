/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use bpaf::Bpaf;
use log::error;
use tracing_subscriber::EnvFilter;

use trackshell::registries::{AlgorithmCategory, AlgorithmRegistry, DefaultsContext};
use trackshell::{Model, TrackingSession, TrackshellConfig};

#[derive(Debug, Clone, Bpaf)]
#[bpaf(options, version)]
/// Inspect the tracking algorithm catalogue and session defaults.
struct Cli {
    /// TOML configuration file (defaults to the platform config dir)
    #[bpaf(long, short, argument("PATH"))]
    config: Option<PathBuf>,
    #[bpaf(external(command))]
    command: Command,
}

#[derive(Debug, Clone, Bpaf)]
enum Command {
    /// List available detectors and their parameters
    #[bpaf(command)]
    Detectors,
    /// List available linkers and their parameters
    #[bpaf(command)]
    Linkers,
    /// Show the configured session and an empty model summary
    #[bpaf(command)]
    Info,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("TRACKSHELL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: Option<&Path>) -> Result<TrackshellConfig, trackshell::ConfigError> {
    match path {
        Some(path) => TrackshellConfig::load(path),
        None => match TrackshellConfig::default_path() {
            Some(path) => TrackshellConfig::load_or_default(&path),
            None => Ok(TrackshellConfig::default()),
        },
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = cli().run();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let registry = Arc::new(AlgorithmRegistry::with_builtin_variants(DefaultsContext {
        num_timepoints: config.tracking.num_timepoints,
    }));

    match cli.command {
        Command::Detectors => print!("{}", registry.describe(AlgorithmCategory::Detector)),
        Command::Linkers => print!("{}", registry.describe(AlgorithmCategory::Linker)),
        Command::Info => {
            let model = Arc::new(Model::with_max_undo_steps(config.undo.max_steps));
            let session = match TrackingSession::new(model.clone(), registry, &config.tracking) {
                Ok(session) => session,
                Err(err) => {
                    error!("{err}");
                    return ExitCode::FAILURE;
                }
            };
            println!("trackshell {}", trackshell::VERSION);
            println!("{}", model.summary());
            print!("{}", model.describe_tags());
            print!("{}", session.describe());
        }
    }
    ExitCode::SUCCESS
}
