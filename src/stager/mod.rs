/*
Copyright 2021 Jakub Lewandowski

This file is part of METplus Data Staging (metstage).

METplus Data Staging (metstage) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

METplus Data Staging (metstage) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with METplus Data Staging (metstage). If not, see https://www.gnu.org/licenses/.
*/

//! Module containing the staging engine.
//!
//! A run expands the configured date range into time slots, resolves
//! the file names of every slot for every model and stages the files
//! under `data/`. Each file is searched on the online filesystem,
//! then on the archive disk and finally on tape.

mod archive;
mod configuration;
mod drivers;
mod fetch;
mod retrieval;
mod staging;
mod template;
mod timegrid;


use self::archive::{HostFs, Probe};
use self::configuration::Config;
use self::drivers::Context;
use self::fetch::{Fetcher, JobLimits};
use self::retrieval::cancel::CancelToken;
use self::retrieval::scheduler::{BatchScheduler, Dialect, JobQueue, NoScheduler};
use self::retrieval::JobRunner;
use self::staging::{ExternalTools, Staging, Toolbox};
use crate::errors::StagerError;
use log::{debug, info};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main staging function.
///
/// Reads the configuration (path given as the first argument,
/// `config.yaml` by default), prepares the data directory and
/// runs the driver of the configured run type.
pub fn main() -> Result<(), StagerError> {
    let config_path = env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("config.yaml"), PathBuf::from);

    let core = Core::new(&config_path)?;
    let tools = ExternalTools::new(&core.config.tools);

    run(
        &core.config,
        &core.data_dir,
        &HostFs,
        &tools,
        core.queue.as_ref(),
        CancelToken::new(),
    )
}

/// Structure containing everything a run needs before staging starts.
pub struct Core {
    pub config: Config,
    pub data_dir: PathBuf,
    pub queue: Box<dyn JobQueue>,
}

impl Core {
    pub fn new(config_path: &Path) -> Result<Self, StagerError> {
        debug!("Reading configuration from {}", config_path.display());
        let config = Config::new_from_file(config_path)?;

        let data_dir = config.output_dir.join("data");
        debug!("Preparing data directory {}", data_dir.display());
        fs::create_dir_all(&data_dir)?;

        let queue: Box<dyn JobQueue> = match Dialect::for_machine(config.machine) {
            Some(dialect) => Box::new(BatchScheduler::new(dialect, &config.hpss)),
            None => Box::new(NoScheduler::new(config.machine)),
        };

        Ok(Core {
            config,
            data_dir,
            queue,
        })
    }
}

/// Stages all files of the configured run into `data_dir`.
pub fn run(
    config: &Config,
    data_dir: &Path,
    probe: &dyn Probe,
    tools: &dyn Toolbox,
    queue: &dyn JobQueue,
    cancel: CancelToken,
) -> Result<(), StagerError> {
    info!("Staging data into {}", data_dir.display());

    let staging = Staging::new(probe, tools);
    let runner = JobRunner::new(queue, cancel, &config.hpss.htar, &config.tools.cnvgrib);
    let limits = JobLimits {
        walltime: Duration::from_secs(config.hpss.walltime * 60),
        tick: Duration::from_secs(config.hpss.poll_tick),
    };
    let fetcher = Fetcher::new(probe, &staging, &runner, limits);

    let ctx = Context {
        config,
        data_dir: data_dir.to_path_buf(),
        probe,
        fetcher: &fetcher,
    };

    drivers::run(&ctx)
}
