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

//! METplus Data Staging (metstage) gathers numerical weather prediction
//! forecasts, analyses and observations needed by a verification run
//! and lays them out under `data/` in the uniform naming that the
//! verification tools expect.
//!
//! Files are searched on the online filesystem first, then on the
//! long-term archive disk and finally on the tape storage, where
//! a retrieval job is submitted to the batch scheduler and waited for.
//! Everything that already exists under `data/` is left untouched,
//! so the program can be safely rerun until all files are present.

mod constants;
mod errors;
mod stager;

use env_logger::Env;
use log::{error, info};
use std::process;

/// The main program function.
/// Prepares the runtime environment and calls the [`stager::main`].
///
/// To provide meaningful and high-quality error messages the `env_logger`
/// needs to be initiated before any log messages are possible to occur.
/// Fatal errors (invalid configuration, unsupported options) terminate
/// the process with non-zero exit status, missing data never does.
fn main() {
    #[cfg(not(feature = "debug"))]
    let logger_env = Env::new().filter_or("METSTAGE_LOG_LEVEL", "info");

    #[cfg(feature = "debug")]
    let logger_env = Env::new().filter_or("METSTAGE_LOG_LEVEL", "debug");

    env_logger::Builder::from_env(logger_env)
        .format_timestamp_millis()
        .init();

    match stager::main() {
        Ok(_) => info!("Data staging finished. Check the data directory and log."),
        Err(err) => {
            error!("Data staging failed with error: {}", err);
            process::exit(1);
        }
    }
}
