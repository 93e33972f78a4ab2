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

//! Grid-to-observation verification: model forecasts and the prepbufr
//! observation files valid at the forecast valid times.

use super::{stage_forecasts, Context};
use crate::errors::{ConfigError, StagerError};
use crate::stager::archive::tape::{TapeKind, TapeSpec};
use crate::stager::archive::LogicalFile;
use crate::stager::configuration::{Config, ObsCategory};
use crate::stager::fetch::Fetched;
use crate::stager::staging::{ErrorRecord, StageMode};
use crate::stager::timegrid::{generate, unique_valid_times, ymd, ymdh, Lead};
use chrono::{Duration, NaiveDateTime, Timelike};
use log::info;
use std::path::PathBuf;

/// Last date of CONUS surface observations from the NDAS system.
const LAST_NDAS_DATE: &str = "20170319";

pub fn run(ctx: &Context) -> Result<(), StagerError> {
    let config = ctx.config;
    let section = Config::section(&config.grid2obs_step1, "grid2obs_step1")?;
    let tape_enabled = section.prepbufr_hpss && config.machine.has_tape_access();

    for category in &section.types {
        let hours = category
            .hours
            .as_ref()
            .or(section.hours.as_ref())
            .ok_or(ConfigError::MissingSection("grid2obs_step1.hours"))?;
        let leads = category
            .fhr_list
            .as_ref()
            .or(section.fhr_list.as_ref())
            .ok_or(ConfigError::MissingSection("grid2obs_step1.fhr_list"))?;

        let window = ctx.window(hours)?;
        let slots = generate(&window, leads, config.make_met_data_by);

        for model in &config.models {
            stage_forecasts(ctx, model, &model.file_format, &slots)?;
        }

        info!("Getting {:?} prepbufr files", category.name);
        for valid in unique_valid_times(&slots) {
            stage_prepbufr(ctx, category.name, &valid, tape_enabled)?;
        }
    }

    Ok(())
}

/// Staged prepbufr name and the files that can provide it, in order.
#[derive(Clone, PartialEq, Debug)]
pub struct PrepbufrRequest {
    pub name: String,
    pub candidates: Vec<LogicalFile>,
}

/// Observation files of the category valid at the given time.
pub fn prepbufr_request(config: &Config, category: ObsCategory, valid: &NaiveDateTime) -> PrepbufrRequest {
    let sources = &config.sources;
    let restriction = config.machine.prepbufr_suffix();
    let date = ymd(valid);
    let hour = valid.format("%H").to_string();

    match category {
        ObsCategory::UpperAir => {
            let online = sources
                .prepbufr_prod_upper_air_dir
                .join(format!("gdas.{}", date))
                .join(&hour)
                .join(format!("gdas.t{}z.prepbufr{}", hour, restriction));
            let archive = sources
                .prepbufr_arch_dir
                .join("gdas")
                .join(format!("prepbufr.gdas.{}{}", ymdh(valid), restriction));
            let tape = TapeSpec::operational(TapeKind::UpperAirBufr { restriction }, *valid);

            PrepbufrRequest {
                name: format!("prepbufr.gdas.{}", ymdh(valid)),
                candidates: vec![LogicalFile::online(online).with_archive(archive).with_tape(tape)],
            }
        }
        ObsCategory::ConusSfc if date.as_str() > LAST_NDAS_DATE => {
            let offset = valid.hour() % 6;
            PrepbufrRequest {
                name: format!("prepbufr.nam.{}", ymdh(valid)),
                candidates: vec![conus_file(config, "nam", "nam", valid, offset)],
            }
        }
        ObsCategory::ConusSfc => {
            let offsets: &[u32] = if valid.hour() % 6 == 0 { &[12, 6, 0] } else { &[9, 3] };
            PrepbufrRequest {
                name: format!("prepbufr.ndas.{}", ymdh(valid)),
                candidates: offsets
                    .iter()
                    .map(|offset| {
                        let prefix = if *offset == 0 { "nam" } else { "ndas" };
                        conus_file(config, "ndas", prefix, valid, *offset)
                    })
                    .collect(),
            }
        }
    }
}

/// CONUS surface file of the cycle `offset` hours after the valid time,
/// holding the observations in its `tm<offset>` section.
fn conus_file(config: &Config, system: &str, prefix: &str, valid: &NaiveDateTime, offset: u32) -> LogicalFile {
    let sources = &config.sources;
    let restriction = config.machine.prepbufr_suffix();
    let cycle = *valid + Duration::hours(i64::from(offset));
    let tm = Lead::new(offset);

    let dated_dir = format!("{}.{}", system, ymd(&cycle));
    let name = format!(
        "{}.t{}z.prepbufr.tm{}{}",
        prefix,
        cycle.format("%H"),
        tm.label,
        restriction
    );

    let online: PathBuf = sources.prepbufr_prod_conus_sfc_dir.join(&dated_dir).join(&name);
    let archive = sources.prepbufr_arch_dir.join(system).join(&dated_dir).join(&name);

    let kind = if system == "nam" {
        TapeKind::NamBufr { tm, restriction }
    } else {
        TapeKind::NdasBufr { tm, restriction }
    };

    LogicalFile::online(online)
        .with_archive(archive)
        .with_tape(TapeSpec::operational(kind, cycle))
}

/// Tries the candidates until one is staged, recording every miss otherwise.
fn stage_prepbufr(
    ctx: &Context,
    category: ObsCategory,
    valid: &NaiveDateTime,
    tape_enabled: bool,
) -> Result<(), StagerError> {
    let dir = ctx.subdir("prepbufr")?;
    let request = prepbufr_request(ctx.config, category, valid);
    let destination = dir.join(&request.name);

    let mut misses = vec![];
    for file in &request.candidates {
        match ctx.fetcher.fetch(file, &destination, StageMode::Link, tape_enabled)? {
            Fetched::Missing(miss) => misses.push(miss),
            _ => return Ok(()),
        }
    }

    let record = ErrorRecord::for_slot(&dir, "", valid);
    for miss in misses {
        record.append(&miss.message())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stager::configuration::Machine;
    use chrono::NaiveDate;

    const CONFIG: &str = r#"
run: grid2obs_step1
machine: WCOSS_DELL_P3
start_date: 20170101
end_date: 20170101
make_met_data_by: VALID
models:
  - { name: gfs, dir: /online, file_format: "pgbf{lead?fmt=%2H}.gfs.{init?fmt=%Y%m%d%H}" }
sources:
  prepbufr_prod_upper_air_dir: /prod/gdas
  prepbufr_prod_conus_sfc_dir: /prod/nam
  prepbufr_arch_dir: /arch/prepbufr
grid2obs_step1:
  hours: { beg: 0, end: 0, inc: 21600 }
  fhr_list: [24]
  types: [ { name: upper_air }, { name: conus_sfc } ]
"#;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn upper_air_locations() {
        let mut config = Config::new_from_slice(CONFIG.as_bytes()).unwrap();
        let request = prepbufr_request(&config, ObsCategory::UpperAir, &at(2020, 5, 1, 12));

        assert_eq!(request.name, "prepbufr.gdas.2020050112");
        assert_eq!(
            request.candidates[0].online,
            PathBuf::from("/prod/gdas/gdas.20200501/12/gdas.t12z.prepbufr")
        );

        config.machine = Machine::Orion;
        let request = prepbufr_request(&config, ObsCategory::UpperAir, &at(2020, 5, 1, 12));
        assert_eq!(
            request.candidates[0].archive,
            Some(PathBuf::from("/arch/prepbufr/gdas/prepbufr.gdas.2020050112.nr"))
        );
    }

    #[test]
    fn nam_offset_cycle() {
        let config = Config::new_from_slice(CONFIG.as_bytes()).unwrap();
        let request = prepbufr_request(&config, ObsCategory::ConusSfc, &at(2019, 12, 31, 21));

        assert_eq!(request.name, "prepbufr.nam.2019123121");
        assert_eq!(request.candidates.len(), 1);
        assert_eq!(
            request.candidates[0].online,
            PathBuf::from("/prod/nam/nam.20200101/nam.t00z.prepbufr.tm03")
        );
    }

    #[test]
    fn ndas_candidate_group() {
        let config = Config::new_from_slice(CONFIG.as_bytes()).unwrap();

        let synoptic = prepbufr_request(&config, ObsCategory::ConusSfc, &at(2017, 3, 19, 12));
        let names: Vec<PathBuf> = synoptic.candidates.iter().map(|c| c.online.clone()).collect();
        assert_eq!(synoptic.name, "prepbufr.ndas.2017031912");
        assert_eq!(
            names,
            vec![
                PathBuf::from("/prod/nam/ndas.20170320/ndas.t00z.prepbufr.tm12"),
                PathBuf::from("/prod/nam/ndas.20170319/ndas.t18z.prepbufr.tm06"),
                PathBuf::from("/prod/nam/ndas.20170319/nam.t12z.prepbufr.tm00"),
            ]
        );

        let intermediate = prepbufr_request(&config, ObsCategory::ConusSfc, &at(2017, 3, 19, 3));
        assert_eq!(intermediate.candidates.len(), 2);
        assert!(intermediate.candidates[0]
            .online
            .ends_with("ndas.20170319/ndas.t12z.prepbufr.tm09"));
    }
}
