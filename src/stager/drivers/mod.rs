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

//! Drivers of the verification use cases.
//!
//! Each driver expands its time grid, then stages forecasts of every
//! model and the matching truth files. Forecasts and analyses of all
//! drivers share the helpers in this module so that the destination
//! names under `data/<model>/` are the same for every run type.

pub mod grid2grid;
pub mod grid2obs;
pub mod maps;
pub mod precip;
pub mod stats;
pub mod tropcyc;

use super::archive::tape::{Dump, TapeKind, TapeSpec};
use super::archive::{LogicalFile, Probe};
use super::configuration::{AnalysisSource, Config, HourWindow, ModelConfig, RunType};
use super::fetch::{Fetched, Fetcher, Miss, MissReason};
use super::staging::{ErrorRecord, StageMode, Staging, Toolbox};
use super::template;
use super::timegrid::{ymdh, Lead, TimeSlot, TimeWindow};
use crate::constants::HPSS_PROD_BASE_DIR;
use crate::errors::{ConfigError, StagerError};
use chrono::NaiveDateTime;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Everything a driver needs, built once per run.
pub struct Context<'a> {
    pub config: &'a Config,
    pub data_dir: PathBuf,
    pub probe: &'a dyn Probe,
    pub fetcher: &'a Fetcher<'a>,
}

impl<'a> Context<'a> {
    pub fn staging(&self) -> &'a Staging<'a> {
        self.fetcher.staging()
    }

    pub fn tools(&self) -> &'a dyn Toolbox {
        self.staging().tools()
    }

    /// Directory under `data/`, created when missing.
    pub fn subdir(&self, name: &str) -> io::Result<PathBuf> {
        let dir = self.data_dir.join(name);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn model_dir(&self, model: &ModelConfig) -> io::Result<PathBuf> {
        self.subdir(&model.name)
    }

    pub fn window(&self, hours: &HourWindow) -> Result<TimeWindow, ConfigError> {
        hours.check_bounds()?;
        TimeWindow::new(self.config.start_date, self.config.end_date, hours)
    }
}

/// Runs the driver selected in the configuration.
pub fn run(ctx: &Context) -> Result<(), StagerError> {
    let config = ctx.config;
    info!(
        "Staging data for {:?} of {} model(s) from {} to {}",
        config.run,
        config.models.len(),
        config.start_date,
        config.end_date
    );

    match config.run {
        RunType::Grid2GridStep1 => grid2grid::run(ctx),
        RunType::Grid2ObsStep1 => grid2obs::run(ctx),
        RunType::PrecipStep1 => precip::run(ctx),
        RunType::Grid2GridStep2 => stats::run(
            ctx,
            stats::StatCategory::Grid2Grid,
            Config::section(&config.grid2grid_step2, "grid2grid_step2")?,
        ),
        RunType::Grid2ObsStep2 => stats::run(
            ctx,
            stats::StatCategory::Grid2Obs,
            Config::section(&config.grid2obs_step2, "grid2obs_step2")?,
        ),
        RunType::PrecipStep2 => stats::run(
            ctx,
            stats::StatCategory::Precip,
            Config::section(&config.precip_step2, "precip_step2")?,
        ),
        RunType::Tropcyc => tropcyc::run(ctx),
        RunType::Maps2d => maps::run_maps2d(ctx),
        RunType::Mapsda => maps::run_mapsda(ctx),
    }
}

/// Progress bar over a phase of a driver.
pub fn progress(len: usize, prefix: &str) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .progress_chars("#>-"),
    );
    bar.set_prefix(prefix.to_string());
    bar
}

pub fn forecast_destination(dir: &Path, slot: &TimeSlot) -> PathBuf {
    dir.join(format!("f{}.{}", slot.lead.label, ymdh(&slot.init)))
}

pub fn analysis_destination(dir: &Path, valid: &NaiveDateTime) -> PathBuf {
    dir.join(format!("anl.{}", ymdh(valid)))
}

/// Tape location of a model grid, when the template names a known stream.
fn grid_tape(root: &str, format: &str, suffix: String, model: &str, time: NaiveDateTime) -> Option<TapeSpec> {
    let dump = Dump::from_file_format(format)?;
    let kind = TapeKind::ModelGrid {
        dump,
        suffix,
        model: model.to_string(),
    };
    Some(TapeSpec::new(root, kind, time))
}

fn with_tape(file: LogicalFile, tape: Option<TapeSpec>) -> LogicalFile {
    match tape {
        Some(tape) => file.with_tape(tape),
        None => file,
    }
}

/// Model forecast for the slot named by the template,
/// from the model directory or its tape root.
pub fn forecast_file(model: &ModelConfig, format: &str, slot: &TimeSlot) -> Result<LogicalFile, StagerError> {
    let online = model.online_dir().join(template::resolve_slot(format, slot)?);
    let tape = grid_tape(
        &model.hpss_dir,
        format,
        format!("f{}", slot.lead.padded(3)),
        &model.name,
        slot.init,
    );

    Ok(with_tape(LogicalFile::online(online), tape))
}

pub fn stage_forecast(
    ctx: &Context,
    model: &ModelConfig,
    format: &str,
    slot: &TimeSlot,
    mode: StageMode,
) -> Result<(PathBuf, Fetched), StagerError> {
    let destination = forecast_destination(&ctx.model_dir(model)?, slot);
    let file = forecast_file(model, format, slot)?;
    let fetched = ctx
        .fetcher
        .fetch(&file, &destination, mode, ctx.config.model_tape_enabled())?;

    Ok((destination, fetched))
}

/// Stages forecasts of all slots except the skipped cycles.
pub fn stage_forecasts(
    ctx: &Context,
    model: &ModelConfig,
    format: &str,
    slots: &[TimeSlot],
) -> Result<(), StagerError> {
    info!("Getting {} forecast files", model.name);
    let bar = progress(slots.len(), &format!("{} forecasts", model.name));

    for slot in slots {
        if !slot.is_skipped_cycle() {
            stage_forecast(ctx, model, format, slot, StageMode::Link)?;
        }
        bar.inc(1);
    }

    bar.finish_with_message("done");
    Ok(())
}

/// How the truth file of a model is resolved.
#[derive(Copy, Clone, Debug)]
pub struct AnalysisRequest<'a> {
    pub source: AnalysisSource,
    pub format: &'a str,
    /// Substitute the lead zero forecast when no analysis exists.
    pub f00_fallback: bool,
}

/// Picks the analysis template: GFS analyses and single entry lists
/// are shared, otherwise templates follow the model order.
pub fn analysis_format<'a>(
    list: &'a [String],
    source: AnalysisSource,
    index: usize,
    model: &ModelConfig,
) -> Result<&'a str, ConfigError> {
    let position = if source.is_gfs() || list.len() == 1 { 0 } else { index };

    list.get(position)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::MissingModelKey(model.name.clone(), "anl_file_format_list"))
}

/// Stages `anl.<valid>` of the model, recording a miss.
pub fn stage_analysis(
    ctx: &Context,
    model: &ModelConfig,
    request: &AnalysisRequest,
    valid: &NaiveDateTime,
) -> Result<Fetched, StagerError> {
    let dir = ctx.model_dir(model)?;
    let destination = analysis_destination(&dir, valid);
    let slot = TimeSlot::analysis(*valid);

    let (online_dir, root) = if request.source.is_gfs() {
        (ctx.config.sources.gstat.join("gfs"), HPSS_PROD_BASE_DIR)
    } else {
        (model.online_dir(), model.hpss_dir.as_str())
    };

    let online = online_dir.join(template::resolve_slot(request.format, &slot)?);
    let tape = grid_tape(root, request.format, "anl".to_string(), &model.name, *valid);
    let file = with_tape(LogicalFile::online(online), tape);

    let fetched = ctx
        .fetcher
        .fetch(&file, &destination, StageMode::Link, ctx.config.model_tape_enabled())?;

    let miss = match &fetched {
        Fetched::Missing(miss) => miss,
        _ => return Ok(fetched),
    };

    ErrorRecord::for_slot(&dir, "anl_", valid).record_once(&miss.message())?;

    if !request.f00_fallback {
        return Ok(fetched);
    }

    substitute_f00(ctx, model, &dir, &destination, &slot)
}

/// Uses the lead zero forecast valid at the analysis time as the analysis.
fn substitute_f00(
    ctx: &Context,
    model: &ModelConfig,
    dir: &Path,
    destination: &Path,
    slot: &TimeSlot,
) -> Result<Fetched, StagerError> {
    let staging = ctx.staging();
    let f00 = forecast_destination(dir, slot);

    if staging.presence(&f00).is_done() {
        info!("Linking {} as analysis", f00.display());
        staging.stage(&f00, destination, StageMode::Link);
        return Ok(presence_as_fetched(ctx, destination));
    }

    let fetched = ctx.fetcher.fetch(
        &forecast_file(model, &model.file_format, slot)?,
        destination,
        StageMode::Link,
        ctx.config.model_tape_enabled(),
    )?;

    if fetched.is_present() {
        staging.stage(destination, &f00, StageMode::Link);
    }

    Ok(fetched)
}

fn presence_as_fetched(ctx: &Context, destination: &Path) -> Fetched {
    if ctx.staging().presence(destination).is_done() {
        Fetched::AlreadyStaged
    } else {
        warn!("Cannot link analysis {}", destination.display());
        Fetched::Missing(Miss {
            reason: MissReason::StageFailed,
            searched: destination.display().to_string(),
            tape: None,
        })
    }
}

/// Stages `f00.<valid>` needed by surface verification.
pub fn stage_surface_f00(ctx: &Context, model: &ModelConfig, valid: &NaiveDateTime) -> Result<(), StagerError> {
    let slot = TimeSlot::from_init(*valid, Lead::zero());
    let (_, fetched) = stage_forecast(ctx, model, &model.file_format, &slot, StageMode::Link)?;

    if let Fetched::Missing(miss) = fetched {
        let dir = ctx.model_dir(model)?;
        ErrorRecord::for_slot(&dir, "f00_", valid).record_once(&miss.message())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn model() -> ModelConfig {
        serde_yaml::from_str(
            "{ name: gfs, dir: /online, file_format: 'pgbf{lead?fmt=%2H}.gfs.{init?fmt=%Y%m%d%H}' }",
        )
        .unwrap()
    }

    #[test]
    fn destinations() {
        let init = NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let slot = TimeSlot::from_init(init, Lead::new(6));

        assert_eq!(
            forecast_destination(Path::new("data/gfs"), &slot),
            PathBuf::from("data/gfs/f06.2021010112")
        );
        assert_eq!(
            analysis_destination(Path::new("data/gfs"), &slot.valid),
            PathBuf::from("data/gfs/anl.2021010118")
        );
    }

    #[test]
    fn forecast_file_locations() {
        let init = NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let model = model();
        let file = forecast_file(&model, &model.file_format, &TimeSlot::from_init(init, Lead::new(24))).unwrap();

        assert_eq!(file.online, PathBuf::from("/online/gfs/pgbf24.gfs.2021010100"));
        match file.tape.unwrap().kind {
            TapeKind::ModelGrid { dump, suffix, .. } => {
                assert_eq!(dump, Dump::Gfs);
                assert_eq!(suffix, "f024");
            }
            other => panic!("unexpected tape kind {:?}", other),
        }
    }

    #[test]
    fn analysis_template_choice() {
        let list = vec!["a0".to_string(), "a1".to_string()];
        let model = model();

        assert_eq!(analysis_format(&list, AnalysisSource::SelfAnl, 1, &model).unwrap(), "a1");
        assert_eq!(analysis_format(&list, AnalysisSource::GfsAnl, 1, &model).unwrap(), "a0");
        assert_eq!(analysis_format(&list[..1], AnalysisSource::SelfF00, 1, &model).unwrap(), "a0");
        assert!(analysis_format(&list, AnalysisSource::SelfAnl, 2, &model).is_err());
    }
}
