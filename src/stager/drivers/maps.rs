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

//! Map diagnostics: 2D forecast and analysis maps with optional
//! climatology observations, and data assimilation maps.
//!
//! Besides staging, both runs write file lists (`*_file_list.txt`)
//! naming the staged files the plotting step reads. Lists are rewritten
//! on every run and only name slots complete for all models.

use super::{
    analysis_destination, analysis_format, forecast_destination, progress, stage_analysis, stage_forecasts,
    AnalysisRequest, Context,
};
use crate::errors::{ConfigError, StagerError};
use crate::stager::archive::tape::{Dump, TapeKind, TapeSpec};
use crate::stager::archive::LogicalFile;
use crate::stager::configuration::{AnalysisSource, Config, DaFlavour, DaType, Hpss, Maps2d, Mapsda, ModelConfig};
use crate::stager::staging::StageMode;
use crate::stager::template;
use crate::stager::timegrid::{
    generate, unique_valid_times, ymdh, zero_fill, Lead, LeadOffset, TimeSlot, TimeWindow,
};
use chrono::NaiveDateTime;
use log::{info, warn};
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Observations served from the VSDB climatology tree, they have no monthly means.
const VSDB_OBS: [&str; 4] = ["clwp", "nvap", "rad_isccp", "rad_srb2"];

/// Variables averaged from `nc` ensemble statistics files.
const ENS_NC_VARIABLES: &str = "tmp,ugrd,vgrd,spfh,pressfc,o3mr,clwmr";

/// Lines of every file list, keyed by list path.
#[derive(Default, Debug)]
struct Manifests {
    lists: BTreeMap<PathBuf, Vec<String>>,
}

impl Manifests {
    fn push(&mut self, list: PathBuf, entry: &Path) {
        self.lists
            .entry(list)
            .or_default()
            .push(entry.display().to_string());
    }

    fn write(&self) -> io::Result<()> {
        for (list, entries) in &self.lists {
            let mut content = entries.join("\n");
            content.push('\n');
            fs::write(list, content)?;
            info!("Wrote {} entries to {}", entries.len(), list.display());
        }
        Ok(())
    }
}

/// Climatology observation compared with model monthly fields.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ClimoObs {
    pub name: &'static str,
    pub monthly_mean: bool,
}

impl ClimoObs {
    /// Directory of the observation relative to the observation data root.
    pub fn source_dir(&self) -> PathBuf {
        if VSDB_OBS.contains(&self.name) {
            PathBuf::from("vsdb_climo_data/CF_compliant")
        } else if self.monthly_mean {
            Path::new(self.name).join("monthly_mean")
        } else {
            Path::new(self.name).join("monthly_climo")
        }
    }

    /// `<ob>_<Mon><YYYY>.nc` for monthly means, `<ob>_<Mon>.nc` for climatologies.
    pub fn file_name(&self, valid: &NaiveDateTime) -> String {
        if self.monthly_mean {
            format!("{}_{}.nc", self.name, valid.format("%b%Y"))
        } else {
            format!("{}_{}.nc", self.name, valid.format("%b"))
        }
    }

    /// Monthly climatology used when the monthly mean is missing.
    fn climatology(&self) -> ClimoObs {
        ClimoObs {
            name: self.name,
            monthly_mean: false,
        }
    }
}

/// Observations of the `model2obs` comparison.
pub fn climo_obs(section: &Maps2d) -> Vec<ClimoObs> {
    let mut names = vec!["gpcp", "ghcn_cams"];
    if section.use_ceres {
        names.push("ceres");
    } else {
        names.extend(VSDB_OBS);
    }

    names
        .into_iter()
        .map(|name| ClimoObs {
            name,
            monthly_mean: section.use_monthly_mean && !VSDB_OBS.contains(&name),
        })
        .collect()
}

/// Leads plotted for an entry of `forecast_to_plot_list`:
/// `anl`, a single lead `fNN` or the four synoptic leads of day `dN`.
pub fn expand_forecast_to_plot(entry: &str) -> Result<Vec<Lead>, ConfigError> {
    let unsupported = || ConfigError::Unsupported(entry.to_string(), "maps2d.forecast_to_plot_list");

    if entry == "anl" {
        return Ok(vec![Lead::zero()]);
    }

    if let Some(label) = entry.strip_prefix('f') {
        let hours = label.parse::<u32>().map_err(|_| unsupported())?;
        return Ok(vec![Lead {
            hours,
            label: label.to_string(),
        }]);
    }

    if let Some(day) = entry.strip_prefix('d') {
        let day = day.parse::<u32>().map_err(|_| unsupported())?;
        if day == 0 {
            return Err(unsupported());
        }
        let last = day * 24;

        return Ok([last - 18, last - 12, last - 6, last]
            .iter()
            .map(|&hours| Lead {
                hours,
                label: zero_fill(&hours.to_string(), 2),
            })
            .collect());
    }

    Err(unsupported())
}

/// Path of the staged observation, `data/obs/<ob>/<file>`.
fn obs_destination(data_dir: &Path, ob: &ClimoObs, valid: &NaiveDateTime) -> PathBuf {
    data_dir.join("obs").join(ob.name).join(ob.file_name(valid))
}

pub fn run_maps2d(ctx: &Context) -> Result<(), StagerError> {
    let config = ctx.config;
    let section = Config::section(&config.maps2d, "maps2d")?;

    let window = ctx.window(&section.hours)?;
    let slots = generate(&window, &section.fhr_list, section.make_met_data_by);
    let analysis_only = section.fhr_list.iter().all(LeadOffset::is_analysis);
    let plots_analysis = section.forecast_to_plot_list.iter().any(|ftp| ftp == "anl");

    let mut analysis_times = Vec::new();
    if section.forecast_anl_diff {
        analysis_times.extend(unique_valid_times(&slots));
    }
    if plots_analysis {
        let analyses = generate(&window, &[LeadOffset::Analysis], section.make_met_data_by);
        analysis_times.extend(analyses.iter().map(|slot| slot.valid));
    }
    let mut seen = FxHashSet::default();
    analysis_times.retain(|valid| seen.insert(*valid));

    for (index, model) in config.models.iter().enumerate() {
        if !analysis_only {
            stage_forecasts(ctx, model, &model.file_format, &slots)?;
        }

        if analysis_times.is_empty() {
            continue;
        }

        info!("Getting {} analysis files", model.name);
        let request = AnalysisRequest {
            source: section.anl_name,
            format: analysis_format(&section.anl_file_format_list, section.anl_name, index, model)?,
            f00_fallback: false,
        };
        for valid in &analysis_times {
            stage_analysis(ctx, model, &request, valid)?;
        }
    }

    let model2obs = section.type_list.iter().any(|kind| kind == "model2obs");
    let obs = if model2obs { climo_obs(section) } else { Vec::new() };
    if model2obs {
        stage_climo_obs(ctx, section, &window, &obs)?;
    }

    let mut manifests = Manifests::default();
    for ftp in &section.forecast_to_plot_list {
        for lead in expand_forecast_to_plot(ftp)? {
            let leads = [LeadOffset::Forecast(lead)];
            let slots = generate(&window, &leads, section.make_met_data_by);

            for slot in slots.iter().filter(|slot| !slot.is_skipped_cycle()) {
                list_model_files(ctx, &mut manifests, ftp, slot, section.forecast_anl_diff)?;

                for ob in &obs {
                    let dir = ctx.data_dir.join("obs").join(ob.name);
                    let list = dir.join(format!("{}_{}_file_list.txt", ob.name, ftp));
                    manifests.push(list, &obs_destination(&ctx.data_dir, ob, &slot.valid));
                }
            }
        }
    }

    manifests.write()?;
    Ok(())
}

fn stage_climo_obs(ctx: &Context, section: &Maps2d, window: &TimeWindow, obs: &[ClimoObs]) -> Result<(), StagerError> {
    let obdata = &ctx.config.sources.obdata_dir;
    let staging = ctx.staging();
    let mut staged = FxHashSet::default();

    for ob in obs {
        ctx.subdir(&format!("obs/{}", ob.name))?;
    }

    info!("Getting climatology observations");
    for ftp in &section.forecast_to_plot_list {
        for lead in expand_forecast_to_plot(ftp)? {
            let leads = [LeadOffset::Forecast(lead)];

            for slot in generate(window, &leads, section.make_met_data_by) {
                for ob in obs {
                    let destination = obs_destination(&ctx.data_dir, ob, &slot.valid);
                    if !staged.insert(destination.clone()) || staging.presence(&destination).is_done() {
                        continue;
                    }

                    let mut source = obdata.join(ob.source_dir()).join(ob.file_name(&slot.valid));
                    if !ctx.probe.exists(&source) && ob.monthly_mean {
                        let climatology = ob.climatology();
                        source = obdata
                            .join(climatology.source_dir())
                            .join(climatology.file_name(&slot.valid));
                    }

                    if ctx.probe.exists(&source) {
                        staging.stage(&source, &destination, StageMode::Link);
                    } else {
                        warn!("WARNING: {} does not exist", source.display());
                    }
                }
            }
        }
    }

    Ok(())
}

/// Lists the slot files of all models when every model has them.
fn list_model_files(
    ctx: &Context,
    manifests: &mut Manifests,
    ftp: &str,
    slot: &TimeSlot,
    forecast_anl_diff: bool,
) -> Result<(), StagerError> {
    let mut entries = Vec::with_capacity(ctx.config.models.len());

    for model in &ctx.config.models {
        let dir = ctx.data_dir.join(&model.name);
        let analysis = analysis_destination(&dir, &slot.valid);

        let (file, paired) = if ftp == "anl" {
            (analysis, None)
        } else if forecast_anl_diff {
            (forecast_destination(&dir, slot), Some(analysis))
        } else {
            (forecast_destination(&dir, slot), None)
        };

        let complete = ctx.probe.exists(&file) && paired.as_ref().map_or(true, |anl| ctx.probe.exists(anl));
        if !complete {
            return Ok(());
        }
        entries.push((model, dir, file, paired));
    }

    for (model, dir, file, paired) in entries {
        manifests.push(dir.join(format!("{}_{}_file_list.txt", model.name, ftp)), &file);
        if let Some(analysis) = paired {
            manifests.push(dir.join(format!("{}_{}_anl_file_list.txt", model.name, ftp)), &analysis);
        }
    }

    Ok(())
}

pub fn run_mapsda(ctx: &Context) -> Result<(), StagerError> {
    let section = Config::section(&ctx.config.mapsda, "mapsda")?;

    for kind in &section.type_list {
        match kind {
            DaType::Gdas => run_gdas(ctx, section, Config::section(&section.gdas, "mapsda.gdas")?)?,
            DaType::Ens => run_ens(ctx, section, Config::section(&section.ens, "mapsda.ens")?)?,
        }
    }

    Ok(())
}

/// Whether the flavour may retrieve from tape.
fn flavour_tape_enabled(config: &Config, flavour: &DaFlavour) -> bool {
    flavour.hpss.unwrap_or(config.hpss.enabled) && config.machine.has_tape_access()
}

/// Label of the guess lead used in file list names.
fn guess_label(flavour: &DaFlavour) -> String {
    match &flavour.guess_hour {
        LeadOffset::Analysis => "anl".to_string(),
        LeadOffset::Forecast(lead) => lead.label.clone(),
    }
}

/// GDAS guess forecasts against the model analyses.
fn run_gdas(ctx: &Context, section: &Mapsda, flavour: &DaFlavour) -> Result<(), StagerError> {
    let config = Config {
        hpss: Hpss {
            enabled: flavour_tape_enabled(ctx.config, flavour),
            ..ctx.config.hpss.clone()
        },
        ..ctx.config.clone()
    };
    let ctx = Context {
        config: &config,
        data_dir: ctx.data_dir.clone(),
        probe: ctx.probe,
        fetcher: ctx.fetcher,
    };

    let window = ctx.window(&section.hours)?;
    let slots = generate(&window, &[flavour.guess_hour.clone()], flavour.make_met_data_by);
    let valid_times = unique_valid_times(&slots);

    for (index, model) in config.models.iter().enumerate() {
        let format = model.require(&model.gdas_file_format, "gdas_file_format")?;
        stage_forecasts(&ctx, model, format, &slots)?;

        info!("Getting {} analysis files", model.name);
        let request = AnalysisRequest {
            source: AnalysisSource::SelfAnl,
            format: analysis_format(&flavour.anl_file_format_list, AnalysisSource::SelfAnl, index, model)?,
            f00_fallback: false,
        };
        for valid in &valid_times {
            stage_analysis(&ctx, model, &request, valid)?;
        }
    }

    let label = guess_label(flavour);
    let mut manifests = Manifests::default();
    for slot in slots.iter().filter(|slot| !slot.is_skipped_cycle()) {
        list_model_files(&ctx, &mut manifests, &label, slot, true)?;
    }

    manifests.write()?;
    Ok(())
}

/// Ensemble statistic file of a slot.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct EnsProduct {
    /// `atmanl` or `atmf0<lead>`.
    pub product: String,
    /// `mean` or `spread`.
    pub statistic: &'static str,
    pub suffix: String,
}

impl EnsProduct {
    pub fn new(slot_lead: &LeadOffset, statistic: &'static str, suffix: &str) -> Self {
        // ensemble output names the guess by its unpadded hour (atmf06),
        // whatever padding the configured lead label carries
        let product = match slot_lead {
            LeadOffset::Analysis => "atmanl".to_string(),
            LeadOffset::Forecast(lead) => format!("atmf0{}", lead.hours),
        };

        EnsProduct {
            product,
            statistic,
            suffix: suffix.to_string(),
        }
    }

    /// `<product>.ens<statistic>.<suffix>` as found in the ensemble output.
    pub fn member(&self) -> String {
        format!("{}.ens{}.{}", self.product, self.statistic, self.suffix)
    }

    /// Online location relative to the ensemble directory.
    pub fn template(&self) -> String {
        format!(
            "enkfgdas.{{init?fmt=%Y%m%d}}/{{cycle?fmt=%H}}/gdas.t{{cycle?fmt=%H}}z.{}",
            self.member()
        )
    }

    pub fn destination(&self, dir: &Path, init: &NaiveDateTime) -> PathBuf {
        dir.join(format!(
            "{}.ens{}.{}.{}",
            self.product,
            self.statistic,
            ymdh(init),
            self.suffix
        ))
    }

    /// Average of all staged cycles.
    pub fn average(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.ens{}.nc", self.product, self.statistic))
    }
}

/// Ensemble mean and spread of every cycle, averaged over the period.
fn run_ens(ctx: &Context, section: &Mapsda, flavour: &DaFlavour) -> Result<(), StagerError> {
    let window = ctx.window(&section.hours)?;
    let slots = generate(&window, &[flavour.guess_hour.clone()], flavour.make_met_data_by);
    let tape_enabled = flavour_tape_enabled(ctx.config, flavour);

    for model in &ctx.config.models {
        let ens_dir = model.require(&model.ens_dir, "ens_dir")?;
        let suffix = model.require(&model.netcdf_suffix, "netcdf_suffix")?;
        let variables = match suffix.as_str() {
            "nc" => Some(ENS_NC_VARIABLES),
            "nc4" => None,
            other => return Err(ConfigError::Unsupported(other.to_string(), "netcdf_suffix").into()),
        };
        let dir = ctx.model_dir(model)?;

        for statistic in ["mean", "spread"] {
            let product = EnsProduct::new(&flavour.guess_hour, statistic, suffix);
            let staged = stage_ens(ctx, model, ens_dir, &product, &dir, &slots, tape_enabled)?;

            if staged.is_empty() {
                warn!("No {} files of {}, skipping average", product.member(), model.name);
                continue;
            }

            let output = product.average(&dir);
            info!("Averaging {} files into {}", staged.len(), output.display());
            if let Err(err) = ctx.tools().average(&staged, &output, variables) {
                warn!("Cannot average {}: {}", output.display(), err);
            }
        }
    }

    Ok(())
}

fn stage_ens(
    ctx: &Context,
    model: &ModelConfig,
    ens_dir: &Path,
    product: &EnsProduct,
    dir: &Path,
    slots: &[TimeSlot],
    tape_enabled: bool,
) -> Result<Vec<PathBuf>, StagerError> {
    let template = product.template();
    let bar = progress(slots.len(), &format!("{} ens{}", model.name, product.statistic));
    let mut staged = Vec::with_capacity(slots.len());

    for slot in slots {
        bar.inc(1);
        if slot.is_skipped_cycle() {
            continue;
        }

        let destination = product.destination(dir, &slot.init);
        let kind = TapeKind::ModelGrid {
            dump: Dump::Enkfgdas,
            suffix: product.member(),
            model: model.name.clone(),
        };
        let file = LogicalFile::online(ens_dir.join(template::resolve_slot(&template, slot)?))
            .with_tape(TapeSpec::new(&model.hpss_dir, kind, slot.init));

        if ctx
            .fetcher
            .fetch(&file, &destination, StageMode::Link, tape_enabled)?
            .is_present()
        {
            staged.push(destination);
        }
    }

    bar.finish_with_message("done");
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn labels(entry: &str) -> Vec<String> {
        expand_forecast_to_plot(entry)
            .unwrap()
            .into_iter()
            .map(|lead| lead.label)
            .collect()
    }

    #[test]
    fn forecast_to_plot_expansion() {
        assert_eq!(labels("anl"), vec!["00"]);
        assert_eq!(labels("f120"), vec!["120"]);
        assert_eq!(labels("d1"), vec!["06", "12", "18", "24"]);
        assert_eq!(labels("d3"), vec!["54", "60", "66", "72"]);
        assert!(expand_forecast_to_plot("d0").is_err());
        assert!(expand_forecast_to_plot("week1").is_err());
    }

    #[test]
    fn climatology_file_names() {
        let valid = at(2021, 3, 1, 0);
        let gpcp = ClimoObs {
            name: "gpcp",
            monthly_mean: true,
        };

        assert_eq!(gpcp.file_name(&valid), "gpcp_Mar2021.nc");
        assert_eq!(gpcp.source_dir(), PathBuf::from("gpcp/monthly_mean"));
        assert_eq!(gpcp.climatology().file_name(&valid), "gpcp_Mar.nc");
        assert_eq!(gpcp.climatology().source_dir(), PathBuf::from("gpcp/monthly_climo"));

        let nvap = ClimoObs {
            name: "nvap",
            monthly_mean: false,
        };
        assert_eq!(nvap.source_dir(), PathBuf::from("vsdb_climo_data/CF_compliant"));
    }

    #[test]
    fn ensemble_products() {
        let guess = LeadOffset::Forecast(Lead::new(6));
        let product = EnsProduct::new(&guess, "mean", "nc");

        assert_eq!(product.member(), "atmf06.ensmean.nc");
        assert_eq!(
            template::resolve_slot(&product.template(), &TimeSlot::from_init(at(2021, 1, 1, 12), Lead::new(6)))
                .unwrap(),
            "enkfgdas.20210101/12/gdas.t12z.atmf06.ensmean.nc"
        );
        assert_eq!(
            product.destination(Path::new("data/gfs"), &at(2021, 1, 1, 12)),
            PathBuf::from("data/gfs/atmf06.ensmean.2021010112.nc")
        );
        assert_eq!(
            product.average(Path::new("data/gfs")),
            PathBuf::from("data/gfs/atmf06.ensmean.nc")
        );

        let analysis = EnsProduct::new(&LeadOffset::Analysis, "spread", "nc4");
        assert_eq!(analysis.member(), "atmanl.ensspread.nc4");
    }
}
