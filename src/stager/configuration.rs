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

//! Module responsible for parsing and checking the configuration file.
//!
//! The configuration file uses [YAML](https://en.wikipedia.org/wiki/YAML)
//! and `serde` to enforce strong typing and automatic type checking,
//! so an unsupported option value is reported before any file is touched.
//!
//! The structures and their fields in this module directly correspond to
//! the fields inside `config.yaml` so you can check this documentation
//! for more details how to set the config file.

use super::timegrid::{LeadOffset, TimeAxis};
use crate::constants::{HPSS_PROD_BASE_DIR, HPSS_WALLTIME_MINUTES, POLL_TICK_SECONDS};
use crate::errors::ConfigError;
use chrono::NaiveDate;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};

/// Verification use case selected for the run.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    #[serde(rename = "grid2grid_step1")]
    Grid2GridStep1,
    #[serde(rename = "grid2grid_step2")]
    Grid2GridStep2,
    #[serde(rename = "grid2obs_step1")]
    Grid2ObsStep1,
    #[serde(rename = "grid2obs_step2")]
    Grid2ObsStep2,
    #[serde(rename = "precip_step1")]
    PrecipStep1,
    #[serde(rename = "precip_step2")]
    PrecipStep2,
    Tropcyc,
    Maps2d,
    Mapsda,
}

/// Execution environment, it decides the batch scheduler
/// dialect and whether tape storage is reachable at all.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
pub enum Machine {
    #[serde(rename = "WCOSS_C")]
    WcossCray,
    #[serde(rename = "WCOSS_DELL_P3")]
    WcossDell,
    #[serde(rename = "HERA")]
    Hera,
    #[serde(rename = "ORION")]
    Orion,
}

impl Machine {
    pub fn has_tape_access(self) -> bool {
        !matches!(self, Machine::Orion)
    }

    /// Suffix of non-restricted observation files
    /// that must be used where restricted data is not allowed.
    pub fn prepbufr_suffix(self) -> &'static str {
        match self {
            Machine::Orion => ".nr",
            _ => "",
        }
    }
}

/// Source of the "truth" analysis used in grid-to-grid comparisons.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    SelfAnl,
    SelfF00,
    GfsAnl,
    GfsF00,
}

impl AnalysisSource {
    pub fn is_gfs(self) -> bool {
        matches!(self, AnalysisSource::GfsAnl | AnalysisSource::GfsF00)
    }
}

/// How archived statistics files were gathered.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
pub enum GatherBy {
    #[serde(rename = "VALID")]
    Valid,
    #[serde(rename = "INIT")]
    Init,
    #[serde(rename = "VSDB")]
    Vsdb,
}

impl GatherBy {
    pub fn dir_name(self) -> &'static str {
        match self {
            GatherBy::Valid => "by_VALID",
            GatherBy::Init => "by_INIT",
            GatherBy::Vsdb => "by_VSDB",
        }
    }
}

impl Default for GatherBy {
    fn default() -> Self {
        GatherBy::Valid
    }
}

/// Precipitation variable written by a model.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
pub enum PrecipVar {
    #[serde(rename = "APCP")]
    Apcp,
    #[serde(rename = "PRATE")]
    Prate,
}

/// Observation categories verified in grid-to-observation runs.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObsCategory {
    UpperAir,
    ConusSfc,
}

/// Ocean basins of tropical cyclones that have known deck sources.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
pub enum Basin {
    #[serde(rename = "AL")]
    Atlantic,
    #[serde(rename = "CP")]
    CentralPacific,
    #[serde(rename = "EP")]
    EastPacific,
    #[serde(rename = "WP")]
    WestPacific,
}

/// Data assimilation diagnostics flavour.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaType {
    Gdas,
    Ens,
}

/// Window of anchor hours with increment in seconds.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
pub struct HourWindow {
    pub beg: u32,
    pub end: u32,

    /// Increment between anchors in seconds.
    ///
    /// Cannot be smaller than `1`.
    pub inc: u32,
}

impl HourWindow {
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.beg > 23 || self.end > 23 {
            return Err(ConfigError::OutOfBounds(
                "Window hours must be between 0 and 23",
            ));
        }

        if self.inc < 1 {
            return Err(ConfigError::OutOfBounds(
                "Window increment cannot be smaller than 1 second",
            ));
        }

        Ok(())
    }
}

/// Verified model and where its files live.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct ModelConfig {
    /// Model name, used also as the name of its `data/` subdirectory.
    pub name: String,

    /// Online directory holding `<name>/` with model output.
    pub dir: PathBuf,

    /// File naming template relative to `<dir>/<name>/`.
    pub file_format: String,

    /// _(Optional)_ Tape storage root of the model.
    /// Defaults to the operational runhistory archive.
    #[serde(default = "ModelConfig::default_hpss_dir")]
    pub hpss_dir: String,

    /// _(Optional)_ Archive of verification statistics.
    #[serde(default)]
    pub arch_dir: Option<PathBuf>,

    /// _(Optional)_ Overrides gathering of statistics files.
    #[serde(default)]
    pub gather_by: Option<GatherBy>,

    /// _(Optional)_ Precipitation bucket length in hours.
    #[serde(default)]
    pub precip_bucket: Option<u32>,

    /// _(Optional)_ Precipitation variable name.
    #[serde(default)]
    pub precip_var: Option<PrecipVar>,

    /// _(Optional)_ ATCF identifier used in track verification.
    #[serde(default)]
    pub atcf_name: Option<String>,

    /// _(Optional)_ Naming template of model track files.
    #[serde(default)]
    pub track_file_format: Option<String>,

    /// _(Optional)_ Template of gdas guess files in assimilation diagnostics.
    #[serde(default)]
    pub gdas_file_format: Option<String>,

    /// _(Optional)_ Online directory of ensemble mean and spread files.
    #[serde(default)]
    pub ens_dir: Option<PathBuf>,

    /// _(Optional)_ Suffix of ensemble netCDF files (`nc` or `nc4`).
    #[serde(default)]
    pub netcdf_suffix: Option<String>,
}

impl ModelConfig {
    fn default_hpss_dir() -> String {
        HPSS_PROD_BASE_DIR.to_string()
    }

    /// Root of online model output, `<dir>/<name>`.
    pub fn online_dir(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    pub fn require<'a, T>(&self, value: &'a Option<T>, key: &'static str) -> Result<&'a T, ConfigError> {
        value
            .as_ref()
            .ok_or_else(|| ConfigError::MissingModelKey(self.name.clone(), key))
    }
}

/// Tape (HPSS) retrieval settings.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Hpss {
    /// _(Optional)_ Whether model files may be retrieved from tape.
    ///
    /// Defaults to `false`.
    #[serde(default)]
    pub enabled: bool,

    /// _(Optional)_ Wall-clock budget of one retrieval job in minutes.
    ///
    /// Defaults to `10`. Cannot be smaller than `1`.
    #[serde(default = "Hpss::default_walltime")]
    pub walltime: u64,

    /// _(Optional)_ Queue (LSF) or partition (Slurm) for retrieval jobs.
    #[serde(default)]
    pub queue: String,

    /// _(Optional)_ Account charged for retrieval jobs.
    #[serde(default)]
    pub account: String,

    /// _(Optional)_ Tape archive extraction tool. Defaults to `htar`.
    #[serde(default = "Hpss::default_htar")]
    pub htar: String,

    /// _(Optional)_ User owning submitted jobs. Defaults to `$USER`.
    #[serde(default = "Hpss::default_user")]
    pub user: String,

    /// _(Optional)_ Seconds between queue checks. Defaults to `10`.
    #[serde(default = "Hpss::default_poll_tick")]
    pub poll_tick: u64,
}

impl Hpss {
    fn default_walltime() -> u64 {
        HPSS_WALLTIME_MINUTES
    }

    fn default_htar() -> String {
        "htar".to_string()
    }

    fn default_user() -> String {
        env::var("USER").unwrap_or_default()
    }

    fn default_poll_tick() -> u64 {
        POLL_TICK_SECONDS
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.walltime < 1 {
            return Err(ConfigError::OutOfBounds(
                "HPSS walltime cannot be less than 1 minute",
            ));
        }

        if self.poll_tick < 1 {
            return Err(ConfigError::OutOfBounds(
                "HPSS poll tick cannot be less than 1 second",
            ));
        }

        Ok(())
    }
}

impl Default for Hpss {
    fn default() -> Self {
        Hpss {
            enabled: false,
            walltime: Hpss::default_walltime(),
            queue: String::new(),
            account: String::new(),
            htar: Hpss::default_htar(),
            user: Hpss::default_user(),
            poll_tick: Hpss::default_poll_tick(),
        }
    }
}

/// External executables called by the program.
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(default)]
pub struct Tools {
    pub cnvgrib: String,
    pub wgrib2: String,
    pub ncea: String,
    pub wget: String,
    pub gunzip: String,
    pub unzip: String,
}

impl Default for Tools {
    fn default() -> Self {
        Tools {
            cnvgrib: "cnvgrib".to_string(),
            wgrib2: "wgrib2".to_string(),
            ncea: "ncea".to_string(),
            wget: "wget".to_string(),
            gunzip: "gunzip".to_string(),
            unzip: "unzip".to_string(),
        }
    }
}

/// Institutional data directories and download locations.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Sources {
    /// Statistics root whose `gfs/` holds the operational GFS analyses.
    pub gstat: PathBuf,

    pub prepbufr_prod_upper_air_dir: PathBuf,
    pub prepbufr_prod_conus_sfc_dir: PathBuf,
    pub prepbufr_arch_dir: PathBuf,

    pub ccpa_24hr_prod_dir: PathBuf,
    pub ccpa_24hr_arch_dir: PathBuf,

    pub nhc_atcfnoaa_bdeck_dir: PathBuf,
    pub nhc_atcfnoaa_adeck_dir: PathBuf,
    pub nhc_atcfnavy_bdeck_dir: PathBuf,
    pub nhc_atcfnavy_adeck_dir: PathBuf,
    pub nhc_atcf_bdeck_ftp: String,
    pub nhc_atcf_adeck_ftp: String,
    pub nhc_atcf_arch_ftp: String,
    pub navy_atcf_bdeck_ftp: String,
    pub trak_arch_dir: PathBuf,

    /// Root of climatology observation datasets.
    pub obdata_dir: PathBuf,
}

/// Grid-to-grid forecast and analysis staging.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Grid2GridStep1 {
    pub hours: HourWindow,
    pub fhr_list: Vec<LeadOffset>,
    #[serde(default)]
    pub type_list: Vec<String>,
    pub anl_name: AnalysisSource,

    /// Analysis file templates, one shared or one per model.
    pub anl_file_format_list: Vec<String>,
}

/// Overrides of a single statistics or observation type.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct TypeWindow<T> {
    pub name: T,
    #[serde(default)]
    pub fhr_list: Option<Vec<LeadOffset>>,
    #[serde(default)]
    pub hours: Option<HourWindow>,
}

/// Gathering of archived statistics files.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct StatGathering {
    #[serde(default)]
    pub hours: Option<HourWindow>,
    #[serde(default)]
    pub fhr_list: Option<Vec<LeadOffset>>,
    #[serde(default)]
    pub gather_by: GatherBy,
    pub types: Vec<TypeWindow<String>>,
}

/// Grid-to-observation forecast and prepbufr staging.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Grid2ObsStep1 {
    #[serde(default)]
    pub hours: Option<HourWindow>,
    #[serde(default)]
    pub fhr_list: Option<Vec<LeadOffset>>,
    pub types: Vec<TypeWindow<ObsCategory>>,

    /// _(Optional)_ Whether prepbufr files may be retrieved from tape.
    #[serde(default)]
    pub prepbufr_hpss: bool,
}

/// Precipitation forecast accumulation and analysis staging.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct PrecipStep1 {
    pub hours: HourWindow,
    pub fhr_list: Vec<LeadOffset>,
    pub obtype: String,
    pub accum_length: u32,

    /// _(Optional)_ Whether observations may be retrieved from tape.
    #[serde(default)]
    pub obs_hpss: bool,
}

/// Storm identification, e.g. `AL_2019_DORIAN` known as `al052019`.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Storm {
    pub basin: Basin,
    pub year: u32,
    pub name: String,
    pub id: String,
}

/// Tropical cyclone deck and model track staging.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Tropcyc {
    pub storms: Vec<Storm>,
    pub fhr_list: Vec<LeadOffset>,

    /// Init hours of model cycles with tracks to verify.
    pub fcyc_list: Vec<u32>,
}

/// Two-dimensional map diagnostics.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Maps2d {
    pub make_met_data_by: TimeAxis,
    pub hours: HourWindow,
    pub fhr_list: Vec<LeadOffset>,
    #[serde(default)]
    pub type_list: Vec<String>,
    pub forecast_to_plot_list: Vec<String>,
    pub anl_name: AnalysisSource,
    pub anl_file_format_list: Vec<String>,
    #[serde(default)]
    pub forecast_anl_diff: bool,
    #[serde(default)]
    pub use_ceres: bool,
    #[serde(default)]
    pub use_monthly_mean: bool,
}

/// Settings of one data assimilation diagnostics flavour.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct DaFlavour {
    pub make_met_data_by: TimeAxis,
    pub guess_hour: LeadOffset,
    #[serde(default)]
    pub anl_file_format_list: Vec<String>,

    /// _(Optional)_ Overrides `hpss.enabled` for this flavour.
    #[serde(default)]
    pub hpss: Option<bool>,
}

/// Data assimilation map diagnostics.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Mapsda {
    pub hours: HourWindow,
    pub type_list: Vec<DaType>,
    #[serde(default)]
    pub gdas: Option<DaFlavour>,
    #[serde(default)]
    pub ens: Option<DaFlavour>,
}

/// Main config structure representing the fields in
/// configuration file.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Config {
    pub run: RunType,

    pub machine: Machine,

    #[serde(deserialize_with = "deserialize_compact_date")]
    pub start_date: NaiveDate,

    #[serde(deserialize_with = "deserialize_compact_date")]
    pub end_date: NaiveDate,

    pub make_met_data_by: TimeAxis,

    #[serde(default = "Config::default_plot_by")]
    pub plot_by: TimeAxis,

    /// _(Optional)_ Directory in which `data/` is created.
    #[serde(default = "Config::default_output_dir")]
    pub output_dir: PathBuf,

    pub models: Vec<ModelConfig>,

    #[serde(default)]
    pub hpss: Hpss,

    #[serde(default)]
    pub tools: Tools,

    #[serde(default)]
    pub sources: Sources,

    #[serde(default)]
    pub grid2grid_step1: Option<Grid2GridStep1>,
    #[serde(default)]
    pub grid2grid_step2: Option<StatGathering>,
    #[serde(default)]
    pub grid2obs_step1: Option<Grid2ObsStep1>,
    #[serde(default)]
    pub grid2obs_step2: Option<StatGathering>,
    #[serde(default)]
    pub precip_step1: Option<PrecipStep1>,
    #[serde(default)]
    pub precip_step2: Option<StatGathering>,
    #[serde(default)]
    pub tropcyc: Option<Tropcyc>,
    #[serde(default)]
    pub maps2d: Option<Maps2d>,
    #[serde(default)]
    pub mapsda: Option<Mapsda>,
}

impl Config {
    /// Config structure constructor, responsible for
    /// deserializing configuration and checking it.
    pub fn new_from_file(file_path: &Path) -> Result<Config, ConfigError> {
        let data = fs::read(file_path)?;
        Config::new_from_slice(data.as_slice())
    }

    pub fn new_from_slice(data: &[u8]) -> Result<Config, ConfigError> {
        let config: Config = serde_yaml::from_slice(data)?;

        config.check_bounds()?;

        Ok(config)
    }

    fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.end_date < self.start_date {
            return Err(ConfigError::OutOfBounds(
                "End date cannot be earlier than start date",
            ));
        }

        if self.models.is_empty() {
            return Err(ConfigError::OutOfBounds(
                "At least one model must be configured",
            ));
        }

        self.hpss.check_bounds()?;

        let mut windows: Vec<HourWindow> = [
            self.grid2grid_step1.as_ref().map(|s| s.hours),
            self.precip_step1.as_ref().map(|s| s.hours),
            self.maps2d.as_ref().map(|s| s.hours),
            self.mapsda.as_ref().map(|s| s.hours),
        ]
        .into_iter()
        .flatten()
        .collect();

        if let Some(section) = &self.grid2obs_step1 {
            windows.extend(section.hours);
            windows.extend(section.types.iter().filter_map(|t| t.hours));
        }

        let gatherings = [&self.grid2grid_step2, &self.grid2obs_step2, &self.precip_step2];
        for section in gatherings.into_iter().flatten() {
            windows.extend(section.hours);
            windows.extend(section.types.iter().filter_map(|t| t.hours));
        }

        for window in &windows {
            window.check_bounds()?;
        }

        Ok(())
    }

    fn default_plot_by() -> TimeAxis {
        TimeAxis::Valid
    }

    fn default_output_dir() -> PathBuf {
        PathBuf::from(".")
    }

    /// Whether tape retrieval of model files is allowed
    /// and possible in this execution environment.
    pub fn model_tape_enabled(&self) -> bool {
        self.hpss.enabled && self.machine.has_tape_access()
    }

    /// Returns the run section or fails when it is missing.
    pub fn section<'a, T>(value: &'a Option<T>, name: &'static str) -> Result<&'a T, ConfigError> {
        value.as_ref().ok_or(ConfigError::MissingSection(name))
    }
}

/// Reads dates written as `YYYYmmdd` either as YAML integer or string.
fn deserialize_compact_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    struct CompactDate;

    impl<'de> Visitor<'de> for CompactDate {
        type Value = NaiveDate;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a date in YYYYmmdd format")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<NaiveDate, E> {
            self.visit_str(&value.to_string())
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<NaiveDate, E> {
            self.visit_str(&value.to_string())
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<NaiveDate, E> {
            NaiveDate::parse_from_str(value, "%Y%m%d")
                .map_err(|_| E::custom(format!("{} is not a YYYYmmdd date", value)))
        }
    }

    deserializer.deserialize_any(CompactDate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
run: grid2grid_step1
machine: HERA
start_date: 20210101
end_date: "20210102"
make_met_data_by: VALID
models:
  - name: gfs
    dir: /online
    file_format: "pgbf{lead?fmt=%2H}.gfs.{init?fmt=%Y%m%d%H}"
grid2grid_step1:
  hours: { beg: 0, end: 18, inc: 21600 }
  fhr_list: [anl, 6, "12"]
  anl_name: self_anl
  anl_file_format_list: ["pgbanl.gfs.{valid?fmt=%Y%m%d%H}"]
"#;

    #[test]
    fn minimal_config() {
        let cfg = Config::new_from_slice(MINIMAL.as_bytes()).unwrap();

        assert_eq!(cfg.run, RunType::Grid2GridStep1);
        assert_eq!(cfg.machine, Machine::Hera);
        assert_eq!(cfg.start_date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!(cfg.end_date, NaiveDate::from_ymd_opt(2021, 1, 2).unwrap());
        assert_eq!(cfg.models[0].hpss_dir, HPSS_PROD_BASE_DIR);
        assert_eq!(cfg.hpss.walltime, HPSS_WALLTIME_MINUTES);
        assert!(!cfg.model_tape_enabled());

        let section = Config::section(&cfg.grid2grid_step1, "grid2grid_step1").unwrap();
        assert_eq!(section.fhr_list.len(), 3);
        assert!(Config::section(&cfg.tropcyc, "tropcyc").is_err());
    }

    #[test]
    fn unsupported_machine_is_rejected() {
        let text = MINIMAL.replace("HERA", "CHEYENNE");
        assert!(matches!(
            Config::new_from_slice(text.as_bytes()),
            Err(ConfigError::CantDeserialize(_))
        ));
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let text = MINIMAL.replace("20210101", "20210105");
        assert!(matches!(
            Config::new_from_slice(text.as_bytes()),
            Err(ConfigError::OutOfBounds(_))
        ));
    }

    #[test]
    fn type_windows_are_checked() {
        let text = MINIMAL.to_string()
            + "grid2obs_step1:\n  types:\n    - { name: upper_air, hours: { beg: 0, end: 18, inc: 0 } }\n";
        assert!(matches!(
            Config::new_from_slice(text.as_bytes()),
            Err(ConfigError::OutOfBounds(_))
        ));

        let text = MINIMAL.to_string()
            + "precip_step2:\n  hours: { beg: 0, end: 30, inc: 86400 }\n  types: [{ name: ccpa }]\n";
        assert!(matches!(
            Config::new_from_slice(text.as_bytes()),
            Err(ConfigError::OutOfBounds(_))
        ));
    }

    #[test]
    fn orion_has_no_tape() {
        let text = MINIMAL.replace("HERA", "ORION") + "hpss: { enabled: true }\n";
        let cfg = Config::new_from_slice(text.as_bytes()).unwrap();

        assert!(cfg.hpss.enabled);
        assert!(!cfg.model_tape_enabled());
        assert_eq!(cfg.machine.prepbufr_suffix(), ".nr");
    }
}
