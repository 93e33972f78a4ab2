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

//! Tape tier naming: the tar file and the member path of a product.
//!
//! Operational products live in the runhistory archive with dated
//! subdirectories `rhYYYY/YYYYmm/YYYYmmdd`, experiments keep one
//! directory per cycle with fixed tar names.

use super::eras::{self, Era};
use crate::constants::{HPSS_PROD_BASE_DIR, HPSS_PROD_MARKER};
use crate::errors::TemplateError;
use crate::stager::template;
use crate::stager::timegrid::{ymdh, Lead};
use chrono::NaiveDateTime;

/// Model output stream selected by the file naming template.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Dump {
    Gfs,
    Gdas,
    Enkfgdas,
}

impl Dump {
    pub fn name(self) -> &'static str {
        match self {
            Dump::Gfs => "gfs",
            Dump::Gdas => "gdas",
            Dump::Enkfgdas => "enkfgdas",
        }
    }

    /// Experiment archive tar holding the stream.
    fn experiment_tar(self) -> &'static str {
        match self {
            Dump::Gfs => "gfsa.tar",
            Dump::Gdas => "gdas.tar",
            Dump::Enkfgdas => "enkfgdas.tar",
        }
    }

    /// Recognizes the stream from a model file template.
    pub fn from_file_format(file_format: &str) -> Option<Dump> {
        if file_format.contains("gfs") {
            Some(Dump::Gfs)
        } else if file_format.contains("gdas") {
            Some(Dump::Gdas)
        } else {
            None
        }
    }
}

/// Product kinds that can be retrieved from tape.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum TapeKind {
    /// Gridded model output, `suffix` is eg. `f006` or `anl`.
    ModelGrid { dump: Dump, suffix: String, model: String },

    /// Cyclone track of an experiment.
    CycloneTrack { model: String },

    /// Global upper air observations.
    UpperAirBufr { restriction: &'static str },

    /// CONUS surface observations after the NAM upgrade.
    NamBufr { tm: Lead, restriction: &'static str },

    /// CONUS surface observations before the NAM upgrade.
    NdasBufr { tm: Lead, restriction: &'static str },

    /// 24 hour precipitation analysis.
    Ccpa24h,
}

/// Product on tape at given archive time, with the root of its archive.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TapeSpec {
    pub root: String,
    pub kind: TapeKind,
    pub time: NaiveDateTime,
}

impl TapeSpec {
    pub fn new(root: &str, kind: TapeKind, time: NaiveDateTime) -> Self {
        TapeSpec {
            root: root.to_string(),
            kind,
            time,
        }
    }

    /// Spec of an operational observation product.
    pub fn operational(kind: TapeKind, time: NaiveDateTime) -> Self {
        TapeSpec::new(HPSS_PROD_BASE_DIR, kind, time)
    }

    fn is_operational(&self) -> bool {
        self.root.contains(HPSS_PROD_MARKER)
    }
}

/// Concrete tape location of a product.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TapeCandidate {
    pub tar: String,
    pub member: String,
    pub era: &'static str,
}

impl TapeCandidate {
    /// Base name of the tar file.
    pub fn tar_name(&self) -> &str {
        self.tar.rsplit('/').next().unwrap_or(&self.tar)
    }
}

/// Builds the tape location of the product or `None` when
/// the archive does not hold such product.
pub fn candidate(spec: &TapeSpec) -> Result<Option<TapeCandidate>, TemplateError> {
    match &spec.kind {
        TapeKind::ModelGrid { dump, suffix, model } => {
            if spec.is_operational() {
                operational_grid(spec, *dump, suffix)
            } else {
                Ok(Some(experiment_grid(spec, *dump, suffix, model)))
            }
        }
        TapeKind::CycloneTrack { model } => {
            if spec.is_operational() {
                return Ok(None);
            }

            let hour = spec.time.format("%H").to_string();
            Ok(Some(TapeCandidate {
                tar: experiment_tar(spec, Dump::Gfs, model),
                member: format!(
                    "gfs.{}/{}/avno.t{}z.cyclone.trackatcfunix",
                    spec.time.format("%Y%m%d"),
                    hour,
                    hour
                ),
                era: "experiment",
            }))
        }
        TapeKind::UpperAirBufr { restriction } => {
            operational(spec, &eras::GDAS_PREPBUFR_ERAS, &[], restriction)
        }
        TapeKind::NamBufr { tm, restriction } => {
            let tm = tm.padded(2);
            operational(spec, &eras::NAM_PREPBUFR_ERAS, &[("{tm}", tm.as_str())], restriction)
        }
        TapeKind::NdasBufr { tm, restriction } => {
            let table: &'static [Era] = if tm.hours == 0 {
                &eras::NDAS_ANALYSIS_PREPBUFR_ERAS
            } else {
                &eras::NDAS_PREPBUFR_ERAS
            };
            let tm = tm.padded(2);
            operational(spec, table, &[("{tm}", tm.as_str())], restriction)
        }
        TapeKind::Ccpa24h => operational(spec, &eras::CCPA_ERAS, &[], ""),
    }
}

fn operational_grid(
    spec: &TapeSpec,
    dump: Dump,
    suffix: &str,
) -> Result<Option<TapeCandidate>, TemplateError> {
    let tokens = [("{dump}", dump.name()), ("{suffix}", suffix)];

    let mut candidate = match operational(spec, &eras::GFS_GRIB_ERAS, &tokens, "")? {
        Some(candidate) => candidate,
        None => return Ok(None),
    };

    if dump == Dump::Enkfgdas {
        candidate.tar = candidate
            .tar
            .replace("_pgrb2.tar", ".tar")
            .replace(".pgrb2_0p25.tar", ".tar");
        candidate.member = candidate
            .member
            .replace("pgrb2.0p25.", "")
            .replace("enkfgdas.t", "gdas.t");
    }

    Ok(Some(candidate))
}

fn experiment_tar(spec: &TapeSpec, dump: Dump, model: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        spec.root,
        model,
        ymdh(&spec.time),
        dump.experiment_tar()
    )
}

fn experiment_grid(spec: &TapeSpec, dump: Dump, suffix: &str, model: &str) -> TapeCandidate {
    let date = spec.time.format("%Y%m%d");
    let hour = spec.time.format("%H");

    let member = match dump {
        Dump::Enkfgdas => format!("enkfgdas.{}/{}/gdas.t{}z.{}", date, hour, hour, suffix),
        _ => format!(
            "{}.{}/{}/{}.t{}z.pgrb2.0p25.{}",
            dump.name(),
            date,
            hour,
            dump.name(),
            hour,
            suffix
        ),
    };

    TapeCandidate {
        tar: experiment_tar(spec, dump, model),
        member,
        era: "experiment",
    }
}

fn operational(
    spec: &TapeSpec,
    table: &'static [Era],
    tokens: &[(&str, &str)],
    restriction: &str,
) -> Result<Option<TapeCandidate>, TemplateError> {
    let era = match eras::select(table, &spec.time) {
        Some(era) => era,
        None => return Ok(None),
    };

    let fill = |pattern: &str| -> Result<String, TemplateError> {
        let pattern = tokens
            .iter()
            .fold(pattern.to_string(), |text, (token, value)| text.replace(token, value));
        template::resolve(&pattern, &spec.time, &spec.time, &Lead::zero())
    };

    let date_dir = spec.time.format("rh%Y/%Y%m/%Y%m%d");

    Ok(Some(TapeCandidate {
        tar: format!("{}/{}/{}", spec.root, date_dir, fill(era.tar)?),
        member: fill(era.member)? + restriction,
        era: era.name,
    }))
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

    fn grid(dump: Dump, root: &str, time: NaiveDateTime) -> TapeCandidate {
        let kind = TapeKind::ModelGrid {
            dump,
            suffix: "f024".to_string(),
            model: "exp1".to_string(),
        };
        candidate(&TapeSpec::new(root, kind, time)).unwrap().unwrap()
    }

    #[test]
    fn operational_gfs_grids() {
        let c = grid(Dump::Gfs, HPSS_PROD_BASE_DIR, at(2020, 2, 26, 12));
        assert_eq!(
            c.tar,
            "/NCEPPROD/hpssprod/runhistory/rh2020/202002/20200226/com_gfs_prod_gfs.20200226_12.gfs_pgrb2.tar"
        );
        assert_eq!(c.member, "gfs.20200226/12/gfs.t12z.pgrb2.0p25.f024");
        assert_eq!(c.tar_name(), "com_gfs_prod_gfs.20200226_12.gfs_pgrb2.tar");

        let c = grid(Dump::Gfs, HPSS_PROD_BASE_DIR, at(2018, 1, 1, 0));
        assert_eq!(
            c.tar,
            "/NCEPPROD/hpssprod/runhistory/rh2018/201801/20180101/gpfs_hps_nco_ops_com_gfs_prod_gfs.2018010100.pgrb2_0p25.tar"
        );
        assert_eq!(c.member, "gfs.t00z.pgrb2.0p25.f024");
        assert_eq!(c.era, "gpfs_hps");
    }

    #[test]
    fn ensemble_rewrite() {
        let c = grid(Dump::Enkfgdas, HPSS_PROD_BASE_DIR, at(2019, 7, 1, 6));
        assert!(c.tar.ends_with("gpfs_dell1_nco_ops_com_gfs_prod_enkfgdas.20190701_06.enkfgdas.tar"));
        assert_eq!(c.member, "enkfgdas.20190701/06/gdas.t06z.f024");

        let c = grid(Dump::Enkfgdas, HPSS_PROD_BASE_DIR, at(2016, 1, 1, 6));
        assert!(c.tar.ends_with("com_gfs_prod_enkfgdas.2016010106.tar"));
        assert_eq!(c.member, "gdas.t06z.f024");
    }

    #[test]
    fn experiment_archive() {
        let c = grid(Dump::Gdas, "/5year/NCEPDEV/emc", at(2021, 3, 1, 18));
        assert_eq!(c.tar, "/5year/NCEPDEV/emc/exp1/2021030118/gdas.tar");
        assert_eq!(c.member, "gdas.20210301/18/gdas.t18z.pgrb2.0p25.f024");

        let track = TapeKind::CycloneTrack { model: "exp1".to_string() };
        let c = candidate(&TapeSpec::new("/5year/NCEPDEV/emc", track.clone(), at(2021, 3, 1, 18)))
            .unwrap()
            .unwrap();
        assert_eq!(c.tar, "/5year/NCEPDEV/emc/exp1/2021030118/gfsa.tar");
        assert_eq!(c.member, "gfs.20210301/18/avno.t18z.cyclone.trackatcfunix");

        let prod = TapeSpec::new(HPSS_PROD_BASE_DIR, track, at(2021, 3, 1, 18));
        assert_eq!(candidate(&prod).unwrap(), None);
    }

    #[test]
    fn observations() {
        let upper = TapeKind::UpperAirBufr { restriction: ".nr" };
        let c = candidate(&TapeSpec::operational(upper, at(2017, 1, 1, 6))).unwrap().unwrap();
        assert!(c.tar.ends_with("rh2017/201701/20170101/com2_gfs_prod_gdas.2017010106.tar"));
        assert_eq!(c.member, "gdas1.t06z.prepbufr.nr");

        let nam = TapeKind::NamBufr { tm: Lead::new(3), restriction: "" };
        let c = candidate(&TapeSpec::operational(nam, at(2020, 3, 1, 6))).unwrap().unwrap();
        assert!(c.tar.ends_with("com_nam_prod_nam.2020030106.bufr.tar"));
        assert_eq!(c.member, "nam.t06z.prepbufr.tm03");

        let ndas = TapeKind::NdasBufr { tm: Lead::zero(), restriction: "" };
        let c = candidate(&TapeSpec::operational(ndas, at(2016, 3, 1, 12))).unwrap().unwrap();
        assert!(c.tar.ends_with("com_nam_prod_nam.2016030112.bufr.tar"));
        assert_eq!(c.member, "nam.t12z.prepbufr.tm00");

        let c = candidate(&TapeSpec::operational(TapeKind::Ccpa24h, at(2020, 2, 1, 12))).unwrap().unwrap();
        assert!(c.tar.ends_with("gpfs_dell1_nco_ops_com_verf_prod_precip20200201.precip.tar"));
        assert_eq!(c.member, "ccpa.2020020112.24h");
    }
}
