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

//! Naming conventions of the operational tape archive.
//!
//! The operational archive renamed its tar files several times
//! over the years. Each table lists the conventions of one product
//! as contiguous date ranges, `from` inclusive and `until` exclusive,
//! both written as `YYYYmmdd` numbers.
//!
//! Patterns use the template placeholders (with the `valid` field
//! holding the archive date) and additional tokens:
//! `{dump}` for the model dump name, `{suffix}` for the product suffix
//! and `{tm}` for the prepbufr time-minus hour.

use chrono::{Datelike, NaiveDateTime};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Era {
    pub name: &'static str,
    pub from: u32,
    pub until: u32,
    pub tar: &'static str,
    pub member: &'static str,
}

const EARLIEST: u32 = 0;
const LATEST: u32 = u32::MAX;

pub static GFS_GRIB_ERAS: [Era; 5] = [
    Era {
        name: "com",
        from: EARLIEST,
        until: 20160510,
        tar: "com_gfs_prod_{dump}.{valid?fmt=%Y%m%d%H}.pgrb2_0p25.tar",
        member: "{dump}.t{valid?fmt=%H}z.pgrb2.0p25.{suffix}",
    },
    Era {
        name: "com2",
        from: 20160510,
        until: 20170720,
        tar: "com2_gfs_prod_{dump}.{valid?fmt=%Y%m%d%H}.pgrb2_0p25.tar",
        member: "{dump}.t{valid?fmt=%H}z.pgrb2.0p25.{suffix}",
    },
    Era {
        name: "gpfs_hps",
        from: 20170720,
        until: 20190612,
        tar: "gpfs_hps_nco_ops_com_gfs_prod_{dump}.{valid?fmt=%Y%m%d%H}.pgrb2_0p25.tar",
        member: "{dump}.t{valid?fmt=%H}z.pgrb2.0p25.{suffix}",
    },
    Era {
        name: "gpfs_dell1",
        from: 20190612,
        until: 20200226,
        tar: "gpfs_dell1_nco_ops_com_gfs_prod_{dump}.{valid?fmt=%Y%m%d}_{valid?fmt=%H}.{dump}_pgrb2.tar",
        member: "{dump}.{valid?fmt=%Y%m%d}/{valid?fmt=%H}/{dump}.t{valid?fmt=%H}z.pgrb2.0p25.{suffix}",
    },
    Era {
        name: "com_v16",
        from: 20200226,
        until: LATEST,
        tar: "com_gfs_prod_{dump}.{valid?fmt=%Y%m%d}_{valid?fmt=%H}.{dump}_pgrb2.tar",
        member: "{dump}.{valid?fmt=%Y%m%d}/{valid?fmt=%H}/{dump}.t{valid?fmt=%H}z.pgrb2.0p25.{suffix}",
    },
];

pub static GDAS_PREPBUFR_ERAS: [Era; 5] = [
    Era {
        name: "com",
        from: EARLIEST,
        until: 20160510,
        tar: "com_gfs_prod_gdas.{valid?fmt=%Y%m%d%H}.tar",
        member: "gdas1.t{valid?fmt=%H}z.prepbufr",
    },
    Era {
        name: "com2",
        from: 20160510,
        until: 20170720,
        tar: "com2_gfs_prod_gdas.{valid?fmt=%Y%m%d%H}.tar",
        member: "gdas1.t{valid?fmt=%H}z.prepbufr",
    },
    Era {
        name: "gpfs_hps",
        from: 20170720,
        until: 20190612,
        tar: "gpfs_hps_nco_ops_com_gfs_prod_gdas.{valid?fmt=%Y%m%d%H}.tar",
        member: "gdas.t{valid?fmt=%H}z.prepbufr",
    },
    Era {
        name: "gpfs_dell1",
        from: 20190612,
        until: 20200226,
        tar: "gpfs_dell1_nco_ops_com_gfs_prod_gdas.{valid?fmt=%Y%m%d}_{valid?fmt=%H}.gdas.tar",
        member: "gdas.{valid?fmt=%Y%m%d}/{valid?fmt=%H}/gdas.t{valid?fmt=%H}z.prepbufr",
    },
    Era {
        name: "com_v16",
        from: 20200226,
        until: LATEST,
        tar: "com_gfs_prod_gdas.{valid?fmt=%Y%m%d}_{valid?fmt=%H}.gdas.tar",
        member: "gdas.{valid?fmt=%Y%m%d}/{valid?fmt=%H}/gdas.t{valid?fmt=%H}z.prepbufr",
    },
];

// NAM prepbufr before the 20170320 switch was published by NDAS,
// the first day after the switch was still archived under com_
pub static NAM_PREPBUFR_ERAS: [Era; 5] = [
    Era {
        name: "com2",
        from: EARLIEST,
        until: 20170320,
        tar: "com2_nam_prod_nam.{valid?fmt=%Y%m%d%H}.bufr.tar",
        member: "nam.t{valid?fmt=%H}z.prepbufr.tm{tm}",
    },
    Era {
        name: "com",
        from: 20170320,
        until: 20170321,
        tar: "com_nam_prod_nam.{valid?fmt=%Y%m%d%H}.bufr.tar",
        member: "nam.t{valid?fmt=%H}z.prepbufr.tm{tm}",
    },
    Era {
        name: "com2",
        from: 20170321,
        until: 20190820,
        tar: "com2_nam_prod_nam.{valid?fmt=%Y%m%d%H}.bufr.tar",
        member: "nam.t{valid?fmt=%H}z.prepbufr.tm{tm}",
    },
    Era {
        name: "gpfs_dell1",
        from: 20190820,
        until: 20200227,
        tar: "gpfs_dell1_nco_ops_com_nam_prod_nam.{valid?fmt=%Y%m%d%H}.bufr.tar",
        member: "nam.t{valid?fmt=%H}z.prepbufr.tm{tm}",
    },
    Era {
        name: "com_v16",
        from: 20200227,
        until: LATEST,
        tar: "com_nam_prod_nam.{valid?fmt=%Y%m%d%H}.bufr.tar",
        member: "nam.t{valid?fmt=%H}z.prepbufr.tm{tm}",
    },
];

pub static NDAS_PREPBUFR_ERAS: [Era; 1] = [Era {
    name: "com",
    from: EARLIEST,
    until: LATEST,
    tar: "com_nam_prod_ndas.{valid?fmt=%Y%m%d%H}.bufr.tar",
    member: "ndas.t{valid?fmt=%H}z.prepbufr.tm{tm}",
}];

/// Analysis (tm00) files of NDAS cycles were kept in NAM tars.
pub static NDAS_ANALYSIS_PREPBUFR_ERAS: [Era; 1] = [Era {
    name: "com",
    from: EARLIEST,
    until: LATEST,
    tar: "com_nam_prod_nam.{valid?fmt=%Y%m%d%H}.bufr.tar",
    member: "nam.t{valid?fmt=%H}z.prepbufr.tm{tm}",
}];

pub static CCPA_ERAS: [Era; 3] = [
    Era {
        name: "com",
        from: EARLIEST,
        until: 20200126,
        tar: "com_verf_prod_precip.{valid?fmt=%Y%m%d}.precip.tar",
        member: "ccpa.{valid?fmt=%Y%m%d}12.24h",
    },
    Era {
        name: "gpfs_dell1",
        from: 20200126,
        until: 20200226,
        tar: "gpfs_dell1_nco_ops_com_verf_prod_precip{valid?fmt=%Y%m%d}.precip.tar",
        member: "ccpa.{valid?fmt=%Y%m%d}12.24h",
    },
    Era {
        name: "com_v16",
        from: 20200226,
        until: LATEST,
        tar: "com_verf_prod_precip{valid?fmt=%Y%m%d}.precip.tar",
        member: "ccpa.{valid?fmt=%Y%m%d}12.24h",
    },
];

/// Date as a `YYYYmmdd` number, the key of era tables.
pub fn date_key(time: &NaiveDateTime) -> u32 {
    let year = u32::try_from(time.year()).unwrap_or(0);
    year * 10000 + time.month() * 100 + time.day()
}

/// Selects the era in which the date falls.
pub fn select(table: &'static [Era], time: &NaiveDateTime) -> Option<&'static Era> {
    let key = date_key(time);
    table.iter().find(|era| era.from <= key && key < era.until)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn day(key: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt((key / 10000) as i32, (key / 100) % 100, key % 100)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn all_tables() -> Vec<&'static [Era]> {
        vec![
            &GFS_GRIB_ERAS[..],
            &GDAS_PREPBUFR_ERAS[..],
            &NAM_PREPBUFR_ERAS[..],
            &NDAS_PREPBUFR_ERAS[..],
            &NDAS_ANALYSIS_PREPBUFR_ERAS[..],
            &CCPA_ERAS[..],
        ]
    }

    #[test]
    fn tables_are_contiguous() {
        for table in all_tables() {
            assert_eq!(table[0].from, EARLIEST);
            assert_eq!(table[table.len() - 1].until, LATEST);

            for pair in table.windows(2) {
                assert_eq!(pair[0].until, pair[1].from);
                assert!(pair[0].from < pair[0].until);
            }
        }
    }

    #[test]
    fn cutover_is_inclusive_of_later_convention() {
        for table in all_tables() {
            for pair in table.windows(2) {
                let boundary = day(pair[1].from);
                let before = boundary - Duration::days(1);

                assert_eq!(select(table, &boundary), Some(&pair[1]));
                assert_eq!(select(table, &before), Some(&pair[0]));
                assert_ne!(pair[0].tar, pair[1].tar);
            }
        }
    }

    #[test]
    fn documented_gfs_boundaries() {
        let names: Vec<_> = [20160509, 20160510, 20170719, 20170720, 20190611, 20190612, 20200225, 20200226]
            .iter()
            .map(|&key| select(&GFS_GRIB_ERAS, &day(key)).unwrap().name)
            .collect();

        assert_eq!(
            names,
            ["com", "com2", "com2", "gpfs_hps", "gpfs_hps", "gpfs_dell1", "gpfs_dell1", "com_v16"]
        );
    }

    #[test]
    fn nam_single_day_era() {
        assert_eq!(select(&NAM_PREPBUFR_ERAS, &day(20170320)).unwrap().name, "com");
        assert_eq!(select(&NAM_PREPBUFR_ERAS, &day(20170321)).unwrap().name, "com2");
        assert_eq!(date_key(&day(20170320)), 20170320);
    }
}
