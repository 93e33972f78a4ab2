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

//! Gathering of archived `.stat` files for the plotting step.

use super::{progress, Context};
use crate::errors::{ConfigError, StagerError};
use crate::stager::configuration::{GatherBy, ModelConfig, StatGathering};
use crate::stager::staging::StageMode;
use crate::stager::timegrid::{generate, ymd, TimeSlot};
use log::{info, warn};
use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum StatCategory {
    Grid2Grid,
    Grid2Obs,
    Precip,
}

impl StatCategory {
    fn dir_name(self) -> &'static str {
        match self {
            StatCategory::Grid2Grid => "grid2grid",
            StatCategory::Grid2Obs => "grid2obs",
            StatCategory::Precip => "precip",
        }
    }
}

/// Archived stat file and its name under `data/<model>/<type>/`.
#[derive(Clone, PartialEq, Debug)]
pub struct StatLink {
    pub source: PathBuf,
    pub name: String,
}

/// Where the stat file of the slot is archived for the given gathering.
/// `None` for skipped cycles of init based observation gatherings.
pub fn stat_link(
    archive: &Path,
    category: StatCategory,
    gather_by: GatherBy,
    stat_type: &str,
    model: &str,
    slot: &TimeSlot,
) -> Option<StatLink> {
    // grid-to-grid statistics are gathered by valid time in VSDB layout
    let layout = match (category, gather_by) {
        (StatCategory::Grid2Grid, GatherBy::Vsdb) => GatherBy::Valid,
        (_, gather_by) => gather_by,
    };

    if layout != GatherBy::Valid && category != StatCategory::Grid2Grid && slot.is_skipped_cycle() {
        return None;
    }

    let valid_hour = slot.valid.format("%H").to_string();
    let init_hour = slot.init.format("%H").to_string();

    let (hour, date, name) = match layout {
        GatherBy::Valid => (
            valid_hour.clone(),
            ymd(&slot.valid),
            format!("{}_valid{}_valid{}.stat", model, ymd(&slot.valid), valid_hour),
        ),
        GatherBy::Init => (
            init_hour.clone(),
            ymd(&slot.init),
            format!("{}_init{}_init{}.stat", model, ymd(&slot.init), init_hour),
        ),
        GatherBy::Vsdb => (
            init_hour.clone(),
            ymd(&slot.valid),
            format!("{}_valid{}_init{}.stat", model, ymd(&slot.valid), init_hour),
        ),
    };

    let source = archive
        .join("metplus_data")
        .join(gather_by.dir_name())
        .join(category.dir_name())
        .join(stat_type)
        .join(format!("{}Z", hour))
        .join(model)
        .join(format!("{}_{}.stat", model, date));

    Some(StatLink { source, name })
}

pub fn run(ctx: &Context, category: StatCategory, section: &StatGathering) -> Result<(), StagerError> {
    let config = ctx.config;

    for stat_type in &section.types {
        let hours = stat_type
            .hours
            .as_ref()
            .or(section.hours.as_ref())
            .ok_or(ConfigError::MissingSection("step2 hours"))?;
        let leads = stat_type
            .fhr_list
            .as_ref()
            .or(section.fhr_list.as_ref())
            .ok_or(ConfigError::MissingSection("step2 fhr_list"))?;

        let window = ctx.window(hours)?;
        let slots = generate(&window, leads, config.plot_by);

        for model in &config.models {
            gather(ctx, category, section, &stat_type.name, model, &slots)?;
        }
    }

    Ok(())
}

fn gather(
    ctx: &Context,
    category: StatCategory,
    section: &StatGathering,
    stat_type: &str,
    model: &ModelConfig,
    slots: &[TimeSlot],
) -> Result<(), StagerError> {
    let archive = model.require(&model.arch_dir, "arch_dir")?;
    let gather_by = model.gather_by.unwrap_or(section.gather_by);
    let dir = ctx.model_dir(model)?.join(stat_type);
    std::fs::create_dir_all(&dir)?;

    info!("Linking {} {} stat files", model.name, stat_type);
    let bar = progress(slots.len(), &format!("{} {}", model.name, stat_type));

    for slot in slots {
        bar.inc(1);

        let link = match stat_link(archive, category, gather_by, stat_type, &model.name, slot) {
            Some(link) => link,
            None => continue,
        };

        let destination = dir.join(&link.name);
        if ctx.staging().presence(&destination).is_done() {
            continue;
        }

        if ctx.probe.exists(&link.source) {
            ctx.staging().stage(&link.source, &destination, StageMode::Link);
        } else {
            warn!("{} does not exist", link.source.display());
        }
    }

    bar.finish_with_message("done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stager::timegrid::Lead;
    use chrono::NaiveDate;

    fn slot(init_hour: u32, lead: u32) -> TimeSlot {
        let init = NaiveDate::from_ymd_opt(2021, 1, 31)
            .unwrap()
            .and_hms_opt(init_hour, 0, 0)
            .unwrap();
        TimeSlot::from_init(init, Lead::new(lead))
    }

    #[test]
    fn valid_gathering() {
        let link = stat_link(Path::new("/arch"), StatCategory::Grid2Grid, GatherBy::Valid, "anom", "gfs", &slot(12, 24))
            .unwrap();

        assert_eq!(
            link.source,
            PathBuf::from("/arch/metplus_data/by_VALID/grid2grid/anom/12Z/gfs/gfs_20210201.stat")
        );
        assert_eq!(link.name, "gfs_valid20210201_valid12.stat");
    }

    #[test]
    fn init_gathering_skips_off_cycles() {
        let link = stat_link(Path::new("/arch"), StatCategory::Precip, GatherBy::Init, "ccpa", "gfs", &slot(0, 36))
            .unwrap();
        assert_eq!(link.name, "gfs_init20210131_init00.stat");
        assert!(link.source.ends_with("by_INIT/precip/ccpa/00Z/gfs/gfs_20210131.stat"));

        assert_eq!(
            stat_link(Path::new("/arch"), StatCategory::Precip, GatherBy::Init, "ccpa", "gfs", &slot(9, 3)),
            None
        );
    }

    #[test]
    fn vsdb_gathering() {
        let link = stat_link(Path::new("/arch"), StatCategory::Grid2Obs, GatherBy::Vsdb, "upper_air", "gfs", &slot(18, 12))
            .unwrap();
        assert_eq!(link.name, "gfs_valid20210201_init18.stat");
        assert!(link.source.ends_with("by_VSDB/grid2obs/upper_air/18Z/gfs/gfs_20210201.stat"));

        let link = stat_link(Path::new("/arch"), StatCategory::Grid2Grid, GatherBy::Vsdb, "anom", "gfs", &slot(18, 12))
            .unwrap();
        assert_eq!(link.name, "gfs_valid20210201_valid06.stat");
        assert!(link.source.ends_with("by_VSDB/grid2grid/anom/06Z/gfs/gfs_20210201.stat"));
    }
}
