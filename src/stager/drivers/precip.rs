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

//! Precipitation verification: forecast buckets summed into the
//! accumulation window and the 24 hour CCPA analyses.

use super::{progress, stage_forecast, Context};
use crate::constants::CCPA_ACCUM_HOURS;
use crate::errors::{ConfigError, StagerError};
use crate::stager::archive::tape::{TapeKind, TapeSpec};
use crate::stager::archive::LogicalFile;
use crate::stager::configuration::{Config, ModelConfig, PrecipVar};
use crate::stager::fetch::Fetched;
use crate::stager::staging::{ErrorRecord, StageMode};
use crate::stager::timegrid::{generate, unique_valid_times, ymd, zero_fill, Lead, TimeSlot};
use chrono::NaiveDateTime;
use log::{info, warn};

pub fn run(ctx: &Context) -> Result<(), StagerError> {
    let config = ctx.config;
    let section = Config::section(&config.precip_step1, "precip_step1")?;

    if section.obtype != "ccpa" {
        return Err(ConfigError::Unsupported(section.obtype.clone(), "precip_step1.obtype").into());
    }

    if section.accum_length != CCPA_ACCUM_HOURS {
        return Err(ConfigError::Unsupported(
            section.accum_length.to_string(),
            "precip_step1.accum_length",
        )
        .into());
    }

    let window = ctx.window(&section.hours)?;
    let slots = generate(&window, &section.fhr_list, config.make_met_data_by);

    for model in &config.models {
        stage_accumulation(ctx, model, &slots, section.accum_length)?;
    }

    info!("Getting CCPA files");
    let tape_enabled = section.obs_hpss && config.machine.has_tape_access();
    for valid in unique_valid_times(&slots) {
        stage_ccpa(ctx, &valid, tape_enabled)?;
    }

    Ok(())
}

/// Forecast buckets ending at the slot lead that sum up to the
/// accumulation, `None` when the window reaches before the init time.
pub fn bucket_slots(slot: &TimeSlot, bucket: u32, accum_length: u32) -> Option<Vec<TimeSlot>> {
    let files = accum_length / bucket;

    (0..files)
        .map(|k| {
            let hours = slot.lead.hours.checked_sub(k * bucket).filter(|hours| *hours > 0)?;
            let lead = Lead {
                hours,
                label: zero_fill(&hours.to_string(), 2),
            };
            Some(TimeSlot::from_init(slot.init, lead))
        })
        .collect()
}

fn stage_accumulation(
    ctx: &Context,
    model: &ModelConfig,
    slots: &[TimeSlot],
    accum_length: u32,
) -> Result<(), StagerError> {
    let bucket = *model.require(&model.precip_bucket, "precip_bucket")?;
    let variable = *model.require(&model.precip_var, "precip_var")?;

    if bucket == 0 || bucket > accum_length {
        return Err(ConfigError::OutOfBounds("Precipitation bucket must be between 1 and the accumulation length").into());
    }

    // rates are rewritten in place so they must not be links
    let mode = match variable {
        PrecipVar::Apcp => StageMode::Link,
        PrecipVar::Prate => StageMode::Copy,
    };

    info!("Getting {} forecast files", model.name);
    let bar = progress(slots.len(), &format!("{} buckets", model.name));

    for slot in slots {
        bar.inc(1);

        if slot.is_skipped_cycle() {
            continue;
        }

        let buckets = match bucket_slots(slot, bucket, accum_length) {
            Some(buckets) => buckets,
            None => continue,
        };

        for bucket_slot in &buckets {
            let (destination, fetched) = stage_forecast(ctx, model, &model.file_format, bucket_slot, mode)?;

            if variable == PrecipVar::Prate && fetched.is_new() {
                if let Err(err) = ctx.tools().prate_to_apcp(&destination) {
                    warn!("Cannot convert {} to APCP: {}", destination.display(), err);
                }
            }
        }
    }

    bar.finish_with_message("done");
    Ok(())
}

/// 24 hour analysis ending at 12Z of the valid date.
pub fn ccpa_file(ctx: &Context, valid: &NaiveDateTime) -> (String, LogicalFile) {
    let sources = &ctx.config.sources;
    let date = ymd(valid);
    let name = format!("ccpa.{}12.24h", date);

    let file = LogicalFile::online(sources.ccpa_24hr_prod_dir.join(format!("precip.{}", date)).join(&name))
        .with_archive(sources.ccpa_24hr_arch_dir.join(&name))
        .with_tape(TapeSpec::operational(TapeKind::Ccpa24h, *valid));

    (name, file)
}

fn stage_ccpa(ctx: &Context, valid: &NaiveDateTime, tape_enabled: bool) -> Result<(), StagerError> {
    let dir = ctx.subdir("ccpa")?;
    let (name, file) = ccpa_file(ctx, valid);

    if let Fetched::Missing(miss) = ctx
        .fetcher
        .fetch(&file, &dir.join(name), StageMode::Link, tape_enabled)?
    {
        ErrorRecord::for_slot(&dir, "", valid).append(&miss.message())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn slot(lead: u32) -> TimeSlot {
        let init = NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        TimeSlot::from_init(init, Lead::new(lead))
    }

    #[test]
    fn buckets_end_at_lead() {
        let buckets = bucket_slots(&slot(36), 6, 24).unwrap();
        let labels: Vec<&str> = buckets.iter().map(|s| s.lead.label.as_str()).collect();

        assert_eq!(labels, ["36", "30", "24", "18"]);
        assert!(buckets.iter().all(|s| s.valid - s.init == s.lead.duration()));
    }

    #[test]
    fn single_bucket() {
        let buckets = bucket_slots(&slot(24), 24, 24).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].lead.label, "24");
    }

    #[test]
    fn window_before_init_is_skipped() {
        assert_eq!(bucket_slots(&slot(24), 6, 24).map(|b| b.len()), Some(4));
        assert_eq!(bucket_slots(&slot(18), 6, 24), None);
        assert_eq!(bucket_slots(&slot(12), 6, 24), None);
    }
}
