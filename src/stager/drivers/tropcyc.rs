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

//! Tropical cyclone verification: best tracks (b-decks), forecast
//! aids (a-decks) and model tracks initialized during the storm.

use super::Context;
use crate::constants::{GFS_TRACK_ID, GFS_VERIFIED_ID, LIVE_DECK_SEASON, TRACK_INIT_STRIDE_SECONDS};
use crate::errors::{DeckError, StagerError};
use crate::stager::archive::tape::{TapeKind, TapeSpec};
use crate::stager::archive::LogicalFile;
use crate::stager::configuration::{Basin, Config, ModelConfig, Storm};
use crate::stager::staging::{ErrorRecord, StageMode};
use crate::stager::template;
use crate::stager::timegrid::{generate, ymdh, Lead, LeadOffset, TimeAxis, TimeSlot, TimeWindow};
use chrono::{Duration, NaiveDateTime, Timelike};
use log::{info, warn};
use rustc_hash::FxHashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub fn run(ctx: &Context) -> Result<(), StagerError> {
    let config = ctx.config;
    let section = Config::section(&config.tropcyc, "tropcyc")?;
    let bdeck_dir = ctx.subdir("bdeck")?;
    let adeck_dir = ctx.subdir("adeck")?;

    for storm in &section.storms {
        info!("Getting decks of {:?} {} {}", storm.basin, storm.year, storm.name);

        let has_bdeck = stage_bdeck(ctx, storm, &bdeck_dir)?;
        let adeck = stage_adeck(ctx, storm, &adeck_dir);

        if !has_bdeck {
            continue;
        }

        let (first, last) = match storm_period(&bdeck_dir.join(deck_name('b', storm))) {
            Ok(period) => period,
            Err(err) => {
                let message = format!("WARNING: cannot read storm period of {}: {}", storm.id, err);
                warn!("{}", message);
                ErrorRecord::named(&bdeck_dir, &format!("error_b{}.txt", storm.id)).append(&message)?;
                continue;
            }
        };
        let inits = track_inits(first, last, &section.fhr_list, &section.fcyc_list);

        for model in &config.models {
            info!("Getting {} tracks of {}", model.name, storm.name);
            for init in &inits {
                stage_track(ctx, model, init, &adeck)?;
            }
        }
    }

    Ok(())
}

fn deck_name(kind: char, storm: &Storm) -> String {
    format!("{}{}.dat", kind, storm.id)
}

/// Links the first existing candidate, `true` when the deck is staged.
fn link_first(ctx: &Context, candidates: &[&Path], destination: &Path) -> bool {
    candidates
        .iter()
        .find(|candidate| ctx.probe.exists(candidate))
        .map(|candidate| ctx.staging().stage(candidate, destination, StageMode::Link).is_done())
        .unwrap_or(false)
}

fn download(ctx: &Context, url: &str, dir: &Path) {
    if let Err(err) = ctx.tools().download(url, dir) {
        warn!("Cannot download {}: {}", url, err);
    }
}

/// Downloads `<name>.gz` and unpacks it next to the decks.
fn download_gzipped(ctx: &Context, url: &str, dir: &Path, name: &str) {
    download(ctx, url, dir);

    let archive = dir.join(format!("{}.gz", name));
    if ctx.probe.exists(&archive) {
        if let Err(err) = ctx.tools().gunzip(&archive) {
            warn!("Cannot unpack {}: {}", archive.display(), err);
        }
    }
}

/// Deck from the NHC ftp: the live feed for the current season,
/// the yearly archive otherwise.
fn download_nhc(ctx: &Context, storm: &Storm, live_feed: &str, name: &str, dir: &Path) {
    let archive_url = format!("{}/{}/{}.gz", ctx.config.sources.nhc_atcf_arch_ftp, storm.year, name);

    if storm.year != LIVE_DECK_SEASON {
        download_gzipped(ctx, &archive_url, dir, name);
    } else if name.starts_with('b') {
        download(ctx, &format!("{}/{}", live_feed, name), dir);
    } else {
        download_gzipped(ctx, &format!("{}/{}.gz", live_feed, name), dir, name);
    }
}

/// Unpacks the deck from the yearly Navy best track archive.
fn unzip_navy(ctx: &Context, storm: &Storm, name: &str, dir: &Path) {
    let zip_name = format!("bwp{}.zip", storm.year);
    let zip = dir.join(&zip_name);

    if !ctx.probe.exists(&zip) {
        let url = format!(
            "{}/{}/{}s-bwp/{}",
            ctx.config.sources.navy_atcf_bdeck_ftp, storm.year, storm.year, zip_name
        );
        download(ctx, &url, dir);
    }

    if ctx.probe.exists(&zip) {
        if let Err(err) = ctx.tools().unzip_member(&zip, name, dir) {
            warn!("Cannot unpack {} from {}: {}", name, zip.display(), err);
        }
    } else {
        info!("Could not retrieve {} from Navy archive", name);
    }
}

fn stage_bdeck(ctx: &Context, storm: &Storm, dir: &Path) -> Result<bool, StagerError> {
    let sources = &ctx.config.sources;
    let name = deck_name('b', storm);
    let destination = dir.join(&name);

    if ctx.staging().presence(&destination).is_done() {
        return Ok(true);
    }

    let archive = sources.trak_arch_dir.join("btk").join(&name);

    let message = match storm.basin {
        Basin::WestPacific => {
            let navy = sources.nhc_atcfnavy_bdeck_dir.join(&name);

            if storm.year < LIVE_DECK_SEASON {
                unzip_navy(ctx, storm, &name, dir);
            }

            if !ctx.staging().presence(&destination).is_done() {
                link_first(ctx, &[&navy, &archive], &destination);
            }

            format!("WARNING: {} and {} do not exist", navy.display(), archive.display())
        }
        _ => {
            let nhc = sources.nhc_atcfnoaa_bdeck_dir.join(&name);

            if !link_first(ctx, &[&nhc, &archive], &destination) {
                info!("Did not find {} online, trying NHC ftp", name);
                download_nhc(ctx, storm, &sources.nhc_atcf_bdeck_ftp, &name, dir);
            }

            format!(
                "WARNING: {} and {} do not exist and did not find file on NHC ftp site",
                nhc.display(),
                archive.display()
            )
        }
    };

    if ctx.staging().presence(&destination).is_done() {
        return Ok(true);
    }

    warn!("{}", message);
    ErrorRecord::named(dir, &format!("error_b{}.txt", storm.id)).append(&message)?;

    Ok(false)
}

/// Stages the a-deck, misses are only logged.
fn stage_adeck(ctx: &Context, storm: &Storm, dir: &Path) -> PathBuf {
    let sources = &ctx.config.sources;
    let name = deck_name('a', storm);
    let destination = dir.join(&name);

    if ctx.staging().presence(&destination).is_done() {
        return destination;
    }

    let (online, archive) = match storm.basin {
        Basin::WestPacific => (
            sources.nhc_atcfnavy_adeck_dir.join(&name),
            sources.trak_arch_dir.join("aid").join(&name),
        ),
        _ => (
            sources.nhc_atcfnoaa_adeck_dir.join(&name),
            sources.trak_arch_dir.join("aid_nws").join(&name),
        ),
    };

    if !link_first(ctx, &[&online, &archive], &destination) && storm.basin != Basin::WestPacific {
        info!("Did not find {} online, trying NHC ftp", name);
        download_nhc(ctx, storm, &sources.nhc_atcf_adeck_ftp, &name, dir);
    }

    if !ctx.staging().presence(&destination).is_done() {
        warn!("{} and {} do not exist", online.display(), archive.display());
    }

    destination
}

/// First and last synoptic time of the best track.
pub fn storm_period(bdeck: &Path) -> Result<(NaiveDateTime, NaiveDateTime), DeckError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(bdeck)?;

    let mut period: Option<(NaiveDateTime, NaiveDateTime)> = None;

    for record in reader.records() {
        let record = record?;
        let stamp = match record.get(2) {
            Some(stamp) if !stamp.is_empty() => stamp,
            _ => continue,
        };

        let time = NaiveDateTime::parse_from_str(&format!("{}00", stamp), "%Y%m%d%H%M")
            .map_err(|_| DeckError::InvalidDate(bdeck.to_path_buf(), stamp.to_string()))?;

        period = Some(match period {
            Some((first, _)) => (first, time),
            None => (time, time),
        });
    }

    period.ok_or_else(|| DeckError::Empty(bdeck.to_path_buf()))
}

/// Init times of model tracks covering the storm, in the verified cycles.
pub fn track_inits(
    first: NaiveDateTime,
    last: NaiveDateTime,
    fhr_list: &[LeadOffset],
    fcyc_list: &[u32],
) -> Vec<NaiveDateTime> {
    let window = TimeWindow {
        start: first,
        end: last,
        increment: Duration::seconds(i64::from(TRACK_INIT_STRIDE_SECONDS)),
    };

    let mut seen = FxHashSet::default();

    generate(&window, fhr_list, TimeAxis::Init)
        .iter()
        .filter(|slot| fcyc_list.contains(&slot.init.hour()) && !slot.is_skipped_cycle())
        .map(|slot| slot.init)
        .filter(|init| seen.insert(*init))
        .collect()
}

/// Identifier of the model inside its own track files.
fn track_tag(model: &ModelConfig) -> String {
    if model.name == "gfs" {
        GFS_TRACK_ID.to_string()
    } else {
        model.name.chars().take(4).collect::<String>().to_uppercase()
    }
}

pub fn rewrite_model_id(track: &Path, from: &str, to: &str) -> io::Result<()> {
    let text = fs::read_to_string(track)?;
    fs::write(track, text.replace(from, to))
}

/// Writes the operational GFS lines of the a-deck for the init time.
fn extract_gfs_track(ctx: &Context, adeck: &Path, init: &NaiveDateTime, destination: &Path) -> io::Result<()> {
    if !ctx.probe.exists(adeck) {
        warn!("{} does not exist", adeck.display());
        return Ok(());
    }

    let stamp = ymdh(init);
    let text = fs::read_to_string(adeck)?;
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| line.contains(GFS_TRACK_ID) && line.contains(&stamp))
        .collect();

    if lines.is_empty() {
        warn!("No {} track of {} in {}", GFS_TRACK_ID, stamp, adeck.display());
        return Ok(());
    }

    fs::write(destination, lines.join("\n") + "\n")
}

fn stage_track(ctx: &Context, model: &ModelConfig, init: &NaiveDateTime, adeck: &Path) -> Result<(), StagerError> {
    let destination = ctx.model_dir(model)?.join(format!("track.{}.dat", ymdh(init)));

    if ctx.staging().presence(&destination).is_done() {
        return Ok(());
    }

    let is_gfs = model.name == "gfs";
    let atcf_id = if is_gfs {
        GFS_VERIFIED_ID
    } else {
        model.require(&model.atcf_name, "atcf_name")?.as_str()
    };

    let format = model.require(&model.track_file_format, "track_file_format")?;
    let slot = TimeSlot::from_init(*init, Lead::zero());
    let online = model.online_dir().join(template::resolve_slot(format, &slot)?);

    if is_gfs && !ctx.probe.exists(&online) {
        info!("Did not find {}, using the a-deck", online.display());
        extract_gfs_track(ctx, adeck, init, &destination)?;
    } else {
        let tape = TapeSpec::new(
            &model.hpss_dir,
            TapeKind::CycloneTrack {
                model: model.name.clone(),
            },
            *init,
        );
        let file = LogicalFile::online(online).with_tape(tape);
        ctx.fetcher
            .fetch(&file, &destination, StageMode::Copy, ctx.config.model_tape_enabled())?;
    }

    if ctx.staging().presence(&destination).is_done() {
        rewrite_model_id(&destination, &track_tag(model), atcf_id)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 8, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    const BDECK: &str = "\
AL, 05, 2019082406,   , BEST,   0, 130N,  430W,  25, 1011, LO
AL, 05, 2019082412,   , BEST,   0, 132N,  445W,  30, 1010, TD,  34, NEQ,
AL, 05, 2019082412,   , BEST,   0, 132N,  445W,  30, 1010, TD,  50, NEQ,
AL, 05, 2019082500,   , BEST,   0, 135N,  470W,  35, 1008, TS
";

    #[test]
    fn storm_period_from_best_track() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bal052019.dat");
        fs::write(&path, BDECK).unwrap();

        assert_eq!(storm_period(&path).unwrap(), (at(24, 6), at(25, 0)));
    }

    #[test]
    fn invalid_best_track() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.dat");
        fs::write(&empty, "").unwrap();
        assert!(matches!(storm_period(&empty), Err(DeckError::Empty(_))));

        let broken = dir.path().join("broken.dat");
        fs::write(&broken, "AL, 05, 20190824XX, BEST\n").unwrap();
        assert!(matches!(storm_period(&broken), Err(DeckError::InvalidDate(_, _))));
    }

    #[test]
    fn inits_follow_verified_cycles() {
        let leads = vec![LeadOffset::Forecast(Lead::new(0)), LeadOffset::Forecast(Lead::new(12))];
        let inits = track_inits(at(24, 6), at(25, 6), &leads, &[0, 12]);

        assert_eq!(inits, vec![at(24, 12), at(25, 0)]);
    }

    #[test]
    fn model_id_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("track.2019082400.dat");
        fs::write(&path, "AL, 05, 2019082400, 03, AVNO, 000\nAL, 05, 2019082400, 03, AVNO, 006\n").unwrap();

        rewrite_model_id(&path, GFS_TRACK_ID, GFS_VERIFIED_ID).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("AVNO"));
        assert_eq!(text.matches("GFSO").count(), 2);
    }
}
