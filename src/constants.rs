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

//! Module containing fixed values of the production environment.

///Root of the operational runhistory archive on tape storage
pub const HPSS_PROD_BASE_DIR: &str = "/NCEPPROD/hpssprod/runhistory";

///Marker that distinguishes operational tape roots from experiment ones
pub const HPSS_PROD_MARKER: &str = "NCEPPROD";

///Substrings of file names that indicate GRIB2 encoding
pub const GRIB2_NAME_MARKERS: [&str; 2] = ["grib2", "grb2"];

///Init hours of off-synoptic cycles that are never verified
pub const SKIPPED_INIT_HOURS: [u32; 4] = [3, 9, 15, 21];

///Default interval (in seconds) between scheduler queue checks
pub const POLL_TICK_SECONDS: u64 = 10;

///Default wall-clock budget (in minutes) of a tape retrieval job
pub const HPSS_WALLTIME_MINUTES: u64 = 10;

///Memory (in MB) requested from LSF for a tape retrieval job
pub const HPSS_JOB_MEMORY_MB: u32 = 2048;

///Name of the subdirectory holding tape retrieval job scripts
pub const HPSS_JOBS_DIR: &str = "HPSS_jobs";

///ATCF identifier of the operational GFS in model track files
pub const GFS_TRACK_ID: &str = "AVNO";

///ATCF identifier under which the operational GFS is verified
pub const GFS_VERIFIED_ID: &str = "GFSO";

///Stride (in seconds) between model track init times
pub const TRACK_INIT_STRIDE_SECONDS: u32 = 21600;

///Only precipitation accumulation length supported for observations
pub const CCPA_ACCUM_HOURS: u32 = 24;

///Season whose decks are still served from the live NHC feed
///instead of the yearly archive
pub const LIVE_DECK_SEASON: u32 = 2019;
