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

//! Retrieval of single files from tape through the batch scheduler.
//!
//! For every tape request a shell job is written to `HPSS_jobs/`
//! next to the destination, submitted to the scheduler and then
//! polled until the scheduler no longer lists it or the walltime
//! of the job passes. Completion of the job does not guarantee
//! that the file was extracted, callers must check the destination.

pub mod cancel;
pub mod scheduler;

use self::cancel::CancelToken;
use self::scheduler::JobQueue;
use super::archive::tape::TapeCandidate;
use crate::constants::{GFS_TRACK_ID, HPSS_JOBS_DIR};
use crate::errors::JobError;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Processing of the extracted member.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PostExtract {
    /// GRIB2 grids are converted to GRIB1 at the destination.
    ConvertGrib2,
    /// Cyclone tracks of both naming variants are merged
    /// and the model identifier is rewritten.
    MergeTrack,
    /// Member extracted directly under its destination name.
    InPlace,
    Copy,
}

impl PostExtract {
    pub fn for_member(member: &str) -> Self {
        if member.contains("pgrb2") {
            PostExtract::ConvertGrib2
        } else if member.contains("trackatcfunix") {
            PostExtract::MergeTrack
        } else if member.starts_with("ccpa.") {
            PostExtract::InPlace
        } else {
            PostExtract::Copy
        }
    }
}

/// One tape retrieval, never reused for another file.
#[derive(Clone, PartialEq, Debug)]
pub struct RetrievalJob {
    pub script: PathBuf,
    pub log: PathBuf,
    pub name: String,
    pub workdir: PathBuf,
    pub destination: PathBuf,
    pub candidate: TapeCandidate,
    pub walltime: Duration,
    pub tick: Duration,
}

impl RetrievalJob {
    pub fn new(
        workdir: &Path,
        destination: &Path,
        candidate: TapeCandidate,
        walltime: Duration,
        tick: Duration,
    ) -> Self {
        let name = format!(
            "HPSS_{}_{}",
            candidate.tar_name(),
            candidate.member.replace('/', "_")
        );
        let jobs_dir = workdir.join(HPSS_JOBS_DIR);

        RetrievalJob {
            script: jobs_dir.join(format!("{}.sh", name)),
            log: jobs_dir.join(format!("{}.out", name)),
            name,
            workdir: workdir.to_path_buf(),
            destination: destination.to_path_buf(),
            candidate,
            walltime,
            tick,
        }
    }

    /// Top directory of the extracted tree.
    fn extracted_root(&self) -> &str {
        self.candidate
            .member
            .split('/')
            .next()
            .unwrap_or(&self.candidate.member)
    }

    /// Identifier written into tracks instead of the GFS one,
    /// first four letters of the model directory name.
    fn track_tag(&self) -> String {
        self.destination
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().chars().take(4).collect::<String>())
            .unwrap_or_default()
            .to_uppercase()
    }

    /// Text of the job script.
    pub fn script_text(&self, htar: &str, cnvgrib: &str) -> String {
        let tar = &self.candidate.tar;
        let member = &self.candidate.member;
        let destination = self.destination.display();

        let mut lines = vec![
            "#!/bin/sh".to_string(),
            format!("cd {}", self.workdir.display()),
            format!("{} -xf {} ./{}", htar, tar, member),
        ];

        match PostExtract::for_member(member) {
            PostExtract::ConvertGrib2 => {
                lines.push(format!(
                    "{} -g21 {} {} > /dev/null 2>&1",
                    cnvgrib, member, destination
                ));
                lines.push(format!("rm -r {}", self.extracted_root()));
            }
            PostExtract::MergeTrack => {
                let prefix = member.split("avn").next().unwrap_or(member);
                lines.push(format!(
                    "{} -xf {} ./{}",
                    htar,
                    tar,
                    member.replace("avno", "avn")
                ));
                lines.push(format!("cp {}avn* {}", prefix, destination));
                lines.push(format!("rm -r {}", self.extracted_root()));
                lines.push(format!(
                    "sed -i s/{}/{}/g {}",
                    GFS_TRACK_ID,
                    self.track_tag(),
                    destination
                ));
            }
            PostExtract::Copy => {
                lines.push(format!("cp {} {}", member, destination));
                lines.push(format!("rm -r {}", self.extracted_root()));
            }
            PostExtract::InPlace => {}
        }

        lines.join("\n") + "\n"
    }
}

/// How the wait for a submitted job ended.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RetrievalOutcome {
    /// Scheduler no longer lists the job.
    Completed,
    /// Walltime passed with the job still listed.
    TimedOut,
    Cancelled,
}

/// Builds, submits and waits for retrieval jobs.
pub struct JobRunner<'a> {
    queue: &'a dyn JobQueue,
    cancel: CancelToken,
    htar: String,
    cnvgrib: String,
}

impl<'a> JobRunner<'a> {
    pub fn new(queue: &'a dyn JobQueue, cancel: CancelToken, htar: &str, cnvgrib: &str) -> Self {
        JobRunner {
            queue,
            cancel,
            htar: htar.to_string(),
            cnvgrib: cnvgrib.to_string(),
        }
    }

    /// Writes a fresh job script, removing the previous one and its log.
    pub fn build(&self, job: &RetrievalJob) -> Result<(), JobError> {
        let script_error = |err| JobError::Script(job.script.clone(), err);

        if let Some(jobs_dir) = job.script.parent() {
            fs::create_dir_all(jobs_dir).map_err(script_error)?;
        }

        for old in [&job.script, &job.log] {
            if old.exists() {
                fs::remove_file(old).map_err(script_error)?;
            }
        }

        fs::write(&job.script, job.script_text(&self.htar, &self.cnvgrib)).map_err(script_error)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&job.script, fs::Permissions::from_mode(0o755))
                .map_err(script_error)?;
        }

        Ok(())
    }

    pub fn run(&self, job: &RetrievalJob) -> Result<RetrievalOutcome, JobError> {
        self.build(job)?;

        info!(
            "Submitting {} to retrieve {} from {}",
            job.script.display(),
            job.candidate.member,
            job.candidate.tar
        );
        info!("Output sent to {}", job.log.display());
        self.queue.submit(job)?;

        self.wait(job)
    }

    /// Polls the scheduler every tick while the whole wait fits in walltime.
    pub fn wait(&self, job: &RetrievalJob) -> Result<RetrievalOutcome, JobError> {
        let mut waited = Duration::ZERO;

        while waited + job.tick <= job.walltime {
            if self.cancel.wait(job.tick) {
                return Ok(RetrievalOutcome::Cancelled);
            }
            waited += job.tick;

            debug!(
                "Walltime checker: {} out of {} seconds",
                waited.as_secs(),
                job.walltime.as_secs()
            );

            if self.queue.active(job)? == 0 {
                return Ok(RetrievalOutcome::Completed);
            }
        }

        Ok(RetrievalOutcome::TimedOut)
    }
}
