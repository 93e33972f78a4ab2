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

//! Single file request: locate it across tiers, retrieve it from
//! tape when needed and stage it at its destination.

use super::archive::tape::TapeCandidate;
use super::archive::{Located, Locator, LogicalFile, Probe, Tier};
use super::retrieval::{JobRunner, RetrievalJob, RetrievalOutcome};
use super::staging::{StageMode, Staging};
use crate::errors::TemplateError;
use log::warn;
use std::path::Path;
use std::time::Duration;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MissReason {
    NotFound,
    TapeTimedOut,
    /// Scheduler finished the job but the file did not appear.
    TapeInconclusive,
    TapeCancelled,
    TapeFailed,
    StageFailed,
}

/// Why a file could not be produced and where it was searched.
#[derive(Clone, PartialEq, Debug)]
pub struct Miss {
    pub reason: MissReason,
    pub searched: String,
    pub tape: Option<TapeCandidate>,
}

impl Miss {
    /// Message in the form written to error records.
    pub fn message(&self) -> String {
        match (&self.reason, &self.tape) {
            (MissReason::StageFailed, _) => format!("WARNING: cannot stage {}", self.searched),
            (_, Some(tape)) => format!(
                "WARNING: {} does not exist and did not find HPSS file {} from {} or walltime exceeded",
                self.searched, tape.member, tape.tar
            ),
            (_, None) => format!("WARNING: {} does not exist", self.searched),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum Fetched {
    AlreadyStaged,
    Staged(Tier),
    Missing(Miss),
}

impl Fetched {
    pub fn is_present(&self) -> bool {
        !matches!(self, Fetched::Missing(_))
    }

    /// Whether the file was produced by this request.
    pub fn is_new(&self) -> bool {
        matches!(self, Fetched::Staged(_))
    }
}

/// Tape job limits of the run.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct JobLimits {
    pub walltime: Duration,
    pub tick: Duration,
}

pub struct Fetcher<'a> {
    probe: &'a dyn Probe,
    staging: &'a Staging<'a>,
    runner: &'a JobRunner<'a>,
    limits: JobLimits,
}

impl<'a> Fetcher<'a> {
    pub fn new(
        probe: &'a dyn Probe,
        staging: &'a Staging<'a>,
        runner: &'a JobRunner<'a>,
        limits: JobLimits,
    ) -> Self {
        Fetcher {
            probe,
            staging,
            runner,
            limits,
        }
    }

    pub fn staging(&self) -> &'a Staging<'a> {
        self.staging
    }

    /// Produces the destination from the first tier holding the file.
    /// Misses are logged and returned, never raised.
    pub fn fetch(
        &self,
        file: &LogicalFile,
        destination: &Path,
        mode: StageMode,
        tape_enabled: bool,
    ) -> Result<Fetched, TemplateError> {
        if self.staging.presence(destination).is_done() {
            return Ok(Fetched::AlreadyStaged);
        }

        let locator = Locator::new(self.probe, tape_enabled);

        let fetched = match locator.locate(file)? {
            Located::OnDisk(tier, source) => {
                if self.staging.stage(&source, destination, mode).is_done() {
                    Fetched::Staged(tier)
                } else {
                    Fetched::Missing(Miss {
                        reason: MissReason::StageFailed,
                        searched: source.display().to_string(),
                        tape: None,
                    })
                }
            }
            Located::OnTape(candidate) => self.retrieve(file, destination, candidate),
            Located::NotFound => Fetched::Missing(Miss {
                reason: MissReason::NotFound,
                searched: file.describe(),
                tape: None,
            }),
        };

        if let Fetched::Missing(miss) = &fetched {
            warn!("{}", miss.message());
        }

        Ok(fetched)
    }

    fn retrieve(&self, file: &LogicalFile, destination: &Path, candidate: TapeCandidate) -> Fetched {
        let workdir = destination.parent().unwrap_or_else(|| Path::new("."));
        let job = RetrievalJob::new(
            workdir,
            destination,
            candidate.clone(),
            self.limits.walltime,
            self.limits.tick,
        );

        let reason = match self.runner.run(&job) {
            Ok(RetrievalOutcome::Completed) => {
                if self.staging.presence(destination).is_done() {
                    return Fetched::Staged(Tier::Tape);
                }
                MissReason::TapeInconclusive
            }
            Ok(RetrievalOutcome::TimedOut) => MissReason::TapeTimedOut,
            Ok(RetrievalOutcome::Cancelled) => MissReason::TapeCancelled,
            Err(err) => {
                warn!("Tape retrieval of {} failed: {}", candidate.member, err);
                MissReason::TapeFailed
            }
        };

        Fetched::Missing(Miss {
            reason,
            searched: file.describe(),
            tape: Some(candidate),
        })
    }
}
