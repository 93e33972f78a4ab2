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

//! Batch scheduler protocol of the supported machines.
//!
//! WCOSS machines run LSF (`bsub`/`bjobs`), Hera runs Slurm
//! (`sbatch`/`squeue`). A job is considered active while the
//! scheduler lists it as running or pending.

use super::RetrievalJob;
use crate::constants::HPSS_JOB_MEMORY_MB;
use crate::errors::JobError;
use crate::stager::configuration::{Hpss, Machine};
use log::{debug, warn};
use std::process::{Command, Output};
use std::time::Duration;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Dialect {
    LsfCray,
    LsfDell,
    Slurm,
}

impl Dialect {
    /// Scheduler of the machine, `None` when it cannot reach tape.
    pub fn for_machine(machine: Machine) -> Option<Dialect> {
        match machine {
            Machine::WcossCray => Some(Dialect::LsfCray),
            Machine::WcossDell => Some(Dialect::LsfDell),
            Machine::Hera => Some(Dialect::Slurm),
            Machine::Orion => None,
        }
    }
}

/// Submission and state queries of retrieval jobs.
pub trait JobQueue {
    fn submit(&self, job: &RetrievalJob) -> Result<(), JobError>;

    /// Number of running or pending jobs with the name of the job.
    fn active(&self, job: &RetrievalJob) -> Result<usize, JobError>;
}

/// External command line: program and its arguments.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct CommandLine {
    pub program: &'static str,
    pub args: Vec<String>,
}

impl CommandLine {
    fn new(program: &'static str, args: &[&str]) -> Self {
        CommandLine {
            program,
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    fn describe(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }

    fn command(&self) -> Command {
        let mut command = Command::new(self.program);
        command.args(&self.args);
        command
    }
}

/// Scheduler reached through its command line tools.
#[derive(Clone, Debug)]
pub struct BatchScheduler {
    dialect: Dialect,
    queue: String,
    account: String,
    user: String,
}

impl BatchScheduler {
    pub fn new(dialect: Dialect, hpss: &Hpss) -> Self {
        BatchScheduler {
            dialect,
            queue: hpss.queue.clone(),
            account: hpss.account.clone(),
            user: hpss.user.clone(),
        }
    }

    pub fn submit_line(&self, job: &RetrievalJob) -> CommandLine {
        let script = job.script.display().to_string();
        let log = job.log.display().to_string();

        match self.dialect {
            Dialect::LsfCray | Dialect::LsfDell => {
                let walltime = clock(job.walltime, false);
                let mut line = CommandLine::new(
                    "bsub",
                    &[
                        "-W", &walltime, "-q", &self.queue, "-P", &self.account, "-o", &log,
                        "-e", &log, "-J", &job.name,
                    ],
                );

                let memory = if self.dialect == Dialect::LsfCray {
                    vec!["-R".to_string(), format!("rusage[mem={}]", HPSS_JOB_MEMORY_MB)]
                } else {
                    vec![
                        "-M".to_string(),
                        HPSS_JOB_MEMORY_MB.to_string(),
                        "-R".to_string(),
                        "affinity[core(1)]".to_string(),
                    ]
                };

                line.args.extend(memory);
                line.args.push(script);
                line
            }
            Dialect::Slurm => CommandLine::new(
                "sbatch",
                &[
                    "--ntasks=1",
                    &format!("--time={}", clock(job.walltime, true)),
                    &format!("--partition={}", self.queue),
                    &format!("--account={}", self.account),
                    &format!("--output={}", log),
                    &format!("--job-name={}", job.name),
                    &script,
                ],
            ),
        }
    }

    pub fn query_line(&self, job: &RetrievalJob) -> CommandLine {
        match self.dialect {
            Dialect::LsfCray | Dialect::LsfDell => CommandLine::new(
                "bjobs",
                &["-a", "-u", &self.user, "-noheader", "-J", &job.name],
            ),
            Dialect::Slurm => CommandLine::new(
                "squeue",
                &["-u", &self.user, "-n", &job.name, "-t", "R,PD", "-h"],
            ),
        }
    }

    /// Counts active jobs in the query output.
    pub fn count_active(&self, output: &str) -> usize {
        let lines = output.lines().filter(|line| !line.trim().is_empty());

        match self.dialect {
            Dialect::LsfCray | Dialect::LsfDell => lines
                .filter(|line| line.contains("RUN") || line.contains("PEND"))
                .count(),
            Dialect::Slurm => lines.count(),
        }
    }
}

impl JobQueue for BatchScheduler {
    fn submit(&self, job: &RetrievalJob) -> Result<(), JobError> {
        let line = self.submit_line(job);
        debug!("Submitting with {}", line.describe());

        let status = line
            .command()
            .status()
            .map_err(|err| JobError::Command(line.describe(), err))?;

        if !status.success() {
            return Err(JobError::Rejected(line.describe(), status));
        }

        Ok(())
    }

    fn active(&self, job: &RetrievalJob) -> Result<usize, JobError> {
        let line = self.query_line(job);

        let output = line
            .command()
            .output()
            .map_err(|err| JobError::Command(line.describe(), err))?;

        Ok(self.read_query(&line, &output))
    }
}

impl BatchScheduler {
    /// Active jobs from the query output. A failed query still
    /// reads as drained, so the failure is logged for tracing.
    fn read_query(&self, line: &CommandLine, output: &Output) -> usize {
        if !output.status.success() {
            warn!(
                "Scheduler query {} exited with {}: {}",
                line.describe(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        self.count_active(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Queue of machines without tape access, every request is refused.
#[derive(Clone, Debug)]
pub struct NoScheduler {
    machine: Machine,
}

impl NoScheduler {
    pub fn new(machine: Machine) -> Self {
        NoScheduler { machine }
    }

    fn refuse(&self) -> JobError {
        JobError::NoScheduler(format!("{:?}", self.machine))
    }
}

impl JobQueue for NoScheduler {
    fn submit(&self, _job: &RetrievalJob) -> Result<(), JobError> {
        Err(self.refuse())
    }

    fn active(&self, _job: &RetrievalJob) -> Result<usize, JobError> {
        Err(self.refuse())
    }
}

/// Wall-clock time of day for the given duration, as schedulers expect it.
fn clock(duration: Duration, with_seconds: bool) -> String {
    let total = duration.as_secs();
    let hours = (total / 3600) % 24;
    let minutes = (total / 60) % 60;

    if with_seconds {
        format!("{:02}:{:02}:{:02}", hours, minutes, total % 60)
    } else {
        format!("{:02}:{:02}", hours, minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::job;
    use super::*;

    fn scheduler(dialect: Dialect) -> BatchScheduler {
        BatchScheduler {
            dialect,
            queue: "dev_transfer".to_string(),
            account: "VERF-T2O".to_string(),
            user: "emc.verif".to_string(),
        }
    }

    #[test]
    fn lsf_submission() {
        let job = job(Duration::from_secs(600), Duration::from_secs(10));
        let line = scheduler(Dialect::LsfDell).submit_line(&job);

        assert_eq!(line.program, "bsub");
        assert_eq!(
            line.args,
            [
                "-W", "00:10", "-q", "dev_transfer", "-P", "VERF-T2O", "-o", "/data/gfs/HPSS_jobs/HPSS_x.out",
                "-e", "/data/gfs/HPSS_jobs/HPSS_x.out", "-J", "HPSS_x", "-M", "2048", "-R",
                "affinity[core(1)]", "/data/gfs/HPSS_jobs/HPSS_x.sh"
            ]
        );

        let line = scheduler(Dialect::LsfCray).submit_line(&job);
        assert!(line.args.contains(&"rusage[mem=2048]".to_string()));
        assert!(!line.args.contains(&"-M".to_string()));

        let query = scheduler(Dialect::LsfCray).query_line(&job);
        assert_eq!(query.describe(), "bjobs -a -u emc.verif -noheader -J HPSS_x");
    }

    #[test]
    fn slurm_submission() {
        let job = job(Duration::from_secs(90 * 60), Duration::from_secs(10));
        let line = scheduler(Dialect::Slurm).submit_line(&job);

        assert_eq!(line.program, "sbatch");
        assert_eq!(line.args[1], "--time=01:30:00");
        assert_eq!(line.args[6], "/data/gfs/HPSS_jobs/HPSS_x.sh");

        let query = scheduler(Dialect::Slurm).query_line(&job);
        assert_eq!(query.describe(), "squeue -u emc.verif -n HPSS_x -t R,PD -h");
    }

    #[test]
    fn active_counting() {
        let lsf = "123 emc RUN dev_transfer HPSS_x\n124 emc DONE dev_transfer HPSS_x\n125 emc PEND q HPSS_x\n";
        assert_eq!(scheduler(Dialect::LsfDell).count_active(lsf), 2);
        assert_eq!(scheduler(Dialect::LsfDell).count_active(""), 0);
        assert_eq!(scheduler(Dialect::Slurm).count_active("  42 service HPSS_x R\n\n"), 1);
    }

    #[cfg(unix)]
    #[test]
    fn failed_query_reads_as_drained() {
        use std::os::unix::process::ExitStatusExt;
        use std::process::ExitStatus;

        let job = job(Duration::from_secs(60), Duration::from_secs(1));
        let scheduler = scheduler(Dialect::Slurm);
        let line = scheduler.query_line(&job);

        let failed = Output {
            status: ExitStatus::from_raw(1 << 8),
            stdout: vec![],
            stderr: b"slurm_load_jobs error: Socket timed out".to_vec(),
        };
        assert_eq!(scheduler.read_query(&line, &failed), 0);

        let listed = Output {
            status: ExitStatus::from_raw(0),
            stdout: b"42 service HPSS_x R\n".to_vec(),
            stderr: vec![],
        };
        assert_eq!(scheduler.read_query(&line, &listed), 1);
    }

    #[test]
    fn orion_has_no_scheduler() {
        assert_eq!(Dialect::for_machine(Machine::Orion), None);
        assert_eq!(Dialect::for_machine(Machine::Hera), Some(Dialect::Slurm));

        let job = job(Duration::from_secs(60), Duration::from_secs(1));
        let queue = NoScheduler::new(Machine::Orion);
        assert!(matches!(queue.submit(&job), Err(JobError::NoScheduler(_))));
    }
}
