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

//! Resolution of logical files across storage tiers.
//!
//! The online filesystem is searched first, then the long-term
//! archive disk, and only then the tape location is computed.
//! The tape tier is never touched when a disk tier holds the file.

pub mod eras;
pub mod tape;

use self::tape::{TapeCandidate, TapeSpec};
use crate::errors::TemplateError;
use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};

/// Storage tier, in order of searching.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Tier {
    Online,
    Archive,
    Tape,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Tier::Online => "online",
            Tier::Archive => "archive",
            Tier::Tape => "tape",
        };
        write!(f, "{}", name)
    }
}

/// Filesystem queries used to search the disk tiers.
pub trait Probe {
    fn exists(&self, path: &Path) -> bool;
}

/// Probe of the host filesystem.
#[derive(Copy, Clone, Debug, Default)]
pub struct HostFs;

impl Probe for HostFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Every place in which one file may be found.
#[derive(Clone, PartialEq, Debug)]
pub struct LogicalFile {
    pub online: PathBuf,
    pub archive: Option<PathBuf>,
    pub tape: Option<TapeSpec>,
}

impl LogicalFile {
    pub fn online(online: PathBuf) -> Self {
        LogicalFile {
            online,
            archive: None,
            tape: None,
        }
    }

    pub fn with_archive(mut self, archive: PathBuf) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_tape(mut self, tape: TapeSpec) -> Self {
        self.tape = Some(tape);
        self
    }

    /// Short description of the disk locations for log messages.
    pub fn describe(&self) -> String {
        match &self.archive {
            Some(archive) => format!("{} and {}", self.online.display(), archive.display()),
            None => self.online.display().to_string(),
        }
    }
}

/// Outcome of the search.
#[derive(Clone, PartialEq, Debug)]
pub enum Located {
    OnDisk(Tier, PathBuf),
    OnTape(TapeCandidate),
    NotFound,
}

pub struct Locator<'a> {
    probe: &'a dyn Probe,
    tape_enabled: bool,
}

impl<'a> Locator<'a> {
    pub fn new(probe: &'a dyn Probe, tape_enabled: bool) -> Self {
        Locator {
            probe,
            tape_enabled,
        }
    }

    pub fn locate(&self, file: &LogicalFile) -> Result<Located, TemplateError> {
        debug!("Searching {} online", file.online.display());
        if self.probe.exists(&file.online) {
            return Ok(Located::OnDisk(Tier::Online, file.online.clone()));
        }

        if let Some(archive) = &file.archive {
            debug!("Searching {} in archive", archive.display());
            if self.probe.exists(archive) {
                return Ok(Located::OnDisk(Tier::Archive, archive.clone()));
            }
        }

        if !self.tape_enabled {
            return Ok(Located::NotFound);
        }

        let candidate = match &file.tape {
            Some(spec) => tape::candidate(spec)?,
            None => None,
        };

        Ok(match candidate {
            Some(candidate) => {
                debug!(
                    "Tape candidate {} from {} ({} naming)",
                    candidate.member, candidate.tar, candidate.era
                );
                Located::OnTape(candidate)
            }
            None => Located::NotFound,
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::tape::{Dump, TapeKind};
    use super::*;
    use chrono::NaiveDate;
    use rustc_hash::FxHashSet;
    use std::cell::RefCell;

    /// Probe answering from a fixed set of paths and recording queries.
    #[derive(Default)]
    pub struct RecordingProbe {
        pub existing: FxHashSet<PathBuf>,
        pub probed: RefCell<Vec<PathBuf>>,
    }

    impl RecordingProbe {
        pub fn with(paths: &[&str]) -> Self {
            RecordingProbe {
                existing: paths.iter().map(PathBuf::from).collect(),
                probed: RefCell::new(vec![]),
            }
        }
    }

    impl Probe for RecordingProbe {
        fn exists(&self, path: &Path) -> bool {
            self.probed.borrow_mut().push(path.to_path_buf());
            self.existing.contains(path)
        }
    }

    fn file() -> LogicalFile {
        let time = NaiveDate::from_ymd_opt(2020, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let kind = TapeKind::ModelGrid {
            dump: Dump::Gfs,
            suffix: "f006".to_string(),
            model: "gfs".to_string(),
        };

        LogicalFile::online(PathBuf::from("/online/gfs/f006"))
            .with_archive(PathBuf::from("/archive/gfs/f006"))
            .with_tape(TapeSpec::operational(kind, time))
    }

    #[test]
    fn online_tier_wins() {
        let probe = RecordingProbe::with(&["/online/gfs/f006", "/archive/gfs/f006"]);
        let located = Locator::new(&probe, true).locate(&file()).unwrap();

        assert_eq!(located, Located::OnDisk(Tier::Online, PathBuf::from("/online/gfs/f006")));
        assert_eq!(*probe.probed.borrow(), vec![PathBuf::from("/online/gfs/f006")]);
    }

    #[test]
    fn archive_before_tape() {
        let probe = RecordingProbe::with(&["/archive/gfs/f006"]);
        let located = Locator::new(&probe, true).locate(&file()).unwrap();

        assert_eq!(located, Located::OnDisk(Tier::Archive, PathBuf::from("/archive/gfs/f006")));
        assert_eq!(probe.probed.borrow().len(), 2);
    }

    #[test]
    fn tape_only_when_enabled() {
        let probe = RecordingProbe::default();

        match Locator::new(&probe, true).locate(&file()).unwrap() {
            Located::OnTape(candidate) => {
                assert_eq!(candidate.member, "gfs.20200301/00/gfs.t00z.pgrb2.0p25.f006")
            }
            other => panic!("expected tape candidate, got {:?}", other),
        }

        let located = Locator::new(&probe, false).locate(&file()).unwrap();
        assert_eq!(located, Located::NotFound);

        let bare = LogicalFile::online(PathBuf::from("/online/x"));
        assert_eq!(Locator::new(&probe, true).locate(&bare).unwrap(), Located::NotFound);
    }
}
