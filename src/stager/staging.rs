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

//! Producing files under `data/` from resolved sources.
//!
//! The destination path is the only state: when it exists the work
//! is done and nothing is touched. GRIB2 sources are converted to
//! GRIB1 at the destination, other sources are linked (or copied).
//! Failed staging is never an error, the destination just stays missing.

use super::archive::Probe;
use super::configuration::Tools;
use crate::constants::GRIB2_NAME_MARKERS;
use crate::errors::ToolError;
use chrono::NaiveDateTime;
use log::{debug, warn};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Whether the staged file exists.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Presence {
    Done,
    Missing,
}

impl Presence {
    pub fn is_done(self) -> bool {
        self == Presence::Done
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum StageMode {
    Link,
    Copy,
}

/// External programs and file operations used while staging.
pub trait Toolbox {
    fn grib2_to_grib1(&self, source: &Path, destination: &Path) -> Result<(), ToolError>;

    fn symlink(&self, source: &Path, destination: &Path) -> Result<(), ToolError>;

    fn copy(&self, source: &Path, destination: &Path) -> Result<(), ToolError>;

    /// Rewrites precipitation rate in the GRIB1 file as accumulation.
    fn prate_to_apcp(&self, file: &Path) -> Result<(), ToolError>;

    /// Averages netCDF files, optionally only the listed variables.
    fn average(&self, inputs: &[PathBuf], output: &Path, variables: Option<&str>) -> Result<(), ToolError>;

    fn download(&self, url: &str, directory: &Path) -> Result<(), ToolError>;

    fn gunzip(&self, file: &Path) -> Result<(), ToolError>;

    fn unzip_member(&self, archive: &Path, member: &str, directory: &Path) -> Result<(), ToolError>;
}

/// Toolbox calling the configured executables.
#[derive(Clone, Debug)]
pub struct ExternalTools {
    tools: Tools,
}

impl ExternalTools {
    pub fn new(tools: &Tools) -> Self {
        ExternalTools {
            tools: tools.clone(),
        }
    }

    fn run(program: &str, args: &[&str]) -> Result<(), ToolError> {
        let line = format!("{} {}", program, args.join(" "));
        debug!("Running {}", line);

        let status = Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|err| ToolError::Spawn(line.clone(), err))?;

        if !status.success() {
            return Err(ToolError::Failed(line, status));
        }

        Ok(())
    }
}

fn text(path: &Path) -> String {
    path.display().to_string()
}

impl Toolbox for ExternalTools {
    fn grib2_to_grib1(&self, source: &Path, destination: &Path) -> Result<(), ToolError> {
        ExternalTools::run(&self.tools.cnvgrib, &["-g21", &text(source), &text(destination)])
    }

    fn symlink(&self, source: &Path, destination: &Path) -> Result<(), ToolError> {
        // replace a dangling link left by previous runs
        if fs::symlink_metadata(destination).is_ok() {
            fs::remove_file(destination)?;
        }

        #[cfg(unix)]
        std::os::unix::fs::symlink(source, destination)?;

        #[cfg(not(unix))]
        fs::copy(source, destination).map(|_| ())?;

        Ok(())
    }

    fn copy(&self, source: &Path, destination: &Path) -> Result<(), ToolError> {
        fs::copy(source, destination)?;
        Ok(())
    }

    fn prate_to_apcp(&self, file: &Path) -> Result<(), ToolError> {
        let dir = file.parent().unwrap_or_else(|| Path::new("."));
        let grib1 = dir.join("tmp_gb1");
        let grib2 = dir.join("tmp_gb2");
        let accumulated = dir.join("tmp_gb2_APCP");

        fs::rename(file, &grib1)?;

        let result = ExternalTools::run(&self.tools.cnvgrib, &["-g12", &text(&grib1), &text(&grib2)])
            .and_then(|_| {
                ExternalTools::run(
                    &self.tools.wgrib2,
                    &[
                        &text(&grib2),
                        "-match",
                        ":PRATE:",
                        "-rpn",
                        "3600:*",
                        "-set_var",
                        "APCP",
                        "-set",
                        "table_4.10",
                        "1",
                        "-grib_out",
                        &text(&accumulated),
                    ],
                )
            })
            .and_then(|_| {
                ExternalTools::run(&self.tools.cnvgrib, &["-g21", &text(&accumulated), &text(file)])
            });

        for temporary in [grib1, grib2, accumulated] {
            if temporary.exists() {
                fs::remove_file(temporary)?;
            }
        }

        result
    }

    fn average(&self, inputs: &[PathBuf], output: &Path, variables: Option<&str>) -> Result<(), ToolError> {
        let inputs: Vec<String> = inputs.iter().map(|input| text(input)).collect();
        let output = text(output);

        let mut args = vec!["-O"];
        args.extend(inputs.iter().map(String::as_str));
        args.extend(["-o", output.as_str()]);
        if let Some(variables) = variables {
            args.extend(["-v", variables]);
        }

        ExternalTools::run(&self.tools.ncea, &args)
    }

    fn download(&self, url: &str, directory: &Path) -> Result<(), ToolError> {
        ExternalTools::run(&self.tools.wget, &["-q", url, "-P", &text(directory)])
    }

    fn gunzip(&self, file: &Path) -> Result<(), ToolError> {
        ExternalTools::run(&self.tools.gunzip, &["-q", "-f", &text(file)])
    }

    fn unzip_member(&self, archive: &Path, member: &str, directory: &Path) -> Result<(), ToolError> {
        ExternalTools::run(
            &self.tools.unzip,
            &["-qq", "-o", "-d", &text(directory), &text(archive), member],
        )
    }
}

/// Whether the file name indicates GRIB2 encoding.
pub fn is_grib2(path: &Path) -> bool {
    let path = path.to_string_lossy();
    GRIB2_NAME_MARKERS.iter().any(|marker| path.contains(marker))
}

/// Idempotent staging of resolved files.
pub struct Staging<'a> {
    probe: &'a dyn Probe,
    tools: &'a dyn Toolbox,
}

impl<'a> Staging<'a> {
    pub fn new(probe: &'a dyn Probe, tools: &'a dyn Toolbox) -> Self {
        Staging { probe, tools }
    }

    pub fn tools(&self) -> &'a dyn Toolbox {
        self.tools
    }

    pub fn presence(&self, destination: &Path) -> Presence {
        if self.probe.exists(destination) {
            Presence::Done
        } else {
            Presence::Missing
        }
    }

    /// Produces the destination from the source unless it already exists.
    pub fn stage(&self, source: &Path, destination: &Path, mode: StageMode) -> Presence {
        if self.presence(destination).is_done() {
            return Presence::Done;
        }

        let result = if is_grib2(source) {
            self.tools.grib2_to_grib1(source, destination)
        } else {
            match mode {
                StageMode::Link => self.tools.symlink(source, destination),
                StageMode::Copy => self.tools.copy(source, destination),
            }
        };

        if let Err(err) = result {
            warn!(
                "Cannot stage {} as {}: {}",
                source.display(),
                destination.display(),
                err
            );
        }

        self.presence(destination)
    }
}

/// Sentinel file noting what could not be found for a slot.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ErrorRecord {
    pub path: PathBuf,
}

impl ErrorRecord {
    /// Record `error_<prefix><YYYYmmddHHMM>.txt` in the directory.
    pub fn for_slot(dir: &Path, prefix: &str, time: &NaiveDateTime) -> Self {
        ErrorRecord {
            path: dir.join(format!("error_{}{}.txt", prefix, time.format("%Y%m%d%H%M"))),
        }
    }

    pub fn named(dir: &Path, name: &str) -> Self {
        ErrorRecord {
            path: dir.join(name),
        }
    }

    /// Writes the message only if the record does not exist yet.
    /// Returns whether the record was created.
    pub fn record_once(&self, message: &str) -> io::Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }

        self.append(message)?;
        Ok(true)
    }

    pub fn append(&self, message: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", message)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::stager::archive::HostFs;
    use chrono::NaiveDate;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Toolbox writing small placeholder files and recording calls.
    #[derive(Default)]
    pub struct RecordingTools {
        pub calls: RefCell<Vec<String>>,
    }

    impl RecordingTools {
        fn log(&self, call: String) {
            self.calls.borrow_mut().push(call);
        }

        pub fn count(&self, prefix: &str) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|call| call.starts_with(prefix))
                .count()
        }
    }

    impl Toolbox for RecordingTools {
        fn grib2_to_grib1(&self, source: &Path, destination: &Path) -> Result<(), ToolError> {
            self.log(format!("convert {}", source.display()));
            fs::write(destination, "grib1")?;
            Ok(())
        }

        fn symlink(&self, source: &Path, destination: &Path) -> Result<(), ToolError> {
            self.log(format!("link {}", source.display()));
            fs::write(destination, "link")?;
            Ok(())
        }

        fn copy(&self, source: &Path, destination: &Path) -> Result<(), ToolError> {
            self.log(format!("copy {}", source.display()));
            fs::write(destination, "copy")?;
            Ok(())
        }

        fn prate_to_apcp(&self, file: &Path) -> Result<(), ToolError> {
            self.log(format!("apcp {}", file.display()));
            Ok(())
        }

        fn average(&self, inputs: &[PathBuf], output: &Path, variables: Option<&str>) -> Result<(), ToolError> {
            self.log(format!("average {} {:?}", inputs.len(), variables));
            fs::write(output, "mean")?;
            Ok(())
        }

        fn download(&self, url: &str, _directory: &Path) -> Result<(), ToolError> {
            self.log(format!("download {}", url));
            Ok(())
        }

        fn gunzip(&self, file: &Path) -> Result<(), ToolError> {
            self.log(format!("gunzip {}", file.display()));
            Ok(())
        }

        fn unzip_member(&self, archive: &Path, member: &str, _directory: &Path) -> Result<(), ToolError> {
            self.log(format!("unzip {} {}", archive.display(), member));
            Ok(())
        }
    }

    #[test]
    fn stage_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let tools = RecordingTools::default();
        let staging = Staging::new(&HostFs, &tools);

        let source = dir.path().join("pgbf06.gfs.2021010100");
        let destination = dir.path().join("f06.2021010100");

        assert_eq!(staging.stage(&source, &destination, StageMode::Link), Presence::Done);
        assert_eq!(staging.stage(&source, &destination, StageMode::Link), Presence::Done);
        assert_eq!(tools.count("link"), 1);
    }

    #[test]
    fn grib2_is_converted() {
        let dir = TempDir::new().unwrap();
        let tools = RecordingTools::default();
        let staging = Staging::new(&HostFs, &tools);

        let source = dir.path().join("gfs.t00z.pgrb2.0p25.f006.grib2");
        staging.stage(&source, &dir.path().join("f06.2021010100"), StageMode::Copy);

        assert_eq!(tools.count("convert"), 1);
        assert_eq!(tools.count("copy"), 0);
        assert!(is_grib2(Path::new("/a/b.grb2")));
        assert!(!is_grib2(Path::new("/a/pgbf06.gfs")));
    }

    #[test]
    fn error_record_created_once() {
        let dir = TempDir::new().unwrap();
        let time = NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let record = ErrorRecord::for_slot(dir.path(), "anl_", &time);

        assert_eq!(record.path, dir.path().join("error_anl_202101010600.txt"));
        assert!(record.record_once("first").unwrap());
        assert!(!record.record_once("second").unwrap());

        record.append("third").unwrap();
        assert_eq!(fs::read_to_string(&record.path).unwrap(), "first\nthird\n");
    }
}
