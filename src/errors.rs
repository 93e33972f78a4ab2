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

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StagerError {
    #[error("Error while reading configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Error while filling file name template: {0}")]
    Template(#[from] TemplateError),

    #[error("Cannot prepare data directory: {0}")]
    DataDir(#[from] std::io::Error),

    #[error("Error while reading best track deck: {0}")]
    Deck(#[from] DeckError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot open configuration file: {0}")]
    CantOpenFile(#[from] std::io::Error),

    #[error("Cannot deserialize configuration file: {0}")]
    CantDeserialize(#[from] serde_yaml::Error),

    #[error("Configuration component is out of bounds: {0}")]
    OutOfBounds(&'static str),

    #[error("Configuration section {0} is required by the selected run")]
    MissingSection(&'static str),

    #[error("Model {0} has no value for {1} required by the selected run")]
    MissingModelKey(String, &'static str),

    #[error("{0} is not a valid value for {1}")]
    Unsupported(String, &'static str),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Placeholder in {0} has invalid time format {1}")]
    InvalidFormat(String, String),
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Cannot write job script {0}: {1}")]
    Script(PathBuf, std::io::Error),

    #[error("Cannot run scheduler command {0}: {1}")]
    Command(String, std::io::Error),

    #[error("Scheduler command {0} exited with {1}")]
    Rejected(String, std::process::ExitStatus),

    #[error("Machine {0} has no batch scheduler for tape retrieval")]
    NoScheduler(String),
}

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Cannot read deck file: {0}")]
    CantRead(#[from] csv::Error),

    #[error("Deck file {0} contains no track records")]
    Empty(PathBuf),

    #[error("Deck file {0} has invalid date {1}")]
    InvalidDate(PathBuf, String),
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Cannot run external tool {0}: {1}")]
    Spawn(String, std::io::Error),

    #[error("External tool {0} exited with {1}")]
    Failed(String, std::process::ExitStatus),

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),
}
