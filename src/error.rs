// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fatal errors for the command-line front end.
//!
//! A server being down is never an error here; it is reported as a result.

use std::io;
use std::path::PathBuf;

use status_probe::TargetError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] confy::ConfyError),

    #[error("Invalid server target: {0}")]
    Target(#[from] TargetError),

    #[error("No server address configured; pass --server or set JAVA_ADDRESS")]
    NoServer,

    #[error("Cannot open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Logger already initialised: {0}")]
    Logger(#[from] log::SetLoggerError),
}
