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

//! Logger setup.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Local;
use env_logger::{Builder, Env, Target};

use crate::error::AppError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Install the global logger.
///
/// The filter defaults to `info` and follows `RUST_LOG` when set. With a
/// `log_file`, records are appended to it as `timestamp - message` lines.
pub fn init(log_file: Option<&Path>) -> Result<(), AppError> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    if let Some(path) = log_file {
        let file = open_log_file(path)?;
        builder
            .target(Target::Pipe(Box::new(file)))
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{} - {}",
                    Local::now().format(TIMESTAMP_FORMAT),
                    record.args()
                )
            });
    }

    builder.try_init()?;
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File, AppError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AppError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}
