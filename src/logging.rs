// Copyright 2024 Saptak Santra
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

//! Tracing subscriber setup driven by [`LogConfig`]
//!
//! Only available with the `profiling` feature. Without it the crate still
//! emits `tracing` events and the host installs its own subscriber.

use std::fs::File;
use std::io;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::{MakeWriter, MakeWriterExt};

use crate::config::LogConfig;
use crate::error::{EngineError, Result};

/// Install the global subscriber. The returned guard flushes the log file
/// when dropped and must be kept alive for the program's lifetime.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let level = parse_level(&config.level)?;

    match (&config.file, config.console) {
        (Some(path), console) => {
            let (writer, guard) = tracing_appender::non_blocking(File::create(path)?);
            if console {
                install(writer.and(io::stdout), level, config.json, false)?;
            } else {
                install(writer, level, config.json, false)?;
            }
            Ok(Some(guard))
        }
        (None, true) => {
            install(io::stdout, level, config.json, true)?;
            Ok(None)
        }
        (None, false) => Ok(None),
    }
}

pub fn parse_level(level: &str) -> Result<Level> {
    level
        .trim()
        .parse::<Level>()
        .map_err(|_| EngineError::ConfigError(format!("unknown log level '{level}'")))
}

fn install<W>(writer: W, level: Level, json: bool, ansi: bool) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_max_level(level)
        .with_ansi(ansi)
        .with_thread_names(true);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| EngineError::ConfigError(format!("logging already initialized: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() -> Result<()> {
        assert_eq!(parse_level("debug")?, Level::DEBUG);
        assert_eq!(parse_level(" WARN ")?, Level::WARN);
        assert!(matches!(parse_level("loud"), Err(EngineError::ConfigError(_))));
        Ok(())
    }

    #[test]
    fn test_silent_config_installs_nothing() -> Result<()> {
        let config = LogConfig {
            console: false,
            ..LogConfig::default()
        };
        assert!(init_logging(&config)?.is_none());
        Ok(())
    }
}
