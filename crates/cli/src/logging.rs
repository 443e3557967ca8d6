// Copyright 2025 itscheems
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

//! Logging initialization for the apix command-line client
//!
//! # Configuration
//!
//! The following environment variables can be used to configure logging:
//!
//! - `RUST_LOG`: Log level filter (default: `info`)
//!   - Can be set per module: `RUST_LOG=apix::request=debug,reqwest=info`
//!
//! - `LOG_DIR`: Root directory for log files (default: unset, no file output)
//!   - Log files are created in `{LOG_DIR}/apix/` directory
//!   - Rotation: one file per day (UTC), e.g. `apix.2026-01-03.log`
//!
//! - `LOG_TO_CONSOLE`: Enable stderr output (default: `true`)
//!   - Set to `true`, `1`, or `yes` to enable; anything else disables it
//!
//! Command results go to stdout; logs never do.

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use tracing::debug;
use tracing_appender::{
	non_blocking,
	rolling::{self, Rotation},
};
use tracing_subscriber::{
	EnvFilter, fmt, layer::SubscriberExt, registry::Registry, util::SubscriberInitExt,
};

use crate::config::{DEFAULT_LOG_LEVEL, DEFAULT_LOG_TO_CONSOLE, LOG_COMPONENT_NAME, parse_flag};

// Store log guard to prevent log loss on program exit
static LOG_GUARD: OnceLock<non_blocking::WorkerGuard> = OnceLock::new();

/// Setup daily-rolling file logging in `{log_root}/apix/`
fn setup_file_logging(log_root: &str) -> Result<non_blocking::NonBlocking> {
	let log_dir = Path::new(log_root).join(LOG_COMPONENT_NAME);
	std::fs::create_dir_all(&log_dir)
		.with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

	let file_appender = rolling::RollingFileAppender::builder()
		.rotation(Rotation::DAILY)
		.filename_prefix(LOG_COMPONENT_NAME.to_string())
		.filename_suffix(".log")
		.build(&log_dir)
		.with_context(|| {
			format!(
				"Failed to create rolling file appender in {}",
				log_dir.display()
			)
		})?;

	let (file_writer, guard) = non_blocking(file_appender);
	LOG_GUARD.set(guard).ok();

	Ok(file_writer)
}

/// Initialize logging with stderr output and optional file output
///
/// See module-level documentation for environment variable configuration.
pub fn init_logging() -> Result<()> {
	let log_level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

	let log_to_console = env::var("LOG_TO_CONSOLE")
		.map(|v| parse_flag(&v))
		.unwrap_or(DEFAULT_LOG_TO_CONSOLE);

	let log_root = env::var("LOG_DIR").ok();
	let file_layer = match log_root.as_deref() {
		Some(root) => Some(
			fmt::layer()
				.with_writer(setup_file_logging(root)?)
				.with_timer(fmt::time::UtcTime::rfc_3339())
				.with_thread_ids(true)
				.with_target(true)
				.with_ansi(false),
		),
		None => None,
	};

	let console_layer = log_to_console.then(|| {
		fmt::layer()
			.with_writer(std::io::stderr)
			.with_timer(fmt::time::UtcTime::rfc_3339())
			.with_target(true)
			.with_ansi(true)
	});

	Registry::default()
		.with(filter)
		.with(file_layer)
		.with(console_layer)
		.try_init()
		.context("Failed to initialize logging")?;

	debug!(target: "apix::cli", "Log level: {}", log_level);
	if let Some(root) = log_root {
		debug!(
			target: "apix::cli",
			"Log files: {}/{}/{}.YYYY-MM-DD.log (daily rolling)",
			root,
			LOG_COMPONENT_NAME,
			LOG_COMPONENT_NAME
		);
	}

	Ok(())
}
