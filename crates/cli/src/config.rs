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

use std::{env, time::Duration};

use anyhow::{Context, Result};
use apix_sdk::ApixConfig;

// Logging configuration constants
/// Default log level (can be overridden by RUST_LOG environment variable)
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log file prefix and directory component name
pub const LOG_COMPONENT_NAME: &str = "apix";

/// Default console output enabled (can be overridden by LOG_TO_CONSOLE environment variable)
pub const DEFAULT_LOG_TO_CONSOLE: bool = true;

// Transport configuration constants
/// Default HTTP timeout in seconds (can be overridden by APIX_TIMEOUT_SECS)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct CliConfig {
	pub apix: ApixConfig,
	pub timeout: Duration,
}

impl CliConfig {
	/// Load the service configuration from `config_file` (if given) and
	/// `APIX_*` environment variables
	pub fn load(config_file: Option<&str>) -> Result<Self> {
		dotenv::dotenv().ok();

		let apix = match config_file {
			Some(path) => ApixConfig::from_file(path)
				.with_context(|| format!("Invalid configuration file: {}", path))?,
			None => ApixConfig::from_env().context("Invalid APIX_* environment configuration")?,
		};

		let timeout_secs = env::var("APIX_TIMEOUT_SECS")
			.ok()
			.and_then(|v| v.parse().ok())
			.unwrap_or(DEFAULT_TIMEOUT_SECS);

		Ok(Self {
			apix,
			timeout: Duration::from_secs(timeout_secs),
		})
	}
}

/// Parse a boolean flag the way `LOG_TO_CONSOLE` is documented
pub fn parse_flag(value: &str) -> bool {
	matches!(value, "true" | "1" | "yes")
}
