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

use serde::{Deserialize, Serialize};

/// Default Apix service host (test environment)
pub const DEFAULT_SERVICE_HOST: &str = "test-api.apix.fi";

/// Environment variable prefix for configuration loading
pub const ENV_PREFIX: &str = "APIX";

/// Apix client configuration
///
/// A plain value handed to the client at construction. The transfer
/// id/key here are the account-level defaults used by invoice submission
/// and address queries; print submission and delivery method queries use
/// the client's own credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApixConfig {
	/// Service host name, without scheme
	pub service_host: String,
	/// Software name reported as `soft`
	pub software_name: Option<String>,
	/// Software version reported as `ver`
	pub software_version: Option<String>,
	/// Default transfer id
	pub transfer_id: Option<String>,
	/// Default transfer key
	pub transfer_key: Option<String>,
}

impl Default for ApixConfig {
	fn default() -> Self {
		Self {
			service_host: DEFAULT_SERVICE_HOST.to_string(),
			software_name: None,
			software_version: None,
			transfer_id: None,
			transfer_key: None,
		}
	}
}

impl ApixConfig {
	/// Adjust the configuration in place and return it
	///
	/// ```
	/// use apix_sdk::ApixConfig;
	///
	/// let config = ApixConfig::default().configure(|c| {
	/// 	c.software_name = Some("Economix".into());
	/// 	c.software_version = Some("1.0".into());
	/// });
	/// assert_eq!(config.service_host, "test-api.apix.fi");
	/// ```
	pub fn configure(mut self, f: impl FnOnce(&mut Self)) -> Self {
		f(&mut self);
		self
	}

	/// Load configuration from `APIX_*` environment variables
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::Environment::with_prefix(ENV_PREFIX))
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file, with environment overrides
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(config::Environment::with_prefix(ENV_PREFIX))
			.build()?;

		cfg.try_deserialize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_config() {
		let config = ApixConfig::default();
		assert_eq!(config.service_host, "test-api.apix.fi");
		assert!(config.software_name.is_none());
		assert!(config.transfer_key.is_none());
	}

	#[test]
	fn test_configure_overrides() {
		let config = ApixConfig::default().configure(|c| {
			c.software_name = Some("Economix".to_string());
			c.software_version = Some("1.0".to_string());
		});
		assert_eq!(config.software_name.as_deref(), Some("Economix"));
		assert_eq!(config.software_version.as_deref(), Some("1.0"));

		let config = config.configure(|c| {
			c.software_name = Some("Devlab".to_string());
			c.software_version = Some("1.6".to_string());
		});
		assert_eq!(config.software_name.as_deref(), Some("Devlab"));
		assert_eq!(config.software_version.as_deref(), Some("1.6"));
	}

	#[test]
	fn test_from_file() {
		let path = std::env::temp_dir().join(format!("apix-config-{}.toml", std::process::id()));
		std::fs::write(
			&path,
			"service_host = \"api.apix.fi\"\nsoftware_name = \"Economix\"\ntransfer_id = \"1234567890\"\n",
		)
		.unwrap();

		let config = ApixConfig::from_file(path.to_str().unwrap()).unwrap();
		std::fs::remove_file(&path).ok();

		assert_eq!(config.service_host, "api.apix.fi");
		assert_eq!(config.software_name.as_deref(), Some("Economix"));
		assert_eq!(config.transfer_id.as_deref(), Some("1234567890"));
		assert!(config.software_version.is_none());
	}
}
