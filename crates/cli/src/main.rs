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

//! Apix command-line client
//!
//! Thin front end over `apix-sdk`: one subcommand per service operation,
//! results printed to stdout as JSON.
//!
//! Service settings come from `APIX_*` environment variables (or `.env`),
//! or from a configuration file given with `--config`:
//!
//! ```text
//! APIX_SERVICE_HOST=test-api.apix.fi
//! APIX_SOFTWARE_NAME=Economix
//! APIX_SOFTWARE_VERSION=1.0
//! APIX_TRANSFER_ID=...
//! APIX_TRANSFER_KEY=...
//! ```

mod config;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use apix_sdk::{
	ApixClient, ApixConfig, CredentialQuery, Credentials, DeliveryParties, HttpTransport,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use crate::{config::CliConfig, logging::init_logging};

#[derive(Parser, Debug)]
#[command(name = "apix", version, about = "Apix e-invoicing service client")]
struct Cli {
	/// Configuration file (keys as in APIX_* without the prefix)
	#[arg(long, global = true)]
	config: Option<String>,

	/// Transfer id for print and delivery method requests
	/// (defaults to the configured transfer id)
	#[arg(long, global = true)]
	transfer_id: Option<String>,

	/// Transfer key for print and delivery method requests
	/// (defaults to the configured transfer key)
	#[arg(long, global = true, env = "APIX_CLIENT_TRANSFER_KEY", hide_env_values = true)]
	transfer_key: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Retrieve TransferID, TransferKey and UniqueCompanyID of an account
	RetrieveCredentials {
		/// Company identifier
		#[arg(long)]
		id: String,
		/// Identifier qualifier
		#[arg(long, default_value = apix_sdk::DEFAULT_ID_QUALIFIER)]
		idq: String,
		/// User id (e-mail)
		#[arg(long)]
		uid: String,
		/// Account password
		#[arg(long, env = "APIX_PASSWORD", hide_env_values = true)]
		password: String,
	},
	/// Send a ZIP archive of invoices
	SendInvoice { path: PathBuf },
	/// Send a ZIP archive of documents for printing
	SendPrint { path: PathBuf },
	/// Look up e-invoice addresses of a business id
	AddressQuery { id: String },
	/// Look up the delivery method and price between two parties
	DeliveryMethod {
		#[arg(long)]
		sender_name: String,
		#[arg(long)]
		sender_ytunnus: String,
		#[arg(long)]
		receiver_name: String,
		#[arg(long)]
		receiver_ytunnus: String,
	},
}

/// Credentials for operations signed with the client's own transfer key
fn client_credentials(
	config: &ApixConfig,
	transfer_id: Option<String>,
	transfer_key: Option<String>,
) -> Result<Credentials> {
	let transfer_id = transfer_id
		.or_else(|| config.transfer_id.clone())
		.unwrap_or_default();
	let transfer_key = transfer_key.or_else(|| config.transfer_key.clone());

	Credentials::new(transfer_id, transfer_key, None, None)
		.context("No transfer key: set APIX_TRANSFER_KEY or pass --transfer-key")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
	let rendered = serde_json::to_string_pretty(value).context("Failed to render result")?;
	println!("{}", rendered);
	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	let Cli {
		config,
		transfer_id,
		transfer_key,
		command,
	} = Cli::parse();

	init_logging()?;

	let config = CliConfig::load(config.as_deref())?;
	info!(target: "apix::cli", host = %config.apix.service_host, "Using Apix service");

	let transport =
		HttpTransport::with_timeout(config.timeout).context("Failed to create HTTP transport")?;

	if let Command::RetrieveCredentials {
		id,
		idq,
		uid,
		password,
	} = command
	{
		let query = CredentialQuery::new(id, uid, password).with_idq(idq);
		let client = ApixClient::authenticate_with(config.apix, transport, query)
			.await
			.context("Failed to retrieve credentials")?;
		return print_json(client.credentials());
	}

	let credentials = client_credentials(&config.apix, transfer_id, transfer_key)?;
	let client = ApixClient::with_transport(config.apix, credentials, transport);

	match command {
		Command::SendInvoice { path } => {
			let Some(response) = client
				.submit_invoice_archive(&path)
				.await
				.context("Failed to send invoice archive")?
			else {
				bail!("Archive not found: {}", path.display());
			};
			print_json(&response)
		}
		Command::SendPrint { path } => {
			let Some(response) = client
				.submit_print_archive(&path)
				.await
				.context("Failed to send print archive")?
			else {
				bail!("Archive not found: {}", path.display());
			};
			print_json(&response)
		}
		Command::AddressQuery { id } => {
			let groups = client
				.query_address(&id)
				.await
				.context("Address query failed")?;
			print_json(&groups)
		}
		Command::DeliveryMethod {
			sender_name,
			sender_ytunnus,
			receiver_name,
			receiver_ytunnus,
		} => {
			let parties = DeliveryParties {
				sender_name,
				sender_ytunnus,
				receiver_name,
				receiver_ytunnus,
			};
			let groups = client
				.query_delivery_method(&parties)
				.await
				.context("Delivery method query failed")?;
			print_json(&groups)
		}
		Command::RetrieveCredentials { .. } => unreachable!("handled above"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn test_cli_definition() {
		Cli::command().debug_assert();
	}

	#[test]
	fn test_parse_retrieve_credentials() {
		let cli = Cli::try_parse_from([
			"apix",
			"retrieve-credentials",
			"--id",
			"2332748-7",
			"--uid",
			"juha.litola@vendep.com",
			"--password",
			"badpassword",
		])
		.unwrap();

		match cli.command {
			Command::RetrieveCredentials { id, idq, uid, .. } => {
				assert_eq!(id, "2332748-7");
				assert_eq!(idq, "y-tunnus");
				assert_eq!(uid, "juha.litola@vendep.com");
			}
			other => panic!("unexpected command: {:?}", other),
		}
	}

	#[test]
	fn test_parse_send_invoice_with_global_flags() {
		let cli = Cli::try_parse_from([
			"apix",
			"send-invoice",
			"invoices.zip",
			"--config",
			"apix.toml",
			"--transfer-id",
			"fdf09a47",
		])
		.unwrap();

		assert_eq!(cli.config.as_deref(), Some("apix.toml"));
		assert_eq!(cli.transfer_id.as_deref(), Some("fdf09a47"));
		assert!(matches!(cli.command, Command::SendInvoice { ref path } if path == &PathBuf::from("invoices.zip")));
	}

	#[test]
	fn test_client_credentials_fall_back_to_config() {
		let config = ApixConfig::default().configure(|c| {
			c.transfer_id = Some("1234567890".to_string());
			c.transfer_key = Some("098765432".to_string());
		});

		let credentials = client_credentials(&config, None, None).unwrap();
		assert_eq!(credentials.transfer_id(), "1234567890");
		assert_eq!(credentials.transfer_key(), Some("098765432"));

		let credentials =
			client_credentials(&config, Some("fdf09a47".to_string()), Some("de6b8d40".to_string()))
				.unwrap();
		assert_eq!(credentials.transfer_id(), "fdf09a47");
		assert_eq!(credentials.transfer_key(), Some("de6b8d40"));
	}

	#[test]
	fn test_client_credentials_require_key() {
		assert!(client_credentials(&ApixConfig::default(), Some("id".to_string()), None).is_err());
	}
}
