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

use std::{
	io,
	path::{Path, PathBuf},
	sync::Arc,
};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::ApixConfig;
use crate::request::{Clock, Operation, RequestBuilder, RequestError, SignedRequest};
use crate::response::{ContentGroup, DecodeError, ServiceResponse, extract_credential_fields};
use crate::signing::SigningError;
use crate::transport::{FileSource, HttpTransport, LocalFiles, Transport, TransportError};
use crate::types::{CredentialQuery, Credentials, DeliveryParties, MissingSecretError};

/// Error types for client operations
#[derive(Debug, Error)]
pub enum ClientError {
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Protocol violation: {0}")]
	ProtocolViolation(String),
	#[error(transparent)]
	Transport(#[from] TransportError),
	#[error("Request rejected ({status_code}): {}", .messages.join("; "))]
	Rejected {
		status_code: String,
		messages: Vec<String>,
	},
	#[error("Failed to read {}: {source}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("Failed to create tokio runtime: {0}")]
	Runtime(#[source] io::Error),
}

impl From<RequestError> for ClientError {
	fn from(e: RequestError) -> Self {
		ClientError::InvalidArgument(e.to_string())
	}
}

impl From<SigningError> for ClientError {
	fn from(e: SigningError) -> Self {
		ClientError::InvalidArgument(e.to_string())
	}
}

impl From<MissingSecretError> for ClientError {
	fn from(e: MissingSecretError) -> Self {
		ClientError::InvalidArgument(e.to_string())
	}
}

impl From<DecodeError> for ClientError {
	fn from(e: DecodeError) -> Self {
		ClientError::ProtocolViolation(e.to_string())
	}
}

/// Client for the Apix e-invoicing service
///
/// Every operation is a single signed request/response round trip; nothing
/// is retried. Archive submission and address queries authenticate with the
/// transfer id/key of the [`ApixConfig`], print submission and delivery
/// method queries with the client's own [`Credentials`].
pub struct ApixClient<T: Transport = HttpTransport> {
	builder: RequestBuilder,
	credentials: Credentials,
	transport: T,
	files: Arc<dyn FileSource>,
}

impl ApixClient<HttpTransport> {
	/// Create a client talking HTTPS to the configured host
	pub fn new(config: ApixConfig, credentials: Credentials) -> Result<Self, ClientError> {
		Ok(Self::with_transport(config, credentials, HttpTransport::new()?))
	}

	/// Retrieve transfer credentials with a password and return a client
	/// holding them
	pub async fn authenticate(config: ApixConfig, query: CredentialQuery) -> Result<Self, ClientError> {
		Self::authenticate_with(config, HttpTransport::new()?, query).await
	}
}

impl<T: Transport> ApixClient<T> {
	/// Create a client over a custom transport
	pub fn with_transport(config: ApixConfig, credentials: Credentials, transport: T) -> Self {
		Self {
			builder: RequestBuilder::new(config),
			credentials,
			transport,
			files: Arc::new(LocalFiles),
		}
	}

	/// Replace the timestamp source
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.builder = RequestBuilder::with_clock(self.builder.config().clone(), clock);
		self
	}

	/// Replace the archive source
	pub fn with_files(mut self, files: impl FileSource + 'static) -> Self {
		self.files = Arc::new(files);
		self
	}

	/// Retrieve transfer credentials over `transport` and return a client
	/// holding them
	pub async fn authenticate_with(
		config: ApixConfig,
		transport: T,
		query: CredentialQuery,
	) -> Result<Self, ClientError> {
		let password = Credentials::with_password(query.password.clone().unwrap_or_default())?;
		let mut client = Self::with_transport(config, password, transport);
		client.credentials = client.retrieve_credentials(&query).await?;
		Ok(client)
	}

	pub fn config(&self) -> &ApixConfig {
		self.builder.config()
	}

	pub fn credentials(&self) -> &Credentials {
		&self.credentials
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	pub fn set_transfer_id(&mut self, transfer_id: impl Into<String>) {
		self.credentials.set_transfer_id(transfer_id);
	}

	pub fn set_transfer_key(&mut self, transfer_key: impl Into<String>) {
		self.credentials.set_transfer_key(transfer_key);
	}

	/// Retrieve the system generated TransferID, TransferKey and
	/// UniqueCompanyID of an account
	///
	/// `GET /app-transferID`, authenticated with the account password.
	pub async fn retrieve_credentials(&self, query: &CredentialQuery) -> Result<Credentials, ClientError> {
		let request = self.builder.retrieve_transfer_id(query)?;
		let response = self.send(request).await?;

		let fields = extract_credential_fields(&response)?;
		let credentials = Credentials::new(
			fields.transfer_id.unwrap_or_default(),
			fields.transfer_key,
			fields.unique_company_id,
			None,
		);

		match credentials {
			Ok(credentials) => {
				info!(
					target: "apix::client",
					transfer_id = %credentials.transfer_id(),
					"Retrieved transfer credentials"
				);
				Ok(credentials)
			}
			Err(_) if !response.is_ok() => Err(ClientError::Rejected {
				status_code: response.status_code,
				messages: response.error_messages,
			}),
			Err(e) => Err(e.into()),
		}
	}

	/// Send a ZIP archive of invoices, their PDF images and attachments
	///
	/// `PUT /invoices`, authenticated with the configured transfer id/key.
	/// Returns `Ok(None)` without contacting the service when `path` is not
	/// an existing file.
	pub async fn submit_invoice_archive(
		&self,
		path: impl AsRef<Path>,
	) -> Result<Option<ServiceResponse>, ClientError> {
		let Some(content) = self.read_archive(Operation::SendInvoiceZip, path.as_ref())? else {
			return Ok(None);
		};

		let request = self.builder.send_invoice_zip(content)?;
		self.send(request).await.map(Some)
	}

	/// Send a ZIP archive of PDF documents with their XML metadata for
	/// printing
	///
	/// `PUT /print`, authenticated with the client's credentials. Returns
	/// `Ok(None)` without contacting the service when `path` is not an
	/// existing file.
	pub async fn submit_print_archive(
		&self,
		path: impl AsRef<Path>,
	) -> Result<Option<ServiceResponse>, ClientError> {
		let Some(content) = self.read_archive(Operation::SendPrintZip, path.as_ref())? else {
			return Ok(None);
		};

		let request = self.builder.send_print_zip(&self.credentials, content)?;
		self.send(request).await.map(Some)
	}

	/// E-invoice addresses and operators of a business id
	///
	/// `PUT /addressquery`, authenticated with the configured transfer id/key.
	pub async fn query_address(&self, id: &str) -> Result<Vec<ContentGroup>, ClientError> {
		let request = self.builder.address_query(id)?;
		Ok(self.send(request).await?.into_groups())
	}

	/// Delivery channel and price for a document between two parties
	///
	/// `PUT /method`, authenticated with the client's credentials.
	pub async fn query_delivery_method(
		&self,
		parties: &DeliveryParties,
	) -> Result<Vec<ContentGroup>, ClientError> {
		let request = self.builder.delivery_method(&self.credentials, parties)?;
		Ok(self.send(request).await?.into_groups())
	}

	fn read_archive(&self, operation: Operation, path: &Path) -> Result<Option<Vec<u8>>, ClientError> {
		if !self.files.exists(path) {
			warn!(
				target: "apix::client",
				operation = ?operation,
				path = %path.display(),
				"Archive not found, nothing sent"
			);
			return Ok(None);
		}

		self.files
			.read_bytes(path)
			.map(Some)
			.map_err(|source| ClientError::Io {
				path: path.to_path_buf(),
				source,
			})
	}

	async fn send(&self, request: SignedRequest) -> Result<ServiceResponse, ClientError> {
		let operation = request.operation;
		let raw = self.transport.execute(request).await?;
		let response = ServiceResponse::decode(raw);

		if response.is_ok() {
			info!(
				target: "apix::client",
				operation = ?operation,
				status_code = %response.status_code,
				groups = response.content_groups.len(),
				"Request completed"
			);
		} else {
			warn!(
				target: "apix::client",
				operation = ?operation,
				status = ?response.status,
				status_code = %response.status_code,
				messages = ?response.error_messages,
				"Service reported failure"
			);
		}

		Ok(response)
	}
}

/// Synchronous client wrapper
///
/// This wraps the async client and runs it in a tokio runtime.
/// For new code, prefer using the async [`ApixClient`] directly.
pub struct SyncClient<T: Transport = HttpTransport> {
	client: ApixClient<T>,
	runtime: tokio::runtime::Runtime,
}

impl SyncClient<HttpTransport> {
	/// Create a new synchronous client
	pub fn new(config: ApixConfig, credentials: Credentials) -> Result<Self, ClientError> {
		Self::from_client(ApixClient::new(config, credentials)?)
	}
}

impl<T: Transport> SyncClient<T> {
	/// Wrap an existing async client
	pub fn from_client(client: ApixClient<T>) -> Result<Self, ClientError> {
		let runtime = tokio::runtime::Runtime::new().map_err(ClientError::Runtime)?;
		Ok(Self { client, runtime })
	}

	pub fn client(&self) -> &ApixClient<T> {
		&self.client
	}

	pub fn client_mut(&mut self) -> &mut ApixClient<T> {
		&mut self.client
	}

	/// Retrieve transfer credentials (synchronous)
	pub fn retrieve_credentials(&self, query: &CredentialQuery) -> Result<Credentials, ClientError> {
		self.runtime.block_on(self.client.retrieve_credentials(query))
	}

	/// Send an invoice archive (synchronous)
	pub fn submit_invoice_archive(
		&self,
		path: impl AsRef<Path>,
	) -> Result<Option<ServiceResponse>, ClientError> {
		self.runtime.block_on(self.client.submit_invoice_archive(path))
	}

	/// Send a print archive (synchronous)
	pub fn submit_print_archive(
		&self,
		path: impl AsRef<Path>,
	) -> Result<Option<ServiceResponse>, ClientError> {
		self.runtime.block_on(self.client.submit_print_archive(path))
	}

	/// Query e-invoice addresses (synchronous)
	pub fn query_address(&self, id: &str) -> Result<Vec<ContentGroup>, ClientError> {
		self.runtime.block_on(self.client.query_address(id))
	}

	/// Query the delivery method (synchronous)
	pub fn query_delivery_method(
		&self,
		parties: &DeliveryParties,
	) -> Result<Vec<ContentGroup>, ClientError> {
		self.runtime.block_on(self.client.query_delivery_method(parties))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_client_creation() {
		let credentials = Credentials::with_transfer_key("transfer_id", "transfer_key").unwrap();
		let client = ApixClient::new(ApixConfig::default(), credentials).unwrap();
		assert_eq!(client.config().service_host, "test-api.apix.fi");
		assert_eq!(client.credentials().transfer_id(), "transfer_id");
	}

	#[test]
	fn test_client_with_password() {
		let credentials = Credentials::with_password("badpassword").unwrap();
		assert!(ApixClient::new(ApixConfig::default(), credentials).is_ok());
	}

	#[test]
	fn test_sync_client_creation() {
		let credentials = Credentials::with_transfer_key("transfer_id", "transfer_key").unwrap();
		let client = SyncClient::new(ApixConfig::default(), credentials);
		assert!(client.is_ok());
	}

	#[test]
	fn test_error_conversions() {
		let err: ClientError = MissingSecretError.into();
		assert!(matches!(err, ClientError::InvalidArgument(_)));

		let err: ClientError = DecodeError::UnknownValueType("Saldo".to_string()).into();
		assert!(matches!(err, ClientError::ProtocolViolation(ref m) if m.contains("Saldo")));

		let err: ClientError = RequestError::MissingArgument("uid").into();
		assert_eq!(err.to_string(), "Invalid argument: Missing argument: uid");

		let err = ClientError::Rejected {
			status_code: "7599".to_string(),
			messages: vec!["Parameter can't be null: id.".to_string()],
		};
		assert_eq!(
			err.to_string(),
			"Request rejected (7599): Parameter can't be null: id."
		);
	}
}
