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

//! External collaborators of the client: the HTTP transport and the
//! filesystem the archives are read from. Both sit behind traits so the
//! client can be driven without network or disk.

use std::{future::Future, io, path::Path, time::Duration};

use reqwest::Client as ReqwestClient;
use tracing::debug;

use crate::request::SignedRequest;

/// Default HTTP request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error types for transport operations
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
	#[error("Network error: {0}")]
	Network(String),
	#[error("Server error: {status}: {body}")]
	Status { status: u16, body: String },
}

/// Executes signed requests and returns the raw response body
///
/// Non-2xx responses must be reported as [`TransportError::Status`].
pub trait Transport: Send + Sync {
	fn execute(
		&self,
		request: SignedRequest,
	) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// HTTPS transport backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: ReqwestClient,
}

impl HttpTransport {
	/// Create a transport with the default timeout
	pub fn new() -> Result<Self, TransportError> {
		Self::with_timeout(DEFAULT_TIMEOUT)
	}

	/// Create a transport with a custom request timeout
	pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| TransportError::Network(format!("Failed to create HTTP client: {}", e)))?;

		Ok(Self { client })
	}
}

impl Transport for HttpTransport {
	async fn execute(&self, request: SignedRequest) -> Result<String, TransportError> {
		let SignedRequest {
			operation,
			method,
			url,
			headers,
			body,
		} = request;

		let mut builder = self.client.request(method, url).headers(headers);
		if let Some(body) = body {
			builder = builder.body(body);
		}

		let response = builder
			.send()
			.await
			.map_err(|e| TransportError::Network(format!("Request failed: {}", e)))?;

		let status = response.status();
		debug!(target: "apix::transport", operation = ?operation, status = %status, "Received response");

		if !status.is_success() {
			let error_text = response
				.text()
				.await
				.unwrap_or_else(|_| format!("HTTP {}", status));
			return Err(TransportError::Status {
				status: status.as_u16(),
				body: error_text,
			});
		}

		response
			.text()
			.await
			.map_err(|e| TransportError::Network(format!("Failed to read response: {}", e)))
	}
}

/// Source of archive contents
pub trait FileSource: Send + Sync {
	fn exists(&self, path: &Path) -> bool;

	fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFiles;

impl FileSource for LocalFiles {
	fn exists(&self, path: &Path) -> bool {
		path.is_file()
	}

	fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
		std::fs::read(path)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_http_transport_creation() {
		assert!(HttpTransport::new().is_ok());
		assert!(HttpTransport::with_timeout(Duration::from_secs(5)).is_ok());
	}

	#[test]
	fn test_local_files() {
		let path = std::env::temp_dir().join(format!("apix-local-files-{}.zip", std::process::id()));
		std::fs::write(&path, b"PK\x03\x04").unwrap();

		assert!(LocalFiles.exists(&path));
		assert_eq!(LocalFiles.read_bytes(&path).unwrap(), b"PK\x03\x04");

		std::fs::remove_file(&path).unwrap();
		assert!(!LocalFiles.exists(&path));
		assert!(LocalFiles.read_bytes(&path).is_err());
	}

	#[test]
	fn test_directory_is_not_an_archive() {
		assert!(!LocalFiles.exists(&std::env::temp_dir()));
	}
}
