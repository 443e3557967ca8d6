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
use std::fmt;

/// Default id qualifier for credential retrieval (Finnish business id)
pub const DEFAULT_ID_QUALIFIER: &str = "y-tunnus";

/// Error raised when credentials cannot authenticate any request
#[derive(Debug, thiserror::Error)]
#[error("transfer_key or password must be present")]
pub struct MissingSecretError;

/// Client credentials
///
/// Either a transfer key or a password must be present. A password-only
/// client can retrieve its transfer credentials; everything else needs the
/// transfer id/key pair.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
	transfer_id: String,
	transfer_key: Option<String>,
	unique_company_id: Option<String>,
	#[serde(skip_serializing)]
	password: Option<String>,
}

fn present(value: &Option<String>) -> bool {
	value.as_deref().is_some_and(|v| !v.is_empty())
}

impl Credentials {
	/// Create credentials, rejecting a combination with no usable secret
	pub fn new(
		transfer_id: impl Into<String>,
		transfer_key: Option<String>,
		unique_company_id: Option<String>,
		password: Option<String>,
	) -> Result<Self, MissingSecretError> {
		let credentials = Self {
			transfer_id: transfer_id.into(),
			transfer_key,
			unique_company_id,
			password,
		};

		if !present(&credentials.transfer_key) && !present(&credentials.password) {
			return Err(MissingSecretError);
		}

		Ok(credentials)
	}

	/// Transfer id/key pair
	pub fn with_transfer_key(
		transfer_id: impl Into<String>,
		transfer_key: impl Into<String>,
	) -> Result<Self, MissingSecretError> {
		Self::new(transfer_id, Some(transfer_key.into()), None, None)
	}

	/// Password only, for credential retrieval
	pub fn with_password(password: impl Into<String>) -> Result<Self, MissingSecretError> {
		Self::new(String::new(), None, None, Some(password.into()))
	}

	pub fn transfer_id(&self) -> &str {
		&self.transfer_id
	}

	pub fn transfer_key(&self) -> Option<&str> {
		self.transfer_key.as_deref()
	}

	pub fn unique_company_id(&self) -> Option<&str> {
		self.unique_company_id.as_deref()
	}

	pub fn password(&self) -> Option<&str> {
		self.password.as_deref()
	}

	pub fn set_transfer_id(&mut self, transfer_id: impl Into<String>) {
		self.transfer_id = transfer_id.into();
	}

	pub fn set_transfer_key(&mut self, transfer_key: impl Into<String>) {
		self.transfer_key = Some(transfer_key.into());
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("transfer_id", &self.transfer_id)
			.field("transfer_key", &self.transfer_key.as_ref().map(|_| "<redacted>"))
			.field("unique_company_id", &self.unique_company_id)
			.field("password", &self.password.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Arguments of credential retrieval
///
/// `id`, `uid` and `password` are required; `idq` falls back to
/// [`DEFAULT_ID_QUALIFIER`].
#[derive(Clone, Default)]
pub struct CredentialQuery {
	/// Company identifier (e.g. business id)
	pub id: Option<String>,
	/// Identifier qualifier
	pub idq: Option<String>,
	/// User id (e-mail)
	pub uid: Option<String>,
	/// Account password
	pub password: Option<String>,
}

impl CredentialQuery {
	pub fn new(
		id: impl Into<String>,
		uid: impl Into<String>,
		password: impl Into<String>,
	) -> Self {
		Self {
			id: Some(id.into()),
			idq: None,
			uid: Some(uid.into()),
			password: Some(password.into()),
		}
	}

	pub fn with_idq(mut self, idq: impl Into<String>) -> Self {
		self.idq = Some(idq.into());
		self
	}

	pub fn idq(&self) -> &str {
		self.idq.as_deref().unwrap_or(DEFAULT_ID_QUALIFIER)
	}
}

impl fmt::Debug for CredentialQuery {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CredentialQuery")
			.field("id", &self.id)
			.field("idq", &self.idq)
			.field("uid", &self.uid)
			.field("password", &self.password.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Sender and receiver of a document, for delivery method queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryParties {
	pub sender_name: String,
	pub sender_ytunnus: String,
	pub receiver_name: String,
	pub receiver_ytunnus: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_credentials_require_secret() {
		assert!(Credentials::new("", None, None, None).is_err());
		assert!(Credentials::new("transfer_id", None, None, None).is_err());
		assert!(Credentials::with_transfer_key("", "").is_err());
		assert!(Credentials::new("", Some(String::new()), None, Some(String::new())).is_err());
	}

	#[test]
	fn test_credentials_with_transfer_key() {
		let credentials = Credentials::with_transfer_key("transfer_id", "transfer_key").unwrap();
		assert_eq!(credentials.transfer_id(), "transfer_id");
		assert_eq!(credentials.transfer_key(), Some("transfer_key"));
		assert!(credentials.password().is_none());
	}

	#[test]
	fn test_credentials_with_password() {
		let credentials = Credentials::with_password("badpassword").unwrap();
		assert_eq!(credentials.password(), Some("badpassword"));
		assert!(credentials.transfer_key().is_none());
	}

	#[test]
	fn test_credentials_accessor_mutation() {
		let mut credentials = Credentials::with_password("badpassword").unwrap();
		credentials.set_transfer_id("fdf09a47");
		credentials.set_transfer_key("de6b8d40");
		assert_eq!(credentials.transfer_id(), "fdf09a47");
		assert_eq!(credentials.transfer_key(), Some("de6b8d40"));
	}

	#[test]
	fn test_debug_redacts_secrets() {
		let credentials = Credentials::new(
			"transfer_id",
			Some("secret-key".to_string()),
			None,
			Some("secret-password".to_string()),
		)
		.unwrap();
		let rendered = format!("{:?}", credentials);
		assert!(rendered.contains("transfer_id"));
		assert!(!rendered.contains("secret-key"));
		assert!(!rendered.contains("secret-password"));
	}

	#[test]
	fn test_credential_query_default_idq() {
		let query = CredentialQuery::new("2332748-7", "juha.litola@vendep.com", "badpassword");
		assert_eq!(query.idq(), "y-tunnus");
		assert_eq!(query.with_idq("ovt").idq(), "ovt");
	}
}
