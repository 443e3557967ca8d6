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

//! Request digest signing
//!
//! Every Apix request carries a `d=SHA-256:<hex>` parameter. The digest is a
//! plain SHA-256 over the request's parameter values joined with `+`, with
//! the shared secret appended as the last element. It is not an HMAC, so the
//! parameter order is the whole contract: the server recomputes the digest
//! in its own fixed order and rejects anything else.
//!
//! Two secrets are in use:
//! - **Transfer key**: appended verbatim.
//! - **Password**: only its SHA-256 hex digest is appended (credential
//!   retrieval).

use sha2::{Digest, Sha256};

/// Tag prefixed to every digest sent on the wire
pub const DIGEST_TAG: &str = "SHA-256:";

/// Separator between digest input elements
const DIGEST_SEPARATOR: &str = "+";

/// Error types for signing operations
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
	#[error("Missing secret: {0}")]
	MissingSecret(&'static str),
}

/// Shared secret used to authenticate a request
#[derive(Clone, Copy)]
pub enum Secret<'a> {
	/// Service-issued transfer key, appended as is
	TransferKey(&'a str),
	/// Account password, appended as its SHA-256 hex digest
	Password(&'a str),
}

impl<'a> Secret<'a> {
	/// Resolve an optional transfer key into a secret
	pub fn transfer_key(key: Option<&'a str>) -> Result<Self, SigningError> {
		key.map(Secret::TransferKey)
			.ok_or(SigningError::MissingSecret("transfer_key"))
	}

	/// Resolve an optional password into a secret
	pub fn password(password: Option<&'a str>) -> Result<Self, SigningError> {
		password
			.map(Secret::Password)
			.ok_or(SigningError::MissingSecret("password"))
	}

	/// The element appended to the digest input
	fn digest_element(&self) -> String {
		match self {
			Secret::TransferKey(key) => (*key).to_string(),
			Secret::Password(password) => sha256_hex(password),
		}
	}
}

impl std::fmt::Debug for Secret<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Secret::TransferKey(_) => f.write_str("TransferKey(..)"),
			Secret::Password(_) => f.write_str("Password(..)"),
		}
	}
}

/// Lowercase hex SHA-256 of a string
pub fn sha256_hex(input: &str) -> String {
	hex::encode(Sha256::digest(input.as_bytes()))
}

/// Compute the hex digest binding `params` (in order) to `secret`
///
/// `SHA-256(p1+p2+...+pn+secret)`, where the secret element is the transfer
/// key or the password's own SHA-256 hex.
pub fn sign<I, S>(secret: Secret<'_>, params: I) -> String
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut elements: Vec<String> = params.into_iter().map(|p| p.as_ref().to_string()).collect();
	elements.push(secret.digest_element());

	sha256_hex(&elements.join(DIGEST_SEPARATOR))
}

/// Compute the tagged `SHA-256:<hex>` value of the `d` query parameter
pub fn digest_param<I, S>(secret: Secret<'_>, params: I) -> String
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	format!("{}{}", DIGEST_TAG, sign(secret, params))
}
