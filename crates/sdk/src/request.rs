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

//! Signed request construction
//!
//! Each Apix operation has a fixed list of query parameters. Their values,
//! in declaration order, are the digest input, so the order is declared
//! exactly once per [`Operation`] and every request goes through
//! [`OrderedParams`].
//!
//! | Operation            | Path              | Parameters              | Secret        |
//! |----------------------|-------------------|-------------------------|---------------|
//! | `RetrieveTransferId` | `/app-transferID` | `id, idq, uid, ts`      | password      |
//! | `SendInvoiceZip`     | `/invoices`       | `soft, ver, TraID, t`   | transfer key  |
//! | `SendPrintZip`       | `/print`          | `soft, ver, TraID, t`   | transfer key  |
//! | `DeliveryMethod`     | `/method`         | `uid, t`                | transfer key  |
//! | `AddressQuery`       | `/addressquery`   | `uid, t`                | transfer key  |

use std::sync::Arc;

use quick_xml::escape::escape;
use reqwest::{
	Method, Url,
	header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use tracing::debug;

use crate::config::ApixConfig;
use crate::signing::{Secret, SigningError, digest_param};
use crate::types::{CredentialQuery, Credentials, DeliveryParties};

/// Timestamp format expected by the service (local time)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Name of the digest query parameter
pub const DIGEST_PARAM: &str = "d";

const CONTENT_TYPE_XML: &str = "text/xml";
const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";
const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Error types for request construction
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
	#[error("Missing argument: {0}")]
	MissingArgument(&'static str),
	#[error("{operation:?} expects {expected} parameters, got {actual}")]
	ParameterCount {
		operation: Operation,
		expected: usize,
		actual: usize,
	},
	#[error(transparent)]
	Signing(#[from] SigningError),
	#[error("Invalid URL: {0}")]
	InvalidUrl(String),
}

/// Source of request timestamps
pub trait Clock: Send + Sync {
	/// Current time as `YYYYMMDDHHMMSS`
	fn timestamp(&self) -> String;
}

/// Wall clock in local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn timestamp(&self) -> String {
		chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
	}
}

/// Clock frozen at a given timestamp
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
	fn timestamp(&self) -> String {
		self.0.clone()
	}
}

/// Apix service operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	RetrieveTransferId,
	SendInvoiceZip,
	SendPrintZip,
	DeliveryMethod,
	AddressQuery,
}

impl Operation {
	pub fn path(self) -> &'static str {
		match self {
			Operation::RetrieveTransferId => "/app-transferID",
			Operation::SendInvoiceZip => "/invoices",
			Operation::SendPrintZip => "/print",
			Operation::DeliveryMethod => "/method",
			Operation::AddressQuery => "/addressquery",
		}
	}

	pub fn method(self) -> Method {
		match self {
			Operation::RetrieveTransferId => Method::GET,
			_ => Method::PUT,
		}
	}

	/// Query parameter names, in digest order
	pub fn query_keys(self) -> &'static [&'static str] {
		match self {
			Operation::RetrieveTransferId => &["id", "idq", "uid", "ts"],
			Operation::SendInvoiceZip | Operation::SendPrintZip => &["soft", "ver", "TraID", "t"],
			Operation::DeliveryMethod | Operation::AddressQuery => &["uid", "t"],
		}
	}
}

/// Query parameter values of one operation, in declared order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedParams {
	operation: Operation,
	values: Vec<String>,
}

impl OrderedParams {
	pub fn new(operation: Operation, values: Vec<String>) -> Result<Self, RequestError> {
		let expected = operation.query_keys().len();
		if values.len() != expected {
			return Err(RequestError::ParameterCount {
				operation,
				expected,
				actual: values.len(),
			});
		}

		Ok(Self { operation, values })
	}

	pub fn operation(&self) -> Operation {
		self.operation
	}

	pub fn values(&self) -> impl Iterator<Item = &str> {
		self.values.iter().map(String::as_str)
	}

	pub fn pairs(&self) -> impl Iterator<Item = (&'static str, &str)> {
		self.operation
			.query_keys()
			.iter()
			.copied()
			.zip(self.values())
	}
}

/// Fully built request, ready for the transport
#[derive(Debug, Clone)]
pub struct SignedRequest {
	pub operation: Operation,
	pub method: Method,
	pub url: Url,
	pub headers: HeaderMap,
	pub body: Option<Vec<u8>>,
}

impl SignedRequest {
	/// Value of a query parameter
	pub fn query_value(&self, key: &str) -> Option<String> {
		self.url
			.query_pairs()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v.into_owned())
	}

	/// URL with the digest replaced, for logging
	pub fn redacted_url(&self) -> String {
		let mut url = self.url.clone();
		let pairs: Vec<(String, String)> = self
			.url
			.query_pairs()
			.map(|(k, v)| {
				let v = if k == DIGEST_PARAM {
					"<redacted>".to_string()
				} else {
					v.into_owned()
				};
				(k.into_owned(), v)
			})
			.collect();
		url.query_pairs_mut().clear().extend_pairs(pairs);
		url.to_string()
	}
}

/// Builds signed requests for every Apix operation
#[derive(Clone)]
pub struct RequestBuilder {
	config: ApixConfig,
	clock: Arc<dyn Clock>,
}

impl RequestBuilder {
	pub fn new(config: ApixConfig) -> Self {
		Self::with_clock(config, Arc::new(SystemClock))
	}

	pub fn with_clock(config: ApixConfig, clock: Arc<dyn Clock>) -> Self {
		Self { config, clock }
	}

	pub fn config(&self) -> &ApixConfig {
		&self.config
	}

	/// `GET /app-transferID?id=&idq=&uid=&ts=&d=`
	pub fn retrieve_transfer_id(&self, query: &CredentialQuery) -> Result<SignedRequest, RequestError> {
		let id = required(query.id.as_deref(), "id")?;
		let uid = required(query.uid.as_deref(), "uid")?;
		let password = required(query.password.as_deref(), "password")?;

		let params = OrderedParams::new(
			Operation::RetrieveTransferId,
			vec![
				id.to_string(),
				query.idq().to_string(),
				uid.to_string(),
				self.clock.timestamp(),
			],
		)?;

		self.build(params, Secret::Password(password), None, HeaderMap::new())
	}

	/// `PUT /invoices` with the configured transfer id/key
	pub fn send_invoice_zip(&self, content: Vec<u8>) -> Result<SignedRequest, RequestError> {
		let transfer_id = required(self.config.transfer_id.as_deref(), "transfer_id")?;
		let secret = Secret::transfer_key(self.config.transfer_key.as_deref())?;

		self.archive_request(Operation::SendInvoiceZip, transfer_id, secret, content)
	}

	/// `PUT /print` with the given credentials
	pub fn send_print_zip(
		&self,
		credentials: &Credentials,
		content: Vec<u8>,
	) -> Result<SignedRequest, RequestError> {
		let transfer_id = required(Some(credentials.transfer_id()), "transfer_id")?;
		let secret = Secret::transfer_key(credentials.transfer_key())?;

		self.archive_request(Operation::SendPrintZip, transfer_id, secret, content)
	}

	/// `PUT /method` with the given credentials
	pub fn delivery_method(
		&self,
		credentials: &Credentials,
		parties: &DeliveryParties,
	) -> Result<SignedRequest, RequestError> {
		let transfer_id = required(Some(credentials.transfer_id()), "transfer_id")?;
		let secret = Secret::transfer_key(credentials.transfer_key())?;

		let body = request_document(&[
			("SenderName", parties.sender_name.as_str()),
			("SenderYtunnus", parties.sender_ytunnus.as_str()),
			("ReceiverName", parties.receiver_name.as_str()),
			("ReceiverYtunnus", parties.receiver_ytunnus.as_str()),
		]);

		self.xml_request(Operation::DeliveryMethod, transfer_id, secret, body)
	}

	/// `PUT /addressquery` with the configured transfer id/key
	pub fn address_query(&self, id: &str) -> Result<SignedRequest, RequestError> {
		let transfer_id = required(self.config.transfer_id.as_deref(), "transfer_id")?;
		let secret = Secret::transfer_key(self.config.transfer_key.as_deref())?;

		let body = request_document(&[("ReceiverYtunnus", id)]);

		self.xml_request(Operation::AddressQuery, transfer_id, secret, body)
	}

	fn archive_request(
		&self,
		operation: Operation,
		transfer_id: &str,
		secret: Secret<'_>,
		content: Vec<u8>,
	) -> Result<SignedRequest, RequestError> {
		let soft = required(self.config.software_name.as_deref(), "software_name")?;
		let ver = required(self.config.software_version.as_deref(), "software_version")?;

		let params = OrderedParams::new(
			operation,
			vec![
				soft.to_string(),
				ver.to_string(),
				transfer_id.to_string(),
				self.clock.timestamp(),
			],
		)?;

		let mut headers = HeaderMap::new();
		headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_OCTET_STREAM));
		headers.insert(CONTENT_LENGTH, HeaderValue::from(content.len()));

		self.build(params, secret, Some(content), headers)
	}

	fn xml_request(
		&self,
		operation: Operation,
		transfer_id: &str,
		secret: Secret<'_>,
		body: String,
	) -> Result<SignedRequest, RequestError> {
		let params = OrderedParams::new(
			operation,
			vec![transfer_id.to_string(), self.clock.timestamp()],
		)?;

		let mut headers = HeaderMap::new();
		headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_XML));

		self.build(params, secret, Some(body.into_bytes()), headers)
	}

	fn build(
		&self,
		params: OrderedParams,
		secret: Secret<'_>,
		body: Option<Vec<u8>>,
		headers: HeaderMap,
	) -> Result<SignedRequest, RequestError> {
		let operation = params.operation();
		let digest = digest_param(secret, params.values());

		let mut url = Url::parse(&format!(
			"https://{}{}",
			self.config.service_host,
			operation.path()
		))
		.map_err(|e| RequestError::InvalidUrl(e.to_string()))?;
		url.query_pairs_mut()
			.extend_pairs(params.pairs())
			.append_pair(DIGEST_PARAM, &digest);

		let request = SignedRequest {
			operation,
			method: operation.method(),
			url,
			headers,
			body,
		};

		debug!(
			target: "apix::request",
			operation = ?operation,
			method = %request.method,
			url = %request.redacted_url(),
			"Built signed request"
		);

		Ok(request)
	}
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, RequestError> {
	value
		.filter(|v| !v.is_empty())
		.ok_or(RequestError::MissingArgument(name))
}

/// Request envelope with a single group of typed values
fn request_document(values: &[(&str, &str)]) -> String {
	let mut document = String::from(XML_DECLARATION);
	document.push_str(r#"<Request version="1.0"><Content><Group>"#);
	for (value_type, value) in values {
		document.push_str(&format!(
			r#"<Value type="{}">{}</Value>"#,
			value_type,
			escape(*value)
		));
	}
	document.push_str("</Group></Content></Request>");
	document
}
