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

//! Apix response decoding
//!
//! Every Apix endpoint answers with the same XML envelope:
//!
//! ```xml
//! <Response version="1.0">
//!     <Status>OK</Status>
//!     <StatusCode>5000</StatusCode>
//!     <FreeText language="en">OK</FreeText>
//!     <Content>
//!         <Group>
//!             <Value type="TransferID">...</Value>
//!         </Group>
//!     </Content>
//! </Response>
//! ```
//!
//! Decoding is soft: an empty or malformed body never fails, it yields a
//! response without a status and a synthetic `"Empty response"` message.
//! Only credential extraction is strict about the value types it accepts.

use std::str::FromStr;

use indexmap::IndexMap;
use quick_xml::{
	Reader,
	events::{BytesStart, Event},
};
use serde::Serialize;
use tracing::debug;

/// Message reported when the body carried no status
pub const EMPTY_RESPONSE_MESSAGE: &str = "Empty response";

/// Status value of a successful response
pub const STATUS_OK: &str = "OK";

/// Status value of a rejected request
pub const STATUS_ERR: &str = "ERR";

/// One `Group` of the response content, keyed by each value's `type` in
/// document order
pub type ContentGroup = IndexMap<String, String>;

/// Error types for strict response decoding
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
	#[error("Unrecognized value type: {0}")]
	UnknownValueType(String),
	#[error("Value without type attribute: {0}")]
	UntypedValue(String),
}

/// Decoded Apix response envelope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceResponse {
	/// Body as received
	#[serde(skip)]
	pub raw: String,
	/// Text of the first `Status`; `None` when missing or empty
	pub status: Option<String>,
	/// Text of the first `StatusCode`; empty when missing
	pub status_code: String,
	/// Every `FreeText`, in document order
	pub free_text: Vec<String>,
	/// Messages describing why the request failed
	pub error_messages: Vec<String>,
	/// Every `Group` under `Content`, in document order
	pub content_groups: Vec<ContentGroup>,
	/// Text of each `Value` without a `type`, per content group
	#[serde(skip)]
	pub untyped_values: Vec<Vec<String>>,
}

impl ServiceResponse {
	/// Decode a raw response body. Never fails.
	pub fn decode(raw: impl Into<String>) -> Self {
		let raw = raw.into();
		let mut decoder = EnvelopeDecoder::default();
		decoder.run(&raw);
		decoder.finish(raw)
	}

	pub fn is_ok(&self) -> bool {
		self.status.as_deref() == Some(STATUS_OK)
	}

	pub fn is_error(&self) -> bool {
		self.status.as_deref() == Some(STATUS_ERR)
	}

	/// First value of the given type across all content groups
	pub fn value(&self, value_type: &str) -> Option<&str> {
		self.content_groups
			.iter()
			.find_map(|group| group.get(value_type))
			.map(String::as_str)
	}

	/// Content groups, consuming the response
	pub fn into_groups(self) -> Vec<ContentGroup> {
		self.content_groups
	}
}

/// Streaming state while walking the envelope
#[derive(Default)]
struct EnvelopeDecoder {
	path: Vec<String>,
	text: String,
	status: Option<Option<String>>,
	status_code: Option<String>,
	free_text: Vec<String>,
	content_groups: Vec<ContentGroup>,
	group: Option<ContentGroup>,
	untyped: Vec<String>,
	untyped_values: Vec<Vec<String>>,
	value_type: Option<String>,
}

impl EnvelopeDecoder {
	fn run(&mut self, raw: &str) {
		let mut reader = Reader::from_str(raw.trim_start());

		loop {
			match reader.read_event() {
				Ok(Event::Start(e)) => self.start(&e),
				Ok(Event::Empty(e)) => {
					self.start(&e);
					self.end();
				}
				Ok(Event::End(_)) => self.end(),
				Ok(Event::Text(e)) => match e.unescape() {
					Ok(text) => self.text.push_str(&text),
					Err(err) => {
						debug!(
							target: "apix::response",
							"Undecodable text at {}: {}",
							reader.buffer_position(),
							err
						);
						break;
					}
				},
				Ok(Event::CData(e)) => {
					self.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
				}
				Ok(Event::Eof) => break,
				Err(err) => {
					debug!(
						target: "apix::response",
						"Malformed response at {}: {}",
						reader.buffer_position(),
						err
					);
					break;
				}
				Ok(_) => {}
			}
		}
	}

	fn start(&mut self, element: &BytesStart<'_>) {
		let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
		let parent = self.path.last().map(String::as_str);

		match (name.as_str(), parent) {
			("Group", Some("Content")) if self.group.is_none() => {
				self.group = Some(ContentGroup::new());
			}
			("Value", Some("Group")) if self.group.is_some() => {
				self.value_type = element
					.try_get_attribute("type")
					.ok()
					.flatten()
					.and_then(|attr| attr.unescape_value().ok())
					.map(|value| value.into_owned());
			}
			_ => {}
		}

		self.path.push(name);
		self.text.clear();
	}

	fn end(&mut self) {
		let Some(name) = self.path.pop() else {
			return;
		};
		let text = std::mem::take(&mut self.text);

		match name.as_str() {
			"Status" if self.status.is_none() => {
				self.status = Some(Some(text).filter(|t| !t.is_empty()));
			}
			"StatusCode" if self.status_code.is_none() => {
				self.status_code = Some(text);
			}
			"FreeText" => self.free_text.push(text),
			"Value" if self.path.last().map(String::as_str) == Some("Group") => {
				let Some(group) = self.group.as_mut() else {
					return;
				};
				match self.value_type.take() {
					Some(value_type) => {
						group.insert(value_type, text);
					}
					None => self.untyped.push(text),
				}
			}
			"Group" if self.path.last().map(String::as_str) == Some("Content") => {
				if let Some(group) = self.group.take() {
					self.content_groups.push(group);
					self.untyped_values.push(std::mem::take(&mut self.untyped));
				}
			}
			_ => {}
		}
	}

	fn finish(self, raw: String) -> ServiceResponse {
		let status = self.status.flatten();
		let error_messages = match status.as_deref() {
			None => vec![EMPTY_RESPONSE_MESSAGE.to_string()],
			Some(STATUS_ERR) => self.free_text.first().cloned().into_iter().collect(),
			Some(_) => Vec::new(),
		};

		ServiceResponse {
			raw,
			status,
			status_code: self.status_code.unwrap_or_default(),
			free_text: self.free_text,
			error_messages,
			content_groups: self.content_groups,
			untyped_values: self.untyped_values,
		}
	}
}

/// Value types accepted by credential retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
	TransferId,
	TransferKey,
	UniqueCompanyId,
}

impl ValueType {
	pub fn as_str(&self) -> &'static str {
		match self {
			ValueType::TransferId => "TransferID",
			ValueType::TransferKey => "TransferKey",
			ValueType::UniqueCompanyId => "UniqueCompanyID",
		}
	}
}

impl FromStr for ValueType {
	type Err = DecodeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"TransferID" => Ok(ValueType::TransferId),
			"TransferKey" => Ok(ValueType::TransferKey),
			"UniqueCompanyID" => Ok(ValueType::UniqueCompanyId),
			other => Err(DecodeError::UnknownValueType(other.to_string())),
		}
	}
}

/// Credential values found in a credential retrieval response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialFields {
	pub transfer_id: Option<String>,
	pub transfer_key: Option<String>,
	pub unique_company_id: Option<String>,
}

/// Strictly extract the credential values of the first content group
///
/// Any value type outside [`ValueType`], or a value with no type at all,
/// fails the whole extraction.
pub fn extract_credential_fields(
	response: &ServiceResponse,
) -> Result<CredentialFields, DecodeError> {
	let mut fields = CredentialFields::default();

	let Some(group) = response.content_groups.first() else {
		return Ok(fields);
	};

	if let Some(text) = response.untyped_values.first().and_then(|values| values.first()) {
		return Err(DecodeError::UntypedValue(text.clone()));
	}

	for (value_type, text) in group {
		let slot = match value_type.parse::<ValueType>()? {
			ValueType::TransferId => &mut fields.transfer_id,
			ValueType::TransferKey => &mut fields.transfer_key,
			ValueType::UniqueCompanyId => &mut fields.unique_company_id,
		};
		*slot = Some(text.clone());
	}

	Ok(fields)
}

#[cfg(test)]
mod tests {
	use super::*;

	const ERROR_RESPONSE: &str = r#"
		<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
		<Response>
			<Status>ERR</Status>
			<StatusCode>7599</StatusCode>
			<FreeText language="en">Parameter can't be null: id.</FreeText>
			<Content/>
		</Response>
	"#;

	const VALID_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
		<Response>
			<Status>OK</Status>
			<StatusCode>5500</StatusCode>
			<FreeText language="en_US">OK</FreeText>
			<Content>
				<Group>
					<Value type="UniqueCompanyID">tgjxx-ccqo0-1291809809-f6u2nvpq5</Value>
					<Value type="Saldo">29.88</Value>
				</Group>
			</Content>
		</Response>"#;

	#[test]
	fn test_valid_response() {
		let response = ServiceResponse::decode(VALID_RESPONSE);
		assert_eq!(response.status.as_deref(), Some("OK"));
		assert_eq!(response.status_code, "5500");
		assert!(response.error_messages.is_empty());
		assert_eq!(response.free_text, vec!["OK".to_string()]);
		assert!(response.is_ok());
		assert_eq!(response.raw, VALID_RESPONSE);
	}

	#[test]
	fn test_error_response() {
		let response = ServiceResponse::decode(ERROR_RESPONSE);
		assert_eq!(response.status.as_deref(), Some("ERR"));
		assert_eq!(response.status_code, "7599");
		assert_eq!(response.error_messages[0], "Parameter can't be null: id.");
		assert!(response.is_error());
		assert!(response.content_groups.is_empty());
	}

	#[test]
	fn test_error_response_reports_first_free_text() {
		let response = ServiceResponse::decode(
			"<Response><Status>ERR</Status><StatusCode>7599</StatusCode>\
			 <FreeText>2016-03-21 14:49:0008</FreeText>\
			 <FreeText>Parameter can't be null: id.</FreeText></Response>",
		);
		assert_eq!(response.error_messages, vec!["2016-03-21 14:49:0008".to_string()]);
		assert_eq!(response.free_text.len(), 2);
	}

	#[test]
	fn test_empty_response() {
		let response = ServiceResponse::decode("");
		assert!(response.status.is_none());
		assert_eq!(response.status_code, "");
		assert_eq!(response.error_messages, vec!["Empty response".to_string()]);
		assert!(response.content_groups.is_empty());
	}

	#[test]
	fn test_empty_status_is_absent() {
		let response = ServiceResponse::decode("<Response><Status></Status><Status>OK</Status></Response>");
		assert!(response.status.is_none());
		assert_eq!(response.error_messages, vec![EMPTY_RESPONSE_MESSAGE.to_string()]);
	}

	#[test]
	fn test_malformed_response_is_soft() {
		let response = ServiceResponse::decode("<Response><Status>OK</Sta");
		assert!(response.status.is_none());
		assert_eq!(response.error_messages, vec![EMPTY_RESPONSE_MESSAGE.to_string()]);

		let response = ServiceResponse::decode("not xml at all");
		assert!(response.status.is_none());
	}

	#[test]
	fn test_content_groups() {
		let groups = ServiceResponse::decode(VALID_RESPONSE).into_groups();
		let expected: ContentGroup = [
			("UniqueCompanyID", "tgjxx-ccqo0-1291809809-f6u2nvpq5"),
			("Saldo", "29.88"),
		]
		.into_iter()
		.map(|(k, v)| (k.to_string(), v.to_string()))
		.collect();
		assert_eq!(groups, vec![expected]);
		assert_eq!(
			groups[0].keys().map(String::as_str).collect::<Vec<_>>(),
			vec!["UniqueCompanyID", "Saldo"]
		);
	}

	#[test]
	fn test_content_group_keeps_document_order() {
		let response = ServiceResponse::decode(
			"<Response><Status>OK</Status><Content><Group>\
			 <Value type=\"Zeta\">1</Value><Value type=\"Alpha\">2</Value>\
			 <Value type=\"Mid\">3</Value><Value type=\"Zeta\">4</Value>\
			 </Group></Content></Response>",
		);
		let group = &response.content_groups[0];
		assert_eq!(group.keys().map(String::as_str).collect::<Vec<_>>(), vec!["Zeta", "Alpha", "Mid"]);
		assert_eq!(group["Zeta"], "4");
	}

	#[test]
	fn test_text_is_kept_verbatim() {
		let response = ServiceResponse::decode(
			"<Response><Status>OK</Status><FreeText>  padded message </FreeText>\
			 <Content><Group><Value type=\"Name\"> Devlab Oy </Value>\
			 <Value type=\"Mixed\">a <![CDATA[b]]> c</Value></Group></Content></Response>",
		);
		assert_eq!(response.free_text, vec!["  padded message ".to_string()]);
		assert_eq!(response.value("Name"), Some(" Devlab Oy "));
		assert_eq!(response.value("Mixed"), Some("a b c"));
	}

	#[test]
	fn test_duplicate_value_type_is_last_wins() {
		let response = ServiceResponse::decode(
			"<Response><Status>OK</Status><Content><Group>\
			 <Value type=\"Saldo\">1</Value><Value type=\"Saldo\">2</Value>\
			 </Group><Group><Value type=\"Saldo\">3</Value></Group></Content></Response>",
		);
		assert_eq!(response.content_groups.len(), 2);
		assert_eq!(response.content_groups[0]["Saldo"], "2");
		assert_eq!(response.content_groups[1]["Saldo"], "3");
		assert_eq!(response.value("Saldo"), Some("2"));
	}

	#[test]
	fn test_groups_outside_content_are_ignored() {
		let response = ServiceResponse::decode(
			"<Response><Status>OK</Status><Group><Value type=\"A\">x</Value></Group>\
			 <Content><Group><Value>untyped</Value><Value type=\"B\">a &amp; b</Value>\
			 <Value type=\"C\"/></Group></Content></Response>",
		);
		assert_eq!(response.content_groups.len(), 1);
		let group = &response.content_groups[0];
		assert_eq!(group.len(), 2);
		assert_eq!(group["B"], "a & b");
		assert_eq!(group["C"], "");
		assert_eq!(response.untyped_values, vec![vec!["untyped".to_string()]]);
	}

	#[test]
	fn test_extract_credential_fields() {
		let response = ServiceResponse::decode(
			r#"<Response version="1.0"><Status>OK</Status><StatusCode>5000</StatusCode>
			<Content><Group>
				<Value type="TransferID">fdf09a47-5e99-4773-9379-3f26c8861eea</Value>
				<Value type="TransferKey">de6b8d40-f81b-4d51-b977-c998510b51bb</Value>
				<Value type="UniqueCompanyID">0f6aa87f-ce1d-44ce-b025-8b9801c8772c</Value>
			</Group></Content></Response>"#,
		);
		let fields = extract_credential_fields(&response).unwrap();
		assert_eq!(
			fields,
			CredentialFields {
				transfer_id: Some("fdf09a47-5e99-4773-9379-3f26c8861eea".to_string()),
				transfer_key: Some("de6b8d40-f81b-4d51-b977-c998510b51bb".to_string()),
				unique_company_id: Some("0f6aa87f-ce1d-44ce-b025-8b9801c8772c".to_string()),
			}
		);
	}

	#[test]
	fn test_extract_rejects_unknown_value_type() {
		let response = ServiceResponse::decode(VALID_RESPONSE);
		let err = extract_credential_fields(&response).unwrap_err();
		assert!(matches!(err, DecodeError::UnknownValueType(ref t) if t == "Saldo"));
	}

	#[test]
	fn test_extract_rejects_untyped_value() {
		let response = ServiceResponse::decode(
			"<Response><Status>OK</Status><Content><Group>\
			 <Value type=\"TransferID\">a</Value><Value>junk</Value>\
			 <Value type=\"TransferKey\">b</Value></Group></Content></Response>",
		);
		assert_eq!(response.content_groups[0].len(), 2);
		let err = extract_credential_fields(&response).unwrap_err();
		assert!(matches!(err, DecodeError::UntypedValue(ref t) if t == "junk"));
	}

	#[test]
	fn test_value_type_round_trip() {
		for value_type in [ValueType::TransferId, ValueType::TransferKey, ValueType::UniqueCompanyId] {
			assert_eq!(value_type.as_str().parse::<ValueType>().unwrap(), value_type);
		}
		assert!("transferid".parse::<ValueType>().is_err());
	}
}
