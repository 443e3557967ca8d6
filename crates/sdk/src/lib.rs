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

//! Apix SDK - Client library for the Apix e-invoicing service
//!
//! This crate provides a typed client for the Apix REST interface:
//! credential retrieval, invoice and print archive submission, e-invoice
//! address queries and delivery method queries.
//!
//! Every request is authenticated with a `SHA-256:` digest over its
//! parameters and a shared secret (see [`signing`]); every response is the
//! same XML envelope, decoded by [`ServiceResponse::decode`].
//!
//! The SDK is designed to be lightweight and embeddable:
//! - No background threads
//! - No global configuration; an [`ApixConfig`] value is passed in
//! - Transport, filesystem and clock are replaceable

pub mod client;
pub mod config;
pub mod request;
pub mod response;
pub mod signing;
pub mod transport;
pub mod types;

pub use client::{ApixClient, ClientError, SyncClient};
pub use config::ApixConfig;
pub use request::{Clock, FixedClock, Operation, RequestBuilder, SignedRequest, SystemClock};
pub use response::{ContentGroup, ServiceResponse, ValueType};
pub use signing::{Secret, digest_param, sign};
pub use transport::{FileSource, HttpTransport, LocalFiles, Transport, TransportError};
pub use types::*;
