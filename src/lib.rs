//! Request layer for the welfare-foundation portal: one chokepoint that combines a TTL response
//! cache, in-flight request deduplication, and session-aware refresh-and-retry.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod client;
pub mod clock;
pub mod error;
pub mod fingerprint;
pub mod http;
pub mod in_flight;
pub mod obs;
pub mod request;
pub mod session;
pub mod token;

pub use client::{ApiClient, ApiClientBuilder};
pub use error::{Error, RequestError, Result};
pub use request::{FileUpload, Method, MultipartPayload, RequestBody, RequestOptions};

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use {serde_json, time, url};
#[cfg(test)] use {color_eyre as _, httpmock as _};
