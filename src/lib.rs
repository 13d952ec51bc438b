//! Authenticated reverse proxy for protected backend APIs: allow-list inbound request shapes,
//! exchange the caller's session token for an On-Behalf-Of access token, rewrite the path into the
//! downstream namespace, and relay the downstream response verbatim.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;
pub mod provider;
pub mod proxy;
pub mod server;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use bytes::Bytes;
	pub use reqwest::{
		Client as ReqwestClient, Error as ReqwestError, Method,
		header::{self, HeaderMap, HeaderValue},
	};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
// The binary reports startup failures through color-eyre.
use color_eyre as _;
#[cfg(test)] use {httpmock as _, tower as _};
