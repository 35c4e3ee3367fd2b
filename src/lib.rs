//! GitHub App installation token broker: mint short-lived installation credentials behind an
//! optional membership gate, serve them over HTTP, and keep them fresh on the client side.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod broker;
pub mod client;
pub mod error;
pub mod ext;
pub mod http;
pub mod obs;
pub mod platform;
pub mod server;

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use reqwest::{Client as ReqwestClient, StatusCode};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
use color_eyre as _;
#[cfg(test)] use {http_body_util as _, httpmock as _, tower as _};
