//! Installation credential value type and freshness helpers.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Lead time before expiry at which cached credentials are proactively replaced.
pub const REFRESH_SAFETY_MARGIN: Duration = Duration::minutes(1);

/// Bearer credential issued for one installation, valid until [`expires_at`](Self::expires_at).
///
/// The expiry is always the value reported by the platform; nothing in this crate derives it
/// locally.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationCredential {
	/// Bearer token; callers must avoid logging it.
	pub token: TokenSecret,
	/// Absolute expiry instant reported by the platform.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
impl InstallationCredential {
	/// Wraps a platform-issued token and expiry.
	pub fn new(token: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { token: TokenSecret::new(token), expires_at }
	}

	/// Returns `true` once `instant` has reached the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` when `instant + margin` has reached the expiry.
	pub fn expires_within(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		instant + margin >= self.expires_at
	}

	/// Returns `true` when the credential should be replaced before use at `instant`.
	pub fn needs_refresh_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_within(instant, REFRESH_SAFETY_MARGIN)
	}
}
impl Debug for InstallationCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InstallationCredential")
			.field("token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
