//! Strongly typed identifiers enforced across the broker domain.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

macro_rules! def_numeric_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "u64", into = "u64")]
		pub struct $name(u64);
		impl $name {
			/// Creates a new identifier, rejecting zero.
			pub fn new(value: u64) -> Result<Self, IdentifierError> {
				if value == 0 {
					return Err(IdentifierError::Zero { kind: $kind });
				}

				Ok(Self(value))
			}

			/// Returns the raw numeric value.
			pub const fn get(self) -> u64 {
				self.0
			}
		}
		impl From<$name> for u64 {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<u64> for $name {
			type Error = IdentifierError;

			fn try_from(value: u64) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				Display::fmt(&self.0, f)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				if s.is_empty() {
					return Err(IdentifierError::Empty { kind: $kind });
				}

				let value =
					s.parse::<u64>().map_err(|_| IdentifierError::NotNumeric { kind: $kind })?;

				Self::new(value)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 100;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} cannot be empty")]
	Empty {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} contains whitespace")]
	ContainsWhitespace {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier contains a path separator.
	#[error("{kind} contains a path separator")]
	ContainsSeparator {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} exceeds {max} characters")]
	TooLong {
		/// Kind of identifier.
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// A numeric identifier could not be parsed.
	#[error("{kind} must be a positive integer")]
	NotNumeric {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// A numeric identifier was zero.
	#[error("{kind} must be non-zero")]
	Zero {
		/// Kind of identifier.
		kind: &'static str,
	},
}
impl From<IdentifierError> for Error {
	fn from(err: IdentifierError) -> Self {
		Error::validation(err.to_string())
	}
}

def_numeric_id! { AppId, "Numeric GitHub App identifier.", "app-id" }
def_numeric_id! { InstallationId, "Numeric installation identifier.", "installation-id" }
def_id! { Login, "Platform user login.", "username" }
def_id! { OrgName, "Organization login.", "org" }
def_id! { TeamSlug, "Team slug within an organization.", "team" }

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.contains('/') {
		return Err(IdentifierError::ContainsSeparator { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}
