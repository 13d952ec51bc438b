//! Secret wrappers that keep credentials out of logs.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

macro_rules! def_secret {
	($name:ident, $doc:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq)]
		pub struct $name(String);
		impl $name {
			/// Wraps a new secret string.
			pub fn new(value: impl Into<String>) -> Self {
				Self(value.into())
			}

			/// Returns the inner value. Callers must avoid logging this string.
			pub fn expose(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.debug_tuple(stringify!($name)).field(&"<redacted>").finish()
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str("<redacted>")
			}
		}
	};
}

def_secret! { SessionToken, "Inbound session credential presented by the caller as a bearer token." }
def_secret! { AccessToken, "Delegated access token issued for one downstream API." }
def_secret! { ClientSecret, "Client secret used to authenticate against the token endpoint." }

impl SessionToken {
	const FINGERPRINT_LEN: usize = 12;

	/// Extracts the credential from an `Authorization: Bearer <token>` header value.
	///
	/// The scheme is matched case-insensitively; an empty token is treated as absent.
	pub fn from_bearer(value: &HeaderValue) -> Option<Self> {
		let raw = value.to_str().ok()?.trim();
		let (scheme, token) = raw.split_once(' ')?;

		if !scheme.eq_ignore_ascii_case("bearer") {
			return None;
		}

		let token = token.trim();

		if token.is_empty() { None } else { Some(Self::new(token)) }
	}

	/// Short, non-reversible digest used to correlate log lines for one session.
	pub fn fingerprint(&self) -> String {
		let digest = Sha256::digest(self.0.as_bytes());
		let mut encoded = URL_SAFE_NO_PAD.encode(digest);

		encoded.truncate(Self::FINGERPRINT_LEN);

		encoded
	}
}
