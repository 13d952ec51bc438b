//! Delegated (On-Behalf-Of) tokens handed to the forwarding step.

// self
use crate::{
	_prelude::*,
	auth::{ApiId, token::secret::AccessToken},
	error::TokenError,
};

/// Access token obtained on behalf of the caller for exactly one downstream API.
///
/// Tokens are produced per request and dropped with it; nothing in the crate caches them.
#[derive(Clone)]
pub struct DelegatedToken {
	/// API the token is scoped to.
	pub api: ApiId,
	/// Access token secret; callers must avoid logging it.
	pub access_token: AccessToken,
	/// Issued-at instant recorded when the response arrived.
	pub issued_at: OffsetDateTime,
	/// Expiry instant derived from `expires_in`.
	pub expires_at: OffsetDateTime,
}
impl DelegatedToken {
	/// Builds a token from the raw token endpoint fields.
	///
	/// `expires_in` must be a positive number of seconds.
	pub fn new(
		api: ApiId,
		access_token: AccessToken,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Result<Self, TokenError> {
		if !expires_in.is_positive() {
			return Err(TokenError::InvalidTokenResponse { reason: "expires_in must be positive" });
		}
		if access_token.expose().is_empty() {
			return Err(TokenError::InvalidTokenResponse { reason: "access_token is empty" });
		}

		Ok(Self { api, access_token, issued_at, expires_at: issued_at + expires_in })
	}

	/// Returns `true` once the expiry instant has been reached.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Renders the `Authorization: Bearer <token>` value, flagged as sensitive.
	pub fn bearer_header(&self) -> Result<HeaderValue, TokenError> {
		let mut value = HeaderValue::from_str(&format!("Bearer {}", self.access_token.expose()))
			.map_err(|_| TokenError::InvalidTokenResponse {
				reason: "access_token is not a valid header value",
			})?;

		value.set_sensitive(true);

		Ok(value)
	}
}
impl Debug for DelegatedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DelegatedToken")
			.field("api", &self.api)
			.field("access_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	fn api() -> ApiId {
		ApiId::new("api://backend/.default").expect("Test API identifier should be valid.")
	}

	#[test]
	fn expiry_is_derived_from_expires_in() {
		let issued = datetime!(2024-05-01 12:00 UTC);
		let token =
			DelegatedToken::new(api(), AccessToken::new("tok"), issued, Duration::seconds(3600))
				.expect("Token with positive lifetime should build.");

		assert_eq!(token.expires_at, datetime!(2024-05-01 13:00 UTC));
		assert!(!token.is_expired_at(datetime!(2024-05-01 12:59:59 UTC)));
		assert!(token.is_expired_at(datetime!(2024-05-01 13:00 UTC)));
	}

	#[test]
	fn rejects_non_positive_lifetimes_and_empty_tokens() {
		let issued = OffsetDateTime::now_utc();

		assert!(matches!(
			DelegatedToken::new(api(), AccessToken::new("tok"), issued, Duration::ZERO),
			Err(TokenError::InvalidTokenResponse { .. })
		));
		assert!(matches!(
			DelegatedToken::new(api(), AccessToken::new(""), issued, Duration::seconds(60)),
			Err(TokenError::InvalidTokenResponse { .. })
		));
	}

	#[test]
	fn bearer_header_is_sensitive_and_redacted_in_debug() {
		let token = DelegatedToken::new(
			api(),
			AccessToken::new("abc.def.ghi"),
			OffsetDateTime::now_utc(),
			Duration::seconds(60),
		)
		.expect("Token should build.");
		let header = token.bearer_header().expect("Token should render as a header value.");

		assert_eq!(header.to_str().expect("Header should be ASCII."), "Bearer abc.def.ghi");
		assert!(header.is_sensitive());
		assert!(!format!("{token:?}").contains("abc.def.ghi"));
	}

	#[test]
	fn bearer_header_rejects_control_characters() {
		let token = DelegatedToken::new(
			api(),
			AccessToken::new("bad\ntoken"),
			OffsetDateTime::now_utc(),
			Duration::seconds(60),
		)
		.expect("Token should build.");

		assert!(token.bearer_header().is_err());
	}
}
