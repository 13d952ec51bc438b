//! On-Behalf-Of token exchange.
//!
//! [`OboTokenProvider`] trades the caller's session token for an access token scoped to one
//! downstream API using the RFC 7523 jwt-bearer grant with `requested_token_use=on_behalf_of`.
//! Every call hits the token endpoint: delegated tokens are never cached here, and failures are
//! returned to the dispatcher without retrying.

// crates.io
use oauth2::{
	TokenResponse,
	basic::{BasicErrorResponse, BasicTokenResponse},
};
use tracing::Instrument;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientSecret, DelegatedToken, SessionToken},
	error::{TokenError, TransportError},
	http::ReqwestHttpClient,
	obs::{self, ExchangeOutcome},
	provider::{
		AccessTokenResult, AuthorityDescriptor, ClientAuthMethod, DefaultProviderStrategy,
		ProviderErrorContext, ProviderErrorKind, ProviderStrategy, TokenFuture, TokenProvider,
	},
	proxy::ApiTarget,
};

/// `grant_type` value for the jwt-bearer assertion grant.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// `requested_token_use` value selecting the On-Behalf-Of flow.
pub const ON_BEHALF_OF: &str = "on_behalf_of";

/// Token provider that performs one On-Behalf-Of exchange per call.
#[derive(Clone)]
pub struct OboTokenProvider {
	/// Identity provider description.
	pub authority: AuthorityDescriptor,
	/// HTTP client used for the token endpoint.
	pub http_client: ReqwestHttpClient,
	/// Request decoration and error classification.
	pub strategy: Arc<dyn ProviderStrategy>,
	client_secret: ClientSecret,
}
impl OboTokenProvider {
	/// Creates a provider with the default strategy.
	pub fn new(
		authority: AuthorityDescriptor,
		client_secret: ClientSecret,
		http_client: ReqwestHttpClient,
	) -> Self {
		Self { authority, http_client, strategy: Arc::new(DefaultProviderStrategy), client_secret }
	}

	/// Replaces the provider strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Performs the exchange for `target` on behalf of `session`.
	pub async fn exchange(&self, session: &SessionToken, target: &ApiTarget) -> AccessTokenResult {
		obs::record_exchange(ExchangeOutcome::Attempt);

		let result = self.exchange_inner(session, target).instrument(obs::token_span(&target.id)).await;

		match &result {
			Ok(token) => {
				tracing::debug!(api = %token.api, expires_at = %token.expires_at, "Obtained delegated token.");
				obs::record_exchange(ExchangeOutcome::Success);
			},
			Err(_) => obs::record_exchange(ExchangeOutcome::Failure),
		}

		result
	}

	async fn exchange_inner(&self, session: &SessionToken, target: &ApiTarget) -> AccessTokenResult {
		let form = self.token_form(session, target);
		let mut request = self
			.http_client
			.post(self.authority.token_endpoint.clone())
			.header(header::ACCEPT, "application/json");

		if self.authority.client_auth_method == ClientAuthMethod::ClientSecretBasic {
			request =
				request.basic_auth(&self.authority.client_id, Some(self.client_secret.expose()));
		}

		let response = request.form(&form).send().await.map_err(TransportError::from)?;
		let status = response.status();
		let body = response.bytes().await.map_err(TransportError::from)?;

		if !status.is_success() {
			return Err(self.map_error_response(status.as_u16(), &body));
		}

		let issued_at = OffsetDateTime::now_utc();
		let parsed: BasicTokenResponse =
			serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(&body))
				.map_err(|source| TokenError::TokenResponseParse {
					source,
					status: Some(status.as_u16()),
				})?;
		let expires_in = parsed
			.expires_in()
			.ok_or(TokenError::InvalidTokenResponse { reason: "expires_in is missing" })?;
		let expires_in = i64::try_from(expires_in.as_secs())
			.map_err(|_| TokenError::InvalidTokenResponse { reason: "expires_in is out of range" })?;

		DelegatedToken::new(
			target.id.clone(),
			AccessToken::new(parsed.access_token().secret().to_owned()),
			issued_at,
			Duration::seconds(expires_in),
		)
	}

	fn token_form(&self, session: &SessionToken, target: &ApiTarget) -> BTreeMap<String, String> {
		let mut form = BTreeMap::new();

		form.insert("grant_type".into(), JWT_BEARER_GRANT.into());
		form.insert("assertion".into(), session.expose().to_owned());
		form.insert("scope".into(), target.id.to_string());
		form.insert("requested_token_use".into(), ON_BEHALF_OF.into());

		if self.authority.client_auth_method == ClientAuthMethod::ClientSecretPost {
			form.insert("client_id".into(), self.authority.client_id.to_string());
			form.insert("client_secret".into(), self.client_secret.expose().to_owned());
		}

		self.strategy.augment_token_request(&mut form);

		form
	}

	fn map_error_response(&self, status: u16, body: &[u8]) -> TokenError {
		let mut ctx = ProviderErrorContext::default().with_http_status(status);

		match serde_json::from_slice::<BasicErrorResponse>(body) {
			Ok(parsed) => {
				let code: &str = parsed.error().as_ref();

				ctx = ctx.with_oauth_error(code);

				if let Some(description) = parsed.error_description() {
					ctx = ctx.with_error_description(description.as_str());
				}
			},
			Err(_) if !body.is_empty() => {
				ctx = ctx.with_body_preview(String::from_utf8_lossy(body).into_owned());
			},
			Err(_) => {},
		}

		let reason = ctx.reason();

		match self.strategy.classify_token_error(&ctx) {
			ProviderErrorKind::InvalidGrant => TokenError::InvalidGrant { reason },
			ProviderErrorKind::InvalidClient => TokenError::InvalidClient { reason },
			ProviderErrorKind::ConsentRequired => TokenError::ConsentRequired { reason },
			ProviderErrorKind::InsufficientScope => TokenError::InsufficientScope { reason },
			ProviderErrorKind::Transient =>
				TokenError::TokenEndpoint { message: reason, status: Some(status) },
		}
	}
}
impl TokenProvider for OboTokenProvider {
	fn on_behalf_of<'a>(
		&'a self,
		session: &'a SessionToken,
		target: &'a ApiTarget,
	) -> TokenFuture<'a> {
		Box::pin(self.exchange(session, target))
	}
}
impl Debug for OboTokenProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OboTokenProvider")
			.field("authority", &self.authority)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}
