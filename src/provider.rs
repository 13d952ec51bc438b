//! Token provider contract plus identity-provider descriptors (data) and strategies (behavior).
//!
//! [`TokenProvider`] is the only seam the dispatcher depends on: given the caller's session token
//! and a target API it yields an [`AccessTokenResult`]. `descriptor` exposes the validated
//! [`AuthorityDescriptor`] (token endpoint, client authentication), and `strategy` defines
//! [`ProviderStrategy`], which decorates outgoing token requests and classifies failures.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;

// self
use crate::{
	_prelude::*,
	auth::{DelegatedToken, SessionToken},
	error::TokenError,
	proxy::ApiTarget,
};

/// Outcome of a single delegated-token request.
pub type AccessTokenResult = Result<DelegatedToken, TokenError>;

/// Boxed future returned by [`TokenProvider::on_behalf_of`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = AccessTokenResult> + 'a + Send>>;

/// Exchanges a caller's session credential for a token scoped to one downstream API.
///
/// Implementations are shared across concurrent requests, so they must be `Send + Sync` and must
/// not keep per-request state. The dispatcher calls this exactly once per allow-listed request and
/// never retries.
pub trait TokenProvider
where
	Self: 'static + Send + Sync,
{
	/// Requests a delegated token for `target` on behalf of the holder of `session`.
	fn on_behalf_of<'a>(&'a self, session: &'a SessionToken, target: &'a ApiTarget)
	-> TokenFuture<'a>;
}
