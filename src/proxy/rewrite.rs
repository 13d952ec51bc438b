//! Path rewriter: maps an inbound path under a mount prefix onto the downstream API's namespace.

// self
use crate::{
	_prelude::*,
	proxy::{ApiTarget, target::normalize_prefix},
};

/// Result of rewriting one inbound path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rewrite {
	/// Path with the mount prefix removed (no query). This is what the allow-list sees.
	pub stripped_path: String,
	/// Raw query string, without the leading `?`, exactly as received.
	pub query: Option<String>,
	/// Downstream path + `?query`, ready to append to the target origin.
	pub downstream_path: String,
	/// `true` when the mount prefix was absent and the inbound path was used unmodified.
	pub prefix_missing: bool,
}
impl Rewrite {
	/// Absolute downstream URL on `target`'s origin.
	pub fn downstream_url(&self, target: &ApiTarget) -> String {
		format!("{}{}", target.origin(), self.downstream_path)
	}
}

/// Rewrites `request_path` (path plus optional `?query`) for `target`.
pub fn rewrite(request_path: &str, target: &ApiTarget, request_prefix: &str) -> Rewrite {
	rewrite_path(request_path, &target.path_prefix, request_prefix)
}

/// Pure rewrite over strings.
///
/// - Splits off the query string at the first `?`; it is re-appended untouched.
/// - Strips `request_prefix` (trailing slashes ignored) from the start of the path. A prefix only
///   matches whole segments: `/api/backend` matches `/api/backend` and `/api/backend/x`, never
///   `/api/backendx`. When it does not match, the path is kept as-is and `prefix_missing` is set.
/// - Prepends `api_path_prefix` unless it is the root `/`.
pub fn rewrite_path(request_path: &str, api_path_prefix: &str, request_prefix: &str) -> Rewrite {
	let (path, query) = match request_path.split_once('?') {
		Some((path, query)) => (path, Some(query.to_owned())),
		None => (request_path, None),
	};
	let request_prefix = normalize_prefix(request_prefix);
	let stripped = if request_prefix.is_empty() {
		Some(path)
	} else {
		path.strip_prefix(request_prefix.as_str())
			.filter(|rest| rest.is_empty() || rest.starts_with('/'))
	};
	let prefix_missing = stripped.is_none();
	let stripped_path = match stripped.unwrap_or(path) {
		"" => "/".to_owned(),
		rest => rest.to_owned(),
	};
	let mut downstream_path = normalize_prefix(api_path_prefix);

	downstream_path.push_str(&stripped_path);

	if let Some(query) = &query {
		downstream_path.push('?');
		downstream_path.push_str(query);
	}

	Rewrite { stripped_path, query, downstream_path, prefix_missing }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::ApiId;

	#[test]
	fn strips_prefix_and_preserves_query() {
		let rewrite = rewrite_path("/myapi/v1/foo?x=1", "/", "/myapi/");

		assert_eq!(rewrite.stripped_path, "/v1/foo");
		assert_eq!(rewrite.query.as_deref(), Some("x=1"));
		assert_eq!(rewrite.downstream_path, "/v1/foo?x=1");
		assert!(!rewrite.prefix_missing);
	}

	#[test]
	fn query_string_is_not_reparsed() {
		let rewrite = rewrite_path("/api/backend/a?b=2&a=1&c=%20x&d&e=?", "", "/api/backend");

		assert_eq!(rewrite.downstream_path, "/a?b=2&a=1&c=%20x&d&e=?");
		assert_eq!(rewrite_path("/api/backend/a?", "", "/api/backend").downstream_path, "/a?");
	}

	#[test]
	fn api_prefix_is_prepended_unless_root() {
		assert_eq!(
			rewrite_path("/backend/v1/foo", "/internal/", "/backend").downstream_path,
			"/internal/v1/foo"
		);
		assert_eq!(rewrite_path("/backend/v1/foo", "/", "/backend").downstream_path, "/v1/foo");
		assert_eq!(rewrite_path("/backend", "/internal", "/backend").downstream_path, "/internal/");
	}

	#[test]
	fn missing_prefix_falls_back_to_the_unmodified_path() {
		let rewrite = rewrite_path("/other/v1/foo?x=1", "/", "/myapi");

		assert!(rewrite.prefix_missing);
		assert_eq!(rewrite.stripped_path, "/other/v1/foo");
		assert_eq!(rewrite.downstream_path, "/other/v1/foo?x=1");
		assert!(rewrite_path("/myapix/v1", "/", "/myapi").prefix_missing);
	}

	#[test]
	fn reapplying_is_a_no_op() {
		let first = rewrite_path("/myapi/v1/foo?x=1", "/", "/myapi/");
		let second = rewrite_path(&first.downstream_path, "/", "/myapi/");

		assert_eq!(second.downstream_path, first.downstream_path);
		assert!(second.prefix_missing);
	}

	#[test]
	fn downstream_url_uses_target_origin() {
		let target = ApiTarget::new(
			ApiId::new("api://backend/.default").expect("Test API identifier should be valid."),
			Url::parse("http://backend.local:8080/internal").expect("Test URL should parse."),
		)
		.expect("Target should build.");
		let rewrite = rewrite("/api/backend/api/v1/pasient?fnr=1", &target, "/api/backend");

		assert_eq!(rewrite.downstream_url(&target), "http://backend.local:8080/internal/api/v1/pasient?fnr=1");
	}
}
