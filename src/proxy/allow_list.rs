//! Allow-list matcher.
//!
//! Concrete identifiers vary per request but the shape of a legitimate path does not. [`PathNormalizer`]
//! collapses every UUID to `[uuid]` and every standalone 7-9 digit run (oppgave ids, HPR numbers)
//! to `[id|hpr]`, after which a request is allowed iff `"<METHOD> <normalized-path>"` is an exact
//! member of a precomputed set.

// crates.io
use regex::Regex;
// self
use crate::{_prelude::*, error::ConfigError};

/// Placeholder substituted for UUIDs.
pub const UUID_PLACEHOLDER: &str = "[uuid]";
/// Placeholder substituted for standalone 7-9 digit runs.
pub const ID_PLACEHOLDER: &str = "[id|hpr]";

/// Request shapes the registration frontend is allowed to reach on its backend.
pub const DEFAULT_ALLOW_LIST: [&str; 8] = [
	"GET /api/v1/pasient",
	"GET /api/v1/oppgave/[id|hpr]",
	"GET /api/v1/sykmelder/[id|hpr]",
	"POST /api/v1/oppgave/[id|hpr]/tilgosys",
	"POST /api/v1/oppgave/[id|hpr]/avvis",
	"POST /api/v1/oppgave/[id|hpr]/send",
	"GET /api/v1/sykmelding/[uuid]/ferdigstilt",
	"POST /api/v1/sykmelding/[uuid]",
];

/// One `"<METHOD> <path-template>"` pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AllowListEntry {
	/// Allowed method.
	pub method: Method,
	/// Path template using [`UUID_PLACEHOLDER`] and [`ID_PLACEHOLDER`] for variable segments.
	pub path_template: String,
}
impl AllowListEntry {
	/// Lookup key for this entry.
	pub fn key(&self) -> String {
		format!("{} {}", self.method, self.path_template)
	}
}
impl FromStr for AllowListEntry {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = || ConfigError::InvalidAllowListEntry { entry: s.to_owned() };
		let (method, template) = s.trim().split_once(' ').ok_or_else(invalid)?;
		let template = template.trim();

		if !template.starts_with('/') || template.chars().any(char::is_whitespace) {
			return Err(invalid());
		}

		let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| invalid())?;

		Ok(Self { method, path_template: template.to_owned() })
	}
}
impl Display for AllowListEntry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{} {}", self.method, self.path_template)
	}
}

/// Rewrites concrete identifiers in a path into allow-list placeholders.
#[derive(Clone, Debug)]
pub struct PathNormalizer {
	uuid: Regex,
	id: Regex,
}
impl PathNormalizer {
	/// Compiles the UUID and digit-run patterns.
	pub fn new() -> Result<Self, ConfigError> {
		Ok(Self {
			uuid: Regex::new(
				r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
			)?,
			id: Regex::new(r"\b[0-9]{7,9}\b")?,
		})
	}

	/// Replaces UUIDs with `[uuid]`, then standalone 7-9 digit runs with `[id|hpr]`.
	///
	/// UUIDs go first so digit runs inside a UUID are never matched on their own. The output
	/// contains no matchable UUID or digit run, so normalizing twice changes nothing.
	pub fn normalize(&self, path: &str) -> String {
		let with_uuids = self.uuid.replace_all(path, UUID_PLACEHOLDER);

		self.id.replace_all(&with_uuids, ID_PLACEHOLDER).into_owned()
	}
}

/// Ordered, immutable allow-list with O(1) membership checks.
#[derive(Clone, Debug)]
pub struct AllowList {
	entries: Vec<AllowListEntry>,
	keys: HashSet<String>,
	normalizer: PathNormalizer,
}
impl AllowList {
	/// Builds an allow-list from parsed entries, keeping their order for diagnostics.
	pub fn new(entries: impl IntoIterator<Item = AllowListEntry>) -> Result<Self, ConfigError> {
		let entries = entries.into_iter().collect::<Vec<_>>();
		let keys = entries.iter().map(AllowListEntry::key).collect();

		Ok(Self { entries, keys, normalizer: PathNormalizer::new()? })
	}

	/// Parses `"<METHOD> <template>"` lines; blank lines and `#` comments are skipped.
	pub fn parse<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Self, ConfigError> {
		let entries = lines
			.into_iter()
			.map(str::trim)
			.filter(|line| !line.is_empty() && !line.starts_with('#'))
			.map(AllowListEntry::from_str)
			.collect::<Result<Vec<_>, _>>()?;

		Self::new(entries)
	}

	/// The built-in list from [`DEFAULT_ALLOW_LIST`].
	pub fn default_list() -> Result<Self, ConfigError> {
		Self::parse(DEFAULT_ALLOW_LIST)
	}

	/// Entries in declaration order.
	pub fn entries(&self) -> &[AllowListEntry] {
		&self.entries
	}

	/// Normalized lookup candidate for `method path`.
	pub fn candidate(&self, method: &Method, path: &str) -> String {
		format!("{method} {}", self.normalizer.normalize(path))
	}

	/// Returns `true` when the normalized `method path` is an allow-listed shape.
	pub fn is_allowed(&self, method: &Method, path: &str) -> bool {
		self.keys.contains(&self.candidate(method, path))
	}
}
