//! Reverse-proxy core: static route configuration, allow-list matching, path rewriting, and the
//! per-request dispatcher that sequences them.

pub mod allow_list;
pub mod dispatcher;
pub mod rewrite;
pub mod target;

pub use allow_list::*;
pub use dispatcher::*;
pub use rewrite::*;
pub use target::*;
