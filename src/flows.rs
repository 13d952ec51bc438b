//! Token flows backing [`TokenProvider`](crate::provider::TokenProvider) implementations.

pub mod on_behalf_of;

pub use on_behalf_of::*;
