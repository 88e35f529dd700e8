//! Adapter for a hosted, Sanity-compatible content store.

mod client;
mod documents;
mod store;

pub use client::SanityClient;
pub use store::SanityStore;
