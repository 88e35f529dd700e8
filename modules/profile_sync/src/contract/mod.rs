pub mod client;
pub mod error;
pub mod model;

pub use client::ProfileSyncApi;
pub use error::ProfileSyncError;
pub use model::*;
