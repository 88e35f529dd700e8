pub mod firebase;
pub mod http;
pub mod memory;
pub mod sanity;
pub mod session;
