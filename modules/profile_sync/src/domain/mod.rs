pub mod auth;
pub mod binder;
pub mod enrollment;
pub mod error;
pub mod locks;
pub mod policy;
pub mod ports;
pub mod reconciler;
pub mod repo;
pub mod service;
pub mod session;
pub mod teaching;
