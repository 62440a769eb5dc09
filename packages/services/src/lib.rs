// ABOUTME: Thin REST clients for the downstream Grove service family
// ABOUTME: Blog, storage, social, analytics, deal-finding, and remote-dev services

pub mod client;
pub mod error;
pub mod registry;

pub use client::ServiceClient;
pub use error::{ServiceError, ServiceResult};
pub use registry::Service;
