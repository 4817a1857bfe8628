//! # meshdir-client
//!
//! Client for the meshnet directory service. Registers the local machine,
//! fetches the mesh map and per-peer permissions, and drives pairing
//! invitations. The directory is the source of truth; nothing here is cached.

pub mod client;
pub mod codec;
pub mod envelope;
pub mod http;
pub mod mock;
pub mod transport;

pub use client::DirectoryClient;
pub use http::HttpTransport;
pub use mock::MockTransport;
pub use transport::{ApiRequest, ApiResponse, Transport};
