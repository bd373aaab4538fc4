//! Generation Endpoint Access
//!
//! The [`Transport`] trait abstracts how a request reaches the endpoint and
//! how its body comes back. [`HttpTransport`] is the production
//! implementation.
//!
//! # Usage
//!
//! ```ignore
//! use relay_core::backend::{GenerateRequest, HttpTransport, Transport};
//! use relay_core::Turn;
//!
//! let transport = HttpTransport::new();
//! let request = GenerateRequest::new(vec![Turn::user("Hello!")], None);
//! let body = transport.open("http://localhost:3000/api/generate", &request).await?;
//! ```

mod http;
mod traits;

pub use http::HttpTransport;
pub use traits::{ByteStream, GenerateRequest, Transport, TransportError};
