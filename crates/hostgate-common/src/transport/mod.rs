//! Hostgate Transport Layer
//!
//! HTTP helpers shared by the server and the client.
//!
//! # Components
//!
//! - **[`HttpTransport`]**: Builds the fixed-shape HTTP responses and reads
//!   request bodies under a size limit
//! - **[`FormData`]** / **[`Charset`]**: Decodes `application/x-www-form-urlencoded`
//!   bodies using the charset the request declared

pub mod form;
pub mod http;

pub use form::{Charset, FormData};
pub use http::{HttpTransport, HyperRequest, HyperResponse};
