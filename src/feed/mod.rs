//! Feed protocol: the version descriptor document and the HTTP client
//! that fetches it.

pub mod client;
pub mod descriptor;

pub use client::{FeedClient, FeedEnvelope};
pub use descriptor::VersionDescriptor;
