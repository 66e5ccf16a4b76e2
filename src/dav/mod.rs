//! WebDAV primitives consumed by the upload engine
//!
//! [`DavTransport`] is the seam between the chunked-upload core and the
//! network; [`DavClient`] implements it over `reqwest`.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod propfind;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod memory;

pub use client::DavClient;
pub use endpoints::{DavEndpoints, ASSEMBLY_MARKER};
pub use error::{DavError, DavResult};
pub use transport::DavTransport;
pub use types::{
    DavAccount, FileMetadata, RequestOptions, HEADER_CTIME, HEADER_DESTINATION, HEADER_MTIME,
    HEADER_OVERWRITE, HEADER_TOTAL_LENGTH,
};
