//! Storage backends consumed by the service.
//!
//! * [`records`]: the conversion table (insert, update-by-id, get, list).
//! * [`objects`]: blob storage for uploaded PDFs with public retrieval URLs.
//!
//! Both are traits with an embedded implementation (memory / local files) and
//! a REST implementation speaking the PostgREST and storage-bucket HTTP APIs.

pub mod objects;
pub mod records;
mod rest;

pub use objects::{LocalObjectStore, ObjectStore, RestObjectStore};
pub use records::{InMemoryRecordStore, RecordStore, RestRecordStore};
pub use rest::RestConnection;
