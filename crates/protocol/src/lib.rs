//! # privfiles Protocol Library
//!
//! This crate defines what travels between the private-files repository and
//! the file picker UI:
//!
//! - **Path Tokens**: an explicit, strictly decoded record identifying a
//!   location in a host file area, carried by the client between requests
//! - **Field Validation**: syntax checks applied to every decoded field
//! - **Picker Payloads**: listing, breadcrumb and copy-result shapes
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{decode_validated, FileParams};
//!
//! let params = FileParams::file(5, "user", "private", 0, "/docs/", "a.txt");
//! let token = params.encode().unwrap();
//!
//! assert_eq!(decode_validated(&token).unwrap(), params);
//! ```
//!
//! ## Modules
//!
//! - [`token`]: Path token record and codec
//! - [`validate`]: Field syntax checks
//! - [`payload`]: Picker payload definitions
//! - [`error`]: Error types

pub mod error;
pub mod payload;
pub mod token;
pub mod validate;

pub use error::{ProtocolError, Result};
pub use payload::{BreadcrumbEntry, CopyResult, EntryLink, Listing, ListingEntry, ReturnTypes};
pub use token::{
    decode_token, decode_validated, encode_token, FileParams, MAX_TOKEN_LENGTH, TOKEN_MAGIC,
    TOKEN_VERSION,
};
pub use validate::{
    validate_alphaext, validate_context_id, validate_filename, validate_filepath,
    MAX_FILENAME_LENGTH,
};
