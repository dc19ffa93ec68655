//! # privfiles Repository Library
//!
//! This crate lets a file picker browse the acting user's private files and
//! copy a selected file into the user's draft area. Storage, contexts and
//! icons come from the host through traits; the repository only sequences
//! calls and shapes the results.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            File Picker UI               │  Listing / CopyResult JSON
//! ├─────────────────────────────────────────┤
//! │           UserRepository                │  path tokens, breadcrumb, filter
//! ├─────────────────────────────────────────┤
//! │  FileBrowser │ ContextResolver │ Icons  │  host contracts
//! ├─────────────────────────────────────────┤
//! │   Host storage (e.g. local filesystem)  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use repository::{Config, UserIdentity};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     let repo = config.local_repository();
//!     let user = UserIdentity::new(config.user.id);
//!
//!     let listing = repo.get_listing(&user, None)?;
//!     println!("{}", serde_json::to_string_pretty(&listing)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`host`]: Contracts consumed from the host
//! - [`user`]: The private-files repository
//! - [`filter`]: Entry filter policy
//! - [`mimetypes`]: Extension table and icon resolution
//! - [`local`]: Filesystem-backed host
//! - [`config`]: Configuration loading and defaults
//! - [`error`]: Error types

pub mod config;
pub mod error;
pub mod filter;
pub mod host;
pub mod local;
pub mod mimetypes;
pub mod user;

// Re-export protocol for convenience
pub use protocol;

pub use config::Config;
pub use error::{RepositoryError, Result};
pub use filter::{AcceptedTypes, EntryFilter};
pub use host::{
    Context, ContextLevel, ContextResolver, FileBrowser, FileInfo, FileLocation, HostError,
    HostResult, IconResolver, StorageTarget, UserIdentity,
};
pub use local::{LocalContexts, LocalFileBrowser, LocalFileInfo};
pub use mimetypes::PixIcons;
pub use user::{UserRepository, DRAFT_AREA, PRIVATE_AREA, USER_COMPONENT};
