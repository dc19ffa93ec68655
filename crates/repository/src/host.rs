//! Contracts the repository consumes from its host.
//!
//! The host owns storage, contexts and permissions. The repository only
//! walks what these traits expose, so any storage engine can sit behind
//! them.

use protocol::FileParams;
use thiserror::Error;

/// Errors reported by a host implementation.
///
/// A location that does not exist is not an error; lookups return
/// `Ok(None)` for that.
#[derive(Debug, Error)]
pub enum HostError {
    /// The storage engine failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The acting user may not perform the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The copy destination is already taken.
    #[error("destination already exists: {0}")]
    AlreadyExists(String),

    /// The node does not support the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Copied content did not match its source.
    #[error("integrity check failed: {0}")]
    Integrity(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for host operations.
pub type HostResult<T> = std::result::Result<T, HostError>;

/// Kind of entity a context scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextLevel {
    /// The whole site.
    System,
    /// A single user.
    User,
    /// A course.
    Course,
    /// A course module.
    Module,
}

/// Host scoping unit for permissions and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Context {
    /// Numeric context id.
    pub id: u64,
    /// What kind of entity this context scopes.
    pub level: ContextLevel,
    /// Id of the scoped entity (the user id for user contexts).
    pub instance_id: u64,
}

impl Context {
    /// Create a user context.
    pub fn user(id: u64, user_id: u64) -> Self {
        Self {
            id,
            level: ContextLevel::User,
            instance_id: user_id,
        }
    }
}

/// The authenticated user on whose behalf the repository acts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserIdentity {
    /// Host user id.
    pub user_id: u64,
}

impl UserIdentity {
    /// Create an identity handle for a user.
    pub fn new(user_id: u64) -> Self {
        Self { user_id }
    }
}

/// A location inside a context's file areas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    /// Component owning the file area.
    pub component: String,
    /// File area within the component.
    pub filearea: String,
    /// Item id within the area.
    pub item_id: u64,
    /// Slash-terminated directory path.
    pub filepath: String,
    /// File name, absent for directories.
    pub filename: Option<String>,
}

impl FileLocation {
    /// Build a location from decoded token params.
    pub fn from_params(params: &FileParams) -> Self {
        Self {
            component: params.component.clone(),
            filearea: params.filearea.clone(),
            item_id: params.item_id,
            filepath: params.filepath.clone(),
            filename: params.filename.clone(),
        }
    }
}

/// Destination of a copy into host storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    /// Destination context id.
    pub context_id: u64,
    /// Destination component.
    pub component: String,
    /// Destination file area.
    pub filearea: String,
    /// Destination item id.
    pub item_id: u64,
    /// Destination directory path.
    pub filepath: String,
    /// Destination file name.
    pub filename: String,
}

/// A navigable node returned by a [`FileBrowser`].
pub trait FileInfo: Sized {
    /// Identity of this node, suitable for encoding into a token.
    fn params(&self) -> FileParams;

    /// Name shown to the user.
    fn visible_name(&self) -> String;

    /// Whether the node is a directory.
    fn is_directory(&self) -> bool;

    /// Size in bytes (0 for directories).
    fn filesize(&self) -> u64;

    /// The enclosing node, if any.
    fn parent(&self) -> HostResult<Option<Self>>;

    /// Immediate children.
    fn children(&self) -> HostResult<Vec<Self>>;

    /// Copy this file's content and metadata into host storage.
    fn copy_to_storage(&self, target: &StorageTarget) -> HostResult<()>;
}

/// Host file browser turning a location into a navigable node.
pub trait FileBrowser {
    /// Node type produced by this browser.
    type Node: FileInfo;

    /// Resolve a node; `Ok(None)` when nothing exists there.
    fn file_info(&self, context: &Context, location: &FileLocation)
        -> HostResult<Option<Self::Node>>;
}

/// Host context resolution.
pub trait ContextResolver {
    /// The per-user context of `user_id`.
    fn user_context(&self, user_id: u64) -> HostResult<Context>;

    /// Any context by its numeric id.
    fn context_by_id(&self, id: u64) -> HostResult<Option<Context>>;
}

/// Icon lookup for picker entries.
pub trait IconResolver {
    /// Icon URL for directories.
    fn folder_icon(&self) -> String;

    /// Icon URL for a file, derived from its name.
    fn file_icon(&self, filename: &str) -> String;
}
