//! Filesystem-backed host.
//!
//! Files for `(context, component, filearea, itemid)` live under
//! `<root>/<context_id>/<component>/<filearea>/<itemid>/`. Every lookup is
//! canonicalized and checked against its area directory; anything that
//! escapes the area, or passes through a symlink, is treated as not found.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use protocol::{validate_alphaext, validate_filename, validate_filepath, FileParams};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::host::{
    Context, ContextResolver, FileBrowser, FileInfo, FileLocation, HostError, HostResult,
    StorageTarget,
};

/// Buffer size used when copying file content (64KB).
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Browser over a directory tree on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileBrowser {
    root: PathBuf,
    include_hidden: bool,
}

impl LocalFileBrowser {
    /// Create a browser rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_hidden: false,
        }
    }

    /// Set whether entries starting with '.' are listed.
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    fn node(&self, context_id: u64, params: FileParams) -> HostResult<Option<LocalFileInfo>> {
        LocalFileInfo::resolve(self.clone(), context_id, params)
    }
}

impl FileBrowser for LocalFileBrowser {
    type Node = LocalFileInfo;

    fn file_info(
        &self,
        context: &Context,
        location: &FileLocation,
    ) -> HostResult<Option<LocalFileInfo>> {
        let params = FileParams {
            context_id: context.id,
            component: location.component.clone(),
            filearea: location.filearea.clone(),
            item_id: location.item_id,
            filepath: location.filepath.clone(),
            filename: location.filename.clone(),
        };

        if let Err(err) = check_params(&params) {
            debug!(error = %err, "Rejecting malformed location");
            return Ok(None);
        }

        self.node(context.id, params)
    }
}

/// What a [`LocalFileInfo`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    /// The context itself, above all of its file areas.
    Context,
    /// A directory inside a file area.
    Directory,
    /// A regular file inside a file area.
    File,
}

/// Node in a [`LocalFileBrowser`] store.
#[derive(Debug, Clone)]
pub struct LocalFileInfo {
    browser: LocalFileBrowser,
    kind: NodeKind,
    params: FileParams,
    path: PathBuf,
    size: u64,
}

impl LocalFileInfo {
    fn resolve(
        browser: LocalFileBrowser,
        context_id: u64,
        params: FileParams,
    ) -> HostResult<Option<Self>> {
        let area_dir = area_dir(
            &browser.root,
            context_id,
            &params.component,
            &params.filearea,
            params.item_id,
        );
        let path = join_location(&area_dir, &params.filepath, params.filename.as_deref());

        let Some(canonical) = canonical_within(&area_dir, &path)? else {
            return Ok(None);
        };

        let metadata = fs::metadata(&canonical)?;
        let kind = match (&params.filename, metadata.is_dir(), metadata.is_file()) {
            (None, true, _) => NodeKind::Directory,
            (Some(_), _, true) => NodeKind::File,
            _ => return Ok(None),
        };

        let size = if kind == NodeKind::File { metadata.len() } else { 0 };

        Ok(Some(Self {
            browser,
            kind,
            params,
            path: canonical,
            size,
        }))
    }

    fn context_node(browser: LocalFileBrowser, context_id: u64) -> Self {
        let path = browser.root.join(context_id.to_string());
        Self {
            browser,
            kind: NodeKind::Context,
            params: FileParams::directory(context_id, "", "", 0, "/"),
            path,
            size: 0,
        }
    }

    /// Filesystem path of this node.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileInfo for LocalFileInfo {
    fn params(&self) -> FileParams {
        self.params.clone()
    }

    fn visible_name(&self) -> String {
        match self.kind {
            NodeKind::Context => format!("Context {}", self.params.context_id),
            NodeKind::File => self.params.filename.clone().unwrap_or_default(),
            NodeKind::Directory => last_segment(&self.params.filepath)
                .unwrap_or(&self.params.filearea)
                .to_string(),
        }
    }

    fn is_directory(&self) -> bool {
        self.kind != NodeKind::File
    }

    fn filesize(&self) -> u64 {
        self.size
    }

    fn parent(&self) -> HostResult<Option<Self>> {
        let context_id = self.params.context_id;
        let mut params = self.params.clone();

        match self.kind {
            NodeKind::Context => return Ok(None),
            NodeKind::File => params.filename = None,
            NodeKind::Directory => match parent_path(&params.filepath) {
                Some(parent) => params.filepath = parent,
                None => {
                    return Ok(Some(Self::context_node(self.browser.clone(), context_id)));
                }
            },
        }

        LocalFileInfo::resolve(self.browser.clone(), context_id, params)
    }

    fn children(&self) -> HostResult<Vec<Self>> {
        if self.kind != NodeKind::Directory {
            return Ok(Vec::new());
        }

        let mut children = Vec::new();
        for entry_result in fs::read_dir(&self.path)? {
            let entry = match entry_result {
                Ok(e) => e,
                Err(_) => continue, // Skip entries we can't read
            };

            let name = entry.file_name().to_string_lossy().to_string();
            if !self.browser.include_hidden && name.starts_with('.') {
                continue;
            }

            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(_) => continue,
            };
            if file_type.is_symlink() {
                continue;
            }

            let mut params = self.params.clone();
            if file_type.is_dir() {
                if validate_filepath(&format!("{}{}/", params.filepath, name)).is_err() {
                    continue;
                }
                params.filepath = format!("{}{}/", params.filepath, name);
            } else if file_type.is_file() {
                if validate_filename(&name).is_err() {
                    continue;
                }
                params.filename = Some(name);
            } else {
                continue;
            }

            if let Some(child) =
                LocalFileInfo::resolve(self.browser.clone(), self.params.context_id, params)?
            {
                children.push(child);
            }
        }

        // Sort by name (directories first, then files)
        children.sort_by(|a, b| match (a.is_directory(), b.is_directory()) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => a
                .visible_name()
                .to_lowercase()
                .cmp(&b.visible_name().to_lowercase()),
        });

        Ok(children)
    }

    fn copy_to_storage(&self, target: &StorageTarget) -> HostResult<()> {
        if self.kind != NodeKind::File {
            return Err(HostError::Unsupported(format!(
                "cannot copy directory {}",
                self.params.filepath
            )));
        }

        let target_params = FileParams::file(
            target.context_id,
            target.component.clone(),
            target.filearea.clone(),
            target.item_id,
            target.filepath.clone(),
            target.filename.clone(),
        );
        check_params(&target_params)
            .map_err(|e| HostError::Storage(format!("invalid copy target: {e}")))?;

        let area_dir = area_dir(
            &self.browser.root,
            target.context_id,
            &target.component,
            &target.filearea,
            target.item_id,
        );
        let dest_dir = join_location(&area_dir, &target.filepath, None);
        fs::create_dir_all(&dest_dir)?;

        // The destination directory must still sit inside its area
        if canonical_within(&area_dir, &dest_dir)?.is_none() {
            return Err(HostError::PermissionDenied(format!(
                "copy target escapes its file area: {}",
                target.filepath
            )));
        }

        let destination = dest_dir.join(&target.filename);
        if fs::symlink_metadata(&destination).is_ok() {
            return Err(HostError::AlreadyExists(format!(
                "{}{}",
                target.filepath, target.filename
            )));
        }

        // Fixed-length hidden name beside the destination; removed on drop
        let mut temp = NamedTempFile::new_in(&dest_dir)?;
        write_verified_copy(&self.path, &mut temp, self.size)?;

        // Fails instead of replacing a destination created in the meantime
        temp.persist_noclobber(&destination).map_err(|err| {
            if err.error.kind() == ErrorKind::AlreadyExists {
                HostError::AlreadyExists(format!("{}{}", target.filepath, target.filename))
            } else {
                HostError::Io(err.error)
            }
        })?;

        debug!(source = ?self.path, destination = ?destination, "Copied file into storage");
        Ok(())
    }
}

/// Copy `source` into `output`, then check size and SHA-256.
fn write_verified_copy(
    source: &Path,
    output: &mut NamedTempFile,
    expected_size: u64,
) -> HostResult<()> {
    let mut input = File::open(source)?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut written = 0u64;
    loop {
        let read = input.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        output.write_all(&buffer[..read])?;
        hasher.update(&buffer[..read]);
        written += read as u64;
    }
    output.as_file().sync_all()?;

    if written != expected_size {
        return Err(HostError::Integrity(format!(
            "size mismatch: expected {expected_size}, got {written}"
        )));
    }

    let expected = hasher.finalize();
    let actual = sha256_file(output.path())?;
    if actual.as_slice() != expected.as_slice() {
        return Err(HostError::Integrity(format!(
            "checksum mismatch: expected {}, got {}",
            hex::encode(expected),
            hex::encode(actual)
        )));
    }

    Ok(())
}

fn sha256_file(path: &Path) -> HostResult<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize().to_vec())
}

fn check_params(params: &FileParams) -> protocol::Result<()> {
    validate_alphaext("component", &params.component)?;
    validate_alphaext("filearea", &params.filearea)?;
    validate_filepath(&params.filepath)?;
    if let Some(name) = &params.filename {
        validate_filename(name)?;
    }
    Ok(())
}

fn area_dir(
    root: &Path,
    context_id: u64,
    component: &str,
    filearea: &str,
    item_id: u64,
) -> PathBuf {
    root.join(context_id.to_string())
        .join(component)
        .join(filearea)
        .join(item_id.to_string())
}

fn join_location(area_dir: &Path, filepath: &str, filename: Option<&str>) -> PathBuf {
    let mut path = area_dir.to_path_buf();
    for segment in filepath.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    if let Some(name) = filename {
        path.push(name);
    }
    path
}

/// Canonicalize `path` and make sure it stays inside `area_dir` without
/// crossing a symlink. Missing paths yield `None`.
fn canonical_within(area_dir: &Path, path: &Path) -> HostResult<Option<PathBuf>> {
    let area_canonical = match fs::canonicalize(area_dir) {
        Ok(p) => p,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let canonical = match fs::canonicalize(path) {
        Ok(p) => p,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if !canonical.starts_with(&area_canonical) {
        return Ok(None);
    }

    // A symlink inside the area resolving to another place inside the area
    // still changes what the path names, so refuse it too.
    let relative = match path.strip_prefix(area_dir) {
        Ok(r) => r,
        Err(_) => return Ok(None),
    };
    if area_canonical.join(relative) != canonical {
        return Ok(None);
    }

    Ok(Some(canonical))
}

fn last_segment(filepath: &str) -> Option<&str> {
    filepath.split('/').filter(|s| !s.is_empty()).next_back()
}

fn parent_path(filepath: &str) -> Option<String> {
    if filepath == "/" {
        return None;
    }
    let trimmed = filepath.trim_end_matches('/');
    let cut = trimmed.rfind('/')?;
    Some(trimmed[..=cut].to_string())
}

/// Registry of known contexts.
#[derive(Debug, Clone, Default)]
pub struct LocalContexts {
    by_id: HashMap<u64, Context>,
    by_user: HashMap<u64, u64>,
}

impl LocalContexts {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user context and return it.
    pub fn register_user(&mut self, user_id: u64, context_id: u64) -> Context {
        let context = Context::user(context_id, user_id);
        self.by_id.insert(context_id, context);
        self.by_user.insert(user_id, context_id);
        context
    }

    /// Register any context.
    pub fn register(&mut self, context: Context) {
        self.by_id.insert(context.id, context);
    }
}

impl ContextResolver for LocalContexts {
    fn user_context(&self, user_id: u64) -> HostResult<Context> {
        self.by_user
            .get(&user_id)
            .and_then(|id| self.by_id.get(id))
            .copied()
            .ok_or_else(|| HostError::PermissionDenied(format!("user {user_id} has no context")))
    }

    fn context_by_id(&self, id: u64) -> HostResult<Option<Context>> {
        Ok(self.by_id.get(&id).copied())
    }
}
