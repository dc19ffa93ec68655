//! Repository over the acting user's private files.
//!
//! The repository turns path tokens into host browser lookups, walks the
//! result into a picker listing, and copies selected files into the user's
//! draft area. It keeps no state between calls.

use std::collections::HashSet;

use protocol::{
    decode_validated, validate_filename, validate_filepath, BreadcrumbEntry, CopyResult,
    FileParams, Listing, ListingEntry, ProtocolError, ReturnTypes,
};
use tracing::{debug, info, warn};

use crate::error::{RepositoryError, Result};
use crate::filter::{AcceptedTypes, EntryFilter};
use crate::host::{
    ContextResolver, FileBrowser, FileInfo, FileLocation, HostError, IconResolver, StorageTarget,
    UserIdentity,
};

/// Component owning user file areas.
pub const USER_COMPONENT: &str = "user";

/// File area holding private files.
pub const PRIVATE_AREA: &str = "private";

/// File area receiving copies.
pub const DRAFT_AREA: &str = "draft";

/// Item id of the private area.
pub const PRIVATE_ITEM_ID: u64 = 0;

/// File picker source over the acting user's private files.
pub struct UserRepository<B, C, I, F = AcceptedTypes> {
    browser: B,
    contexts: C,
    icons: I,
    filter: F,
}

impl<B, C, I> UserRepository<B, C, I, AcceptedTypes>
where
    B: FileBrowser,
    C: ContextResolver,
    I: IconResolver,
{
    /// Create a repository that accepts every file type.
    pub fn new(browser: B, contexts: C, icons: I) -> Self {
        Self {
            browser,
            contexts,
            icons,
            filter: AcceptedTypes::any(),
        }
    }
}

impl<B, C, I, F> UserRepository<B, C, I, F>
where
    B: FileBrowser,
    C: ContextResolver,
    I: IconResolver,
    F: EntryFilter,
{
    /// Replace the entry filter.
    pub fn with_filter<G: EntryFilter>(self, filter: G) -> UserRepository<B, C, I, G> {
        UserRepository {
            browser: self.browser,
            contexts: self.contexts,
            icons: self.icons,
            filter,
        }
    }

    /// Whether a separate login step is needed. It never is.
    pub fn login_required(&self) -> bool {
        false
    }

    /// Login affordance: produces the root listing straight away.
    pub fn print_login(&self, user: &UserIdentity) -> Result<Listing> {
        self.get_listing(user, None)
    }

    /// Files are always copied into the destination, never linked.
    pub fn supported_return_types(&self) -> ReturnTypes {
        ReturnTypes::INTERNAL
    }

    /// List one level of the user's private area.
    ///
    /// A missing or empty token lists the area root. A token that does not
    /// decode, or whose path fields fail validation, yields an empty
    /// listing. Host failures surface as [`RepositoryError::EmptyFileList`].
    pub fn get_listing(&self, user: &UserIdentity, token: Option<&str>) -> Result<Listing> {
        let (filepath, filename) = match token.filter(|t| !t.is_empty()) {
            None => ("/".to_string(), None),
            Some(token) => match navigation_target(token) {
                Ok(target) => target,
                Err(err) => {
                    debug!(error = %err, "Ignoring undecodable listing token");
                    return Ok(Listing::empty());
                }
            },
        };

        let location = FileLocation {
            component: USER_COMPONENT.to_string(),
            filearea: PRIVATE_AREA.to_string(),
            item_id: PRIVATE_ITEM_ID,
            filepath,
            filename,
        };

        debug!(
            user_id = user.user_id,
            filepath = %location.filepath,
            filename = ?location.filename,
            "Listing private files"
        );

        self.build_listing(user, &location).map_err(|err| {
            warn!(error = %err, user_id = user.user_id, "Failed to list private files");
            RepositoryError::EmptyFileList
        })
    }

    /// Copy the file named by `token` into the user's draft area.
    ///
    /// Every token field and the destination path and name are validated
    /// before the host is touched.
    pub fn copy_to_area(
        &self,
        user: &UserIdentity,
        token: &str,
        draft_item_id: u64,
        new_filepath: &str,
        new_filename: &str,
    ) -> Result<CopyResult> {
        let source = decode_validated(token).map_err(RepositoryError::InvalidToken)?;
        let source_name = source.filename.clone().ok_or_else(|| {
            RepositoryError::InvalidToken(ProtocolError::invalid_field("filename", "is missing"))
        })?;

        validate_filepath(new_filepath).map_err(RepositoryError::InvalidDestination)?;
        validate_filename(new_filename).map_err(RepositoryError::InvalidDestination)?;

        let user_context = self.contexts.user_context(user.user_id)?;
        let source_context = self
            .contexts
            .context_by_id(source.context_id)?
            .ok_or(RepositoryError::ContextNotFound(source.context_id))?;

        let location = FileLocation::from_params(&source);
        let file = self
            .browser
            .file_info(&source_context, &location)?
            .ok_or_else(|| {
                RepositoryError::SourceNotFound(format!("{}{}", source.filepath, source_name))
            })?;

        let target = StorageTarget {
            context_id: user_context.id,
            component: USER_COMPONENT.to_string(),
            filearea: DRAFT_AREA.to_string(),
            item_id: draft_item_id,
            filepath: new_filepath.to_string(),
            filename: new_filename.to_string(),
        };
        file.copy_to_storage(&target)?;

        let filesize = file.filesize();
        info!(
            user_id = user.user_id,
            source_context = source.context_id,
            source = %format!("{}{}", source.filepath, source_name),
            draft_item_id,
            destination = %format!("{new_filepath}{new_filename}"),
            filesize,
            "Copied file to draft area"
        );

        Ok(CopyResult {
            itemid: draft_item_id,
            title: new_filename.to_string(),
            contextid: user_context.id,
            filesize,
        })
    }

    fn build_listing(&self, user: &UserIdentity, location: &FileLocation) -> Result<Listing> {
        let context = self.contexts.user_context(user.user_id)?;

        let Some(node) = self.browser.file_info(&context, location)? else {
            debug!(filepath = %location.filepath, "Private files location not found");
            return Ok(Listing::empty());
        };

        let path = self.breadcrumb(&node)?;

        let mut list = Vec::new();
        for child in node.children()? {
            let entry = self.entry_for(&child)?;
            if self.filter.accept(&entry) {
                list.push(entry);
            }
        }

        Ok(Listing::new(path, list))
    }

    /// Walk from `node` up to the area root, root-first.
    ///
    /// The area root itself is the picker's home and gets no entry. A host
    /// whose parent chain revisits a node is reported as a storage error.
    fn breadcrumb(&self, node: &B::Node) -> Result<Vec<BreadcrumbEntry>> {
        let mut crumbs = Vec::new();
        let mut seen = HashSet::new();

        let params = node.params();
        if !in_private_area(&params) || is_area_root(&params) {
            return Ok(crumbs);
        }
        crumbs.push(crumb(node, &params)?);
        seen.insert(params);

        let mut current = node.parent()?;
        while let Some(level) = current {
            let params = level.params();
            if !in_private_area(&params) || is_area_root(&params) {
                break;
            }
            if seen.contains(&params) {
                return Err(RepositoryError::Host(HostError::Storage(format!(
                    "parent chain loops back to {}",
                    params.filepath
                ))));
            }
            crumbs.push(crumb(&level, &params)?);
            seen.insert(params);
            current = level.parent()?;
        }

        crumbs.reverse();
        Ok(crumbs)
    }

    fn entry_for(&self, child: &B::Node) -> Result<ListingEntry> {
        let token = encode(&child.params())?;
        let name = child.visible_name();
        if child.is_directory() {
            Ok(ListingEntry::directory(name, token, self.icons.folder_icon()))
        } else {
            let thumbnail = self.icons.file_icon(&name);
            Ok(ListingEntry::file(name, child.filesize(), token, thumbnail))
        }
    }
}

/// Decode a listing token down to the path and name it navigates to.
fn navigation_target(token: &str) -> std::result::Result<(String, Option<String>), ProtocolError> {
    let params = FileParams::decode(token)?;
    validate_filepath(&params.filepath)?;
    if let Some(name) = &params.filename {
        validate_filename(name)?;
    }
    Ok((params.filepath, params.filename))
}

fn in_private_area(params: &FileParams) -> bool {
    params.component == USER_COMPONENT && params.filearea == PRIVATE_AREA
}

fn is_area_root(params: &FileParams) -> bool {
    params.filepath == "/" && params.filename.is_none()
}

fn crumb<N: FileInfo>(node: &N, params: &FileParams) -> Result<BreadcrumbEntry> {
    Ok(BreadcrumbEntry {
        name: node.visible_name(),
        path: encode(params)?,
    })
}

fn encode(params: &FileParams) -> Result<String> {
    params.encode().map_err(RepositoryError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Context, HostResult};
    use crate::local::{LocalContexts, LocalFileBrowser};
    use crate::mimetypes::PixIcons;
    use std::fs;
    use tempfile::TempDir;

    const USER_ID: u64 = 2;
    const CONTEXT_ID: u64 = 5;

    fn private_root(temp: &TempDir) -> std::path::PathBuf {
        temp.path().join("5/user/private/0")
    }

    fn setup() -> (UserRepository<LocalFileBrowser, LocalContexts, PixIcons>, TempDir) {
        let temp = TempDir::new().unwrap();
        let root = private_root(&temp);
        fs::create_dir_all(root.join("docs/2024")).unwrap();
        fs::write(root.join("notes.txt"), "hello").unwrap();
        fs::write(root.join("docs/report.pdf"), "pdf-bytes").unwrap();

        let mut contexts = LocalContexts::new();
        contexts.register_user(USER_ID, CONTEXT_ID);
        let repo = UserRepository::new(
            LocalFileBrowser::new(temp.path()),
            contexts,
            PixIcons::default(),
        );
        (repo, temp)
    }

    #[test]
    fn test_login_is_never_required() {
        let (repo, _temp) = setup();
        assert!(!repo.login_required());
        let user = UserIdentity::new(USER_ID);
        assert_eq!(
            repo.print_login(&user).unwrap(),
            repo.get_listing(&user, None).unwrap()
        );
    }

    #[test]
    fn test_only_internal_return_type() {
        let (repo, _temp) = setup();
        let types = repo.supported_return_types();
        assert!(types.contains(ReturnTypes::INTERNAL));
        assert!(!types.contains(ReturnTypes::EXTERNAL));
    }

    #[test]
    fn test_root_listing() {
        let (repo, _temp) = setup();
        let listing = repo.get_listing(&UserIdentity::new(USER_ID), None).unwrap();

        assert!(listing.dynload && listing.nosearch && listing.nologin);
        assert!(listing.path.is_empty());
        let titles: Vec<&str> = listing.list.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["docs", "notes.txt"]);

        let docs = &listing.list[0];
        assert!(docs.is_directory());
        assert_eq!(docs.children, Some(Vec::new()));
        assert_eq!(docs.thumbnail, "/pix/f/folder-32");

        let notes = &listing.list[1];
        assert_eq!(notes.size, 5);
        assert_eq!(notes.thumbnail, "/pix/f/text-32");
        let params = FileParams::decode(notes.token()).unwrap();
        assert_eq!(params, FileParams::file(CONTEXT_ID, "user", "private", 0, "/", "notes.txt"));
    }

    #[test]
    fn test_empty_token_lists_root() {
        let (repo, _temp) = setup();
        let user = UserIdentity::new(USER_ID);
        assert_eq!(
            repo.get_listing(&user, Some("")).unwrap(),
            repo.get_listing(&user, None).unwrap()
        );
    }

    #[test]
    fn test_navigate_into_directory() {
        let (repo, _temp) = setup();
        let user = UserIdentity::new(USER_ID);
        let root = repo.get_listing(&user, None).unwrap();
        let docs_token = root.list[0].token().to_string();

        let listing = repo.get_listing(&user, Some(&docs_token)).unwrap();
        assert_eq!(listing.path.len(), 1);
        assert_eq!(listing.path[0].name, "docs");
        assert_eq!(listing.path[0].path, docs_token);
        let titles: Vec<&str> = listing.list.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["2024", "report.pdf"]);
    }

    #[test]
    fn test_garbage_token_gives_empty_listing() {
        let (repo, _temp) = setup();
        let listing = repo
            .get_listing(&UserIdentity::new(USER_ID), Some("%%% not a token"))
            .unwrap();
        assert!(listing.list.is_empty());
        assert!(listing.path.is_empty());
    }

    #[test]
    fn test_traversal_token_gives_empty_listing() {
        let (repo, _temp) = setup();
        let token = FileParams::directory(CONTEXT_ID, "user", "private", 0, "/../../")
            .encode()
            .unwrap();
        let listing = repo
            .get_listing(&UserIdentity::new(USER_ID), Some(&token))
            .unwrap();
        assert!(listing.is_empty());
    }

    #[test]
    fn test_missing_directory_gives_empty_listing() {
        let (repo, _temp) = setup();
        let token = FileParams::directory(CONTEXT_ID, "user", "private", 0, "/nowhere/")
            .encode()
            .unwrap();
        let listing = repo
            .get_listing(&UserIdentity::new(USER_ID), Some(&token))
            .unwrap();
        assert!(listing.is_empty());
    }

    #[test]
    fn test_filter_drops_unaccepted_files() {
        let (repo, _temp) = setup();
        let repo = repo.with_filter(AcceptedTypes::parse([".pdf"]));
        let listing = repo.get_listing(&UserIdentity::new(USER_ID), None).unwrap();
        let titles: Vec<&str> = listing.list.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["docs"]);
    }

    #[test]
    fn test_copy_to_area() {
        let (repo, temp) = setup();
        let user = UserIdentity::new(USER_ID);
        let source = FileParams::file(CONTEXT_ID, "user", "private", 0, "/docs/", "report.pdf")
            .encode()
            .unwrap();

        let result = repo.copy_to_area(&user, &source, 7, "/", "a.pdf").unwrap();
        assert_eq!(
            result,
            CopyResult {
                itemid: 7,
                title: "a.pdf".to_string(),
                contextid: CONTEXT_ID,
                filesize: 9,
            }
        );

        let copied = temp.path().join("5/user/draft/7/a.pdf");
        assert_eq!(fs::read(copied).unwrap(), b"pdf-bytes");
        assert!(private_root(&temp).join("docs/report.pdf").exists());
    }

    #[test]
    fn test_copy_rejects_directory_token() {
        let (repo, _temp) = setup();
        let token = FileParams::directory(CONTEXT_ID, "user", "private", 0, "/docs/")
            .encode()
            .unwrap();
        let result = repo.copy_to_area(&UserIdentity::new(USER_ID), &token, 7, "/", "a.pdf");
        assert!(matches!(result, Err(RepositoryError::InvalidToken(_))));
    }

    #[test]
    fn test_copy_rejects_bad_destination() {
        let (repo, temp) = setup();
        let token = FileParams::file(CONTEXT_ID, "user", "private", 0, "/", "notes.txt")
            .encode()
            .unwrap();
        let user = UserIdentity::new(USER_ID);

        let result = repo.copy_to_area(&user, &token, 7, "/../", "a.txt");
        assert!(matches!(result, Err(RepositoryError::InvalidDestination(_))));
        let result = repo.copy_to_area(&user, &token, 7, "/", "../a.txt");
        assert!(matches!(result, Err(RepositoryError::InvalidDestination(_))));
        assert!(!temp.path().join("5/user/draft").exists());
    }

    #[test]
    fn test_copy_unknown_context() {
        let (repo, _temp) = setup();
        let token = FileParams::file(99, "user", "private", 0, "/", "notes.txt")
            .encode()
            .unwrap();
        let result = repo.copy_to_area(&UserIdentity::new(USER_ID), &token, 7, "/", "a.txt");
        assert!(matches!(result, Err(RepositoryError::ContextNotFound(99))));
    }

    #[test]
    fn test_copy_missing_source() {
        let (repo, _temp) = setup();
        let token = FileParams::file(CONTEXT_ID, "user", "private", 0, "/", "gone.txt")
            .encode()
            .unwrap();
        let result = repo.copy_to_area(&UserIdentity::new(USER_ID), &token, 7, "/", "a.txt");
        assert!(matches!(result, Err(RepositoryError::SourceNotFound(_))));
    }

    struct BrokenBrowser;

    struct NeverNode;

    impl FileInfo for NeverNode {
        fn params(&self) -> FileParams {
            unreachable!()
        }
        fn visible_name(&self) -> String {
            unreachable!()
        }
        fn is_directory(&self) -> bool {
            unreachable!()
        }
        fn filesize(&self) -> u64 {
            unreachable!()
        }
        fn parent(&self) -> HostResult<Option<Self>> {
            unreachable!()
        }
        fn children(&self) -> HostResult<Vec<Self>> {
            unreachable!()
        }
        fn copy_to_storage(&self, _target: &StorageTarget) -> HostResult<()> {
            unreachable!()
        }
    }

    impl FileBrowser for BrokenBrowser {
        type Node = NeverNode;

        fn file_info(
            &self,
            _context: &Context,
            _location: &FileLocation,
        ) -> HostResult<Option<NeverNode>> {
            Err(HostError::Storage("database unavailable".to_string()))
        }
    }

    #[test]
    fn test_host_failure_becomes_empty_file_list() {
        let mut contexts = LocalContexts::new();
        contexts.register_user(USER_ID, CONTEXT_ID);
        let repo = UserRepository::new(BrokenBrowser, contexts, PixIcons::default());

        let result = repo.get_listing(&UserIdentity::new(USER_ID), None);
        assert!(matches!(result, Err(RepositoryError::EmptyFileList)));
    }

    /// Host whose `/a/` and `/a/b/` name each other as parent.
    struct LoopingBrowser;

    struct LoopNode {
        filepath: String,
    }

    impl FileInfo for LoopNode {
        fn params(&self) -> FileParams {
            FileParams::directory(CONTEXT_ID, "user", "private", 0, self.filepath.clone())
        }
        fn visible_name(&self) -> String {
            self.filepath.clone()
        }
        fn is_directory(&self) -> bool {
            true
        }
        fn filesize(&self) -> u64 {
            0
        }
        fn parent(&self) -> HostResult<Option<Self>> {
            let filepath = if self.filepath == "/a/" { "/a/b/" } else { "/a/" };
            Ok(Some(LoopNode {
                filepath: filepath.to_string(),
            }))
        }
        fn children(&self) -> HostResult<Vec<Self>> {
            Ok(Vec::new())
        }
        fn copy_to_storage(&self, _target: &StorageTarget) -> HostResult<()> {
            Err(HostError::Unsupported("directory".to_string()))
        }
    }

    impl FileBrowser for LoopingBrowser {
        type Node = LoopNode;

        fn file_info(
            &self,
            _context: &Context,
            location: &FileLocation,
        ) -> HostResult<Option<LoopNode>> {
            Ok(Some(LoopNode {
                filepath: location.filepath.clone(),
            }))
        }
    }

    #[test]
    fn test_parent_cycle_becomes_empty_file_list() {
        let mut contexts = LocalContexts::new();
        contexts.register_user(USER_ID, CONTEXT_ID);
        let repo = UserRepository::new(LoopingBrowser, contexts, PixIcons::default());
        let token = FileParams::directory(CONTEXT_ID, "user", "private", 0, "/a/b/")
            .encode()
            .unwrap();

        let result = repo.get_listing(&UserIdentity::new(USER_ID), Some(&token));
        assert!(matches!(result, Err(RepositoryError::EmptyFileList)));
    }

    #[test]
    fn test_host_failure_propagates_from_copy() {
        let mut contexts = LocalContexts::new();
        contexts.register_user(USER_ID, CONTEXT_ID);
        let repo = UserRepository::new(BrokenBrowser, contexts, PixIcons::default());
        let token = FileParams::file(CONTEXT_ID, "user", "private", 0, "/", "a.txt")
            .encode()
            .unwrap();

        let result = repo.copy_to_area(&UserIdentity::new(USER_ID), &token, 1, "/", "a.txt");
        assert!(matches!(result, Err(RepositoryError::Host(HostError::Storage(_)))));
    }
}
