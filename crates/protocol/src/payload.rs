//! File picker payload definitions.
//!
//! These types serialize to the JSON shape the picker UI consumes. Field
//! names are part of that contract and must not change.

use serde::{Deserialize, Serialize};

/// Listing payload for one level of the picker tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Children are loaded on demand as the user navigates.
    pub dynload: bool,
    /// The source offers no search.
    pub nosearch: bool,
    /// The source needs no separate login.
    pub nologin: bool,
    /// Breadcrumb from the area root down to the current location.
    pub path: Vec<BreadcrumbEntry>,
    /// Entries at the current location.
    pub list: Vec<ListingEntry>,
}

impl Listing {
    /// Create a listing with the standard flags set.
    pub fn new(path: Vec<BreadcrumbEntry>, list: Vec<ListingEntry>) -> Self {
        Self {
            dynload: true,
            nosearch: true,
            nologin: true,
            path,
            list,
        }
    }

    /// A listing with no breadcrumb and no entries.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Whether the listing has no entries.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// One step of the breadcrumb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadcrumbEntry {
    /// Display name.
    pub name: String,
    /// Token navigating to this level.
    pub path: String,
}

/// Where selecting an entry leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryLink {
    /// Directory: the token navigates one level down.
    Directory {
        /// Navigation token.
        path: String,
    },
    /// File: the token selects the file for copying.
    File {
        /// Source token.
        source: String,
    },
}

impl EntryLink {
    /// The token carried by this link.
    pub fn token(&self) -> &str {
        match self {
            EntryLink::Directory { path } => path,
            EntryLink::File { source } => source,
        }
    }
}

/// One node in the picker tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Display title.
    pub title: String,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Display date, empty when unknown.
    pub date: String,
    /// Navigation or selection token.
    #[serde(flatten)]
    pub link: EntryLink,
    /// Placeholder for on-demand children; always present and empty for
    /// directories, absent for files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ListingEntry>>,
    /// Icon URL.
    pub thumbnail: String,
}

impl ListingEntry {
    /// Create a directory entry with an empty children placeholder.
    pub fn directory(title: impl Into<String>, token: String, thumbnail: String) -> Self {
        Self {
            title: title.into(),
            size: 0,
            date: String::new(),
            link: EntryLink::Directory { path: token },
            children: Some(Vec::new()),
            thumbnail,
        }
    }

    /// Create a file entry.
    pub fn file(title: impl Into<String>, size: u64, token: String, thumbnail: String) -> Self {
        Self {
            title: title.into(),
            size,
            date: String::new(),
            link: EntryLink::File { source: token },
            children: None,
            thumbnail,
        }
    }

    /// Whether this entry is a directory.
    pub fn is_directory(&self) -> bool {
        matches!(self.link, EntryLink::Directory { .. })
    }

    /// The token carried by this entry.
    pub fn token(&self) -> &str {
        self.link.token()
    }
}

/// Facts about a file copied into a draft area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyResult {
    /// Destination draft item id.
    pub itemid: u64,
    /// Title assigned to the copy (the destination file name).
    pub title: String,
    /// Destination context id.
    pub contextid: u64,
    /// Size of the copied file in bytes.
    pub filesize: u64,
}

/// Ways a repository can return a selected file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReturnTypes(u8);

impl ReturnTypes {
    /// The file is copied into the destination area.
    pub const INTERNAL: ReturnTypes = ReturnTypes(0b0000_0001);
    /// The file is referenced by an external link.
    pub const EXTERNAL: ReturnTypes = ReturnTypes(0b0000_0010);

    /// Create an empty set.
    #[inline]
    pub fn empty() -> Self {
        Self(0)
    }

    /// Get the raw bit value.
    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Check whether every type in `other` is supported.
    #[inline]
    pub fn contains(self, other: ReturnTypes) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ReturnTypes {
    type Output = ReturnTypes;

    fn bitor(self, rhs: ReturnTypes) -> ReturnTypes {
        ReturnTypes(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_directory_entry_json() {
        let entry =
            ListingEntry::directory("docs", "TOKEN".to_string(), "/pix/f/folder-32".to_string());
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({
                "title": "docs",
                "size": 0,
                "date": "",
                "path": "TOKEN",
                "children": [],
                "thumbnail": "/pix/f/folder-32",
            })
        );
    }

    #[test]
    fn test_file_entry_json_has_source_and_no_children() {
        let entry =
            ListingEntry::file("a.txt", 12, "TOKEN".to_string(), "/pix/f/text-32".to_string());
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["source"], "TOKEN");
        assert!(value.get("path").is_none());
        assert!(value.get("children").is_none());
        assert_eq!(value["size"], 12);
    }

    #[test]
    fn test_entry_deserializes_both_links() {
        let dir: ListingEntry = serde_json::from_value(json!({
            "title": "d", "size": 0, "date": "", "path": "P", "children": [], "thumbnail": "t"
        }))
        .unwrap();
        assert!(dir.is_directory());
        assert_eq!(dir.token(), "P");

        let file: ListingEntry = serde_json::from_value(json!({
            "title": "f", "size": 3, "date": "", "source": "S", "thumbnail": "t"
        }))
        .unwrap();
        assert!(!file.is_directory());
        assert_eq!(file.token(), "S");
    }

    #[test]
    fn test_listing_flags() {
        let listing = Listing::empty();
        assert!(listing.dynload);
        assert!(listing.nosearch);
        assert!(listing.nologin);
        assert!(listing.is_empty());

        let value = serde_json::to_value(&listing).unwrap();
        assert_eq!(value["path"], json!([]));
        assert_eq!(value["list"], json!([]));
    }

    #[test]
    fn test_copy_result_json() {
        let result = CopyResult {
            itemid: 7,
            title: "a.txt".to_string(),
            contextid: 5,
            filesize: 42,
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"itemid": 7, "title": "a.txt", "contextid": 5, "filesize": 42})
        );
    }

    #[test]
    fn test_return_types() {
        let internal = ReturnTypes::INTERNAL;
        assert!(internal.contains(ReturnTypes::INTERNAL));
        assert!(!internal.contains(ReturnTypes::EXTERNAL));

        let both = ReturnTypes::INTERNAL | ReturnTypes::EXTERNAL;
        assert!(both.contains(ReturnTypes::EXTERNAL));
        assert_eq!(both.bits(), 0b11);
        assert_eq!(ReturnTypes::empty().bits(), 0);
    }
}
