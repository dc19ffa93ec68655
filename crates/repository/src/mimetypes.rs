//! Extension table for icons and type groups.

use crate::host::IconResolver;

/// Icon used for unknown extensions.
pub const UNKNOWN_ICON: &str = "unknown";

/// Icon used for directories.
pub const FOLDER_ICON: &str = "folder";

/// Icon sizes the pix set provides.
pub const ICON_SIZES: &[u32] = &[16, 24, 32, 48, 64, 128, 256];

/// A known file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileType {
    /// Lowercase extension without the dot.
    pub extension: &'static str,
    /// Icon name in the `f/` pix set.
    pub icon: &'static str,
    /// Type groups this extension belongs to.
    pub groups: &'static [&'static str],
}

const fn ft(
    extension: &'static str,
    icon: &'static str,
    groups: &'static [&'static str],
) -> FileType {
    FileType {
        extension,
        icon,
        groups,
    }
}

const WEB_IMAGE: &[&str] = &["image", "web_image"];
const IMAGE: &[&str] = &["image"];
const DOCUMENT: &[&str] = &["document"];
const SPREADSHEET: &[&str] = &["document", "spreadsheet"];
const PRESENTATION: &[&str] = &["document", "presentation"];
const AUDIO: &[&str] = &["audio"];
const VIDEO: &[&str] = &["video"];
const ARCHIVE: &[&str] = &["archive"];
const NONE: &[&str] = &[];

static FILE_TYPES: &[FileType] = &[
    ft("bmp", "bmp", IMAGE),
    ft("gif", "gif", WEB_IMAGE),
    ft("jpeg", "jpeg", WEB_IMAGE),
    ft("jpg", "jpeg", WEB_IMAGE),
    ft("png", "png", WEB_IMAGE),
    ft("svg", "image", WEB_IMAGE),
    ft("tif", "tiff", IMAGE),
    ft("tiff", "tiff", IMAGE),
    ft("pdf", "pdf", DOCUMENT),
    ft("doc", "document", DOCUMENT),
    ft("docx", "document", DOCUMENT),
    ft("odt", "writer", DOCUMENT),
    ft("rtf", "text", DOCUMENT),
    ft("txt", "text", DOCUMENT),
    ft("md", "text", DOCUMENT),
    ft("html", "html", DOCUMENT),
    ft("htm", "html", DOCUMENT),
    ft("xls", "spreadsheet", SPREADSHEET),
    ft("xlsx", "spreadsheet", SPREADSHEET),
    ft("ods", "calc", SPREADSHEET),
    ft("csv", "spreadsheet", SPREADSHEET),
    ft("ppt", "powerpoint", PRESENTATION),
    ft("pptx", "powerpoint", PRESENTATION),
    ft("odp", "impress", PRESENTATION),
    ft("mp3", "mp3", AUDIO),
    ft("ogg", "audio", AUDIO),
    ft("wav", "wav", AUDIO),
    ft("mp4", "mpeg", VIDEO),
    ft("webm", "video", VIDEO),
    ft("mov", "quicktime", VIDEO),
    ft("avi", "avi", VIDEO),
    ft("zip", "archive", ARCHIVE),
    ft("gz", "archive", ARCHIVE),
    ft("tar", "archive", ARCHIVE),
    ft("7z", "archive", ARCHIVE),
    ft("json", "text", NONE),
    ft("xml", "xml", NONE),
];

/// Lowercase extension of a file name, without the dot.
///
/// Names with no dot, or whose only dot is leading (`.profile`), have none.
pub fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Look up a known extension.
pub fn lookup(extension: &str) -> Option<&'static FileType> {
    let extension = extension.trim_start_matches('.').to_ascii_lowercase();
    FILE_TYPES.iter().find(|m| m.extension == extension)
}

/// Look up the entry for a file name.
pub fn lookup_filename(filename: &str) -> Option<&'static FileType> {
    extension_of(filename).and_then(|ext| lookup(&ext))
}

/// Whether any extension belongs to `group`.
pub fn is_known_group(group: &str) -> bool {
    FILE_TYPES
        .iter()
        .any(|m| m.groups.iter().any(|g| *g == group))
}

/// Icon name for a file name.
pub fn file_extension_icon(filename: &str) -> &'static str {
    lookup_filename(filename)
        .map(|m| m.icon)
        .unwrap_or(UNKNOWN_ICON)
}

/// Icons served from a pix directory, `{base_url}/f/{icon}-{size}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixIcons {
    base_url: String,
    size: u32,
}

impl PixIcons {
    /// Create a resolver for the given base URL and icon size.
    pub fn new(base_url: impl Into<String>, size: u32) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            size,
        }
    }

    fn url(&self, icon: &str) -> String {
        format!("{}/f/{}-{}", self.base_url, icon, self.size)
    }
}

impl Default for PixIcons {
    fn default() -> Self {
        Self::new("/pix", 32)
    }
}

impl IconResolver for PixIcons {
    fn folder_icon(&self) -> String {
        self.url(FOLDER_ICON)
    }

    fn file_icon(&self, filename: &str) -> String {
        self.url(file_extension_icon(filename))
    }
}
