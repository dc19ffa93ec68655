//! Entry filter policy applied to listings.

use protocol::ListingEntry;

use crate::mimetypes;

/// Decides which listing entries reach the picker.
pub trait EntryFilter {
    /// Whether `entry` should be kept.
    fn accept(&self, entry: &ListingEntry) -> bool;
}

impl<F> EntryFilter for F
where
    F: Fn(&ListingEntry) -> bool,
{
    fn accept(&self, entry: &ListingEntry) -> bool {
        self(entry)
    }
}

/// One accepted-type rule.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TypeRule {
    /// A single extension, lowercase, no dot.
    Extension(String),
    /// A type group such as `image` or `document`.
    Group(String),
}

/// Filter keeping files whose type the destination accepts.
///
/// Directories always pass so users can navigate into them. An empty
/// rule set, or one containing `*`, accepts every file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptedTypes {
    rules: Vec<TypeRule>,
}

impl AcceptedTypes {
    /// Accept every file.
    pub fn any() -> Self {
        Self::default()
    }

    /// Parse accepted types from strings such as `*`, `.txt`, `pdf` or
    /// `image`.
    ///
    /// Known group names become group rules; everything else is taken as
    /// an extension. Blank entries are ignored.
    pub fn parse<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        for raw in types {
            let value = raw.as_ref().trim().to_ascii_lowercase();
            if value.is_empty() {
                continue;
            }
            if value == "*" {
                return Self::any();
            }
            if let Some(ext) = value.strip_prefix('.') {
                rules.push(TypeRule::Extension(ext.to_string()));
            } else if mimetypes::is_known_group(&value) {
                rules.push(TypeRule::Group(value));
            } else {
                rules.push(TypeRule::Extension(value));
            }
        }
        Self { rules }
    }

    /// Whether every file is accepted.
    pub fn accepts_all(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether a file with this name is accepted.
    pub fn accepts_filename(&self, filename: &str) -> bool {
        if self.accepts_all() {
            return true;
        }
        let Some(ext) = mimetypes::extension_of(filename) else {
            return false;
        };
        let groups = mimetypes::lookup(&ext).map(|m| m.groups).unwrap_or(&[]);
        self.rules.iter().any(|rule| match rule {
            TypeRule::Extension(accepted) => *accepted == ext,
            TypeRule::Group(group) => groups.iter().any(|g| *g == group.as_str()),
        })
    }
}

impl EntryFilter for AcceptedTypes {
    fn accept(&self, entry: &ListingEntry) -> bool {
        entry.is_directory() || self.accepts_filename(&entry.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(title: &str) -> ListingEntry {
        ListingEntry::file(title, 1, "T".to_string(), String::new())
    }

    fn dir(title: &str) -> ListingEntry {
        ListingEntry::directory(title, "T".to_string(), String::new())
    }

    #[test]
    fn test_any_accepts_everything() {
        let filter = AcceptedTypes::any();
        assert!(filter.accepts_all());
        assert!(filter.accept(&file("a.bin")));
        assert!(filter.accept(&file("README")));
        assert!(filter.accept(&dir("docs")));
    }

    #[test]
    fn test_star_accepts_everything() {
        let filter = AcceptedTypes::parse([".pdf", "*"]);
        assert!(filter.accepts_all());
        assert!(filter.accept(&file("a.bin")));
    }

    #[test]
    fn test_extension_rules() {
        let filter = AcceptedTypes::parse([".PDF", "txt"]);
        assert!(filter.accept(&file("a.pdf")));
        assert!(filter.accept(&file("b.TXT")));
        assert!(!filter.accept(&file("c.docx")));
        assert!(!filter.accept(&file("Makefile")));
    }

    #[test]
    fn test_group_rules() {
        let filter = AcceptedTypes::parse(["web_image"]);
        assert!(filter.accept(&file("a.png")));
        assert!(filter.accept(&file("b.jpeg")));
        assert!(!filter.accept(&file("c.tiff")));
        assert!(!filter.accept(&file("d.pdf")));
    }

    #[test]
    fn test_directories_always_pass() {
        let filter = AcceptedTypes::parse([".pdf"]);
        assert!(filter.accept(&dir("photos.png")));
        assert!(filter.accept(&dir("plain")));
    }

    #[test]
    fn test_blank_entries_ignored() {
        let filter = AcceptedTypes::parse(["", "  "]);
        assert!(filter.accepts_all());
    }

    #[test]
    fn test_closure_filter() {
        let filter = |entry: &ListingEntry| entry.size > 0;
        assert!(filter.accept(&file("a.txt")));
        assert!(!filter.accept(&dir("d")));
    }
}
