use std::ops::Deref;

use object_store::path::Path as ObjPath;

/// File extension for persisted documents
pub const DOCUMENT_FILE_EXTENSION: &str = "xml";

/// Key of one persisted element: `<prefix>/<source>/<sequence>.xml`
///
/// The sequence is zero padded so that keys list in write order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentPath(ObjPath);

impl DocumentPath {
    pub fn new(prefix: &str, source: &str, sequence: u64) -> Self {
        Self(ObjPath::from(format!(
            "{prefix}/{source}/{sequence:020}.{DOCUMENT_FILE_EXTENSION}"
        )))
    }

    /// Directory holding every document of `source`
    pub fn dir(prefix: &str, source: &str) -> ObjPath {
        ObjPath::from(format!("{prefix}/{source}"))
    }

    /// Recover the sequence number from a key written by [`DocumentPath::new`]
    pub fn sequence(path: &ObjPath) -> Option<u64> {
        path.filename()?
            .strip_suffix(DOCUMENT_FILE_EXTENSION)?
            .strip_suffix('.')?
            .parse()
            .ok()
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Deref for DocumentPath {
    type Target = ObjPath;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<ObjPath> for DocumentPath {
    fn as_ref(&self) -> &ObjPath {
        &self.0
    }
}

impl From<DocumentPath> for ObjPath {
    fn from(value: DocumentPath) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn layout() {
        let path = DocumentPath::new("docs", "orders.xml", 42);
        assert_eq!(
            path.to_string(),
            "docs/orders.xml/00000000000000000042.xml"
        );
        assert_eq!(DocumentPath::sequence(&path), Some(42));
        assert!(path.prefix_matches(&DocumentPath::dir("docs", "orders.xml")));
    }

    #[test]
    fn empty_prefix() {
        let path = DocumentPath::new("", "stdin", 0);
        assert_eq!(path.to_string(), "stdin/00000000000000000000.xml");
    }

    #[test]
    fn keys_sort_by_sequence() {
        let mut paths = vec![
            DocumentPath::new("p", "s", 10),
            DocumentPath::new("p", "s", 9),
            DocumentPath::new("p", "s", 100),
        ];
        paths.sort();
        let sequences: Vec<_> = paths.iter().filter_map(|p| DocumentPath::sequence(p)).collect();
        assert_eq!(sequences, vec![9, 10, 100]);
    }

    #[test]
    fn foreign_keys_have_no_sequence() {
        assert_eq!(DocumentPath::sequence(&ObjPath::from("p/s/notes.txt")), None);
        assert_eq!(DocumentPath::sequence(&ObjPath::from("p/s/abc.xml")), None);
        assert_eq!(DocumentPath::sequence(&ObjPath::from("")), None);
    }
}
