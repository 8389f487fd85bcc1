//! The txtar archive format.
//!
//! An archive is a comment followed by a sequence of files, each introduced by a marker
//! line `-- name --`:
//!
//! ```text
//! # DO NOT EDIT; generated by goldgen
//! #
//! #name: basic
//! -- in.cue --
//! a: 1
//! -- out/def --
//! a: 1
//! ```
//!
//! Formatting appends a newline to the comment and to each file's data when they are
//! non-empty and lack one, which makes [`Archive::parse`] the inverse of
//! [`Archive::format`] for archives whose parts already end in newlines.

use crate::{err_msg, GoldenError};

pub mod writer;

pub use writer::{
    archive_file_name, ArchiveChecker, ArchiveSink, ArchiveWriter, PersistOutcome,
};

const MARKER: &[u8] = b"-- ";
const MARKER_END: &[u8] = b" --";
const NEWLINE_MARKER: &[u8] = b"\n-- ";

/// One named file of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub name: String,
    pub data: Vec<u8>,
}

/// A header comment and an ordered list of files with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    pub comment: Vec<u8>,
    pub files: Vec<ArchiveFile>,
}

impl Archive {
    pub fn new(comment: impl Into<Vec<u8>>) -> Self {
        Self {
            comment: comment.into(),
            files: Vec::new(),
        }
    }

    /// Appends a file. Names must be unique within the archive.
    pub fn push_file(
        &mut self,
        name: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Result<(), GoldenError> {
        let name = name.into();
        if self.file(&name).is_some() {
            return Err(err_msg!(Internal, "Duplicate archive entry '{}'", name));
        }
        self.files.push(ArchiveFile {
            name,
            data: data.into(),
        });
        Ok(())
    }

    pub fn file(&self, name: &str) -> Option<&ArchiveFile> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    /// Serializes the archive.
    pub fn format(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&fix_newline(&self.comment));
        for file in &self.files {
            out.extend_from_slice(MARKER);
            out.extend_from_slice(file.name.as_bytes());
            out.extend_from_slice(MARKER_END);
            out.push(b'\n');
            out.extend_from_slice(&fix_newline(&file.data));
        }
        out
    }

    /// Parses serialized archive data. Never fails: text before the first marker is the
    /// comment, and a line only counts as a marker if it has a non-empty name.
    pub fn parse(data: &[u8]) -> Self {
        let (comment, mut name, mut rest) = find_file_marker(data);
        let mut archive = Archive::new(comment);
        while let Some(current) = name {
            let (data, next, after) = find_file_marker(rest);
            archive.files.push(ArchiveFile {
                name: current,
                data,
            });
            name = next;
            rest = after;
        }
        archive
    }
}

fn fix_newline(data: &[u8]) -> Vec<u8> {
    let mut data = data.to_vec();
    if data.last().is_some_and(|&b| b != b'\n') {
        data.push(b'\n');
    }
    data
}

/// Splits `data` at the first marker line: the bytes before it, the marker's name, and
/// the bytes after the marker line.
fn find_file_marker(data: &[u8]) -> (Vec<u8>, Option<String>, &[u8]) {
    let mut i = 0;
    loop {
        if let Some((name, after)) = marker_at(&data[i..]) {
            return (data[..i].to_vec(), Some(name), after);
        }
        match find(&data[i..], NEWLINE_MARKER) {
            Some(j) => i += j + 1,
            None => return (fix_newline(data), None, &[]),
        }
    }
}

fn marker_at(data: &[u8]) -> Option<(String, &[u8])> {
    if !data.starts_with(MARKER) {
        return None;
    }
    let (line, after) = match data.iter().position(|&b| b == b'\n') {
        Some(i) => (&data[..i], &data[i + 1..]),
        None => (data, &data[data.len()..]),
    };
    if !line.ends_with(MARKER_END) || line.len() < MARKER.len() + MARKER_END.len() {
        return None;
    }
    let name = String::from_utf8_lossy(&line[MARKER.len()..line.len() - MARKER_END.len()])
        .trim()
        .to_string();
    if name.is_empty() {
        return None;
    }
    Some((name, after))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_adds_missing_newlines() {
        let mut a = Archive::new("# header");
        a.push_file("in.cue", "a: 1").unwrap();
        a.push_file("out/legacy-debug", "3").unwrap();
        a.push_file("out/empty", "").unwrap();
        assert_eq!(
            String::from_utf8(a.format()).unwrap(),
            "# header\n-- in.cue --\na: 1\n-- out/legacy-debug --\n3\n-- out/empty --\n"
        );
    }

    #[test]
    fn parse_reads_comment_and_files() {
        let text = "# c\n#\n-- in.cue --\na: 1\n-- out/def --\na: 1\nb: 2\n";
        let a = Archive::parse(text.as_bytes());
        assert_eq!(a.comment, b"# c\n#\n");
        assert_eq!(a.file_names(), vec!["in.cue", "out/def"]);
        assert_eq!(a.file("out/def").unwrap().data, b"a: 1\nb: 2\n");
        assert_eq!(a.format(), text.as_bytes());
    }

    #[test]
    fn parse_ignores_lines_that_only_look_like_markers() {
        let text = "-- --\n--x --\n-- a --\n-- not end\n";
        let a = Archive::parse(text.as_bytes());
        assert_eq!(a.comment, b"-- --\n--x --\n");
        assert_eq!(a.file_names(), vec!["a"]);
        assert_eq!(a.file("a").unwrap().data, b"-- not end\n");
    }

    #[test]
    fn parse_without_markers_is_all_comment() {
        let a = Archive::parse(b"just text");
        assert_eq!(a.comment, b"just text\n");
        assert!(a.files.is_empty());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut a = Archive::default();
        a.push_file("in.cue", "x").unwrap();
        let err = a.push_file("in.cue", "y").unwrap_err();
        assert_eq!(err.error_type(), crate::ErrorType::Internal);
    }
}
