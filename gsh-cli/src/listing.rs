//! Rendering of [`DirectoryEntry`]s and [`FileAttributes`] for the terminal.

use std::fmt::Write;

use globset::{Glob, GlobSet, GlobSetBuilder};
use gsh_types::{DirectoryEntry, FileAttributes};

/// Build a [`GlobSet`] that matches entry names we should skip.
pub fn ignore_set<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet, anyhow::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern.as_ref())?);
    }
    Ok(builder.build()?)
}

/// Drop ignored entries and sort the rest by name.
pub fn prepare(mut entries: Vec<DirectoryEntry>, ignore: &GlobSet) -> Vec<DirectoryEntry> {
    entries.retain(|entry| !ignore.is_match(&*entry.name().to_string_lossy()));
    entries.sort_by(|a, b| a.name().cmp(b.name()));
    entries
}

/// Single character describing the kind of entry, like `ls -l`.
fn kind_char(attributes: &FileAttributes) -> char {
    match attributes.details() {
        None => '?',
        Some(details) if details.symbolic_link => 'l',
        Some(details) if details.directory => 'd',
        Some(details) if details.regular => '-',
        Some(_) => 'o',
    }
}

fn permission_chars(attributes: &FileAttributes) -> String {
    let Some(details) = attributes.details() else {
        return "---".to_string();
    };
    let flag = |set: bool, c: char| if set { c } else { '-' };
    [
        flag(details.readable(), 'r'),
        flag(details.writable(), 'w'),
        flag(details.executable(), 'x'),
    ]
    .into_iter()
    .collect()
}

/// One line of a long listing: kind and permissions, size, modification stamp, and name.
pub fn long_line(entry: &DirectoryEntry) -> String {
    let attributes = entry.attributes();
    let mut line = String::new();
    line.push(kind_char(attributes));
    line.push_str(&permission_chars(attributes));

    match attributes.details() {
        Some(details) => {
            let size = details
                .size()
                .map(|size| size.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = write!(line, " {size:>12} {:>12}", details.stamp);
        }
        None if attributes.error() != 0 => {
            let _ = write!(line, " {:>25}", format!("error {}", attributes.error()));
        }
        None => {
            let _ = write!(line, " {:>25}", "missing");
        }
    }

    let _ = write!(line, " {}", entry.name());
    line
}

/// Human readable description of the attributes of `path`, one field per line.
pub fn describe(path: &str, attributes: &FileAttributes) -> String {
    let mut out = format!("path: {path}\n");
    match attributes {
        FileAttributes::Failed { error } => {
            let _ = writeln!(out, "error: {error}");
        }
        FileAttributes::Missing => out.push_str("exists: false\n"),
        FileAttributes::Present(details) => {
            out.push_str("exists: true\n");
            let _ = writeln!(out, "kind: {}", kind_char(attributes));
            let _ = writeln!(out, "permissions: {}", permission_chars(attributes));
            let _ = writeln!(out, "symbolic_link: {}", details.symbolic_link);
            let _ = writeln!(out, "stamp: {}", details.stamp);
            if let Some(size) = details.size() {
                let _ = writeln!(out, "size: {size}");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use gsh_types::{Details, EntryName, Permissions};

    use super::*;

    fn entry(name: &str, attributes: FileAttributes) -> DirectoryEntry {
        DirectoryEntry::new(EntryName::new(name).unwrap(), attributes)
    }

    fn file(length: i64) -> FileAttributes {
        FileAttributes::Present(Details {
            permissions: Permissions::READABLE | Permissions::WRITABLE,
            symbolic_link: false,
            regular: true,
            directory: false,
            stamp: 1_700_000_000,
            length,
        })
    }

    fn directory() -> FileAttributes {
        FileAttributes::Present(Details {
            permissions: Permissions::all(),
            symbolic_link: false,
            regular: false,
            directory: true,
            stamp: 0,
            length: 4096,
        })
    }

    #[test]
    fn prepare_filters_and_sorts() {
        let entries = vec![
            entry("zeta.rs", file(1)),
            entry("target", directory()),
            entry("alpha.rs", file(2)),
            entry("notes.tmp", file(3)),
        ];
        let ignore = ignore_set(&["target", "*.tmp"]).unwrap();
        let names: Vec<_> = prepare(entries, &ignore)
            .into_iter()
            .map(|entry| entry.name().to_string())
            .collect();
        assert_eq!(names, ["alpha.rs", "zeta.rs"]);
    }

    #[test]
    fn invalid_glob() {
        assert!(ignore_set(&["a{b"]).is_err());
    }

    #[test]
    fn long_lines() {
        let line = long_line(&entry("main.rs", file(42)));
        assert!(line.starts_with("-rw- "), "{line}");
        assert!(line.contains(" 42 "), "{line}");
        assert!(line.ends_with(" main.rs"), "{line}");

        // Directories don't report a size.
        let line = long_line(&entry("src", directory()));
        assert!(line.starts_with("drwx "), "{line}");
        assert!(line.contains(" - "), "{line}");

        let line = long_line(&entry("broken", FileAttributes::failed(13)));
        assert!(line.starts_with("?--- "), "{line}");
        assert!(line.contains("error 13"), "{line}");
    }

    #[test]
    fn describe_attributes() {
        let text = describe("/tmp/x", &file(7));
        assert!(text.contains("exists: true\n"));
        assert!(text.contains("size: 7\n"));
        assert!(text.contains("permissions: rw-\n"));

        let text = describe("/tmp/missing", &FileAttributes::Missing);
        assert_eq!(text, "path: /tmp/missing\nexists: false\n");

        let text = describe("/tmp/denied", &FileAttributes::failed(13));
        assert!(text.contains("error: 13\n"));
    }
}
