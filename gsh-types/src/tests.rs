use crate::abi::{self, RawDirEntry, RawFileAttributes};
use crate::*;

fn regular_file() -> FileAttributes {
    FileAttributes::Present(Details {
        permissions: Permissions::READABLE | Permissions::WRITABLE,
        symbolic_link: false,
        regular: true,
        directory: false,
        stamp: 1_700_000_000,
        length: 42,
    })
}

#[test]
fn pinned_constants() {
    assert_eq!(abi::READ_MODE, 0);
    assert_eq!(abi::WRITE_MODE, 1);
    assert_eq!(abi::APPEND_MODE, 2);

    assert_eq!(abi::P_INHERIT, 0);
    assert_eq!(abi::P_IDLE, 1);
    assert_eq!(abi::P_BELOW_NORMAL, 2);
    assert_eq!(abi::P_NORMAL, 3);
    assert_eq!(abi::P_ABOVE_NORMAL, 4);
    assert_eq!(abi::P_HIGH, 5);

    assert_eq!(abi::NAME_BUFFER_LEN, 512);
}

#[test]
fn raw_values_map_to_variants() {
    for (raw, mode) in [(0, OpenMode::Read), (1, OpenMode::Write), (2, OpenMode::Append)] {
        assert_eq!(OpenMode::try_from(raw), Ok(mode));
        assert_eq!(mode.as_raw(), raw);
    }
    assert!(OpenMode::try_from(3).is_err());
    assert!(OpenMode::try_from(-1).is_err());

    for (raw, class) in PriorityClass::ALL.into_iter().enumerate() {
        let raw = i32::try_from(raw).unwrap();
        assert_eq!(PriorityClass::try_from(raw), Ok(class));
    }
    assert!(PriorityClass::try_from(6).is_err());
}

#[test]
fn priority_classes_are_ordered() {
    let mut sorted = PriorityClass::ALL;
    sorted.sort();
    assert_eq!(sorted, PriorityClass::ALL);
    assert!(PriorityClass::Idle < PriorityClass::High);

    // Higher classes get lower nice values.
    let nice: Vec<i32> = PriorityClass::ALL
        .into_iter()
        .filter_map(PriorityClass::nice_value)
        .collect();
    assert!(nice.windows(2).all(|pair| pair[0] > pair[1]));
}

#[test]
fn parse_names() {
    assert_eq!("append".parse::<OpenMode>(), Ok(OpenMode::Append));
    assert_eq!("READ".parse::<OpenMode>(), Ok(OpenMode::Read));
    assert_eq!(
        "below-normal".parse::<PriorityClass>(),
        Ok(PriorityClass::BelowNormal)
    );
    assert_eq!("high".parse::<PriorityClass>(), Ok(PriorityClass::High));

    let err = "urgent".parse::<PriorityClass>().unwrap_err();
    assert_eq!(err.to_string(), "unknown priority class: urgent");
}

#[test]
fn failed_attributes_hide_details() {
    let attributes = FileAttributes::failed(13);
    assert_eq!(attributes.error(), 13);
    assert!(!attributes.exists());
    assert!(attributes.details().is_none());
    assert!(!attributes.is_regular());

    // Zero isn't a failure code.
    assert_eq!(FileAttributes::failed(0).error(), -1);
}

#[test]
fn missing_attributes_hide_details() {
    let attributes = FileAttributes::Missing;
    assert_eq!(attributes.error(), 0);
    assert!(!attributes.exists());
    assert!(attributes.details().is_none());
    assert!(!attributes.is_directory());
}

#[test]
fn from_result_records_error_code() {
    let ok: Result<_, std::io::Error> = Ok(regular_file());
    assert_eq!(FileAttributes::from_result(ok, |_| 1), regular_file());

    let err: Result<FileAttributes, i32> = Err(2);
    let attributes = FileAttributes::from_result(err, |code| *code);
    assert_eq!(attributes.error(), 2);
}

#[test]
fn size_only_for_regular_files() {
    let details = *regular_file().details().unwrap();
    assert_eq!(details.size(), Some(42));
    assert!(details.readable());
    assert!(details.writable());
    assert!(!details.executable());

    let directory = Details {
        regular: false,
        directory: true,
        ..details
    };
    assert_eq!(directory.size(), None);
    assert_eq!(
        directory.modified(),
        std::time::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000)
    );
}

#[test]
fn entry_name_boundary() {
    let longest = "a".repeat(MAX_NAME_LEN);
    let name = EntryName::new(&longest).unwrap();
    assert_eq!(name.len(), 511);
    assert_eq!(name.to_str(), Some(longest.as_str()));

    let too_long = "a".repeat(MAX_NAME_LEN + 1);
    assert_eq!(
        EntryName::new(&too_long),
        Err(NameError::TooLong { len: 512 })
    );
    // Multi-byte characters count in bytes.
    let wide = "é".repeat(256);
    assert_eq!(EntryName::new(&wide), Err(NameError::TooLong { len: 512 }));
}

#[test]
fn entry_name_validation() {
    assert_eq!(EntryName::new(""), Err(NameError::Empty));
    assert_eq!(EntryName::new("a/b"), Err(NameError::Separator));
    assert_eq!(EntryName::new("a\0b"), Err(NameError::Nul));
    assert_eq!(EntryName::from_bytes(b"a/\xff"), Err(NameError::Separator));
    assert_eq!(EntryName::from_bytes(b"\xff\0"), Err(NameError::Nul));
    assert_eq!(EntryName::new(".hidden").unwrap().to_string(), ".hidden");
}

#[test]
fn entry_name_keeps_raw_bytes() {
    // Latin-1 "café".
    let name = EntryName::from_bytes(b"caf\xe9").unwrap();
    assert_eq!(name.as_bytes(), b"caf\xe9");
    assert_eq!(name.len(), 4);
    assert_eq!(name.to_str(), None);
    assert_eq!(name.to_string(), "caf\u{fffd}");
    assert_eq!(format!("{name:?}"), r#"b"caf\xe9""#);

    // Valid UTF-8 from bytes is the same name as from text.
    let text = EntryName::from_bytes("café".as_bytes()).unwrap();
    assert_eq!(text, EntryName::new("café").unwrap());
    assert_eq!(text.to_str(), Some("café"));

    // Ordered by bytes, UTF-8 "é" starts with 0xc3.
    let mut names = vec![name.clone(), EntryName::new("zed").unwrap(), text.clone()];
    names.sort();
    assert_eq!(names, [text, name, EntryName::new("zed").unwrap()]);

    let longest = vec![0xffu8; MAX_NAME_LEN];
    assert!(EntryName::from_bytes(&longest).is_ok());
    assert_eq!(
        EntryName::from_bytes(&[0xff; MAX_NAME_LEN + 1]),
        Err(NameError::TooLong { len: 512 })
    );
}

#[test]
fn raw_dir_entry_with_raw_name() {
    let entry = DirectoryEntry::new(EntryName::from_bytes(b"caf\xe9").unwrap(), regular_file());

    let raw = RawDirEntry::from(&entry);
    assert_eq!(raw.name_bytes(), b"caf\xe9");
    assert_eq!(DirectoryEntry::try_from(&raw).unwrap(), entry);

    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["name"], "caf\u{fffd}");
}

#[test]
fn raw_attributes_zero_unspecified_fields() {
    let raw = RawFileAttributes::from(&FileAttributes::failed(2));
    assert_eq!(
        raw,
        RawFileAttributes {
            error: 2,
            ..Default::default()
        }
    );

    let raw = RawFileAttributes::from(&FileAttributes::Missing);
    assert_eq!(raw, RawFileAttributes::default());

    let raw = RawFileAttributes::from(&regular_file());
    assert_eq!(raw.exists, 1);
    assert_eq!(raw.readable, 1);
    assert_eq!(raw.writable, 1);
    assert_eq!(raw.executable, 0);
    assert_eq!(raw.regular, 1);
    assert_eq!(raw.length, 42);
    assert_eq!(FileAttributes::from(raw), regular_file());
}

#[test]
fn raw_attributes_error_wins() {
    // Garbage in the other fields is ignored when `error` is set.
    let raw = RawFileAttributes {
        error: 5,
        exists: 1,
        regular: 1,
        length: 99,
        ..Default::default()
    };
    assert_eq!(FileAttributes::from(raw), FileAttributes::failed(5));
}

#[test]
fn raw_dir_entry_name_at_capacity() {
    let longest = "z".repeat(MAX_NAME_LEN);
    let entry = DirectoryEntry::new(EntryName::new(&longest).unwrap(), regular_file());

    let raw = RawDirEntry::from(&entry);
    assert_eq!(raw.name[MAX_NAME_LEN], 0);
    assert_eq!(raw.name_bytes().len(), MAX_NAME_LEN);
    assert_eq!(DirectoryEntry::try_from(&raw).unwrap(), entry);
}

#[test]
fn raw_dir_entry_without_terminator_is_rejected() {
    let raw = RawDirEntry {
        name: [b'x'; abi::NAME_BUFFER_LEN],
        ..Default::default()
    };
    assert_eq!(
        DirectoryEntry::try_from(&raw),
        Err(NameError::TooLong { len: 512 })
    );
}

#[test]
fn serialize_attributes() {
    let json = serde_json::to_value(FileAttributes::Missing).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "missing" }));

    let json = serde_json::to_value(FileAttributes::failed(13)).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "failed", "error": 13 }));

    let entry = DirectoryEntry::new(EntryName::new("notes.txt").unwrap(), regular_file());
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["name"], "notes.txt");
    assert_eq!(json["attributes"]["status"], "present");
    assert_eq!(json["attributes"]["length"], 42);
}
