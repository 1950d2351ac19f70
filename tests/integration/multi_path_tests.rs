use std::fs;
use std::path::PathBuf;

use tempfile::tempdir;
use treedupe::duplicates::find_duplicates;
use treedupe::output::group_names;
use treedupe::scanner::{open_candidates, ScanError, WalkerConfig};

#[test]
fn test_duplicates_across_directories() {
    let left = tempdir().unwrap();
    let right = tempdir().unwrap();
    fs::create_dir(left.path().join("nested")).unwrap();
    fs::write(left.path().join("nested/photo.jpg"), b"jpeg bytes").unwrap();
    fs::write(left.path().join("notes.txt"), b"notes").unwrap();
    fs::write(right.path().join("copy.jpg"), b"jpeg bytes").unwrap();

    let config = WalkerConfig {
        recursive: true,
        ..WalkerConfig::default()
    };
    let roots = vec![left.path().to_path_buf(), right.path().to_path_buf()];
    let mut opened = open_candidates(&roots, &config, None).unwrap();
    let names = opened.paths();

    let groups = find_duplicates(&mut opened.candidates).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(
        group_names(&groups[0], &names),
        vec![
            left.path().join("nested/photo.jpg").as_path(),
            right.path().join("copy.jpg").as_path()
        ]
    );
}

#[test]
fn test_repeated_root_is_not_its_own_duplicate() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("only.bin"), b"lonely").unwrap();

    let config = WalkerConfig {
        recursive: true,
        ..WalkerConfig::default()
    };
    let roots = vec![dir.path().to_path_buf(), dir.path().to_path_buf()];
    let mut opened = open_candidates(&roots, &config, None).unwrap();
    assert_eq!(opened.candidates.len(), 1);

    let groups = find_duplicates(&mut opened.candidates).unwrap();
    assert!(groups.is_empty());
}

#[test]
fn test_hidden_entries_can_be_skipped() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    fs::write(dir.path().join(".git/blob"), b"payload").unwrap();
    fs::write(dir.path().join("visible"), b"payload").unwrap();

    let all = WalkerConfig {
        recursive: true,
        skip_hidden: false,
    };
    let mut opened = open_candidates(&[dir.path().to_path_buf()], &all, None).unwrap();
    assert_eq!(find_duplicates(&mut opened.candidates).unwrap().len(), 1);

    let visible_only = WalkerConfig {
        recursive: true,
        skip_hidden: true,
    };
    let mut opened = open_candidates(&[dir.path().to_path_buf()], &visible_only, None).unwrap();
    assert_eq!(opened.candidates.len(), 1);
    assert!(find_duplicates(&mut opened.candidates).unwrap().is_empty());
}

#[test]
fn test_missing_paths_are_reported_not_fatal() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"same").unwrap();
    fs::write(&b, b"same").unwrap();

    let paths = vec![a, PathBuf::from("/definitely/not/here"), b];
    let mut opened = open_candidates(&paths, &WalkerConfig::default(), None).unwrap();

    assert_eq!(opened.skipped.len(), 1);
    assert!(matches!(opened.skipped[0], ScanError::NotFound(_)));
    let groups = find_duplicates(&mut opened.candidates).unwrap();
    assert_eq!(groups[0].members, vec![0, 1]);
}
