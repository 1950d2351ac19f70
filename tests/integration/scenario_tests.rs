use std::fs;
use std::path::PathBuf;

use tempfile::{tempdir, TempDir};
use treedupe::duplicates::{DuplicateFinder, FinderConfig};
use treedupe::scanner::{open_candidates, WalkerConfig};
use treedupe::source::ChunkPolicy;

fn write_files(dir: &TempDir, files: &[(&str, Vec<u8>)]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|(name, content)| {
            let path = dir.path().join(name);
            fs::write(&path, content).unwrap();
            path
        })
        .collect()
}

fn finder(chunk: usize) -> DuplicateFinder {
    DuplicateFinder::new(
        FinderConfig::default().with_chunk_policy(ChunkPolicy::fixed(chunk).unwrap()),
    )
}

#[test]
fn test_scenario_a_three_groups_of_five() {
    let dir = tempdir().unwrap();
    let mut files = Vec::new();
    for (tag, len) in [('x', 100usize), ('y', 300), ('z', 700)] {
        let content: Vec<u8> = (0..len).map(|i| (i % 251) as u8 ^ tag as u8).collect();
        for copy in 0..5 {
            files.push((format!("{tag}{copy}.bin"), content.clone()));
        }
    }
    let files: Vec<(&str, Vec<u8>)> = files
        .iter()
        .map(|(name, content)| (name.as_str(), content.clone()))
        .collect();
    let paths = write_files(&dir, &files);

    let mut opened = open_candidates(&paths, &WalkerConfig::default(), None).unwrap();
    let (groups, summary) = finder(256).classify(&mut opened.candidates).unwrap();

    assert_eq!(groups.len(), 3);
    assert!(groups.iter().all(|g| g.len() == 5));
    assert_eq!(groups[0].members, vec![0, 1, 2, 3, 4]);
    assert_eq!(groups[1].members, vec![5, 6, 7, 8, 9]);
    assert_eq!(groups[2].members, vec![10, 11, 12, 13, 14]);
    assert_eq!(summary.duplicate_files, 12);
    assert_eq!(summary.reclaimable_space, 4 * (100 + 300 + 700));
}

#[test]
fn test_scenario_b_single_file() {
    let dir = tempdir().unwrap();
    let paths = write_files(&dir, &[("alone.bin", vec![7u8; 512])]);

    let mut opened = open_candidates(&paths, &WalkerConfig::default(), None).unwrap();
    let (groups, summary) = finder(256).classify(&mut opened.candidates).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.eliminated_by_size, 1);
    assert_eq!(summary.content_reads, 0);
}

#[test]
fn test_scenario_c_first_byte_differs() {
    let dir = tempdir().unwrap();
    let mut a = vec![0u8; 4096];
    let b = a.clone();
    a[0] = 1;
    let paths = write_files(&dir, &[("a.bin", a), ("b.bin", b)]);

    let mut opened = open_candidates(&paths, &WalkerConfig::default(), None).unwrap();
    let (groups, summary) = finder(256).classify(&mut opened.candidates).unwrap();

    assert!(groups.is_empty());
    // One chunk each, then both settle in distinct children.
    assert_eq!(summary.content_reads, 2);
    assert_eq!(summary.bytes_read, 512);
}

#[test]
fn test_scenario_d_divergence_at_byte_1001() {
    let dir = tempdir().unwrap();
    let a = vec![b'a'; 1100];
    let mut b = a.clone();
    b[1000] = b'b';
    let paths = write_files(&dir, &[("a.bin", a), ("b.bin", b)]);

    let mut opened = open_candidates(&paths, &WalkerConfig::default(), None).unwrap();
    let (groups, summary) = finder(256).classify(&mut opened.candidates).unwrap();

    assert!(groups.is_empty());
    // Four levels (bytes 0..1024) are read by both files; byte 1001 lies in the fourth.
    assert_eq!(summary.content_reads, 8);
    assert_eq!(summary.bytes_read, 8 * 256);
}

#[test]
fn test_scenario_e_pair_plus_late_difference() {
    let dir = tempdir().unwrap();
    let same: Vec<u8> = (0..2000u32).map(|i| (i * 7 % 256) as u8).collect();
    let mut other = same.clone();
    other[1999] ^= 0xff;
    let paths = write_files(
        &dir,
        &[
            ("one.bin", same.clone()),
            ("other.bin", other),
            ("two.bin", same),
        ],
    );

    let mut opened = open_candidates(&paths, &WalkerConfig::default(), None).unwrap();
    let (groups, summary) = finder(256).classify(&mut opened.candidates).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].members, vec![0, 2]);
    assert_eq!(groups[0].size, 2000);
    assert_eq!(summary.duplicate_groups, 1);
}

#[test]
fn test_empty_files_are_duplicates_of_each_other() {
    let dir = tempdir().unwrap();
    let paths = write_files(
        &dir,
        &[("e1", Vec::new()), ("full", b"x".to_vec()), ("e2", Vec::new())],
    );

    let mut opened = open_candidates(&paths, &WalkerConfig::default(), None).unwrap();
    let (groups, _) = finder(256).classify(&mut opened.candidates).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].size, 0);
    assert_eq!(groups[0].members, vec![0, 2]);
}

#[test]
fn test_accelerating_policy_matches_fixed() {
    let dir = tempdir().unwrap();
    let base: Vec<u8> = (0..50_000u32).map(|i| (i % 253) as u8).collect();
    let mut late = base.clone();
    late[49_000] ^= 1;
    let paths = write_files(
        &dir,
        &[
            ("a", base.clone()),
            ("b", late),
            ("c", base.clone()),
            ("d", base),
        ],
    );

    let mut opened = open_candidates(&paths, &WalkerConfig::default(), None).unwrap();
    let (fixed_groups, fixed_summary) = finder(256).classify(&mut opened.candidates).unwrap();

    let mut opened = open_candidates(&paths, &WalkerConfig::default(), None).unwrap();
    let accelerating = DuplicateFinder::new(FinderConfig::default().with_chunk_policy(
        ChunkPolicy::accelerating(256, 2, 64 * 1024).unwrap(),
    ));
    let (acc_groups, acc_summary) = accelerating.classify(&mut opened.candidates).unwrap();

    assert_eq!(fixed_groups, acc_groups);
    assert_eq!(acc_groups[0].members, vec![0, 2, 3]);
    assert!(acc_summary.content_reads < fixed_summary.content_reads);
}

#[test]
fn test_single_thread_matches_parallel() {
    let dir = tempdir().unwrap();
    let mut files = Vec::new();
    for i in 0..40u8 {
        let len = 64 + usize::from(i % 5) * 10;
        files.push((format!("f{i}"), vec![i % 3; len]));
    }
    let files: Vec<(&str, Vec<u8>)> = files
        .iter()
        .map(|(name, content)| (name.as_str(), content.clone()))
        .collect();
    let paths = write_files(&dir, &files);

    let mut opened = open_candidates(&paths, &WalkerConfig::default(), None).unwrap();
    let sequential = DuplicateFinder::new(FinderConfig::default().with_io_threads(1));
    let (seq_groups, _) = sequential.classify(&mut opened.candidates).unwrap();

    let mut opened = open_candidates(&paths, &WalkerConfig::default(), None).unwrap();
    let parallel = DuplicateFinder::new(FinderConfig::default().with_io_threads(8));
    let (par_groups, _) = parallel.classify(&mut opened.candidates).unwrap();

    assert_eq!(seq_groups, par_groups);
    let grouped: usize = seq_groups.iter().map(|g| g.len()).sum();
    assert_eq!(grouped, 40);
}
