//! Lazily grown discrimination tree for one size bucket.
//!
//! # Overview
//!
//! Every node stands for "the candidates whose content so far matched this
//! node's path of chunks". Each node is in one of three states:
//!
//! - [`Node::Empty`]: nobody has arrived yet
//! - [`Node::Deferred`]: exactly one candidate arrived and its next chunk has
//!   not been read
//! - [`Node::Branch`]: candidates were split by the exact bytes of their
//!   next chunk; those that hit end-of-input here are kept as terminals
//!
//! A candidate's next chunk is read only once a second candidate reaches the
//! same node, so a candidate that is never challenged costs no I/O and the
//! total read volume follows the depth at which contents diverge, not the
//! file size.
//!
//! Two candidates end up in the same terminal list if and only if they read
//! the same chunk sequence and hit end-of-input at the same depth.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use treedupe::duplicates::{Candidate, DiscriminationTree};
//! use treedupe::source::ChunkPolicy;
//!
//! let mut a = Cursor::new(b"same bytes".to_vec());
//! let mut b = Cursor::new(b"same bytes".to_vec());
//! let mut c = Cursor::new(b"diff bytes".to_vec());
//!
//! let mut tree = DiscriminationTree::new(10, ChunkPolicy::fixed(4).unwrap());
//! tree.insert(Candidate::new(0, 10, &mut a)).unwrap();
//! tree.insert(Candidate::new(1, 10, &mut b)).unwrap();
//! tree.insert(Candidate::new(2, 10, &mut c)).unwrap();
//!
//! let groups = tree.into_groups();
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].members, vec![0, 1]);
//! ```

use std::collections::HashMap;

use super::collector::collect_groups;
use super::{Candidate, DuplicateGroup, FinderError};
use crate::source::{read_chunk, ChunkPolicy, ChunkSource};

/// One node of a discrimination tree.
#[derive(Debug)]
pub enum Node<'a, S: ?Sized> {
    /// No candidate has reached this node.
    Empty,
    /// A single candidate reached this node; its next chunk is unread.
    Deferred(Candidate<'a, S>),
    /// Two or more candidates reached this node and were pushed further.
    Branch(Branch<'a, S>),
}

impl<S: ?Sized> Default for Node<'_, S> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<'a, S: ?Sized> Node<'a, S> {
    /// Check if the node is still waiting for a second candidate.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    /// The branch payload, if the node has been split.
    #[must_use]
    pub fn as_branch(&self) -> Option<&Branch<'a, S>> {
        match self {
            Self::Branch(branch) => Some(branch),
            _ => None,
        }
    }
}

/// A split node: children keyed by the exact bytes of the next chunk, plus
/// the candidates that hit end-of-input at this node.
#[derive(Debug)]
pub struct Branch<'a, S: ?Sized> {
    children: HashMap<Box<[u8]>, Node<'a, S>>,
    terminals: Vec<Candidate<'a, S>>,
}

impl<S: ?Sized> Default for Branch<'_, S> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            terminals: Vec::new(),
        }
    }
}

impl<'a, S: ?Sized> Branch<'a, S> {
    /// Child nodes keyed by chunk content.
    #[must_use]
    pub fn children(&self) -> &HashMap<Box<[u8]>, Node<'a, S>> {
        &self.children
    }

    /// Candidates whose content ended exactly at this node.
    #[must_use]
    pub fn terminals(&self) -> &[Candidate<'a, S>] {
        &self.terminals
    }
}

/// I/O counters for one tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of chunk reads issued (including end-of-input probes)
    pub reads: u64,
    /// Total content bytes read
    pub bytes_read: u64,
    /// Number of nodes that were split into branches
    pub branch_nodes: usize,
    /// Deepest chunk level any candidate advanced to
    pub max_depth: usize,
}

/// Discrimination tree for the candidates of one declared length.
#[derive(Debug)]
pub struct DiscriminationTree<'a, S: ?Sized> {
    size: u64,
    policy: ChunkPolicy,
    root: Node<'a, S>,
    stats: TreeStats,
}

impl<'a, S: ChunkSource + ?Sized> DiscriminationTree<'a, S> {
    /// Create an empty tree for candidates of `size` bytes.
    #[must_use]
    pub fn new(size: u64, policy: ChunkPolicy) -> Self {
        Self {
            size,
            policy,
            root: Node::Empty,
            stats: TreeStats::default(),
        }
    }

    /// Declared length shared by every candidate of this tree.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Root node, for inspection.
    #[must_use]
    pub fn root(&self) -> &Node<'a, S> {
        &self.root
    }

    /// I/O counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> TreeStats {
        self.stats
    }

    /// Insert a candidate, reading only as much content as is needed to
    /// separate it from candidates already in the tree.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Read`] if a chunk read fails. The tree must be
    /// discarded after an error; the failing candidate is not in it.
    pub fn insert(&mut self, candidate: Candidate<'a, S>) -> Result<(), FinderError> {
        debug_assert_eq!(
            candidate.len, self.size,
            "Candidate length {} doesn't match tree size {}",
            candidate.len, self.size
        );
        settle(&mut self.root, 0, candidate, &self.policy, &mut self.stats)
    }

    /// Consume the tree and return every terminal list with 2+ members.
    #[must_use]
    pub fn into_groups(self) -> Vec<DuplicateGroup> {
        collect_groups(&self.root, self.size)
    }
}

impl<S: ?Sized> Drop for DiscriminationTree<'_, S> {
    // Nodes nest as deep as the longest shared prefix; unlink them one at a
    // time so dropping a deep tree does not recurse.
    fn drop(&mut self) {
        let mut pending = vec![std::mem::take(&mut self.root)];
        while let Some(node) = pending.pop() {
            if let Node::Branch(mut branch) = node {
                pending.extend(branch.children.drain().map(|(_, child)| child));
            }
        }
    }
}

/// Walk `candidate` down from `node` (at chunk `depth`) until it either
/// parks in an empty node or ends at a branch.
fn settle<'a, S: ChunkSource + ?Sized>(
    mut node: &mut Node<'a, S>,
    mut depth: usize,
    candidate: Candidate<'a, S>,
    policy: &ChunkPolicy,
    stats: &mut TreeStats,
) -> Result<(), FinderError> {
    loop {
        match node {
            Node::Empty => {
                log::trace!(
                    "Deferring candidate #{} at depth {}",
                    candidate.index,
                    depth
                );
                *node = Node::Deferred(candidate);
                return Ok(());
            }
            Node::Deferred(_) => {
                let resident = match std::mem::replace(node, Node::Branch(Branch::default())) {
                    Node::Deferred(resident) => resident,
                    _ => unreachable!("node was matched as deferred"),
                };
                stats.branch_nodes += 1;
                log::trace!(
                    "Splitting node at depth {}: #{} meets #{}",
                    depth,
                    resident.index,
                    candidate.index
                );
                // The branch is fresh, so the resident lands in an empty
                // child or among the terminals without recursing further.
                settle(&mut *node, depth, resident, policy, stats)?;
            }
            Node::Branch(branch) => {
                let len = policy.chunk_len(depth);
                let chunk = read_chunk(&mut *candidate.source, len).map_err(|source| {
                    FinderError::Read {
                        index: candidate.index,
                        depth,
                        source,
                    }
                })?;
                stats.reads += 1;

                match chunk {
                    None => {
                        log::trace!(
                            "Candidate #{} ended at depth {}",
                            candidate.index,
                            depth
                        );
                        branch.terminals.push(candidate);
                        return Ok(());
                    }
                    Some(key) => {
                        stats.bytes_read += key.len() as u64;
                        depth += 1;
                        stats.max_depth = stats.max_depth.max(depth);
                        node = branch.children.entry(key).or_default();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read};

    /// Cursor that counts read calls.
    struct Counted {
        inner: Cursor<Vec<u8>>,
        reads: usize,
    }

    impl Counted {
        fn new(data: &[u8]) -> Self {
            Self {
                inner: Cursor::new(data.to_vec()),
                reads: 0,
            }
        }
    }

    impl Read for Counted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            self.inner.read(buf)
        }
    }

    impl ChunkSource for Counted {
        fn declared_len(&mut self) -> io::Result<u64> {
            self.inner.declared_len()
        }
    }

    /// Fails on the first read after `ok_reads` successful ones.
    struct FailAfter {
        inner: Cursor<Vec<u8>>,
        ok_reads: usize,
    }

    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.ok_reads == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "disk on fire"));
            }
            self.ok_reads -= 1;
            self.inner.read(buf)
        }
    }

    impl ChunkSource for FailAfter {
        fn declared_len(&mut self) -> io::Result<u64> {
            self.inner.declared_len()
        }
    }

    /// Returns a single byte per read call.
    struct OneByte(Cursor<Vec<u8>>);

    impl Read for OneByte {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(1);
            self.0.read(&mut buf[..n])
        }
    }

    impl ChunkSource for OneByte {
        fn declared_len(&mut self) -> io::Result<u64> {
            self.0.declared_len()
        }
    }

    fn fixed(size: usize) -> ChunkPolicy {
        ChunkPolicy::fixed(size).unwrap()
    }

    #[test]
    fn test_single_candidate_is_deferred_without_reads() {
        let mut a = Counted::new(b"lonely");
        {
            let mut tree = DiscriminationTree::new(6, fixed(4));
            tree.insert(Candidate::new(0, 6, &mut a)).unwrap();

            assert!(tree.root().is_deferred());
            assert_eq!(tree.stats(), TreeStats::default());
            assert!(tree.into_groups().is_empty());
        }
        assert_eq!(a.reads, 0);
    }

    #[test]
    fn test_identical_pair_forms_group() {
        let mut a = Cursor::new(b"0123456789".to_vec());
        let mut b = Cursor::new(b"0123456789".to_vec());

        let mut tree = DiscriminationTree::new(10, fixed(4));
        tree.insert(Candidate::new(0, 10, &mut a)).unwrap();
        tree.insert(Candidate::new(1, 10, &mut b)).unwrap();

        let stats = tree.stats();
        // 3 data chunks (4 + 4 + 2) per candidate, then one end probe each
        assert_eq!(stats.bytes_read, 20);
        assert_eq!(stats.reads, 8);
        assert_eq!(stats.max_depth, 3);
        assert_eq!(stats.branch_nodes, 4);

        let groups = tree.into_groups();
        assert_eq!(groups, vec![DuplicateGroup::new(10, vec![0, 1])]);
    }

    #[test]
    fn test_first_byte_difference_reads_one_chunk_each() {
        let mut a = Counted::new(&[b'a'; 1000]);
        let mut b = Counted::new(&[b'b'; 1000]);
        {
            let mut tree = DiscriminationTree::new(1000, fixed(256));
            tree.insert(Candidate::new(0, 1000, &mut a)).unwrap();
            tree.insert(Candidate::new(1, 1000, &mut b)).unwrap();

            let root = tree.root().as_branch().unwrap();
            assert_eq!(root.children().len(), 2);
            assert!(root.children().values().all(Node::is_deferred));
            assert!(tree.into_groups().is_empty());
        }
        assert_eq!(a.reads, 1);
        assert_eq!(b.reads, 1);
    }

    #[test]
    fn test_divergence_at_byte_1001_splits_at_fourth_level() {
        let mut left = vec![7u8; 1200];
        let mut right = left.clone();
        left[1000] = 1;
        right[1000] = 2;

        let mut a = Cursor::new(left);
        let mut b = Cursor::new(right);

        let mut tree = DiscriminationTree::new(1200, fixed(256));
        tree.insert(Candidate::new(0, 1200, &mut a)).unwrap();
        tree.insert(Candidate::new(1, 1200, &mut b)).unwrap();

        // Byte 1001 (offset 1000) sits in the 4th chunk (offsets 768..1024)
        let mut node = tree.root();
        for _ in 0..3 {
            let branch = node.as_branch().unwrap();
            assert_eq!(branch.children().len(), 1);
            node = branch.children().values().next().unwrap();
        }
        let fourth = node.as_branch().unwrap();
        assert_eq!(fourth.children().len(), 2);
        assert!(fourth.terminals().is_empty());
        assert!(tree.into_groups().is_empty());
    }

    #[test]
    fn test_third_candidate_diverging_late_is_excluded() {
        let mut a = Cursor::new(b"abcdefgh".to_vec());
        let mut b = Cursor::new(b"abcdefgh".to_vec());
        let mut c = Cursor::new(b"abcdefgX".to_vec());

        let mut tree = DiscriminationTree::new(8, fixed(2));
        tree.insert(Candidate::new(0, 8, &mut c)).unwrap();
        tree.insert(Candidate::new(1, 8, &mut a)).unwrap();
        tree.insert(Candidate::new(2, 8, &mut b)).unwrap();

        let groups = tree.into_groups();
        assert_eq!(groups, vec![DuplicateGroup::new(8, vec![1, 2])]);
    }

    #[test]
    fn test_empty_candidates_are_duplicates() {
        let mut a = Cursor::new(Vec::new());
        let mut b = Cursor::new(Vec::new());

        let mut tree = DiscriminationTree::new(0, fixed(256));
        tree.insert(Candidate::new(0, 0, &mut a)).unwrap();
        tree.insert(Candidate::new(1, 0, &mut b)).unwrap();

        assert_eq!(tree.stats().bytes_read, 0);
        let root = tree.root().as_branch().unwrap();
        assert_eq!(root.terminals().len(), 2);
        assert_eq!(tree.into_groups().len(), 1);
    }

    #[test]
    fn test_accelerating_policy_converges_identical_content() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let mut a = Cursor::new(data.clone());
        let mut b = Cursor::new(data.clone());
        let mut c = Cursor::new(data);

        let policy = ChunkPolicy::accelerating(16, 2, 1024).unwrap();
        let mut tree = DiscriminationTree::new(5000, policy);
        for (i, src) in [&mut a, &mut b, &mut c].into_iter().enumerate() {
            tree.insert(Candidate::new(i, 5000, src)).unwrap();
        }

        // 16+32+64+128+256+512 = 1008, then 1024-byte chunks
        assert!(tree.stats().max_depth < 12);
        let groups = tree.into_groups();
        assert_eq!(groups, vec![DuplicateGroup::new(5000, vec![0, 1, 2])]);
    }

    #[test]
    fn test_deep_identical_content_does_not_recurse() {
        // One-byte chunks over 50k bytes would blow a test thread's stack
        // if descent, collection or drop recursed per level.
        let data = vec![0xABu8; 50_000];
        let mut a = Cursor::new(data.clone());
        let mut b = Cursor::new(data);

        let mut tree = DiscriminationTree::new(50_000, fixed(1));
        tree.insert(Candidate::new(0, 50_000, &mut a)).unwrap();
        tree.insert(Candidate::new(1, 50_000, &mut b)).unwrap();

        assert_eq!(tree.stats().max_depth, 50_000);
        assert_eq!(tree.into_groups().len(), 1);
    }

    #[test]
    fn test_read_failure_names_candidate_and_depth() {
        let mut a = FailAfter {
            inner: Cursor::new(b"aaaabbbb".to_vec()),
            ok_reads: usize::MAX,
        };
        let mut bad = FailAfter {
            inner: Cursor::new(b"aaaabbbb".to_vec()),
            ok_reads: 1,
        };

        let mut tree = DiscriminationTree::new(8, fixed(4));
        tree.insert(Candidate::new(0, 8, &mut a)).unwrap();

        // The split reads #0 at depth 0 and descends; #1 fails on its
        // second read, one level down.
        let err = tree.insert(Candidate::new(1, 8, &mut bad)).unwrap_err();
        match err {
            FinderError::Read { index, depth, .. } => {
                assert_eq!(index, 1);
                assert_eq!(depth, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_reads_do_not_separate_identical_content() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 241) as u8).collect();
        let mut whole: Box<dyn ChunkSource> = Box::new(Cursor::new(data.clone()));
        let mut trickle: Box<dyn ChunkSource> = Box::new(OneByte(Cursor::new(data)));

        let mut tree: DiscriminationTree<'_, dyn ChunkSource> =
            DiscriminationTree::new(1000, fixed(256));
        tree.insert(Candidate::new(0, 1000, &mut *whole)).unwrap();
        tree.insert(Candidate::new(1, 1000, &mut *trickle)).unwrap();

        assert_eq!(tree.stats().max_depth, 4);
        assert_eq!(
            tree.into_groups(),
            vec![DuplicateGroup::new(1000, vec![0, 1])]
        );
    }
}
