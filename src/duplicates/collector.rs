//! Gathering duplicate groups out of finished discrimination trees.

use super::tree::Node;
use super::DuplicateGroup;

/// Walk every node under `root` and emit each terminal list with at least
/// two members as a [`DuplicateGroup`] of `size` bytes.
///
/// Deferred nodes are never emitted: their single occupant was never
/// challenged by another candidate. The traversal keeps an explicit stack,
/// so tree depth does not translate into call depth. Sibling order is not
/// significant and groups come back in no particular order.
#[must_use]
pub fn collect_groups<S: ?Sized>(root: &Node<'_, S>, size: u64) -> Vec<DuplicateGroup> {
    let mut groups = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        let Node::Branch(branch) = node else {
            continue;
        };

        if branch.terminals().len() >= 2 {
            let members = branch.terminals().iter().map(|c| c.index).collect();
            groups.push(DuplicateGroup::new(size, members));
        } else if let [single] = branch.terminals() {
            log::trace!(
                "Candidate #{} ended alone; not a duplicate",
                single.index
            );
        }

        stack.extend(branch.children().values());
    }

    groups
}
