//! Safe-deletion cascade planning over the story graph.
//!
//! Deleting a fragment removes it together with its exclusively-owned
//! descendants, while preserving anything still reachable or referenced
//! from outside the cascade. The whole plan is computed before any
//! mutation: either the entire plan applies or nothing does.

use std::collections::HashSet;

use crate::error::{CoreError, CoreResult};
use crate::id::FragmentId;
use crate::story::Story;

/// The computed outcome of a deletion request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    /// Fragments to remove.
    pub delete: HashSet<FragmentId>,
    /// Candidates kept alive by a reference from outside the cascade (or
    /// from the protected root).
    pub externally_referenced: HashSet<FragmentId>,
    /// Candidates that survive the cascade for any reason.
    pub preserved_children: HashSet<FragmentId>,
    /// Candidates still reachable from the protected root via a path that
    /// avoids the cascade root.
    pub bypass_reachable: HashSet<FragmentId>,
}

/// Compute the deletion cascade for removing `cascade_root`.
///
/// Refused outright when `cascade_root` is the protected story root. The
/// returned plan never contains the protected root, and nothing in
/// `bypass_reachable` is ever deleted.
pub fn plan_deletion(story: &Story, cascade_root: &FragmentId) -> CoreResult<DeletionPlan> {
    if cascade_root.is_root() {
        return Err(CoreError::ProtectedRoot);
    }
    if !story.contains(cascade_root) {
        return Err(CoreError::FragmentNotFound(cascade_root.clone()));
    }

    let protected = FragmentId::root();
    let candidates = story.find_descendants(cascade_root);

    // 1. Candidates targeted by a choice outside the candidate set, or by
    //    the protected fragment itself.
    let mut externally_referenced: HashSet<FragmentId> = HashSet::new();
    for fragment in story.fragments() {
        let outside = !candidates.contains(&fragment.id) || fragment.id == protected;
        if !outside {
            continue;
        }
        for choice in &fragment.choices {
            if candidates.contains(&choice.target) {
                externally_referenced.insert(choice.target.clone());
            }
        }
    }

    // 2. Candidates (excluding the cascade root) reachable from the
    //    protected fragment via a path avoiding the cascade root.
    let mut bypass_reachable: HashSet<FragmentId> = HashSet::new();
    let mut visited: HashSet<FragmentId> = HashSet::new();
    let mut stack = vec![protected.clone()];
    while let Some(id) = stack.pop() {
        if id == *cascade_root || !visited.insert(id.clone()) {
            continue;
        }
        if candidates.contains(&id) && id != protected {
            bypass_reachable.insert(id.clone());
        }
        if let Some(fragment) = story.get(&id) {
            for choice in &fragment.choices {
                if story.contains(&choice.target) {
                    stack.push(choice.target.clone());
                }
            }
        }
    }

    // 3. Depth-first walk from the cascade root within the candidate set.
    //    Only the protected fragment and bypass-reachable nodes stop the
    //    walk; an externally referenced node survives but the walk still
    //    descends through it, so its exclusive children die with the rest
    //    of the cascade.
    let mut delete: HashSet<FragmentId> = HashSet::new();
    let mut walked: HashSet<FragmentId> = HashSet::new();
    let mut stack = vec![cascade_root.clone()];
    while let Some(id) = stack.pop() {
        if !walked.insert(id.clone()) {
            continue;
        }
        if id == protected || bypass_reachable.contains(&id) {
            continue;
        }
        if id == *cascade_root || !externally_referenced.contains(&id) {
            delete.insert(id.clone());
        }
        if let Some(fragment) = story.get(&id) {
            for choice in &fragment.choices {
                if candidates.contains(&choice.target) {
                    stack.push(choice.target.clone());
                }
            }
        }
    }

    let preserved_children = candidates
        .iter()
        .filter(|id| !delete.contains(*id))
        .cloned()
        .collect();

    Ok(DeletionPlan {
        delete,
        externally_referenced,
        preserved_children,
        bypass_reachable,
    })
}

impl Story {
    /// Apply a previously computed deletion plan.
    ///
    /// Removes every fragment in the plan's deletion set and drops every
    /// surviving choice whose target died.
    pub fn apply_deletion(&mut self, plan: &DeletionPlan) -> CoreResult<()> {
        self.remove_fragments(&plan.delete)
    }
}
