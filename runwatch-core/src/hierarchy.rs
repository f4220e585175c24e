// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rebuilds parent/child nesting from a flat stream of depth-tagged tests.
//!
//! The runner only tells us how deeply nested each test is. Each file has a stack of the groups
//! that are currently open; a new test at depth `d` closes everything at depth `d` or deeper, and
//! its parent is whatever is left on top at depth `d - 1`.
//!
//! Stacks are kept per file, because files can run in parallel and their events interleave.

use crate::record::RecordId;
use camino::Utf8PathBuf;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug)]
struct OpenEntry {
    nesting: usize,
    id: RecordId,
}

/// Tracks the open ancestor chain for each file.
#[derive(Debug, Default)]
pub(crate) struct HierarchyResolver {
    stacks: HashMap<Option<Utf8PathBuf>, Vec<OpenEntry>>,
}

impl HierarchyResolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a newly created record and returns its parent.
    pub(crate) fn push(
        &mut self,
        file: Option<&Utf8PathBuf>,
        nesting: usize,
        id: RecordId,
    ) -> Option<RecordId> {
        let stack = self.stacks.entry(file.cloned()).or_default();

        while stack.last().is_some_and(|entry| entry.nesting >= nesting) {
            stack.pop();
        }

        let parent = match (nesting.checked_sub(1), stack.last()) {
            (Some(parent_nesting), Some(top)) if top.nesting == parent_nesting => Some(top.id),
            _ => None,
        };

        stack.push(OpenEntry { nesting, id });
        parent
    }

    #[cfg(test)]
    fn depth(&self, file: Option<&Utf8PathBuf>) -> usize {
        self.stacks.get(&file.cloned()).map_or(0, Vec::len)
    }
}
