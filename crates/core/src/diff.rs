// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

use crate::Target;

/// Diffs two target lists into `(additions, removals)`.
///
/// A target present in `new` but not `old` is an addition. A target present
/// in `old` but not `new` is a removal. A target present in both but with
/// any field changed is an addition only — **not** a removal followed by an
/// addition, so a replaced target's `down` command is never run. A target
/// unchanged between `old` and `new` appears in neither list.
pub fn diff_targets(old: &[Target], new: &[Target]) -> (Vec<Target>, Vec<Target>) {
    let old_by_name: HashMap<&str, &Target> =
        old.iter().map(|t| (t.name.as_str(), t)).collect();
    let new_by_name: HashMap<&str, &Target> =
        new.iter().map(|t| (t.name.as_str(), t)).collect();

    let mut additions = Vec::new();
    for target in new {
        match old_by_name.get(target.name.as_str()) {
            None => additions.push(target.clone()),
            Some(old_target) if *old_target != target => additions.push(target.clone()),
            Some(_) => {}
        }
    }

    let mut removals = Vec::new();
    for target in old {
        if !new_by_name.contains_key(target.name.as_str()) {
            removals.push(target.clone());
        }
    }

    (additions, removals)
}
