// src/tags/dependency_table.rs

use std::collections::HashMap;

use super::{ActionId, ProvisionId, Tag};

/// One recorded lookup: "this action consulted this tag and got this
/// provider". A `None` provision means no provider existed at the time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepRow {
    pub tag: Tag,
    pub action: ActionId,
    pub provision: Option<ProvisionId>,
}

/// Three-column relation over (Tag, Action, Provision?) with three search
/// directions.
///
/// Queries return snapshots rather than borrows: callers routinely reset
/// actions while walking the matches, and a reset mutates this table. Handing
/// out owned rows makes the snapshot-before-mutate discipline structural.
#[derive(Debug, Default)]
pub struct DependencyTable {
    rows: Vec<Option<DepRow>>,
    by_tag: HashMap<Tag, Vec<usize>>,
    by_action: HashMap<ActionId, Vec<usize>>,
    by_provision: HashMap<ProvisionId, Vec<usize>>,
}

impl DependencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tag: Tag, action: ActionId, provision: Option<ProvisionId>) {
        let idx = self.rows.len();
        self.by_tag.entry(tag.clone()).or_default().push(idx);
        self.by_action.entry(action).or_default().push(idx);
        if let Some(p) = provision {
            self.by_provision.entry(p).or_default().push(idx);
        }
        self.rows.push(Some(DepRow {
            tag,
            action,
            provision,
        }));
    }

    pub fn rows_for_tag(&self, tag: &Tag) -> Vec<DepRow> {
        self.collect(self.by_tag.get(tag))
    }

    pub fn rows_for_action(&self, action: ActionId) -> Vec<DepRow> {
        self.collect(self.by_action.get(&action))
    }

    pub fn rows_for_provision(&self, provision: ProvisionId) -> Vec<DepRow> {
        self.collect(self.by_provision.get(&provision))
    }

    pub fn has_action(&self, action: ActionId) -> bool {
        self.by_action
            .get(&action)
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }

    /// Remove every row whose action column is `action`. Returns the number
    /// of rows removed.
    pub fn erase_action(&mut self, action: ActionId) -> usize {
        let indices = self.by_action.remove(&action).unwrap_or_default();
        let mut removed = 0;
        for idx in indices {
            if let Some(row) = self.rows[idx].take() {
                removed += 1;
                self.unlink_tag(&row.tag, idx);
                if let Some(p) = row.provision {
                    self.unlink_provision(p, idx);
                }
            }
        }
        removed
    }

    /// Remove every row whose provision column is `provision`. Returns the
    /// number of rows removed.
    pub fn erase_provision(&mut self, provision: ProvisionId) -> usize {
        let indices = self.by_provision.remove(&provision).unwrap_or_default();
        let mut removed = 0;
        for idx in indices {
            if let Some(row) = self.rows[idx].take() {
                removed += 1;
                self.unlink_tag(&row.tag, idx);
                self.unlink_action(row.action, idx);
            }
        }
        removed
    }

    pub fn row_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_some()).count()
    }

    fn collect(&self, indices: Option<&Vec<usize>>) -> Vec<DepRow> {
        indices
            .into_iter()
            .flatten()
            .filter_map(|&idx| self.rows[idx].clone())
            .collect()
    }

    fn unlink_tag(&mut self, tag: &Tag, idx: usize) {
        if let Some(list) = self.by_tag.get_mut(tag) {
            list.retain(|&i| i != idx);
            if list.is_empty() {
                self.by_tag.remove(tag);
            }
        }
    }

    fn unlink_action(&mut self, action: ActionId, idx: usize) {
        if let Some(list) = self.by_action.get_mut(&action) {
            list.retain(|&i| i != idx);
            if list.is_empty() {
                self.by_action.remove(&action);
            }
        }
    }

    fn unlink_provision(&mut self, provision: ProvisionId, idx: usize) {
        if let Some(list) = self.by_provision.get_mut(&provision) {
            list.retain(|&i| i != idx);
            if list.is_empty() {
                self.by_provision.remove(&provision);
            }
        }
    }
}
