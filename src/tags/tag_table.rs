// src/tags/tag_table.rs

use std::collections::HashMap;

use super::{ProvisionId, Tag};

/// Multi-index relation over (Tag, Provision).
///
/// Both directions are queryable: providers of a tag, and the tags a
/// provision publishes. Insertion order within a tag group carries no
/// meaning; the preference rule orders candidates when it matters.
#[derive(Debug, Default)]
pub struct TagTable {
    by_tag: HashMap<Tag, Vec<ProvisionId>>,
    by_provision: HashMap<ProvisionId, Vec<Tag>>,
}

impl TagTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tag: Tag, provision: ProvisionId) {
        self.by_tag.entry(tag.clone()).or_default().push(provision);
        self.by_provision.entry(provision).or_default().push(tag);
    }

    pub fn providers(&self, tag: &Tag) -> &[ProvisionId] {
        self.by_tag.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tags_of(&self, provision: ProvisionId) -> &[Tag] {
        self.by_provision
            .get(&provision)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Remove every row mentioning `provision`. Returns the number of rows
    /// removed.
    pub fn erase_provision(&mut self, provision: ProvisionId) -> usize {
        let tags = match self.by_provision.remove(&provision) {
            Some(tags) => tags,
            None => return 0,
        };
        let removed = tags.len();
        for tag in tags {
            if let Some(providers) = self.by_tag.get_mut(&tag) {
                providers.retain(|&p| p != provision);
                if providers.is_empty() {
                    self.by_tag.remove(&tag);
                }
            }
        }
        removed
    }

    pub fn row_count(&self) -> usize {
        self.by_provision.values().map(Vec::len).sum()
    }
}
