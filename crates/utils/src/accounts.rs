use std::collections::BTreeMap;

/// Maps a unified account name to the labels the sources use for it.
pub type AliasTable = BTreeMap<String, Vec<String>>;

/// Outcome of resolving one provider's raw account labels.
#[derive(Debug, Default, Clone)]
pub struct ResolutionStats {
    pub resolved: usize,
    pub excluded: usize,
    pub excluded_labels: Vec<String>,
}

impl ResolutionStats {
    pub fn record_resolved(&mut self) {
        self.resolved += 1;
    }

    pub fn record_excluded(&mut self, label: &str) {
        self.excluded += 1;
        if !self.excluded_labels.iter().any(|l| l == label) {
            self.excluded_labels.push(label.to_string());
        }
    }

    /// Emits one aggregated warning for everything this provider dropped.
    /// Names at most two of the unknown labels and counts the rest.
    pub fn warn_if_excluded(&self, provider: &str) {
        if self.excluded == 0 {
            return;
        }
        let shown: Vec<&str> = self
            .excluded_labels
            .iter()
            .take(2)
            .map(String::as_str)
            .collect();
        let remainder = self.excluded_labels.len().saturating_sub(shown.len());
        let mut detail = shown.join(", ");
        if remainder > 0 {
            detail.push_str(&format!(" and {} more", remainder));
        }
        tracing::warn!(
            provider,
            excluded = self.excluded,
            "Dropped records for unmapped accounts: {}",
            detail
        );
    }
}

/// Resolves a raw account label to its unified name.
///
/// A label matches when it equals a unified name directly or appears in
/// that name's alias list, so already-resolved labels map to themselves.
/// Unknown labels return `None` and the caller drops the record.
pub fn resolve_account(table: &AliasTable, label: &str) -> Option<String> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    if table.contains_key(label) {
        return Some(label.to_string());
    }
    for (unified, aliases) in table {
        if aliases.iter().any(|a| a == label) {
            return Some(unified.clone());
        }
    }
    None
}
