use super::record::{DashboardRecord, DashboardState, ListedDashboard, Origin};
use crate::error::{Error, Result};
use std::collections::HashSet;
use tracing::{debug, warn};

/// In-memory view of the dashboards in the target account.
///
/// Listings are merged in, never substituted: a name missing from one listing
/// keeps its record. Names removed by a confirmed delete are tombstoned so a
/// listing rendered before the page caught up cannot bring them back.
#[derive(Debug, Default, Clone)]
pub struct DashboardSet {
    records: Vec<DashboardRecord>,
    tombstones: HashSet<String>,
}

impl DashboardSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a listing. Returns the names seen for the first time.
    pub fn reconcile(&mut self, listing: &[ListedDashboard]) -> Vec<String> {
        let mut added = Vec::new();
        let mut seen = HashSet::new();
        let mut active_name = None;

        for entry in listing {
            if !seen.insert(entry.name.as_str()) {
                warn!("Dashboard name '{}' listed more than once", entry.name);
                continue;
            }
            if self.tombstones.contains(&entry.name) {
                debug!("Ignoring deleted dashboard '{}' in listing", entry.name);
                continue;
            }
            if self.get(&entry.name).is_none() {
                self.records.push(DashboardRecord::listed(&entry.name));
                added.push(entry.name.clone());
            }
            if entry.active && active_name.is_none() {
                active_name = Some(entry.name.as_str());
            }
        }

        if let Some(name) = active_name {
            self.mark_active(name);
        }
        added
    }

    pub fn get(&self, name: &str) -> Option<&DashboardRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DashboardRecord> {
        self.records.iter_mut().find(|r| r.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DashboardRecord> {
        self.records.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn active(&self) -> Option<&DashboardRecord> {
        self.records.iter().find(|r| r.is_active())
    }

    /// Make `name` the only active record; the previously active one becomes
    /// inactive. Returns false if `name` is unknown.
    pub fn mark_active(&mut self, name: &str) -> bool {
        if !self.contains(name) {
            return false;
        }
        for record in &mut self.records {
            if record.name == name {
                record.state = match record.state {
                    DashboardState::Renaming { .. } => DashboardState::Renaming { was_active: true },
                    _ => DashboardState::Active,
                };
            } else {
                record.state = match record.state {
                    DashboardState::Active => DashboardState::Inactive,
                    DashboardState::Renaming { .. } => DashboardState::Renaming { was_active: false },
                    other => other,
                };
            }
        }
        true
    }

    /// Register a dashboard this run created. It becomes the active record.
    pub fn register_created(&mut self, name: &str) {
        self.tombstones.remove(name);
        match self.get_mut(name) {
            Some(record) => record.origin = Origin::CreatedThisSession,
            None => self.records.push(DashboardRecord {
                name: name.to_string(),
                state: DashboardState::Listed,
                origin: Origin::CreatedThisSession,
            }),
        }
        self.mark_active(name);
    }

    pub fn set_state(&mut self, name: &str, state: DashboardState) {
        if let Some(record) = self.get_mut(name) {
            record.state = state;
        }
    }

    /// Rename in place, keeping state and origin. The old name is tombstoned
    /// so a listing that still shows it does not add it back.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        match self.get_mut(old) {
            Some(record) => {
                record.name = new.to_string();
                self.tombstones.insert(old.to_string());
                self.tombstones.remove(new);
                true
            }
            None => false,
        }
    }

    /// Drop a deleted record and tombstone its name.
    pub fn remove(&mut self, name: &str) -> Option<DashboardRecord> {
        let index = self.records.iter().position(|r| r.name == name)?;
        let mut record = self.records.remove(index);
        record.state = DashboardState::Deleted;
        self.tombstones.insert(name.to_string());
        Some(record)
    }

    pub fn is_tombstoned(&self, name: &str) -> bool {
        self.tombstones.contains(name)
    }

    pub fn active_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_active()).count()
    }

    pub fn check_single_active(&self) -> Result<()> {
        match self.active_count() {
            0 | 1 => Ok(()),
            n => Err(Error::InvariantViolation(format!(
                "{} dashboards marked active at once",
                n
            ))),
        }
    }
}
