use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardState {
    /// Seen in a listing, activity not yet known.
    Listed,
    Active,
    Inactive,
    /// Mid-rename; returns to the state it came from.
    Renaming { was_active: bool },
    Deleting,
    Deleted,
}

impl DashboardState {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            DashboardState::Active | DashboardState::Renaming { was_active: true }
        )
    }

    /// Not in the middle of a transition.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            DashboardState::Listed | DashboardState::Active | DashboardState::Inactive
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    PreExisting,
    CreatedThisSession,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardRecord {
    pub name: String,
    pub state: DashboardState,
    pub origin: Origin,
}

impl DashboardRecord {
    pub fn listed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: DashboardState::Listed,
            origin: Origin::PreExisting,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

/// One entry of a sidebar listing as read from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedDashboard {
    pub name: String,
    pub active: bool,
}
