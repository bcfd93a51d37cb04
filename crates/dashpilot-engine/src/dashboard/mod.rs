pub mod lifecycle;
pub mod record;
pub mod set;

pub use lifecycle::{CleanupReport, DashboardLifecycle, Timing};
pub use record::{DashboardRecord, DashboardState, ListedDashboard, Origin};
pub use set::DashboardSet;
