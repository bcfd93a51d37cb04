pub mod credentials;
pub mod loader;
pub mod schema;

pub use credentials::Credentials;
pub use loader::{ConfigError, ConfigLoader};
pub use schema::{
    ArtifactsConfig, BrowserConfig, DashpilotConfig, NamingConfig, ResolutionConfig, RetryConfig,
    TargetConfig, WidgetConfig, WorkflowConfig,
};
