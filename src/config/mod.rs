pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, load_or_default, ConfigError, CONFIG_FILE_NAME};
pub use schema::{
    LimitsSection, OutputSection, ToolConfig, ValidationError, ValidationIssue, WorkspaceSection,
};
