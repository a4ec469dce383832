pub mod config;
pub mod error;
pub mod path;

pub use config::Config;
pub use error::Error;
pub use path::{discover_project_root, project_hash_from_root, resolve_workspace_path};
