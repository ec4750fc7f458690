// Core modules
pub mod bootstrap;
mod error;
pub mod host;
mod settings;
pub mod view;
pub mod zis;

// CLI module
pub mod cli;

// Public exports
pub use bootstrap::Session;
pub use error::AppError;
pub use host::{HostBridge, HostNotice, HostRuntime, NoticeKind, Registration, ZendeskHost};
pub use settings::{
    effective_settings, get_settings, update_settings, AppSettings, SettingsOverrides,
};
pub use view::{ConfigState, ConfigView, ModalView, Mounted};
