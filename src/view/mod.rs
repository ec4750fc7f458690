pub mod config;
pub mod format;
pub mod modal;

pub use config::{
    display_value, BundleState, ConfigState, ConfigView, FormAlert, LoadTickets, LoadedBundle,
    SaveRequest,
};
pub use format::{format_date, format_key};
pub use modal::ModalView;

/// Which view the launch location mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mounted {
    Config,
    Modal,
}

impl Mounted {
    pub fn for_location(location: &str) -> Self {
        if location == "modal" {
            Mounted::Modal
        } else {
            Mounted::Config
        }
    }
}
