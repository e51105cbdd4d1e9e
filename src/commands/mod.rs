pub mod preview;
pub mod show_config;
pub mod view;
