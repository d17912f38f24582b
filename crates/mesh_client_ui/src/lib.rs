#![forbid(unsafe_code)]

pub mod app_state;
pub mod command;
pub mod directory;
pub mod settings;
