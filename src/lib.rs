#[cfg(windows)]
pub mod app;

pub mod config;
pub mod menu;
pub mod options;

#[cfg(windows)]
pub mod platform;

pub mod utils;
