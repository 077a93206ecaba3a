pub mod app;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod display;
pub mod driver;
pub mod engine;
pub mod error;
pub mod input;
pub mod mailbox;
pub mod model;
pub mod progress;
pub mod ui;
