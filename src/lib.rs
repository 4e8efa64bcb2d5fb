//! Records what you work on through the day and turns it into a daily report prompt.
//! A background logger samples the focused application and the text on screen into one
//! JSON-lines file per day; the `report` command reads a day back, merges it with the calendar
//! and hands the resulting prompt to a chat assistant.
//!

pub mod cli;
pub mod config;
pub mod daemon;
pub mod fs;
pub mod report;
pub mod submission;
pub mod utils;
pub mod window_api;
