#![doc = include_str!("../README.md")]
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod util;
