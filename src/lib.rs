pub mod api;
pub mod assignment;
pub mod config;
pub mod console;
pub mod dashboard;
pub mod error;
pub mod roster;
pub mod session;

pub use config::ConsoleConfig;
pub use console::Console;
pub use error::{ConsoleError, Result};
