pub mod manager;

pub use manager::{RosterChange, RosterManager, DELETE_FALLBACK, SAVE_FALLBACK, SKILL_OPTIONS};
