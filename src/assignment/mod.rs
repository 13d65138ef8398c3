pub mod coordinator;
pub mod types;

pub use coordinator::AssignmentCoordinator;
pub use types::*;
