pub mod manager;
pub mod store;
pub mod types;

pub use manager::SessionHolder;
pub use store::{FileTokenStore, InMemoryTokenStore, TokenStore};
pub use types::*;
