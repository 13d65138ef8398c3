pub mod fetcher;
pub mod filter;
pub mod snapshot;

pub use fetcher::DashboardFetcher;
pub use filter::*;
pub use snapshot::*;
