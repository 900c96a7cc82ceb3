//! Dashboard-side data access for podintel.
//!
//! - [`query`]: keyed stale-while-revalidate cache with retries and polling
//! - [`hooks`]: topic velocity, sentiment and dashboard queries for either
//!   [`DataMode`](pi_core::data_mode::DataMode)
//! - [`search`]: backend search with the client-side [`SearchCache`](pi_core::search_cache::SearchCache)

pub mod bff;
pub mod error;
pub mod hooks;
pub mod query;
pub mod search;

pub use bff::BffClient;
pub use error::{ClientError, SearchError};
pub use hooks::IntelligenceHooks;
pub use query::{QueryClient, QueryHandle, QueryKey, QueryOptions, QueryState, RetryPolicy};
pub use search::SearchClient;
