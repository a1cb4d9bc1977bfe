//! Client-side plumbing for the MarketMind dashboard: the typed backend API,
//! the fetch-state machine every page is built on, and the timers that drive
//! polling and debounced lookups.

pub mod api;
pub mod debounce;
pub mod error;
pub mod fetch;
pub mod polling;

pub use api::{DashboardApi, HttpDashboardClient, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT};
pub use debounce::Debouncer;
pub use error::{ClientBuildError, FetchError, FetchErrorCategory};
pub use fetch::{Derived, FetchController, RequestState, RequestStatus};
pub use polling::PollingSubscription;
