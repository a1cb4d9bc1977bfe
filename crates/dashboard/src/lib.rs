//! Page controllers for the MarketMind dashboard.
//!
//! Each page owns its fetch controllers, validates input before anything goes
//! over the wire, and renders itself to plain text lines. Pages never share
//! state; the terminal app drives one page at a time.

pub mod events;
pub mod format;
pub mod pages;

pub use events::{Notice, PageError};
pub use pages::Page;

#[cfg(test)]
#[path = "tests/mock_api.rs"]
mod mock_api;
