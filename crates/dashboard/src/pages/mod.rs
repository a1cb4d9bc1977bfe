use async_trait::async_trait;

pub mod commodities;
pub mod comparison;
pub mod converter;
pub mod evaluation;
pub mod fundamentals;
pub mod news;
pub mod notifications;
pub mod options;
pub mod paper;
pub mod predictions;
pub mod search;
pub mod watchlist;

pub use commodities::CommoditiesPage;
pub use comparison::ComparisonPage;
pub use converter::{ConverterPage, Market};
pub use evaluation::ModelPerformancePage;
pub use fundamentals::FundamentalsPage;
pub use news::NewsPage;
pub use notifications::NotificationsPage;
pub use options::OptionsPage;
pub use paper::PaperTradingPage;
pub use predictions::PredictionsPage;
pub use search::{Autocomplete, SearchPage};
pub use watchlist::WatchlistPage;

#[async_trait]
pub trait Page: Send {
    fn title(&self) -> &'static str;

    /// Re-issue the page's primary requests. Poll ticks land here.
    fn refresh(&mut self);

    /// Apply finished requests without blocking. Returns true when the
    /// rendered output may have changed.
    fn pump(&mut self) -> bool;

    fn is_loading(&self) -> bool;

    /// Wait for the next completion of any request the page owns and apply it.
    /// Cancel safe.
    async fn changed(&mut self);

    fn render(&self) -> Vec<String>;

    /// Wait until nothing the page started is still in flight, including
    /// follow-up requests issued when earlier ones land.
    async fn settled(&mut self) {
        self.pump();
        while self.is_loading() {
            self.changed().await;
        }
    }
}
