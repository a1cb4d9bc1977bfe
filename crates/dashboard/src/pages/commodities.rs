use std::{cmp::Reverse, sync::Arc};

use async_trait::async_trait;
use client_core::{DashboardApi, Derived, FetchController};
use shared::protocol::{CommodityHistoryPoint, CommodityInfo, CommodityPrice};
use tracing::debug;

use crate::{
    events::PageError,
    format,
    pages::Page,
};

pub const CATALOG_FAILED: &str = "Could not fetch commodities list.";
const RECENT_HISTORY: usize = 10;

/// Commodities bucketed by category, categories in first-seen order.
pub fn group_by_category(items: &[CommodityInfo]) -> Vec<(String, Vec<CommodityInfo>)> {
    let mut groups: Vec<(String, Vec<CommodityInfo>)> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|(category, _)| *category == item.category) {
            Some((_, members)) => members.push(item.clone()),
            None => groups.push((item.category.clone(), vec![item.clone()])),
        }
    }
    groups
}

/// The latest `RECENT_HISTORY` points, newest first, whatever order the
/// backend sent them in.
pub fn recent_history(history: &[CommodityHistoryPoint]) -> Vec<&CommodityHistoryPoint> {
    let mut points: Vec<&CommodityHistoryPoint> = history.iter().collect();
    points.sort_by_key(|point| Reverse(point.day()));
    points.truncate(RECENT_HISTORY);
    points
}

pub struct CommoditiesPage {
    catalog: FetchController<(), Vec<CommodityInfo>>,
    groups: Derived<Vec<(String, Vec<CommodityInfo>)>>,
    price: FetchController<String, CommodityPrice>,
    catalog_seen: Option<u64>,
}

impl CommoditiesPage {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        let catalog_api = Arc::clone(&api);
        let catalog = FetchController::new("commodity-list", move |()| {
            let api = Arc::clone(&catalog_api);
            async move { api.commodities().await }
        });
        let price = FetchController::new("commodity-price", move |code: String| {
            let api = Arc::clone(&api);
            async move { api.commodity_price(&code).await }
        })
        .retain_data_while_loading();
        Self {
            catalog,
            groups: Derived::new(),
            price,
            catalog_seen: None,
        }
    }

    pub fn load(&mut self) {
        self.catalog.trigger(());
    }

    pub fn select(&mut self, raw: &str) -> bool {
        let code = raw.trim().to_ascii_uppercase();
        if code.is_empty() {
            self.price.reject("Please choose a commodity.");
            return false;
        }
        self.price.trigger(code);
        true
    }

    pub fn selected(&self) -> Option<&str> {
        self.price.last_key().map(String::as_str)
    }

    pub fn groups(&self) -> &[(String, Vec<CommodityInfo>)] {
        self.groups.value().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn price(&self) -> Option<&CommodityPrice> {
        self.price.data()
    }

    fn sync(&mut self) -> bool {
        let changed = self.groups.refresh(self.catalog.state(), |items| group_by_category(items));
        let version = self.catalog.state().version;
        if !self.catalog.state().is_success() || self.catalog_seen == Some(version) {
            return changed;
        }
        self.catalog_seen = Some(version);
        if self.price.last_key().is_some() {
            return changed;
        }
        match self.catalog.data().and_then(|items| items.first()) {
            Some(first) => {
                debug!(code = %first.code, "selecting first commodity");
                let code = first.code.clone();
                self.price.trigger(code);
                true
            }
            None => changed,
        }
    }

    fn render_price(&self, price: &CommodityPrice, lines: &mut Vec<String>) {
        let unit = price.unit.as_deref().unwrap_or("");
        lines.push(format!(
            "{} ({})",
            price.full_name.as_deref().unwrap_or(&price.name),
            price.code
        ));
        let mut details = vec![
            ("Category", price.category.clone()),
            (
                "Price",
                format!("{} {unit}", format::money(price.current_price))
                    .trim_end()
                    .to_string(),
            ),
            ("Change", format::change(price.price_change, price.price_change_percent)),
        ];
        if let Some(previous) = price.previous_price {
            details.push(("Previous", format::money(previous)));
        }
        if let Some(date) = &price.date {
            details.push(("As of", date.clone()));
        }
        if let Some(interval) = &price.interval {
            details.push(("Interval", interval.clone()));
        }
        lines.extend(format::key_values(&details));

        if !price.history.is_empty() {
            lines.push(String::new());
            let rows: Vec<Vec<String>> = recent_history(&price.history)
                .into_iter()
                .map(|point| vec![point.date.clone(), format::money(point.value)])
                .collect();
            lines.extend(format::table(&["Date", "Value"], &rows));
        }
    }
}

#[async_trait]
impl Page for CommoditiesPage {
    fn title(&self) -> &'static str {
        "Commodities"
    }

    fn refresh(&mut self) {
        if self.catalog.state().is_error() || self.catalog.state().is_idle() {
            self.catalog.trigger(());
        }
        if !self.price.state().is_loading() {
            self.price.retry();
        }
    }

    fn pump(&mut self) -> bool {
        let applied = self.catalog.pump() | self.price.pump();
        self.sync() || applied
    }

    fn is_loading(&self) -> bool {
        self.catalog.state().is_loading() || self.price.state().is_loading()
    }

    async fn changed(&mut self) {
        tokio::select! {
            _ = self.catalog.changed() => {}
            _ = self.price.changed() => {}
        }
        self.pump();
    }

    fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.catalog.state().is_loading() {
            lines.push("Loading commodities...".to_string());
        } else if let Some(err) = self.catalog.failure() {
            lines.push(PageError::with_fallback(err, CATALOG_FAILED).render());
        } else {
            for (category, members) in self.groups() {
                let codes: Vec<String> = members
                    .iter()
                    .map(|c| format!("{} ({})", c.name, c.code))
                    .collect();
                lines.push(format!("{category}: {}", codes.join(", ")));
            }
        }

        let mut detail = Vec::new();
        if let Some(err) = self.price.failure() {
            detail.push(PageError::from_fetch(err).render());
        } else if let Some(price) = self.price() {
            self.render_price(price, &mut detail);
        } else if self.price.state().is_loading() {
            detail.push(format!("Loading {}...", self.selected().unwrap_or("")));
        }
        if !detail.is_empty() {
            lines.push(String::new());
            lines.extend(detail);
        }
        lines
    }
}

#[cfg(test)]
#[path = "../tests/commodities_tests.rs"]
mod tests;
