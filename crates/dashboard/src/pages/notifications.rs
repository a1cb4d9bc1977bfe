//! Price alerts: the active list, the triggered feed behind the bell, and the
//! create/delete/dismiss actions.

use std::sync::Arc;

use async_trait::async_trait;
use client_core::{DashboardApi, FetchController, FetchError};
use futures::future::try_join;
use shared::{
    domain::{AlertCondition, AlertId, Ticker, TriggeredAlertId},
    protocol::{CreateAlertRequest, MessageResponse, PriceAlert, TriggeredAlert},
};

use crate::{
    events::{Notice, PageError},
    format,
    pages::Page,
};

pub const CREATED: &str = "Notification created successfully!";
pub const CREATE_FAILED: &str = "Failed to create notification.";
pub const INVALID_PRICE: &str = "Please enter a valid target price.";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlertLists {
    pub active: Vec<PriceAlert>,
    pub triggered: Vec<TriggeredAlert>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertAction {
    Create(CreateAlertRequest),
    Delete(AlertId),
    Dismiss(TriggeredAlertId),
}

fn parse_target_price(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_start_matches('$')
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price > 0.0)
}

fn action_notice(action: Option<&AlertAction>, result: Result<&MessageResponse, &FetchError>) -> Notice {
    let creating = matches!(action, Some(AlertAction::Create(_)));
    match result {
        Ok(_) if creating => Notice::Success(CREATED.to_string()),
        Ok(response) => Notice::Success(response.message.clone()),
        Err(FetchError::Http { message, .. }) => Notice::Error(message.clone()),
        Err(_) if creating => Notice::Error(CREATE_FAILED.to_string()),
        Err(err) => Notice::Error(err.user_message()),
    }
}

pub struct NotificationsPage {
    lists: FetchController<(), AlertLists>,
    action: FetchController<AlertAction, MessageResponse>,
    action_pending: bool,
    notice: Option<Notice>,
}

impl NotificationsPage {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        let lists_api = Arc::clone(&api);
        let lists = FetchController::new("alerts", move |()| {
            let api = Arc::clone(&lists_api);
            async move {
                let (active, triggered) =
                    try_join(api.alerts(), api.triggered_alerts(true)).await?;
                Ok::<_, FetchError>(AlertLists { active, triggered })
            }
        })
        .retain_data_while_loading();

        let action = FetchController::new("alert-action", move |action: AlertAction| {
            let api = Arc::clone(&api);
            async move {
                match &action {
                    AlertAction::Create(request) => api.create_alert(request).await,
                    AlertAction::Delete(id) => api.delete_alert(*id).await,
                    AlertAction::Dismiss(id) => api.dismiss_triggered_alert(*id).await,
                }
            }
        });

        Self {
            lists,
            action,
            action_pending: false,
            notice: None,
        }
    }

    pub fn load(&mut self) {
        self.lists.trigger(());
    }

    pub fn create(&mut self, ticker: &str, condition: AlertCondition, price: &str) -> bool {
        let ticker = match Ticker::parse(ticker) {
            Ok(ticker) => ticker,
            Err(err) => {
                self.notice = Some(Notice::Error(err.to_string()));
                return false;
            }
        };
        let Some(target_price) = parse_target_price(price) else {
            self.notice = Some(Notice::Error(INVALID_PRICE.to_string()));
            return false;
        };
        self.submit(AlertAction::Create(CreateAlertRequest {
            ticker,
            condition,
            target_price,
        }));
        true
    }

    pub fn delete(&mut self, id: AlertId) {
        self.submit(AlertAction::Delete(id));
    }

    pub fn dismiss(&mut self, id: TriggeredAlertId) {
        self.submit(AlertAction::Dismiss(id));
    }

    pub fn lists(&self) -> Option<&AlertLists> {
        self.lists.data()
    }

    /// Number shown on the bell: triggered alerts not yet dismissed.
    pub fn bell_count(&self) -> usize {
        self.lists().map_or(0, |lists| lists.triggered.len())
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    fn submit(&mut self, action: AlertAction) {
        self.notice = None;
        self.action.trigger(action);
        self.action_pending = true;
    }

    fn sync(&mut self) -> bool {
        if !self.action_pending || self.action.state().is_loading() {
            return false;
        }
        self.action_pending = false;
        let result = match (self.action.data(), self.action.failure()) {
            (_, Some(err)) => Err(err),
            (Some(response), None) => Ok(response),
            (None, None) => return false,
        };
        self.notice = Some(action_notice(self.action.last_key(), result));
        self.lists.trigger(());
        true
    }
}

#[async_trait]
impl Page for NotificationsPage {
    fn title(&self) -> &'static str {
        "Price Alerts"
    }

    fn refresh(&mut self) {
        if !self.lists.state().is_loading() {
            self.lists.trigger(());
        }
    }

    fn pump(&mut self) -> bool {
        let applied = self.lists.pump() | self.action.pump();
        self.sync() || applied
    }

    fn is_loading(&self) -> bool {
        self.lists.state().is_loading() || self.action.state().is_loading()
    }

    async fn changed(&mut self) {
        tokio::select! {
            _ = self.lists.changed() => {}
            _ = self.action.changed() => {}
        }
        self.pump();
    }

    fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(notice) = &self.notice {
            lines.push(notice.render());
        }
        if let Some(err) = self.lists.failure() {
            lines.push(PageError::from_fetch(err).render());
            return lines;
        }
        let Some(lists) = self.lists() else {
            if self.lists.state().is_loading() {
                lines.push("Loading alerts...".to_string());
            }
            return lines;
        };

        lines.push(format!("Triggered ({})", self.bell_count()));
        if lists.triggered.is_empty() {
            lines.push("No triggered alerts.".to_string());
        } else {
            let rows: Vec<Vec<String>> = lists
                .triggered
                .iter()
                .map(|alert| {
                    vec![
                        alert.id.to_string(),
                        format::text_field(alert.ticker.as_deref()),
                        alert.message.clone(),
                    ]
                })
                .collect();
            lines.extend(format::table(&["ID", "Ticker", "Message"], &rows));
        }

        lines.push(String::new());
        lines.push(format!("Active ({})", lists.active.len()));
        if lists.active.is_empty() {
            lines.push("No active alerts.".to_string());
        } else {
            let rows: Vec<Vec<String>> = lists
                .active
                .iter()
                .map(|alert| {
                    vec![
                        alert.id.to_string(),
                        alert.ticker.clone(),
                        alert.condition.label().to_string(),
                        format::money(alert.target_price),
                    ]
                })
                .collect();
            lines.extend(format::table(&["ID", "Ticker", "Condition", "Target"], &rows));
        }
        lines
    }
}

#[cfg(test)]
#[path = "../tests/notifications_tests.rs"]
mod tests;
