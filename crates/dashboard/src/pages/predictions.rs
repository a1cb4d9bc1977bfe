use std::sync::Arc;

use async_trait::async_trait;
use client_core::{DashboardApi, FetchController, FetchError};
use shared::{domain::Ticker, protocol::Prediction};

use crate::{format, pages::Page};

/// Absolute percentage error of `predicted` against `actual`.
pub fn percentage_error(predicted: f64, actual: f64) -> Option<f64> {
    (actual != 0.0 && actual.is_finite() && predicted.is_finite())
        .then(|| (predicted - actual).abs() / actual.abs() * 100.0)
}

pub struct PredictionsPage {
    prediction: FetchController<Ticker, Prediction>,
}

impl PredictionsPage {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        let prediction = FetchController::new("predictions", move |ticker: Ticker| {
            let api = Arc::clone(&api);
            async move { api.predict(&ticker).await }
        });
        Self { prediction }
    }

    pub fn predict(&mut self, raw: &str) -> bool {
        match Ticker::parse(raw) {
            Ok(ticker) => {
                self.prediction.trigger(ticker);
                true
            }
            Err(err) => {
                self.prediction.reject(err.to_string());
                false
            }
        }
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        self.prediction.data()
    }

    /// The failure text names the ticker that was asked for, so it is built
    /// from the last request key rather than stored with the error.
    pub fn error_message(&self) -> Option<String> {
        let failure = self.prediction.failure()?;
        if let FetchError::Validation(message) = failure {
            return Some(message.clone());
        }
        let ticker = self
            .prediction
            .last_key()
            .map(Ticker::to_string)
            .unwrap_or_default();
        Some(format!(
            "Error: Could not fetch predictions for {ticker}. Please check the ticker and try again."
        ))
    }
}

#[async_trait]
impl Page for PredictionsPage {
    fn title(&self) -> &'static str {
        "Stock Predictions"
    }

    fn refresh(&mut self) {
        self.prediction.retry();
    }

    fn pump(&mut self) -> bool {
        self.prediction.pump()
    }

    fn is_loading(&self) -> bool {
        self.prediction.state().is_loading()
    }

    async fn changed(&mut self) {
        self.prediction.changed().await;
    }

    fn render(&self) -> Vec<String> {
        if self.is_loading() {
            return vec!["Running prediction model...".to_string()];
        }
        if let Some(message) = self.error_message() {
            return vec![message];
        }
        let Some(prediction) = self.prediction() else {
            return vec!["Enter a stock ticker to see its predicted closes.".to_string()];
        };

        let heading = match &prediction.company_name {
            Some(name) => format!("{name} ({})", prediction.symbol),
            None => prediction.symbol.clone(),
        };
        let mut lines = vec![heading];
        let mut details = Vec::new();
        if let Some(date) = &prediction.recent_date {
            details.push(("Recent date", date.clone()));
        }
        details.extend([
            ("Recent close", format::money(prediction.recent_close)),
            ("Predicted close", format::money(prediction.recent_predicted)),
            (
                "Prediction error",
                percentage_error(prediction.recent_predicted, prediction.recent_close)
                    .map_or_else(|| format::NOT_AVAILABLE.to_string(), format::percent),
            ),
        ]);
        lines.extend(format::key_values(&details));
        if !prediction.predictions.is_empty() {
            lines.push(String::new());
            let rows: Vec<Vec<String>> = prediction
                .predictions
                .iter()
                .map(|p| vec![p.date.clone(), format::money(p.predicted_close)])
                .collect();
            lines.extend(format::table(&["Date", "Predicted Close"], &rows));
        }
        lines
    }
}

#[cfg(test)]
#[path = "../tests/predictions_tests.rs"]
mod tests;
