use std::sync::Arc;

use async_trait::async_trait;
use client_core::{DashboardApi, FetchController, FetchError};
use shared::{
    domain::{EvaluationWindow, Ticker},
    protocol::{Evaluation, ModelEvaluation, TradingReturns},
};

use crate::{format, pages::Page};

pub const DEFAULT_MODEL: &str = "ensemble";

/// `random_forest` -> `RANDOM FOREST`. Only the first underscore is replaced,
/// matching how the backend's model names are shown elsewhere.
pub fn model_label(name: &str) -> String {
    name.replacen('_', " ", 1).to_uppercase()
}

fn model_key(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Back-tests every prediction model for one ticker and compares them.
pub struct ModelPerformancePage {
    evaluation: FetchController<(Ticker, EvaluationWindow), Evaluation>,
    selected: String,
}

impl ModelPerformancePage {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        let evaluation =
            FetchController::new("evaluation", move |(ticker, window): (Ticker, EvaluationWindow)| {
                let api = Arc::clone(&api);
                async move { api.evaluate(&ticker, window).await }
            });
        Self {
            evaluation,
            selected: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn evaluate(&mut self, raw: &str, window: EvaluationWindow) -> bool {
        match Ticker::parse(raw) {
            Ok(ticker) => {
                self.evaluation.trigger((ticker, window));
                true
            }
            Err(err) => {
                self.evaluation.reject(err.to_string());
                false
            }
        }
    }

    /// Accepts `random_forest`, `Random Forest` and the like. Before results
    /// land any name is kept; afterwards it must be one of the evaluated models.
    pub fn select_model(&mut self, raw: &str) -> bool {
        let key = model_key(raw);
        if key.is_empty() {
            return false;
        }
        if let Some(evaluation) = self.evaluation() {
            if evaluation.model(&key).is_none() {
                return false;
            }
        }
        self.selected = key;
        true
    }

    pub fn selected_model(&self) -> &str {
        &self.selected
    }

    pub fn window(&self) -> Option<EvaluationWindow> {
        self.evaluation.last_key().map(|(_, window)| *window)
    }

    pub fn evaluation(&self) -> Option<&Evaluation> {
        self.evaluation.data()
    }

    /// The selected model's results, or the best model's when the selection
    /// is not part of this evaluation.
    pub fn shown_model(&self) -> Option<(&str, &ModelEvaluation)> {
        let evaluation = self.evaluation()?;
        [self.selected.as_str(), evaluation.best_model.as_str()]
            .into_iter()
            .find_map(|name| evaluation.model(name).map(|model| (name, model)))
    }

    pub fn error_message(&self) -> Option<String> {
        let failure = self.evaluation.failure()?;
        if let FetchError::Validation(message) = failure {
            return Some(message.clone());
        }
        let ticker = self
            .evaluation
            .last_key()
            .map(|(ticker, _)| ticker.to_string())
            .unwrap_or_default();
        Some(format!(
            "Error: Could not evaluate {ticker}. Please check the ticker and try again."
        ))
    }

    fn render_summary(evaluation: &Evaluation) -> Vec<String> {
        let period = &evaluation.test_period;
        format::key_values(&[
            ("Ticker", evaluation.ticker.clone()),
            (
                "Test period",
                format!(
                    "{} days ({} to {})",
                    period.days, period.start_date, period.end_date
                ),
            ),
            ("Best model", model_label(&evaluation.best_model)),
            ("Models tested", evaluation.models.len().to_string()),
        ])
    }

    fn render_comparison(evaluation: &Evaluation) -> Vec<String> {
        let rows: Vec<Vec<String>> = evaluation
            .models
            .iter()
            .map(|(name, model)| {
                let mut label = model_label(name);
                if *name == evaluation.best_model {
                    label.push_str(" (best)");
                }
                let metrics = &model.metrics;
                vec![
                    label,
                    format::money(metrics.mae),
                    format::money(metrics.rmse),
                    format::percent(metrics.mape),
                    format::fixed(metrics.r_squared, 4),
                    format::percent(metrics.directional_accuracy),
                ]
            })
            .collect();
        let mut lines = vec!["Model Comparison".to_string()];
        lines.extend(format::table(
            &["Model", "MAE", "RMSE", "MAPE", "R²", "Dir Acc"],
            &rows,
        ));
        lines
    }

    fn render_model(evaluation: &Evaluation, name: &str, model: &ModelEvaluation) -> Vec<String> {
        let rows: Vec<Vec<String>> = evaluation
            .dates
            .iter()
            .zip(&evaluation.actuals)
            .zip(&model.predictions)
            .map(|((date, actual), predicted)| {
                vec![
                    date.clone(),
                    format::money(*actual),
                    format::money(*predicted),
                    format::signed_money(predicted - actual),
                ]
            })
            .collect();
        let mut lines = vec![format!("Actual vs predicted: {}", model_label(name))];
        lines.extend(format::table(
            &["Date", "Actual", "Predicted", "Error"],
            &rows,
        ));
        lines
    }

    fn render_returns(returns: &TradingReturns) -> Vec<String> {
        let mut lines = vec!["Trading Performance".to_string()];
        lines.extend(format::key_values(&[
            ("Initial capital", format::money(returns.initial_capital)),
            ("Final value", format::money(returns.final_value)),
            ("Total return", format::signed_percent(returns.total_return)),
            ("Buy & hold return", format::signed_percent(returns.buy_hold_return)),
            ("vs Buy & Hold", format::signed_percent(returns.outperformance)),
            ("Sharpe ratio", format::fixed(returns.sharpe_ratio, 2)),
            ("Max drawdown", format::percent(returns.max_drawdown)),
            ("Trades", returns.num_trades.to_string()),
        ]));
        lines
    }
}

#[async_trait]
impl Page for ModelPerformancePage {
    fn title(&self) -> &'static str {
        "Model Performance"
    }

    fn refresh(&mut self) {
        self.evaluation.retry();
    }

    fn pump(&mut self) -> bool {
        self.evaluation.pump()
    }

    fn is_loading(&self) -> bool {
        self.evaluation.state().is_loading()
    }

    async fn changed(&mut self) {
        self.evaluation.changed().await;
    }

    fn render(&self) -> Vec<String> {
        if self.is_loading() {
            return vec![
                "Running evaluation...".to_string(),
                "Training the models and backtesting; this can take a while.".to_string(),
            ];
        }
        if let Some(message) = self.error_message() {
            return vec![message];
        }
        let Some(evaluation) = self.evaluation() else {
            return vec!["Enter a stock ticker to evaluate the prediction models.".to_string()];
        };

        let mut lines = Self::render_summary(evaluation);
        lines.push(String::new());
        lines.extend(Self::render_comparison(evaluation));
        if let Some((name, model)) = self.shown_model() {
            lines.push(String::new());
            lines.extend(Self::render_model(evaluation, name, model));
        }
        if let Some(returns) = &evaluation.returns {
            lines.push(String::new());
            lines.extend(Self::render_returns(returns));
        }
        lines
    }
}

#[cfg(test)]
#[path = "../tests/evaluation_tests.rs"]
mod tests;
