use std::sync::Arc;

use async_trait::async_trait;
use client_core::{DashboardApi, FetchController};
use shared::protocol::NewsArticle;

use crate::{
    events::PageError,
    pages::Page,
};

pub const NO_NEWS: &str = "No news available.";
const SUMMARY_LIMIT: usize = 200;

fn summary_line(summary: &str) -> Option<String> {
    let summary = summary.trim();
    if summary.is_empty() {
        return None;
    }
    if summary.chars().count() <= SUMMARY_LIMIT {
        return Some(summary.to_string());
    }
    let cut: String = summary.chars().take(SUMMARY_LIMIT).collect();
    Some(format!("{}...", cut.trim_end()))
}

pub struct NewsPage {
    articles: FetchController<(), Vec<NewsArticle>>,
}

impl NewsPage {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        let articles = FetchController::new("news", move |()| {
            let api = Arc::clone(&api);
            async move { api.news().await }
        })
        .retain_data_while_loading();
        Self { articles }
    }

    pub fn load(&mut self) {
        self.articles.trigger(());
    }

    pub fn articles(&self) -> &[NewsArticle] {
        self.articles.data().map(Vec::as_slice).unwrap_or(&[])
    }
}

#[async_trait]
impl Page for NewsPage {
    fn title(&self) -> &'static str {
        "Market News"
    }

    fn refresh(&mut self) {
        if !self.articles.state().is_loading() {
            self.articles.trigger(());
        }
    }

    fn pump(&mut self) -> bool {
        self.articles.pump()
    }

    fn is_loading(&self) -> bool {
        self.articles.state().is_loading()
    }

    async fn changed(&mut self) {
        self.articles.changed().await;
    }

    fn render(&self) -> Vec<String> {
        if let Some(err) = self.articles.failure() {
            return vec![PageError::from_fetch(err).render()];
        }
        if self.articles.data().is_none() {
            if self.is_loading() {
                return vec!["Loading news...".to_string()];
            }
            return Vec::new();
        }
        let articles = self.articles();
        if articles.is_empty() {
            return vec![NO_NEWS.to_string()];
        }

        let mut lines = Vec::new();
        for (index, article) in articles.iter().enumerate() {
            if index > 0 {
                lines.push(String::new());
            }
            lines.push(format!("{} ({})", article.headline.trim(), article.source));
            if let Some(summary) = summary_line(&article.summary) {
                lines.push(format!("  {summary}"));
            }
            if !article.url.is_empty() {
                lines.push(format!("  {}", article.url));
            }
        }
        lines
    }
}

#[cfg(test)]
#[path = "../tests/news_tests.rs"]
mod tests;
