//! Question service gateway
//!
//! Supplies the category and language taxonomies and picks a question for a
//! matched pair, filtered by complexity, language and categories.

use crate::clients::{status_error, transport_error};
use crate::error::Result;
use crate::types::{Complexity, Language, Question};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "question-service";

/// Contract consumed from the external question service
#[async_trait]
pub trait QuestionClient: Send + Sync {
    /// All valid category labels
    async fn fetch_categories(&self) -> Result<Vec<String>>;

    /// All supported languages with their slugs
    async fn fetch_languages(&self) -> Result<Vec<Language>>;

    /// Pick one question matching the filters. An empty `categories` slice
    /// means no category filter. `Ok(None)` when nothing matches.
    async fn find_question(
        &self,
        complexity: Complexity,
        language: &str,
        categories: &[String],
    ) -> Result<Option<Question>>;
}

/// The question service wraps every payload in a `data` field
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Option<T>,
}

/// reqwest-backed question service gateway
#[derive(Debug, Clone)]
pub struct HttpQuestionClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpQuestionClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl QuestionClient for HttpQuestionClient {
    async fn fetch_categories(&self) -> Result<Vec<String>> {
        let url = format!("{}/question-service/categories", self.base_url);
        debug!("Fetching categories from: {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let envelope: DataEnvelope<Vec<String>> =
            response.json().await.map_err(|e| transport_error(SERVICE, e))?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn fetch_languages(&self) -> Result<Vec<Language>> {
        let url = format!("{}/question-service/languages", self.base_url);
        debug!("Fetching languages from: {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let envelope: DataEnvelope<Vec<Language>> =
            response.json().await.map_err(|e| transport_error(SERVICE, e))?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn find_question(
        &self,
        complexity: Complexity,
        language: &str,
        categories: &[String],
    ) -> Result<Option<Question>> {
        let url = format!(
            "{}/question-service/question-matching/question",
            self.base_url
        );

        let mut query: Vec<(&str, String)> = vec![
            ("complexity", complexity.to_string()),
            ("language", language.to_string()),
        ];
        for category in categories {
            query.push(("categories[]", category.clone()));
        }

        debug!(
            "Fetching question: complexity={}, language={}, categories={:?}",
            complexity, language, categories
        );

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        // The service answers 200 with or without contents; an absent `data`
        // field means no question matched the filters.
        let envelope: DataEnvelope<Question> =
            response.json().await.map_err(|e| transport_error(SERVICE, e))?;
        Ok(envelope.data)
    }
}
