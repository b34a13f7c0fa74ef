//! Gemini adapter for production forecasts.
//!
//! Calls the `generateContent` REST endpoint and returns the first candidate's
//! text as-is.

use crate::domain::{DomainError, SalesRecord};
use crate::ports::ForecastPort;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiAdapter {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiAdapter {
    /// # Arguments
    /// * `api_key` - Google AI Studio key
    /// * `model` - Model name (e.g., "gemini-1.5-flash")
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base(API_BASE.to_string(), api_key, model)
    }

    fn with_base(api_base: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }

    /// Build the analyst prompt around the pretty-printed sales records.
    pub fn build_prompt(records: &[SalesRecord]) -> Result<String, DomainError> {
        let data = serde_json::to_string_pretty(records)
            .map_err(|e| DomainError::Forecast(format!("serialize sales data: {}", e)))?;

        Ok(format!(
            r#"You are an analytics assistant for the owner of a small bakery.
Below is pie sales data for the most recent days.

Data:
{data}

Analyze the data and give a short, direct production recommendation for tomorrow.
Do not explain your method and do not write an introduction. Give only the result.

Your answer must look exactly like this:
"Forecast for tomorrow:"
followed immediately by a bulleted list, for example:
* Meat: 35 pcs
* Potato: 40 pcs
* Sausage roll: 38 pcs

Do not use Markdown formatting in the answer."#
        ))
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<PartOut>,
}

#[derive(Serialize)]
struct PartOut {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Deserialize)]
struct PartIn {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .next()
    }
}

#[async_trait::async_trait]
impl ForecastPort for GeminiAdapter {
    async fn forecast(&self, records: &[SalesRecord]) -> Result<String, DomainError> {
        info!(
            records = records.len(),
            model = %self.model,
            "requesting production forecast"
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![PartOut {
                    text: Self::build_prompt(records)?,
                }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::Forecast(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "forecast API returned error");
            return Err(DomainError::Forecast(format!(
                "API error {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| DomainError::Forecast(format!("Failed to parse API response: {}", e)))?;

        let text = parsed
            .first_text()
            .ok_or_else(|| DomainError::Forecast("No candidates returned".to_string()))?;

        debug!(len = text.len(), "forecast received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<SalesRecord> {
        vec![
            SalesRecord {
                log_date: "2024-08-01".into(),
                pie_type: "Potato".into(),
                sold_quantity: 18,
            },
            SalesRecord {
                log_date: "2024-08-01".into(),
                pie_type: "Meat".into(),
                sold_quantity: 22,
            },
        ]
    }

    #[test]
    fn test_prompt_embeds_records() {
        let prompt = GeminiAdapter::build_prompt(&records()).unwrap();
        assert!(prompt.contains("analytics assistant"));
        assert!(prompt.contains(r#""pie_type": "Potato""#));
        assert!(prompt.contains(r#""sold_quantity": 18"#));
        assert!(prompt.contains(r#""log_date": "2024-08-01""#));
    }

    #[test]
    fn test_endpoint() {
        let adapter = GeminiAdapter::with_base(
            "http://localhost:9000/models/".into(),
            "k".into(),
            "gemini-1.5-flash".into(),
        );
        assert_eq!(
            adapter.endpoint(),
            "http://localhost:9000/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_first_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Forecast for tomorrow:\n* Meat: 30 pcs"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.first_text().as_deref(),
            Some("Forecast for tomorrow:\n* Meat: 30 pcs")
        );

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.first_text().is_none());

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(blocked.first_text().is_none());
    }
}
