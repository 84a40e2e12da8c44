//! ============================================================================
//! Calculation Save Client - Stores a computed plan in the user's history
//! ============================================================================

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::RiskPlan;

/// Save endpoint path
pub const SAVE_PATH: &str = "/calc/save/";

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("request to /calc/save/ failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("/calc/save/ returned HTTP {0}")]
    Status(u16),

    #[error("Error saving calculation: {0}")]
    Rejected(String),
}

/// Response of `POST /calc/save/`
#[derive(Debug, Clone, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

pub struct CalcSaveClient {
    client: reqwest::Client,
    base_url: String,
}

impl CalcSaveClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Submit a plan as a multipart form
    pub async fn save(&self, plan: &RiskPlan, symbol: &str) -> Result<SaveResponse, SaveError> {
        let url = format!("{}{}", self.base_url, SAVE_PATH);
        info!("Saving calculation for {} ({})", symbol, plan.input.direction);

        let form = reqwest::multipart::Form::new()
            .text("symbol", symbol.to_string())
            .text("direction", plan.input.direction.label())
            .text("entry_price", format!("{:.2}", plan.input.entry_price))
            .text("stop_loss", format!("{:.2}", plan.input.stop_loss))
            .text("custom_ratio", plan.input.custom_ratio.clone().unwrap_or_default())
            .text("risk_rs", format!("{:.2}", plan.risk_amount))
            .text("per_share_risk", format!("{:.2}", plan.per_share_risk))
            .text("risk_per_quantity", format!("{:.2}", plan.per_share_risk))
            .text("quantity", plan.quantity.to_string())
            .text("targets", plan.targets_text());

        let response = self
            .client
            .post(&url)
            .header("X-Requested-With", "XMLHttpRequest")
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SaveError::Status(response.status().as_u16()));
        }

        let body: SaveResponse = response.json().await?;
        if !body.success {
            let reason = body
                .error
                .clone()
                .or_else(|| body.message.clone())
                .unwrap_or_else(|| "Unknown error".to_string());
            warn!("Calculation rejected: {}", reason);
            return Err(SaveError::Rejected(reason));
        }

        info!("Calculation saved successfully");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::{compute, RiskInput};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn sample_plan() -> RiskPlan {
        compute(&RiskInput {
            capital: 100_000.0,
            entry_price: 500.0,
            stop_loss: 490.0,
            ..RiskInput::default()
        })
    }

    #[tokio::test]
    async fn test_save_posts_multipart_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calc/save/"))
            .and(header("X-Requested-With", "XMLHttpRequest"))
            .respond_with(|req: &Request| {
                let body = String::from_utf8_lossy(&req.body).to_string();
                let ok = body.contains("name=\"quantity\"")
                    && body.contains("100")
                    && body.contains("Buy (Long)")
                    && body.contains("INFY");
                ResponseTemplate::new(200).set_body_json(json!({"success": ok}))
            })
            .mount(&server)
            .await;

        let client = CalcSaveClient::new(&server.uri());
        let response = client.save(&sample_plan(), "INFY").await.unwrap();
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_rejection_carries_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calc/save/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error": "Not logged in"
            })))
            .mount(&server)
            .await;

        let err = CalcSaveClient::new(&server.uri())
            .save(&sample_plan(), "TCS")
            .await
            .unwrap_err();
        assert!(matches!(err, SaveError::Rejected(ref msg) if msg == "Not logged in"));
    }

    #[tokio::test]
    async fn test_rejection_without_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
            .mount(&server)
            .await;

        let err = CalcSaveClient::new(&server.uri())
            .save(&sample_plan(), "TCS")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Error saving calculation: Unknown error");
    }
}
