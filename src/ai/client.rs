use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use super::{
    AiError, AiGateway, CatalogEntry, CleanedItem, ExtractedInvoice, ExtractedQuote,
    MarketQuote, MatchCandidate,
};
use crate::config::AiConfig;

/// HTTP implementation of [`AiGateway`] against the AI bridge service.
/// Confidence thresholds, prompt wording and grounding all live on the
/// other side of this boundary.
pub struct HttpAiGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpAiGateway {
    pub fn new(config: &AiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, AiError> {
        let key = self.api_key.as_deref().ok_or(AiError::MissingApiKey)?;

        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| AiError::Malformed(e.to_string()))
    }
}

#[derive(Serialize)]
struct ExtractionRequest<'a> {
    document_path: &'a str,
}

#[derive(Serialize)]
struct MatchRequest<'a> {
    items: &'a [MatchCandidate],
    catalog: &'a [CatalogEntry],
}

#[derive(Deserialize)]
struct MatchResponse {
    #[serde(default)]
    matches: HashMap<Uuid, Uuid>,
}

#[derive(Serialize)]
struct CleaningRequest<'a> {
    texts: &'a [String],
}

#[derive(Deserialize)]
struct CleaningResponse {
    #[serde(default)]
    items: Vec<CleanedItem>,
}

#[derive(Serialize)]
struct MarketRequest<'a> {
    query: &'a str,
}

#[async_trait]
impl AiGateway for HttpAiGateway {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn extract_invoice(&self, document_path: &str) -> Result<ExtractedInvoice, AiError> {
        self.post("/v1/invoice-extraction", &ExtractionRequest { document_path })
            .await
    }

    async fn extract_quote(&self, document_path: &str) -> Result<ExtractedQuote, AiError> {
        self.post("/v1/quote-extraction", &ExtractionRequest { document_path })
            .await
    }

    async fn match_items(
        &self,
        items: &[MatchCandidate],
        catalog: &[CatalogEntry],
    ) -> Result<HashMap<Uuid, Uuid>, AiError> {
        let response: MatchResponse = self
            .post("/v1/catalog-match", &MatchRequest { items, catalog })
            .await?;
        Ok(response.matches)
    }

    async fn clean_items(&self, raw_texts: &[String]) -> Result<Vec<CleanedItem>, AiError> {
        let response: CleaningResponse = self
            .post("/v1/item-cleaning", &CleaningRequest { texts: raw_texts })
            .await?;
        Ok(response.items)
    }

    async fn search_market_price(&self, clean_name: &str) -> Result<MarketQuote, AiError> {
        self.post("/v1/market-price", &MarketRequest { query: clean_name })
            .await
    }
}
