pub mod client;
pub mod retry;

use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use client::HttpAiGateway;
pub use retry::retry_ai;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("AI API key is not configured")]
    MissingApiKey,

    #[error("malformed AI response: {0}")]
    Malformed(String),
}

impl AiError {
    /// Rate-limit and overload signals are worth retrying; everything else
    /// aborts immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            AiError::Status { status, message } => {
                matches!(status, 429 | 503)
                    || message.contains("Quota exceeded")
                    || message.contains("RESOURCE_EXHAUSTED")
            }
            _ => false,
        }
    }
}

/// Extraction output for a supplier invoice. Best-effort: an empty item
/// list and a missing supplier name are valid responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedInvoice {
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub items: Vec<ExtractedInvoiceItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedInvoiceItem {
    pub raw_name: String,
    pub quantity: Option<BigDecimal>,
    pub unit_price: Option<BigDecimal>,
    pub raw_unit: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedQuote {
    #[serde(default)]
    pub items: Vec<ExtractedQuoteItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedQuoteItem {
    pub description: String,
    pub quantity: Option<BigDecimal>,
    pub unit: Option<String>,
    pub unit_price: Option<BigDecimal>,
}

/// Invoice line sent to the catalog matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub id: Uuid,
    pub raw_name: String,
    pub raw_unit: String,
}

/// Catalog entry sent to the matcher alongside the candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
}

/// One cleaned quote line. `clean_name` is the product name with labor
/// verbs stripped; `is_service_only` flags pure labor/transport lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedItem {
    pub original_text: String,
    pub clean_name: String,
    pub is_service_only: bool,
}

/// Web-grounded price lookup result. `found = false` is an expected,
/// valid answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketQuote {
    pub found: bool,
    pub price: Option<BigDecimal>,
    pub currency: Option<String>,
    pub store_name: Option<String>,
    pub source_url: Option<String>,
}

/// Boundary to the external AI services. The matcher enforces its own
/// >=90% confidence rule; associations it returns are taken as-is.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Whether the gateway has credentials. Checked before any write so a
    /// missing key surfaces as a validation error, not a dangling record.
    fn is_configured(&self) -> bool {
        true
    }

    async fn extract_invoice(&self, document_path: &str) -> Result<ExtractedInvoice, AiError>;

    async fn extract_quote(&self, document_path: &str) -> Result<ExtractedQuote, AiError>;

    async fn match_items(
        &self,
        items: &[MatchCandidate],
        catalog: &[CatalogEntry],
    ) -> Result<HashMap<Uuid, Uuid>, AiError>;

    async fn clean_items(&self, raw_texts: &[String]) -> Result<Vec<CleanedItem>, AiError>;

    async fn search_market_price(&self, clean_name: &str) -> Result<MarketQuote, AiError>;
}

/// Recording in-memory gateway for service tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingGateway {
        pub match_calls: AtomicUsize,
        pub clean_calls: AtomicUsize,
        pub market_calls: AtomicUsize,
        pub market_queries: Mutex<Vec<String>>,
        pub match_result: Mutex<HashMap<Uuid, Uuid>>,
        pub clean_result: Mutex<Vec<CleanedItem>>,
        pub market_result: Mutex<HashMap<String, MarketQuote>>,
        pub fail_cleaning: bool,
    }

    #[async_trait]
    impl AiGateway for RecordingGateway {
        async fn extract_invoice(&self, _document_path: &str) -> Result<ExtractedInvoice, AiError> {
            Ok(ExtractedInvoice::default())
        }

        async fn extract_quote(&self, _document_path: &str) -> Result<ExtractedQuote, AiError> {
            Ok(ExtractedQuote::default())
        }

        async fn match_items(
            &self,
            items: &[MatchCandidate],
            _catalog: &[CatalogEntry],
        ) -> Result<HashMap<Uuid, Uuid>, AiError> {
            self.match_calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let known = self.match_result.lock().unwrap();
            Ok(items
                .iter()
                .filter_map(|i| known.get(&i.id).map(|m| (i.id, *m)))
                .collect())
        }

        async fn clean_items(&self, raw_texts: &[String]) -> Result<Vec<CleanedItem>, AiError> {
            self.clean_calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if self.fail_cleaning {
                return Err(AiError::Status {
                    status: 500,
                    message: "cleaning failed".into(),
                });
            }
            let known = self.clean_result.lock().unwrap();
            Ok(known
                .iter()
                .filter(|c| raw_texts.contains(&c.original_text))
                .cloned()
                .collect())
        }

        async fn search_market_price(&self, clean_name: &str) -> Result<MarketQuote, AiError> {
            self.market_calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.market_queries
                .lock()
                .unwrap()
                .push(clean_name.to_string());
            let known = self.market_result.lock().unwrap();
            Ok(known.get(clean_name).cloned().unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_statuses_are_transient() {
        let err = AiError::Status {
            status: 429,
            message: "too many requests".into(),
        };
        assert!(err.is_transient());

        let err = AiError::Status {
            status: 503,
            message: "overloaded".into(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn quota_message_is_transient_regardless_of_status() {
        let err = AiError::Status {
            status: 400,
            message: "Quota exceeded for model".into(),
        };
        assert!(err.is_transient());

        let err = AiError::Status {
            status: 500,
            message: "RESOURCE_EXHAUSTED".into(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn other_errors_abort_immediately() {
        let err = AiError::Status {
            status: 400,
            message: "invalid request".into(),
        };
        assert!(!err.is_transient());
        assert!(!AiError::MissingApiKey.is_transient());
        assert!(!AiError::Malformed("truncated".into()).is_transient());
    }
}
