use raspadinha_core::{
    BatchStatus, BatchView, CardView, EngineConfig, EngineError, RevealEvent, ScratchMask,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header carrying the per-batch token issued on purchase.
pub const BATCH_TOKEN_HEADER: &str = "x-batch-token";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PurchaseRequest {
    pub client_seed: String,
    pub quantity: usize,
    #[serde(default)]
    pub bonus: usize,
}

impl PurchaseRequest {
    pub fn check(&self) -> ApiResult<()> {
        if self.quantity == 0 {
            return Err(ApiError::Invalid("quantity must be at least 1".into()));
        }
        if self.client_seed.trim().is_empty() {
            return Err(ApiError::Invalid("client_seed must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PurchaseResponse {
    pub batch_id: Uuid,
    pub token: String,
    pub server_seed_hash: String,
    pub nonce: u64,
    pub view: BatchView,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScratchRequest {
    pub card_index: usize,
    pub mask: ScratchMask,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScratchResponse {
    pub event: Option<RevealEvent>,
    pub status: BatchStatus,
    pub card: CardView,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VerifyResponse {
    pub server_seed_hash: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminSetConfigRequest {
    pub config: EngineConfig,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("batch not found")]
    NotFound,
    #[error("invalid batch token")]
    Unauthorized,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("too many active batches")]
    Busy,
    #[error("internal server error")]
    Internal,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Config(_)
            | EngineError::InvalidIndex { .. }
            | EngineError::MaskTooLarge { .. } => ApiError::Invalid(e.to_string()),
            EngineError::BatchFinished
            | EngineError::NotRevealed(_)
            | EngineError::NotFinished { .. } => ApiError::Conflict(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_bonus_defaults_to_zero() {
        let req: PurchaseRequest =
            serde_json::from_str(r#"{"client_seed":"abc","quantity":3}"#).unwrap();
        assert_eq!(req.bonus, 0);
        req.check().unwrap();
    }

    #[test]
    fn purchase_check_rejects_empty() {
        let req = PurchaseRequest {
            client_seed: " ".into(),
            quantity: 1,
            bonus: 0,
        };
        assert!(matches!(req.check(), Err(ApiError::Invalid(_))));
        let req = PurchaseRequest {
            client_seed: "abc".into(),
            quantity: 0,
            bonus: 2,
        };
        assert!(matches!(req.check(), Err(ApiError::Invalid(_))));
    }

    #[test]
    fn engine_errors_map_to_api_errors() {
        assert!(matches!(
            ApiError::from(EngineError::InvalidIndex { index: 4, len: 2 }),
            ApiError::Invalid(_)
        ));
        assert!(matches!(
            ApiError::from(EngineError::MaskTooLarge { points: 9, max: 4 }),
            ApiError::Invalid(_)
        ));
        assert!(matches!(
            ApiError::from(EngineError::BatchFinished),
            ApiError::Conflict(_)
        ));
    }

    #[test]
    fn scratch_request_shape() {
        let req: ScratchRequest = serde_json::from_str(
            r#"{"card_index":2,"mask":{"kind":"stroke","points":[{"x":1.0,"y":1.0},{"x":9.0,"y":1.0}]}}"#,
        )
        .unwrap();
        assert_eq!(req.card_index, 2);
        assert!(matches!(req.mask, ScratchMask::Stroke { ref points } if points.len() == 2));
    }
}
