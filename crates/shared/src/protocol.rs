use serde::{Deserialize, Serialize};

pub const STORE_DELETED_MESSAGE: &str = "Store deleted successfully";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteStoreResponse {
    pub message: String,
}

impl DeleteStoreResponse {
    pub fn deleted() -> Self {
        Self {
            message: STORE_DELETED_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
