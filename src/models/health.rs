use serde::{Deserialize, Serialize};

pub const SERVICE_NAME: &str = "finops-copilot-api";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub service: String,
}

impl HealthCheckResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            service: SERVICE_NAME.to_string(),
        }
    }
}
