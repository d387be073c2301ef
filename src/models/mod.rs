mod billing;
mod chat;
mod health;
mod kpi;

pub use billing::{BillingRecord, MonthlySpend, RawBillingRow, ResourceMetadata};
pub use chat::{ChatRequest, ChatResponse, ChatStatus, RagAnswer, RetrievedChunk, UNKNOWN_SOURCE};
pub use health::{HealthCheckResponse, SERVICE_NAME};
pub use kpi::{CostDriver, KpiResponse};
