// src/models/finance.rs

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Financeira parceira. O valor financiado fica no cliente, não aqui.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinanceOption {
    pub id: Uuid,
    #[schema(example = "HDFC Bank")]
    pub company_name: String,
    pub details: Option<String>,
}
