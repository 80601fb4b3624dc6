// src/models/verification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Ação registrada na trilha de auditoria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "verification_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VerificationAction {
    SalesVerified,
    AccountsVerified,
    RtoVerified,
}

// Entrada da trilha de auditoria. Só inserção: nunca alterada nem apagada.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_id: Uuid,
    pub action: VerificationAction,
    pub timestamp: DateTime<Utc>,
}

/// Entrada ainda não persistida, produzida por uma transição bem-sucedida.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVerificationLog {
    pub user_id: Uuid,
    pub customer_id: Uuid,
    pub action: VerificationAction,
    pub timestamp: DateTime<Utc>,
}
