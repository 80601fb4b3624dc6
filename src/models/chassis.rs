// src/models/chassis.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Foto do número de chassi tirada no pátio, ligada a quem enviou
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Chassis {
    pub id: Uuid,
    #[schema(example = "MBLHA10EZ9HM12345")]
    pub chassis_number: String,
    pub chassis_photo_url: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChassisImageView {
    pub chassis_number: String,
    pub image_url: String,
}

impl From<Chassis> for ChassisImageView {
    fn from(chassis: Chassis) -> Self {
        Self {
            chassis_number: chassis.chassis_number,
            image_url: chassis.chassis_photo_url,
        }
    }
}

// Envio vindo do multipart, antes da validação
#[derive(Debug, Clone, Default)]
pub struct ChassisUpload {
    pub chassis_number: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}
