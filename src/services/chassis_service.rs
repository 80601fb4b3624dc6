// src/services/chassis_service.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ChassisStore,
    models::{
        auth::Actor,
        chassis::{Chassis, ChassisUpload},
        document::ALLOWED_CONTENT_TYPES,
    },
    services::{
        access_policy::{self, Operation},
        document_storage::DocumentStorage,
    },
};

#[derive(Clone)]
pub struct ChassisService {
    store: Arc<dyn ChassisStore>,
    storage: Arc<dyn DocumentStorage>,
    bucket: String,
}

impl ChassisService {
    pub fn new(
        store: Arc<dyn ChassisStore>,
        storage: Arc<dyn DocumentStorage>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            store,
            storage,
            bucket: bucket.into(),
        }
    }

    pub async fn upload_chassis(
        &self,
        actor: &Actor,
        upload: ChassisUpload,
    ) -> Result<Chassis, AppError> {
        access_policy::authorize(actor, Operation::UploadChassis)?;

        let chassis_number = normalize_chassis_number(&upload.chassis_number)?;
        let extension = photo_extension(&upload.content_type)?;
        if upload.bytes.is_empty() {
            return Err(AppError::invalid_field(
                "chassis_photo",
                "empty_file",
                "Arquivo vazio.",
            ));
        }

        // Duplicado falha antes do upload
        if self.store.find_by_number(&chassis_number).await?.is_some() {
            return Err(AppError::PreconditionFailed(format!(
                "chassi {} já cadastrado",
                chassis_number
            )));
        }

        let filename = format!("{}.{}", chassis_number, extension);
        let url = self
            .storage
            .store_document(upload.bytes, &self.bucket, &filename)
            .await?;

        let chassis = Chassis {
            id: Uuid::new_v4(),
            chassis_number,
            chassis_photo_url: url,
            user_id: actor.user_id,
            created_at: Utc::now(),
        };
        let chassis = self.store.insert(&chassis).await.inspect_err(|_| {
            tracing::warn!(
                "⚠️ Chassi {} não gravado; foto órfã no storage: {}",
                chassis.chassis_number,
                chassis.chassis_photo_url
            )
        })?;

        tracing::info!(
            "📷 Chassi {} enviado por {}",
            chassis.chassis_number,
            actor.user_id
        );
        Ok(chassis)
    }

    pub async fn find_chassis(
        &self,
        actor: &Actor,
        chassis_number: &str,
    ) -> Result<Chassis, AppError> {
        access_policy::authorize(actor, Operation::ReadChassis)?;

        let chassis_number = normalize_chassis_number(chassis_number)?;
        self.store
            .find_by_number(&chassis_number)
            .await?
            .ok_or(AppError::NotFound("Chassi"))
    }
}

// Maiúsculas, sem espaços; só letras e dígitos (vira nome de arquivo)
fn normalize_chassis_number(raw: &str) -> Result<String, AppError> {
    let number: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    if number.is_empty() {
        return Err(AppError::invalid_field(
            "chassis_number",
            "required",
            "O número do chassi é obrigatório.",
        ));
    }
    if !number.chars().all(|c| c.is_ascii_alphanumeric()) || number.len() > 32 {
        return Err(AppError::invalid_field(
            "chassis_number",
            "invalid_chassis_number",
            "Número de chassi inválido.",
        ));
    }
    Ok(number)
}

fn photo_extension(content_type: &str) -> Result<&'static str, AppError> {
    match content_type {
        "image/jpeg" => Ok("jpg"),
        "image/png" => Ok("png"),
        _ => Err(AppError::invalid_field(
            "chassis_photo",
            "invalid_file_type",
            format!("Envie apenas {}.", ALLOWED_CONTENT_TYPES.join(" ou ")),
        )),
    }
}
