// src/handlers/chassis.rs

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::public_form::malformed;
use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        auth::Actor,
        chassis::{Chassis, ChassisImageView, ChassisUpload},
    },
};

// POST /api/chassis
#[utoipa::path(
    post,
    path = "/api/chassis",
    tag = "Chassis",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "chassis_number + arquivo chassis_photo (JPEG ou PNG)"
    ),
    responses(
        (status = 201, description = "Foto do chassi registrada", body = Chassis),
        (status = 400, description = "Número ou arquivo inválido"),
        (status = 409, description = "Chassi já cadastrado"),
        (status = 502, description = "Falha no armazenamento da foto")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_chassis(
    State(app_state): State<AppState>,
    actor: Actor,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload = ChassisUpload::default();
    let mut has_photo = false;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            "chassis_number" => {
                upload.chassis_number = field.text().await.map_err(malformed)?;
            }
            "chassis_photo" => {
                upload.content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                upload.bytes = field.bytes().await.map_err(malformed)?.to_vec();
                has_photo = true;
            }
            other => tracing::debug!("Campo desconhecido ignorado no envio do chassi: {}", other),
        }
    }

    if !has_photo {
        return Err(AppError::invalid_field(
            "chassis_photo",
            "required",
            "A foto do chassi é obrigatória.",
        ));
    }

    let chassis = app_state.chassis_service.upload_chassis(&actor, upload).await?;
    Ok((StatusCode::CREATED, Json(chassis)))
}

// GET /api/chassis/{chassis_number}/image
#[utoipa::path(
    get,
    path = "/api/chassis/{chassis_number}/image",
    tag = "Chassis",
    params(("chassis_number" = String, Path, description = "Número do chassi")),
    responses(
        (status = 200, description = "URL da foto", body = ChassisImageView),
        (status = 404, description = "Chassi não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_chassis_image(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(chassis_number): Path<String>,
) -> Result<Json<ChassisImageView>, AppError> {
    let chassis = app_state
        .chassis_service
        .find_chassis(&actor, &chassis_number)
        .await?;
    Ok(Json(chassis.into()))
}
