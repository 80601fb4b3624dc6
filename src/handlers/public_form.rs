// src/handlers/public_form.rs
//
// Rotas sem autenticação: o link token é a credencial do cliente final.

use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        customer::{CustomerDetail, CustomerFormFields, PublicFormView},
        document::{DocumentKind, DocumentUpload},
    },
};

// GET /api/public/forms/{link_token}
#[utoipa::path(
    get,
    path = "/api/public/forms/{link_token}",
    tag = "Public Form",
    params(("link_token" = Uuid, Path, description = "Token do link enviado ao cliente")),
    responses(
        (status = 200, description = "Saudação do formulário", body = PublicFormView),
        (status = 404, description = "Link inválido")
    )
)]
pub async fn get_form(
    State(app_state): State<AppState>,
    Path(link_token): Path<Uuid>,
) -> Result<Json<PublicFormView>, AppError> {
    let view = app_state.customer_service.get_form(link_token).await?;
    Ok(Json(view))
}

// POST /api/public/forms/{link_token}
#[utoipa::path(
    post,
    path = "/api/public/forms/{link_token}",
    tag = "Public Form",
    params(("link_token" = Uuid, Path, description = "Token do link enviado ao cliente")),
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "first_name, last_name, email, address, alternate_phone_number, pin_code, dob (AAAA-MM-DD), nominee, relation + arquivos aadhaar_front, aadhaar_back, passport e signature (opcional)"
    ),
    responses(
        (status = 200, description = "Formulário recebido", body = CustomerDetail),
        (status = 400, description = "Campos ou arquivos inválidos"),
        (status = 404, description = "Link inválido"),
        (status = 409, description = "Formulário já verificado por vendas"),
        (status = 502, description = "Falha no armazenamento dos documentos")
    )
)]
pub async fn submit_form(
    State(app_state): State<AppState>,
    Path(link_token): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<CustomerDetail>, AppError> {
    let mut fields = CustomerFormFields::default();
    let mut documents = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if let Some(kind) = DocumentKind::from_field_name(&name) {
            documents.push(read_document(kind, field).await?);
            continue;
        }

        let value = field.text().await.map_err(malformed)?;
        match name.as_str() {
            "first_name" => fields.first_name = value,
            "last_name" => fields.last_name = value,
            "email" => fields.email = value,
            "address" => fields.address = value,
            "alternate_phone_number" => fields.alternate_phone_number = Some(value),
            "pin_code" => fields.pin_code = Some(value),
            "dob" => fields.dob = Some(value),
            "nominee" => fields.nominee = Some(value),
            "relation" => fields.relation = Some(value),
            other => tracing::debug!("Campo desconhecido ignorado no formulário: {}", other),
        }
    }

    let customer = app_state
        .customer_service
        .submit_form(link_token, fields, documents)
        .await?;

    Ok(Json(customer.into()))
}

async fn read_document(kind: DocumentKind, field: Field<'_>) -> Result<DocumentUpload, AppError> {
    let filename = field
        .file_name()
        .map(str::to_owned)
        .unwrap_or_else(|| kind.field_name().to_string());
    let content_type = field
        .content_type()
        .map(str::to_owned)
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let bytes = field.bytes().await.map_err(malformed)?;

    Ok(DocumentUpload {
        kind,
        filename,
        content_type,
        bytes: bytes.to_vec(),
    })
}

pub(super) fn malformed(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::invalid_field("form", "malformed_multipart", err.body_text())
}
