// src/handlers/customers.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        auth::Actor,
        customer::{
            CustomerCreated, CustomerDetail, FinancePatch, ListCustomersQuery, NewCustomerPayload,
            PostSalePatch, RegisterVehiclePayload, SalesDetailsPatch,
        },
        verification::VerificationLog,
    },
};

// =============================================================================
//  ÁREA 1: CONSULTAS (TODOS OS PAPÉIS)
// =============================================================================

// GET /api/customers
#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Customers",
    params(ListCustomersQuery),
    responses(
        (status = 200, description = "Clientes visíveis para o funcionário", body = Vec<CustomerDetail>),
        (status = 403, description = "Filial fora do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    actor: Actor,
    Query(query): Query<ListCustomersQuery>,
) -> Result<Json<Vec<CustomerDetail>>, AppError> {
    let customers = app_state.customer_service.list_customers(&actor, query).await?;
    Ok(Json(customers.into_iter().map(CustomerDetail::from).collect()))
}

// GET /api/customers/{id}
#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente", body = CustomerDetail),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerDetail>, AppError> {
    let customer = app_state.customer_service.get_customer(id, &actor).await?;
    Ok(Json(customer.into()))
}

// GET /api/customers/{id}/logs
#[utoipa::path(
    get,
    path = "/api/customers/{id}/logs",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Trilha de verificações, da mais antiga para a mais nova", body = Vec<VerificationLog>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_verification_history(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<VerificationLog>>, AppError> {
    let logs = app_state
        .customer_service
        .verification_history(id, &actor)
        .await?;
    Ok(Json(logs))
}

// =============================================================================
//  ÁREA 2: VENDAS
// =============================================================================

// POST /api/sales/customers
#[utoipa::path(
    post,
    path = "/api/sales/customers",
    tag = "Sales",
    request_body = NewCustomerPayload,
    responses(
        (status = 201, description = "Cliente cadastrado; envie o formLink ao cliente", body = CustomerCreated),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Apenas vendas")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    actor: Actor,
    Json(payload): Json<NewCustomerPayload>,
) -> Result<impl IntoResponse, AppError> {
    let created = app_state
        .customer_service
        .create_customer(&actor, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

// PATCH /api/sales/customers/{id}
#[utoipa::path(
    patch,
    path = "/api/sales/customers/{id}",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = SalesDetailsPatch,
    responses(
        (status = 200, description = "Dados de venda atualizados", body = CustomerDetail),
        (status = 409, description = "Bloqueado após a verificação de contas")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_sales_details(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(patch): Json<SalesDetailsPatch>,
) -> Result<Json<CustomerDetail>, AppError> {
    let customer = app_state
        .customer_service
        .update_sales_details(id, &actor, patch)
        .await?;
    Ok(Json(customer.into()))
}

// POST /api/sales/customers/{id}/verify
#[utoipa::path(
    post,
    path = "/api/sales/customers/{id}/verify",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Verificado por vendas", body = CustomerDetail),
        (status = 403, description = "Papel ou filial sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn verify_sales(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerDetail>, AppError> {
    let customer = app_state.customer_service.verify_sales(id, &actor).await?;
    Ok(Json(customer.into()))
}

// =============================================================================
//  ÁREA 3: CONTAS
// =============================================================================

// PATCH /api/accounts/customers/{id}/finance
#[utoipa::path(
    patch,
    path = "/api/accounts/customers/{id}/finance",
    tag = "Accounts",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = FinancePatch,
    responses(
        (status = 200, description = "Financiamento atualizado e saldo recalculado", body = CustomerDetail),
        (status = 404, description = "Cliente ou financeira não encontrados"),
        (status = 409, description = "Bloqueado após a verificação do RTO")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_finance(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(patch): Json<FinancePatch>,
) -> Result<Json<CustomerDetail>, AppError> {
    let customer = app_state
        .customer_service
        .update_finance(id, &actor, patch)
        .await?;
    Ok(Json(customer.into()))
}

// POST /api/accounts/customers/{id}/verify
#[utoipa::path(
    post,
    path = "/api/accounts/customers/{id}/verify",
    tag = "Accounts",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Verificado por contas", body = CustomerDetail),
        (status = 409, description = "Vendas ainda não verificou")
    ),
    security(("api_jwt" = []))
)]
pub async fn verify_accounts(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerDetail>, AppError> {
    let customer = app_state.customer_service.verify_accounts(id, &actor).await?;
    Ok(Json(customer.into()))
}

// =============================================================================
//  ÁREA 4: RTO
// =============================================================================

// POST /api/rto/customers/{id}/verify
#[utoipa::path(
    post,
    path = "/api/rto/customers/{id}/verify",
    tag = "RTO",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Verificado pelo RTO", body = CustomerDetail),
        (status = 409, description = "Vendas e contas ainda não verificaram")
    ),
    security(("api_jwt" = []))
)]
pub async fn verify_rto(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerDetail>, AppError> {
    let customer = app_state.customer_service.verify_rto(id, &actor).await?;
    Ok(Json(customer.into()))
}

// POST /api/rto/customers/{id}/register
#[utoipa::path(
    post,
    path = "/api/rto/customers/{id}/register",
    tag = "RTO",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = RegisterVehiclePayload,
    responses(
        (status = 200, description = "Veículo registrado", body = CustomerDetail),
        (status = 409, description = "RTO não verificou ou veículo já registrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_vehicle(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<RegisterVehiclePayload>,
) -> Result<Json<CustomerDetail>, AppError> {
    payload.validate()?;

    let customer = app_state
        .customer_service
        .register_vehicle(id, &actor, payload.vehicle_number)
        .await?;
    Ok(Json(customer.into()))
}

// PATCH /api/rto/customers/{id}
#[utoipa::path(
    patch,
    path = "/api/rto/customers/{id}",
    tag = "RTO",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = PostSalePatch,
    responses(
        (status = 200, description = "Dados pós-venda atualizados", body = CustomerDetail)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_post_sale(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(patch): Json<PostSalePatch>,
) -> Result<Json<CustomerDetail>, AppError> {
    let customer = app_state
        .customer_service
        .update_post_sale(id, &actor, patch)
        .await?;
    Ok(Json(customer.into()))
}
