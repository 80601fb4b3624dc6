// src/models/customer.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::patch::Patch;

// --- ENUMS ---

// Status informativo do cadastro (texto livre no legado, fechado aqui)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "customer_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    Pending,
    Submitted,
    Registered,
}

/// Etapa do fluxo, derivada das flags de verificação. Não é gravada no banco.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Created,
    Submitted,
    SalesVerified,
    AccountsVerified,
    RtoVerified,
    Registered,
}

// --- CLIENTE ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub sales_executive_id: Option<Uuid>,

    // Identidade
    #[schema(example = "Ravi Kumar")]
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[schema(example = "9876543210")]
    pub phone_number: String,
    pub alternate_phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub pin_code: Option<String>,
    pub dob: Option<NaiveDate>,
    pub nominee: Option<String>,
    pub relation: Option<String>,

    // Veículo
    #[schema(example = "Jupiter")]
    pub vehicle_name: String,
    #[schema(example = "ZX Disc")]
    pub vehicle_variant: String,
    pub vehicle_color: Option<String>,

    // Preço itemizado
    #[schema(example = "80000.00")]
    pub ex_showroom_price: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub insurance: Option<Decimal>,
    pub tp_registration: Option<Decimal>,
    pub man_accessories: Option<Decimal>,
    pub optional_accessories: Option<Decimal>,
    pub booking_amount: Option<Decimal>,

    // Campos calculados. Nunca editados diretamente.
    #[schema(example = "94000.00")]
    pub total_price: Decimal,
    #[schema(example = "24000.00")]
    pub balance_amount: Decimal,

    // Pagamentos
    pub finance_id: Option<Uuid>,
    pub finance_amount: Option<Decimal>,
    pub amount_paid: Option<Decimal>,

    // Documentos (URLs do storage)
    pub photo_aadhaar_front: Option<String>,
    pub photo_aadhaar_back: Option<String>,
    pub photo_passport: Option<String>,
    pub customer_sign: Option<String>,

    // Fluxo
    pub link_token: Uuid,
    pub status: CustomerStatus,
    pub sales_verified: bool,
    pub accounts_verified: bool,
    pub rto_verified: bool,
    pub registered: bool,
    #[schema(example = "KA01AB1234")]
    pub vehicle_number: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn stage(&self) -> WorkflowStage {
        if self.registered {
            WorkflowStage::Registered
        } else if self.rto_verified {
            WorkflowStage::RtoVerified
        } else if self.accounts_verified {
            WorkflowStage::AccountsVerified
        } else if self.sales_verified {
            WorkflowStage::SalesVerified
        } else if self.status == CustomerStatus::Submitted {
            WorkflowStage::Submitted
        } else {
            WorkflowStage::Created
        }
    }
}

// Resposta completa (Cliente + Etapa calculada)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub stage: WorkflowStage,
}

impl From<Customer> for CustomerDetail {
    fn from(customer: Customer) -> Self {
        let stage = customer.stage();
        Self { customer, stage }
    }
}

// Resposta da criação: o vendedor envia o link para o cliente preencher o formulário
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCreated {
    pub customer: CustomerDetail,
    #[schema(example = "https://app.concessionaria.com/customer-form/550e8400-e29b-41d4-a716-446655440000")]
    pub form_link: String,
}

// O que o cliente final vê ao abrir o link (saudação)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicFormView {
    pub name: String,
    pub vehicle_name: String,
    pub vehicle_variant: String,
}

// =============================================================================
//  PAYLOADS
// =============================================================================

// Só espaços conta como vazio
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

// Criação pelo vendedor
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomerPayload {
    #[validate(custom(function = "not_blank", message = "O nome é obrigatório."))]
    #[schema(example = "Ravi Kumar")]
    pub name: String,

    #[validate(length(min = 6, max = 15, message = "Telefone inválido."))]
    #[schema(example = "9876543210")]
    pub phone_number: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,

    #[validate(custom(function = "not_blank", message = "O veículo é obrigatório."))]
    pub vehicle_name: String,
    #[validate(custom(function = "not_blank", message = "A variante é obrigatória."))]
    pub vehicle_variant: String,
    pub vehicle_color: Option<String>,

    #[schema(example = "80000.00")]
    pub ex_showroom_price: Decimal,
    #[schema(example = "8000.00")]
    pub tax: Decimal,
    pub insurance: Option<Decimal>,
    pub tp_registration: Option<Decimal>,
    pub man_accessories: Option<Decimal>,
    pub optional_accessories: Option<Decimal>,
    pub booking_amount: Option<Decimal>,
    pub amount_paid: Option<Decimal>,
}

// Edição pelo vendedor (antes da verificação de Contas)
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SalesDetailsPatch {
    #[schema(value_type = Option<String>)]
    pub name: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub phone_number: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub vehicle_name: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub vehicle_variant: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub vehicle_color: Patch<Option<String>>,
    #[schema(value_type = Option<String>)]
    pub ex_showroom_price: Patch<Option<Decimal>>,
    #[schema(value_type = Option<String>)]
    pub tax: Patch<Option<Decimal>>,
    #[schema(value_type = Option<String>)]
    pub insurance: Patch<Option<Decimal>>,
    #[schema(value_type = Option<String>)]
    pub tp_registration: Patch<Option<Decimal>>,
    #[schema(value_type = Option<String>)]
    pub man_accessories: Patch<Option<Decimal>>,
    #[schema(value_type = Option<String>)]
    pub optional_accessories: Patch<Option<Decimal>>,
    #[schema(value_type = Option<String>)]
    pub booking_amount: Patch<Option<Decimal>>,
    #[schema(value_type = Option<String>)]
    pub amount_paid: Patch<Option<Decimal>>,
}

// Ajuste de financiamento (Contas)
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct FinancePatch {
    #[schema(value_type = Option<Uuid>)]
    pub finance_id: Patch<Option<Uuid>>,
    #[schema(value_type = Option<String>, example = "50000.00")]
    pub finance_amount: Patch<Option<Decimal>>,
}

// Edição pós-venda (RTO): contato e veículo
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PostSalePatch {
    #[schema(value_type = Option<String>)]
    pub phone_number: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub alternate_phone_number: Patch<Option<String>>,
    #[schema(value_type = Option<String>)]
    pub email: Patch<Option<String>>,
    #[schema(value_type = Option<String>)]
    pub address: Patch<Option<String>>,
    #[schema(value_type = Option<String>)]
    pub pin_code: Patch<Option<String>>,
    #[schema(value_type = Option<String>)]
    pub vehicle_name: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub vehicle_variant: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub vehicle_color: Patch<Option<String>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVehiclePayload {
    #[validate(length(min = 1, max = 20, message = "Número da placa inválido."))]
    #[schema(example = "KA01AB1234")]
    pub vehicle_number: String,
}

// Campos de texto do formulário público (multipart)
#[derive(Debug, Clone, Default, Validate)]
pub struct CustomerFormFields {
    #[validate(custom(function = "not_blank", message = "O nome é obrigatório."))]
    pub first_name: String,
    #[validate(custom(function = "not_blank", message = "O sobrenome é obrigatório."))]
    pub last_name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(custom(function = "not_blank", message = "O endereço é obrigatório."))]
    pub address: String,
    pub alternate_phone_number: Option<String>,
    pub pin_code: Option<String>,
    // Texto cru (AAAA-MM-DD); o serviço converte e rejeita formatos inválidos
    pub dob: Option<String>,
    pub nominee: Option<String>,
    pub relation: Option<String>,
}

// Filtros da listagem (vindos da query string)
#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListCustomersQuery {
    pub branch_id: Option<Uuid>,
    pub stage: Option<WorkflowStage>,
    #[validate(range(min = 1, max = 12, message = "Mês inválido."))]
    pub month: Option<u32>,
    #[validate(range(min = 2000, max = 2100, message = "Ano inválido."))]
    pub year: Option<i32>,
}

/// Filtro já resolvido pelo serviço (escopo de filial aplicado).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerFilter {
    pub branch_id: Option<Uuid>,
    pub stage: Option<WorkflowStage>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}
