// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,

        // --- Formulário público ---
        handlers::public_form::get_form,
        handlers::public_form::submit_form,

        // --- Consultas ---
        handlers::customers::list_customers,
        handlers::customers::get_customer,
        handlers::customers::get_verification_history,

        // --- Vendas ---
        handlers::customers::create_customer,
        handlers::customers::update_sales_details,
        handlers::customers::verify_sales,

        // --- Contas ---
        handlers::customers::update_finance,
        handlers::customers::verify_accounts,

        // --- RTO ---
        handlers::customers::verify_rto,
        handlers::customers::register_vehicle,
        handlers::customers::update_post_sale,

        // --- Chassi ---
        handlers::chassis::upload_chassis,
        handlers::chassis::get_chassis_image,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::User,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Clientes ---
            models::customer::CustomerStatus,
            models::customer::WorkflowStage,
            models::customer::Customer,
            models::customer::CustomerDetail,
            models::customer::CustomerCreated,
            models::customer::PublicFormView,
            models::customer::NewCustomerPayload,
            models::customer::SalesDetailsPatch,
            models::customer::FinancePatch,
            models::customer::PostSalePatch,
            models::customer::RegisterVehiclePayload,

            // --- Auditoria ---
            models::verification::VerificationAction,
            models::verification::VerificationLog,

            // --- Financeiras ---
            models::finance::FinanceOption,

            // --- Chassi ---
            models::chassis::Chassis,
            models::chassis::ChassisImageView,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação"),
        (name = "Users", description = "Dados do Funcionário"),
        (name = "Public Form", description = "Formulário do Cliente (link sem login)"),
        (name = "Customers", description = "Consulta de Clientes e Auditoria"),
        (name = "Sales", description = "Cadastro e Verificação de Vendas"),
        (name = "Accounts", description = "Financiamento e Verificação de Contas"),
        (name = "RTO", description = "Verificação do RTO e Registro do Veículo"),
        (name = "Chassis", description = "Fotos de Chassi")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
