// src/services/workflow.rs
//
// Regras de transição do cliente: created -> submitted -> sales -> accounts -> rto -> registered.
// Funções puras sobre o registro em memória. Quem garante a atomicidade (ler, validar,
// aplicar, gravar) é o `CustomerStore::transition`.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use validator::ValidateEmail;

use crate::{
    common::{error::AppError, patch::Patch},
    models::{
        auth::Actor,
        customer::{
            Customer, CustomerFormFields, CustomerStatus, FinancePatch, PostSalePatch,
            SalesDetailsPatch,
        },
        document::DocumentKind,
        verification::{NewVerificationLog, VerificationAction},
    },
    services::pricing,
};

fn log_entry(
    customer: &Customer,
    actor: &Actor,
    action: VerificationAction,
    now: DateTime<Utc>,
) -> NewVerificationLog {
    NewVerificationLog {
        user_id: actor.user_id,
        customer_id: customer.id,
        action,
        timestamp: now,
    }
}

// =========================================================================
//  VERIFICAÇÕES
// =========================================================================

/// Reverificação é permitida: a flag não muda, mas a auditoria ganha outra entrada.
pub fn verify_sales(customer: &mut Customer, actor: &Actor, now: DateTime<Utc>) -> NewVerificationLog {
    customer.sales_verified = true;
    customer.updated_at = now;
    log_entry(customer, actor, VerificationAction::SalesVerified, now)
}

pub fn verify_accounts(
    customer: &mut Customer,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<NewVerificationLog, AppError> {
    if !customer.sales_verified {
        return Err(AppError::PreconditionFailed(
            "o cliente precisa ser verificado por vendas primeiro".into(),
        ));
    }

    // Contas fecha o saldo considerando o financiamento
    pricing::recalculate(customer);
    customer.accounts_verified = true;
    customer.updated_at = now;
    Ok(log_entry(customer, actor, VerificationAction::AccountsVerified, now))
}

pub fn verify_rto(
    customer: &mut Customer,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<NewVerificationLog, AppError> {
    if !(customer.sales_verified && customer.accounts_verified) {
        return Err(AppError::PreconditionFailed(
            "must be sales and accounts verified first".into(),
        ));
    }

    customer.rto_verified = true;
    customer.updated_at = now;
    Ok(log_entry(customer, actor, VerificationAction::RtoVerified, now))
}

/// Estado terminal. Exige `rto_verified` (gate mais rígido que o sistema legado).
pub fn register_vehicle(
    customer: &mut Customer,
    vehicle_number: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if customer.registered {
        return Err(AppError::PreconditionFailed("veículo já registrado".into()));
    }
    if !customer.rto_verified {
        return Err(AppError::PreconditionFailed(
            "o cliente precisa ser verificado pelo RTO antes do registro".into(),
        ));
    }

    let vehicle_number = normalize_vehicle_number(vehicle_number);
    if vehicle_number.is_empty() {
        return Err(AppError::invalid_field(
            "vehicleNumber",
            "required",
            "O número da placa é obrigatório.",
        ));
    }

    customer.vehicle_number = Some(vehicle_number);
    customer.registered = true;
    customer.status = CustomerStatus::Registered;
    customer.updated_at = now;
    Ok(())
}

// "ka 01 ab 1234" -> "KA01AB1234"
fn normalize_vehicle_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

// =========================================================================
//  FORMULÁRIO PÚBLICO
// =========================================================================

/// O formulário fica travado depois que vendas assina.
pub fn ensure_form_open(customer: &Customer) -> Result<(), AppError> {
    if customer.sales_verified {
        return Err(AppError::PreconditionFailed(
            "formulário já verificado por vendas".into(),
        ));
    }
    Ok(())
}

/// Converte a data de nascimento (AAAA-MM-DD). Formato inválido é erro de validação.
pub fn parse_dob(raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                AppError::invalid_field("dob", "invalid_date_format", "Use o formato AAAA-MM-DD.")
            }),
    }
}

pub fn submit_form(
    customer: &mut Customer,
    fields: &CustomerFormFields,
    dob: Option<NaiveDate>,
    document_urls: &HashMap<DocumentKind, String>,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    ensure_form_open(customer)?;

    let first_name = fields.first_name.trim();
    let last_name = fields.last_name.trim();

    customer.name = format!("{} {}", first_name, last_name);
    customer.first_name = Some(first_name.to_string());
    customer.last_name = Some(last_name.to_string());
    customer.email = Some(fields.email.trim().to_string());
    customer.address = Some(fields.address.trim().to_string());
    customer.alternate_phone_number = optional_text(fields.alternate_phone_number.as_deref());
    customer.pin_code = optional_text(fields.pin_code.as_deref());
    customer.dob = dob;
    customer.nominee = optional_text(fields.nominee.as_deref());
    customer.relation = optional_text(fields.relation.as_deref());

    for (kind, url) in document_urls {
        let slot = match kind {
            DocumentKind::AadhaarFront => &mut customer.photo_aadhaar_front,
            DocumentKind::AadhaarBack => &mut customer.photo_aadhaar_back,
            DocumentKind::Passport => &mut customer.photo_passport,
            DocumentKind::Signature => &mut customer.customer_sign,
        };
        *slot = Some(url.clone());
    }

    customer.status = CustomerStatus::Submitted;
    pricing::recalculate(customer);
    customer.updated_at = now;
    Ok(())
}

// =========================================================================
//  EDIÇÕES DE CAMPOS
// =========================================================================

/// Vendas ajusta preço e pagamento enquanto Contas não fechou o saldo.
pub fn apply_sales_details(
    customer: &mut Customer,
    patch: SalesDetailsPatch,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if customer.accounts_verified {
        return Err(AppError::PreconditionFailed(
            "dados de venda bloqueados após a verificação de contas".into(),
        ));
    }

    apply_required_text(patch.name, "name", &mut customer.name)?;
    apply_required_text(patch.phone_number, "phoneNumber", &mut customer.phone_number)?;
    apply_required_text(patch.vehicle_name, "vehicleName", &mut customer.vehicle_name)?;
    apply_required_text(patch.vehicle_variant, "vehicleVariant", &mut customer.vehicle_variant)?;
    patch.vehicle_color.apply_to(&mut customer.vehicle_color);

    patch.ex_showroom_price.apply_to(&mut customer.ex_showroom_price);
    patch.tax.apply_to(&mut customer.tax);
    patch.insurance.apply_to(&mut customer.insurance);
    patch.tp_registration.apply_to(&mut customer.tp_registration);
    patch.man_accessories.apply_to(&mut customer.man_accessories);
    patch.optional_accessories.apply_to(&mut customer.optional_accessories);
    patch.booking_amount.apply_to(&mut customer.booking_amount);
    patch.amount_paid.apply_to(&mut customer.amount_paid);

    pricing::validate_amounts(customer)?;
    pricing::recalculate(customer);
    customer.updated_at = now;
    Ok(())
}

/// Contas ajusta o financiamento. Depois do RTO o valor está fechado.
pub fn apply_finance(
    customer: &mut Customer,
    patch: FinancePatch,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if customer.rto_verified {
        return Err(AppError::PreconditionFailed(
            "financiamento bloqueado após a verificação do RTO".into(),
        ));
    }

    patch.finance_id.apply_to(&mut customer.finance_id);
    patch.finance_amount.apply_to(&mut customer.finance_amount);

    pricing::validate_amounts(customer)?;
    pricing::recalculate(customer);
    customer.updated_at = now;
    Ok(())
}

pub fn apply_post_sale(
    customer: &mut Customer,
    patch: PostSalePatch,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if let Patch::Set(Some(email)) = &patch.email {
        if !email.validate_email() {
            return Err(AppError::invalid_field(
                "email",
                "email",
                "O e-mail fornecido é inválido.",
            ));
        }
    }

    apply_required_text(patch.phone_number, "phoneNumber", &mut customer.phone_number)?;
    apply_required_text(patch.vehicle_name, "vehicleName", &mut customer.vehicle_name)?;
    apply_required_text(patch.vehicle_variant, "vehicleVariant", &mut customer.vehicle_variant)?;
    patch.alternate_phone_number.apply_to(&mut customer.alternate_phone_number);
    patch.email.apply_to(&mut customer.email);
    patch.address.apply_to(&mut customer.address);
    patch.pin_code.apply_to(&mut customer.pin_code);
    patch.vehicle_color.apply_to(&mut customer.vehicle_color);

    customer.updated_at = now;
    Ok(())
}

fn apply_required_text(
    patch: Patch<String>,
    field: &'static str,
    target: &mut String,
) -> Result<(), AppError> {
    if let Patch::Set(value) = patch {
        let value = value.trim();
        if value.is_empty() {
            return Err(AppError::invalid_field(field, "required", "Campo obrigatório."));
        }
        *target = value.to_string();
    }
    Ok(())
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;
    use crate::services::test_support::{actor, sample_customer};
    use rust_decimal_macros::dec;

    #[test]
    fn verify_sales_is_idempotent_on_the_flag() {
        let mut customer = sample_customer();
        let sales = actor(Role::SalesExecutive, Some(customer.branch_id));

        let first = verify_sales(&mut customer, &sales, Utc::now());
        let second = verify_sales(&mut customer, &sales, Utc::now());

        assert!(customer.sales_verified);
        assert_eq!(first.action, VerificationAction::SalesVerified);
        assert_eq!(second.action, VerificationAction::SalesVerified);
        assert_eq!(second.customer_id, customer.id);
    }

    #[test]
    fn accounts_requires_sales_first() {
        let mut customer = sample_customer();
        let accounts = actor(Role::Accounts, Some(customer.branch_id));

        let err = verify_accounts(&mut customer, &accounts, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));
        assert!(!customer.accounts_verified);
    }

    #[test]
    fn rto_requires_sales_and_accounts() {
        let mut customer = sample_customer();
        customer.sales_verified = true;
        let rto = actor(Role::Rto, None);

        let err = verify_rto(&mut customer, &rto, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));
        assert!(!customer.rto_verified);
    }

    #[test]
    fn register_requires_rto_and_normalizes_plate() {
        let mut customer = sample_customer();
        assert!(matches!(
            register_vehicle(&mut customer, "KA01AB1234", Utc::now()),
            Err(AppError::PreconditionFailed(_))
        ));

        customer.sales_verified = true;
        customer.accounts_verified = true;
        customer.rto_verified = true;
        register_vehicle(&mut customer, " ka 01-ab 1234 ", Utc::now()).unwrap();

        assert!(customer.registered);
        assert_eq!(customer.status, CustomerStatus::Registered);
        assert_eq!(customer.vehicle_number.as_deref(), Some("KA01AB1234"));

        assert!(matches!(
            register_vehicle(&mut customer, "KA02", Utc::now()),
            Err(AppError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn blank_plate_is_a_validation_error() {
        let mut customer = sample_customer();
        customer.sales_verified = true;
        customer.accounts_verified = true;
        customer.rto_verified = true;

        assert!(matches!(
            register_vehicle(&mut customer, "  ", Utc::now()),
            Err(AppError::ValidationError(_))
        ));
        assert!(!customer.registered);
    }

    #[test]
    fn parse_dob_rejects_malformed_dates() {
        assert_eq!(parse_dob(None).unwrap(), None);
        assert_eq!(parse_dob(Some("")).unwrap(), None);
        assert_eq!(
            parse_dob(Some("1990-05-17")).unwrap(),
            NaiveDate::from_ymd_opt(1990, 5, 17)
        );
        assert!(matches!(parse_dob(Some("17/05/1990")), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn sales_patch_distinguishes_unset_from_clear() {
        let mut customer = sample_customer();
        customer.insurance = Some(dec!(3000));
        customer.vehicle_color = Some("Red".into());

        let patch = SalesDetailsPatch {
            vehicle_color: Patch::Set(None),
            amount_paid: Patch::Set(Some(dec!(1000))),
            ..Default::default()
        };
        apply_sales_details(&mut customer, patch, Utc::now()).unwrap();

        assert_eq!(customer.vehicle_color, None);
        assert_eq!(customer.insurance, Some(dec!(3000)));
        assert_eq!(customer.balance_amount, customer.total_price - dec!(1000));
    }

    #[test]
    fn sales_patch_locked_after_accounts() {
        let mut customer = sample_customer();
        customer.sales_verified = true;
        customer.accounts_verified = true;

        let patch = SalesDetailsPatch {
            amount_paid: Patch::Set(Some(dec!(1))),
            ..Default::default()
        };
        assert!(matches!(
            apply_sales_details(&mut customer, patch, Utc::now()),
            Err(AppError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn blank_required_text_is_rejected() {
        let mut customer = sample_customer();
        let patch = PostSalePatch {
            phone_number: Patch::Set("   ".into()),
            ..Default::default()
        };
        assert!(matches!(
            apply_post_sale(&mut customer, patch, Utc::now()),
            Err(AppError::ValidationError(_))
        ));
    }
}
