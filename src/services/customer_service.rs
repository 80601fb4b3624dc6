// src/services/customer_service.rs

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{CustomerKey, CustomerStore},
    models::{
        auth::Actor,
        customer::{
            Customer, CustomerCreated, CustomerFilter, CustomerFormFields, CustomerStatus,
            FinancePatch, ListCustomersQuery, NewCustomerPayload, PostSalePatch, PublicFormView,
            SalesDetailsPatch,
        },
        document::{DocumentKind, DocumentUpload, ALLOWED_CONTENT_TYPES},
        verification::{NewVerificationLog, VerificationLog},
    },
    services::{
        access_policy::{self, Operation},
        document_storage::DocumentStorage,
        pricing, workflow,
    },
};

#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn CustomerStore>,
    storage: Arc<dyn DocumentStorage>,
    form_base_url: String,
    bucket: String,
}

impl CustomerService {
    pub fn new(
        store: Arc<dyn CustomerStore>,
        storage: Arc<dyn DocumentStorage>,
        form_base_url: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            store,
            storage,
            form_base_url: form_base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
        }
    }

    pub fn form_link(&self, link_token: Uuid) -> String {
        format!("{}/{}", self.form_base_url, link_token)
    }

    // Papel -> leitura com trava -> filial -> regra de negócio -> gravação (registro + auditoria)
    async fn run_transition<F>(
        &self,
        customer_id: Uuid,
        actor: &Actor,
        operation: Operation,
        rule: F,
    ) -> Result<Customer, AppError>
    where
        F: FnOnce(&mut Customer, &Actor, DateTime<Utc>) -> Result<Option<NewVerificationLog>, AppError>
            + Send
            + 'static,
    {
        access_policy::authorize(actor, operation)?;

        let actor = *actor;
        self.store
            .transition(
                CustomerKey::Id(customer_id),
                Box::new(move |customer| {
                    access_policy::ensure_branch(&actor, customer.branch_id)?;
                    rule(customer, &actor, Utc::now())
                }),
            )
            .await
    }

    // =========================================================================
    //  1. CADASTRO (VENDAS)
    // =========================================================================

    pub async fn create_customer(
        &self,
        actor: &Actor,
        payload: NewCustomerPayload,
    ) -> Result<CustomerCreated, AppError> {
        access_policy::authorize(actor, Operation::CreateCustomer)?;
        let branch_id = access_policy::branch_scope(actor)?
            .ok_or_else(|| AppError::Forbidden("usuário sem filial vinculada".into()))?;

        payload.validate()?;

        let now = Utc::now();
        let mut customer = Customer {
            id: Uuid::new_v4(),
            branch_id,
            sales_executive_id: Some(actor.user_id),
            name: payload.name.trim().to_string(),
            first_name: None,
            last_name: None,
            phone_number: payload.phone_number.trim().to_string(),
            alternate_phone_number: None,
            email: payload.email,
            address: None,
            pin_code: None,
            dob: None,
            nominee: None,
            relation: None,
            vehicle_name: payload.vehicle_name.trim().to_string(),
            vehicle_variant: payload.vehicle_variant.trim().to_string(),
            vehicle_color: payload.vehicle_color,
            ex_showroom_price: Some(payload.ex_showroom_price),
            tax: Some(payload.tax),
            insurance: payload.insurance,
            tp_registration: payload.tp_registration,
            man_accessories: payload.man_accessories,
            optional_accessories: payload.optional_accessories,
            booking_amount: payload.booking_amount,
            total_price: Default::default(),
            balance_amount: Default::default(),
            finance_id: None,
            finance_amount: None,
            amount_paid: payload.amount_paid,
            photo_aadhaar_front: None,
            photo_aadhaar_back: None,
            photo_passport: None,
            customer_sign: None,
            link_token: Uuid::new_v4(),
            status: CustomerStatus::Pending,
            sales_verified: false,
            accounts_verified: false,
            rto_verified: false,
            registered: false,
            vehicle_number: None,
            created_at: now,
            updated_at: now,
        };

        pricing::validate_amounts(&customer)?;
        pricing::recalculate(&mut customer);

        let customer = self.store.insert(&customer).await?;
        tracing::info!("🧾 Cliente {} cadastrado por {}", customer.id, actor.user_id);

        let form_link = self.form_link(customer.link_token);
        Ok(CustomerCreated {
            customer: customer.into(),
            form_link,
        })
    }

    pub async fn update_sales_details(
        &self,
        customer_id: Uuid,
        actor: &Actor,
        patch: SalesDetailsPatch,
    ) -> Result<Customer, AppError> {
        self.run_transition(customer_id, actor, Operation::EditSalesDetails, move |c, _, now| {
            workflow::apply_sales_details(c, patch, now).map(|_| None)
        })
        .await
    }

    // =========================================================================
    //  2. FORMULÁRIO PÚBLICO (LINK TOKEN)
    // =========================================================================

    pub async fn get_form(&self, link_token: Uuid) -> Result<PublicFormView, AppError> {
        let customer = self
            .store
            .find(CustomerKey::LinkToken(link_token))
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;

        Ok(PublicFormView {
            name: customer.name,
            vehicle_name: customer.vehicle_name,
            vehicle_variant: customer.vehicle_variant,
        })
    }

    pub async fn submit_form(
        &self,
        link_token: Uuid,
        fields: CustomerFormFields,
        documents: Vec<DocumentUpload>,
    ) -> Result<Customer, AppError> {
        // 1. Token desconhecido ou formulário travado: falha antes de qualquer upload
        let current = self
            .store
            .find(CustomerKey::LinkToken(link_token))
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;
        workflow::ensure_form_open(&current)?;

        // 2. Validação dos campos e dos arquivos
        fields.validate()?;
        let dob = workflow::parse_dob(fields.dob.as_deref())?;
        let documents = validate_documents(documents)?;

        // 3. Upload. Qualquer falha aborta a transição inteira (registro intocado)
        let mut urls = HashMap::with_capacity(documents.len());
        for (kind, doc) in documents {
            let filename = format!("{}-{}", kind.field_name(), doc.filename);
            match self
                .storage
                .store_document(doc.bytes, &self.bucket, &filename)
                .await
            {
                Ok(url) => {
                    urls.insert(kind, url);
                }
                Err(err) => {
                    warn_orphaned_uploads(link_token, urls.values());
                    return Err(err);
                }
            }
        }

        // 4. Escrita atômica no cliente daquele token
        let orphans: Vec<String> = urls.values().cloned().collect();
        let customer = self
            .store
            .transition(
                CustomerKey::LinkToken(link_token),
                Box::new(move |customer| {
                    workflow::submit_form(customer, &fields, dob, &urls, Utc::now())?;
                    Ok(None)
                }),
            )
            .await
            .inspect_err(|_| warn_orphaned_uploads(link_token, orphans.iter()))?;

        tracing::info!("📨 Formulário do cliente {} enviado", customer.id);
        Ok(customer)
    }

    // =========================================================================
    //  3. VERIFICAÇÕES
    // =========================================================================

    pub async fn verify_sales(&self, customer_id: Uuid, actor: &Actor) -> Result<Customer, AppError> {
        let customer = self
            .run_transition(customer_id, actor, Operation::VerifySales, |c, actor, now| {
                Ok(Some(workflow::verify_sales(c, actor, now)))
            })
            .await?;

        tracing::info!("✅ Vendas verificou o cliente {} ({})", customer.id, actor.user_id);
        Ok(customer)
    }

    pub async fn verify_accounts(&self, customer_id: Uuid, actor: &Actor) -> Result<Customer, AppError> {
        let customer = self
            .run_transition(customer_id, actor, Operation::VerifyAccounts, |c, actor, now| {
                workflow::verify_accounts(c, actor, now).map(Some)
            })
            .await?;

        tracing::info!(
            "✅ Contas verificou o cliente {} (saldo {})",
            customer.id,
            customer.balance_amount
        );
        Ok(customer)
    }

    pub async fn verify_rto(&self, customer_id: Uuid, actor: &Actor) -> Result<Customer, AppError> {
        let customer = self
            .run_transition(customer_id, actor, Operation::VerifyRto, |c, actor, now| {
                workflow::verify_rto(c, actor, now).map(Some)
            })
            .await?;

        tracing::info!("✅ RTO verificou o cliente {}", customer.id);
        Ok(customer)
    }

    pub async fn register_vehicle(
        &self,
        customer_id: Uuid,
        actor: &Actor,
        vehicle_number: String,
    ) -> Result<Customer, AppError> {
        let customer = self
            .run_transition(customer_id, actor, Operation::RegisterVehicle, move |c, _, now| {
                workflow::register_vehicle(c, &vehicle_number, now).map(|_| None)
            })
            .await?;

        tracing::info!(
            "🏍️ Veículo do cliente {} registrado com a placa {:?}",
            customer.id,
            customer.vehicle_number
        );
        Ok(customer)
    }

    // =========================================================================
    //  4. AJUSTES (CONTAS / RTO)
    // =========================================================================

    pub async fn update_finance(
        &self,
        customer_id: Uuid,
        actor: &Actor,
        patch: FinancePatch,
    ) -> Result<Customer, AppError> {
        // Filial antes da financeira
        self.get_customer_for(customer_id, actor, Operation::EditFinance)
            .await?;

        if let Some(Some(finance_id)) = patch.finance_id.as_set() {
            self.store
                .find_finance_option(*finance_id)
                .await?
                .ok_or(AppError::NotFound("Financeira"))?;
        }

        self.run_transition(customer_id, actor, Operation::EditFinance, move |c, _, now| {
            workflow::apply_finance(c, patch, now).map(|_| None)
        })
        .await
    }

    pub async fn update_post_sale(
        &self,
        customer_id: Uuid,
        actor: &Actor,
        patch: PostSalePatch,
    ) -> Result<Customer, AppError> {
        self.run_transition(customer_id, actor, Operation::EditPostSale, move |c, _, now| {
            workflow::apply_post_sale(c, patch, now).map(|_| None)
        })
        .await
    }

    // =========================================================================
    //  5. CONSULTAS
    // =========================================================================

    pub async fn get_customer(&self, customer_id: Uuid, actor: &Actor) -> Result<Customer, AppError> {
        self.get_customer_for(customer_id, actor, Operation::ReadCustomers)
            .await
    }

    // Papel + existência + filial, sem gravar nada
    async fn get_customer_for(
        &self,
        customer_id: Uuid,
        actor: &Actor,
        operation: Operation,
    ) -> Result<Customer, AppError> {
        access_policy::authorize(actor, operation)?;

        let customer = self
            .store
            .find(CustomerKey::Id(customer_id))
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;

        access_policy::ensure_branch(actor, customer.branch_id)?;
        Ok(customer)
    }

    pub async fn verification_history(
        &self,
        customer_id: Uuid,
        actor: &Actor,
    ) -> Result<Vec<VerificationLog>, AppError> {
        let customer = self.get_customer(customer_id, actor).await?;
        self.store.list_logs(customer.id).await
    }

    pub async fn list_customers(
        &self,
        actor: &Actor,
        query: ListCustomersQuery,
    ) -> Result<Vec<Customer>, AppError> {
        access_policy::authorize(actor, Operation::ReadCustomers)?;
        query.validate()?;

        let branch_id = match access_policy::branch_scope(actor)? {
            Some(own) => {
                if query.branch_id.is_some_and(|requested| requested != own) {
                    return Err(AppError::Forbidden("cliente pertence a outra filial".into()));
                }
                Some(own)
            }
            None => query.branch_id,
        };

        let (created_from, created_to) = created_window(query.month, query.year)?;

        let filter = CustomerFilter {
            branch_id,
            stage: query.stage,
            created_from,
            created_to,
        };
        self.store.list(&filter).await
    }
}

// Arquivos já enviados que não chegaram ao registro
fn warn_orphaned_uploads<'a>(link_token: Uuid, urls: impl Iterator<Item = &'a String>) {
    let urls: Vec<&String> = urls.collect();
    if !urls.is_empty() {
        tracing::warn!(
            "⚠️ Envio do formulário {} falhou; arquivos órfãos no storage: {:?}",
            link_token,
            urls
        );
    }
}

// Um arquivo por tipo; obrigatórios presentes; só jpeg/png
fn validate_documents(
    documents: Vec<DocumentUpload>,
) -> Result<HashMap<DocumentKind, DocumentUpload>, AppError> {
    let mut by_kind = HashMap::new();

    for doc in documents {
        if !ALLOWED_CONTENT_TYPES.contains(&doc.content_type.as_str()) {
            return Err(AppError::invalid_field(
                doc.kind.field_name(),
                "invalid_file_type",
                "Envie apenas imagens JPEG ou PNG.",
            ));
        }
        if doc.bytes.is_empty() {
            return Err(AppError::invalid_field(
                doc.kind.field_name(),
                "empty_file",
                "Arquivo vazio.",
            ));
        }
        by_kind.insert(doc.kind, doc);
    }

    for kind in DocumentKind::REQUIRED {
        if !by_kind.contains_key(&kind) {
            return Err(AppError::invalid_field(
                kind.field_name(),
                "required",
                "Documento obrigatório.",
            ));
        }
    }

    Ok(by_kind)
}

// Mês/ano de cadastro -> intervalo [início, fim)
fn created_window(
    month: Option<u32>,
    year: Option<i32>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), AppError> {
    let start_of = |date: Option<NaiveDate>| {
        date.and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .ok_or_else(|| AppError::invalid_field("month", "invalid_date", "Data inválida."))
    };

    match (month, year) {
        (None, None) => Ok((None, None)),
        (Some(_), None) => Err(AppError::invalid_field(
            "year",
            "required",
            "Informe o ano junto com o mês.",
        )),
        (None, Some(year)) => {
            let from = start_of(NaiveDate::from_ymd_opt(year, 1, 1))?;
            let to = start_of(NaiveDate::from_ymd_opt(year + 1, 1, 1))?;
            Ok((Some(from), Some(to)))
        }
        (Some(month), Some(year)) => {
            let first = NaiveDate::from_ymd_opt(year, month, 1);
            let next = first.and_then(|d| {
                if d.month() == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)
                }
            });
            Ok((Some(start_of(first)?), Some(start_of(next)?)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn december_window_rolls_into_next_year() {
        let (from, to) = created_window(Some(12), Some(2024)).unwrap();
        assert_eq!(from.unwrap().to_rfc3339(), "2024-12-01T00:00:00+00:00");
        assert_eq!(to.unwrap().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn month_without_year_is_rejected() {
        assert!(matches!(
            created_window(Some(3), None),
            Err(AppError::ValidationError(_))
        ));
    }
}
