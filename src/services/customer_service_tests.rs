// src/services/customer_service_tests.rs

use std::sync::Arc;

use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::{
    common::{error::AppError, patch::Patch},
    models::{
        auth::Role,
        customer::{
            CustomerFormFields, CustomerStatus, FinancePatch, ListCustomersQuery,
            NewCustomerPayload, WorkflowStage,
        },
        document::{DocumentKind, DocumentUpload},
        verification::VerificationAction,
    },
    services::{
        customer_service::CustomerService,
        test_support::{actor, sample_customer, FakeStorage, InMemoryCustomerStore},
    },
};

fn service(store: &InMemoryCustomerStore, storage: &FakeStorage) -> CustomerService {
    CustomerService::new(
        Arc::new(store.clone()),
        Arc::new(storage.clone()),
        "https://app.test/customer-form/",
        "documents",
    )
}

fn new_customer_payload() -> NewCustomerPayload {
    NewCustomerPayload {
        name: "Ravi Kumar".into(),
        phone_number: "9876543210".into(),
        email: None,
        vehicle_name: "Activa".into(),
        vehicle_variant: "6G".into(),
        vehicle_color: Some("Black".into()),
        ex_showroom_price: dec!(80000),
        tax: dec!(8000),
        insurance: Some(dec!(3000)),
        tp_registration: Some(dec!(2000)),
        man_accessories: Some(dec!(1000)),
        optional_accessories: None,
        booking_amount: Some(dec!(5000)),
        amount_paid: Some(dec!(20000)),
    }
}

fn form_fields() -> CustomerFormFields {
    CustomerFormFields {
        first_name: "Ravi".into(),
        last_name: "Kumar".into(),
        email: "ravi@example.com".into(),
        address: "12 MG Road, Bengaluru".into(),
        pin_code: Some("560001".into()),
        dob: Some("1990-05-17".into()),
        ..Default::default()
    }
}

fn upload(kind: DocumentKind) -> DocumentUpload {
    DocumentUpload {
        kind,
        filename: format!("{}.jpg", kind.field_name()),
        content_type: "image/jpeg".into(),
        bytes: vec![0xFF, 0xD8, 0xFF],
    }
}

fn required_uploads() -> Vec<DocumentUpload> {
    DocumentKind::REQUIRED.into_iter().map(upload).collect()
}

#[tokio::test]
async fn full_flow_from_creation_to_registration() {
    let store = InMemoryCustomerStore::default();
    let storage = FakeStorage::default();
    let service = service(&store, &storage);

    let branch = Uuid::new_v4();
    let sales = actor(Role::SalesExecutive, Some(branch));
    let accounts = actor(Role::Accounts, Some(branch));
    let rto = actor(Role::Rto, None);

    // 1. Cadastro
    let created = service.create_customer(&sales, new_customer_payload()).await.unwrap();
    let customer = created.customer.customer;
    assert_eq!(created.customer.stage, WorkflowStage::Created);
    assert_eq!(customer.branch_id, branch);
    assert_eq!(customer.total_price, dec!(94000));
    assert_eq!(customer.balance_amount, dec!(74000));
    assert_eq!(
        created.form_link,
        format!("https://app.test/customer-form/{}", customer.link_token)
    );

    // 2. Formulário público
    let view = service.get_form(customer.link_token).await.unwrap();
    assert_eq!(view.name, "Ravi Kumar");

    let submitted = service
        .submit_form(customer.link_token, form_fields(), required_uploads())
        .await
        .unwrap();
    assert_eq!(submitted.status, CustomerStatus::Submitted);
    assert_eq!(submitted.stage(), WorkflowStage::Submitted);
    assert!(submitted.photo_passport.as_deref().unwrap().starts_with("https://storage.test/documents/"));
    assert_eq!(submitted.customer_sign, None);
    assert_eq!(storage.uploads().len(), 3);

    // 3. Verificações em ordem
    service.verify_sales(customer.id, &sales).await.unwrap();

    let finance_id = store.add_finance_option("HDFC Bank");
    let patch = FinancePatch {
        finance_id: Patch::Set(Some(finance_id)),
        finance_amount: Patch::Set(Some(dec!(50000))),
    };
    let financed = service.update_finance(customer.id, &accounts, patch).await.unwrap();
    assert_eq!(financed.balance_amount, dec!(24000));

    service.verify_accounts(customer.id, &accounts).await.unwrap();
    service.verify_rto(customer.id, &rto).await.unwrap();

    // 4. Registro
    let registered = service
        .register_vehicle(customer.id, &rto, "ka 01 ab 1234".into())
        .await
        .unwrap();
    assert!(registered.registered);
    assert_eq!(registered.status, CustomerStatus::Registered);
    assert_eq!(registered.vehicle_number.as_deref(), Some("KA01AB1234"));

    let history = service.verification_history(customer.id, &rto).await.unwrap();
    let actions: Vec<_> = history.iter().map(|l| l.action).collect();
    assert_eq!(
        actions,
        vec![
            VerificationAction::SalesVerified,
            VerificationAction::AccountsVerified,
            VerificationAction::RtoVerified,
        ]
    );
    assert_eq!(history[1].user_id, accounts.user_id);
}

#[tokio::test]
async fn accounts_before_sales_leaves_record_and_log_untouched() {
    let customer = sample_customer();
    let store = InMemoryCustomerStore::with_customer(customer.clone());
    let service = service(&store, &FakeStorage::default());
    let accounts = actor(Role::Accounts, Some(customer.branch_id));

    let err = service.verify_accounts(customer.id, &accounts).await.unwrap_err();

    assert!(matches!(err, AppError::PreconditionFailed(_)));
    assert!(!store.get(customer.id).accounts_verified);
    assert!(store.logs().is_empty());
}

#[tokio::test]
async fn rto_before_accounts_reports_both_prerequisites() {
    let mut customer = sample_customer();
    customer.sales_verified = true;
    let store = InMemoryCustomerStore::with_customer(customer.clone());
    let service = service(&store, &FakeStorage::default());

    let err = service
        .verify_rto(customer.id, &actor(Role::Rto, None))
        .await
        .unwrap_err();

    let AppError::PreconditionFailed(message) = err else {
        panic!("esperava PreconditionFailed, veio {err:?}");
    };
    assert_eq!(message, "must be sales and accounts verified first");
    assert!(!store.get(customer.id).rto_verified);
    assert!(store.logs().is_empty());
}

#[tokio::test]
async fn wrong_role_or_branch_is_forbidden() {
    let customer = sample_customer();
    let store = InMemoryCustomerStore::with_customer(customer.clone());
    let service = service(&store, &FakeStorage::default());

    let other_branch = actor(Role::SalesExecutive, Some(Uuid::new_v4()));
    let err = service.verify_sales(customer.id, &other_branch).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let admin = actor(Role::Admin, None);
    let err = service.verify_sales(customer.id, &admin).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let rto = actor(Role::Rto, None);
    let err = service.verify_sales(customer.id, &rto).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    assert!(!store.get(customer.id).sales_verified);
    assert!(store.logs().is_empty());
}

#[tokio::test]
async fn reverification_appends_another_log_entry() {
    let customer = sample_customer();
    let store = InMemoryCustomerStore::with_customer(customer.clone());
    let service = service(&store, &FakeStorage::default());
    let sales = actor(Role::SalesExecutive, Some(customer.branch_id));

    service.verify_sales(customer.id, &sales).await.unwrap();
    service.verify_sales(customer.id, &sales).await.unwrap();

    assert!(store.get(customer.id).sales_verified);
    assert_eq!(store.logs().len(), 2);
}

#[tokio::test]
async fn unknown_link_token_fails_before_any_upload() {
    let store = InMemoryCustomerStore::default();
    let storage = FakeStorage::default();
    let service = service(&store, &storage);

    let err = service
        .submit_form(Uuid::new_v4(), form_fields(), required_uploads())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(storage.uploads().is_empty());
}

#[tokio::test]
async fn submission_only_touches_the_token_owner() {
    let first = sample_customer();
    let second = sample_customer();
    let store = InMemoryCustomerStore::default();
    store.put(first.clone());
    store.put(second.clone());
    let storage = FakeStorage::default();
    let service = service(&store, &storage);

    let second_before = serde_json::to_value(store.get(second.id)).unwrap();

    service
        .submit_form(first.link_token, form_fields(), required_uploads())
        .await
        .unwrap();

    assert_eq!(store.get(first.id).status, CustomerStatus::Submitted);
    assert_eq!(serde_json::to_value(store.get(second.id)).unwrap(), second_before);

    let first_before = serde_json::to_value(store.get(first.id)).unwrap();
    let uploads_before = storage.uploads().len();

    let err = service
        .submit_form(Uuid::new_v4(), form_fields(), required_uploads())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(serde_json::to_value(store.get(first.id)).unwrap(), first_before);
    assert_eq!(serde_json::to_value(store.get(second.id)).unwrap(), second_before);
    assert_eq!(storage.uploads().len(), uploads_before);
}

#[tokio::test]
async fn blank_required_form_fields_are_rejected() {
    let customer = sample_customer();
    let store = InMemoryCustomerStore::with_customer(customer.clone());
    let storage = FakeStorage::default();
    let service = service(&store, &storage);

    let fields = CustomerFormFields {
        first_name: "   ".into(),
        address: "\t ".into(),
        ..form_fields()
    };
    let err = service
        .submit_form(customer.link_token, fields, required_uploads())
        .await
        .unwrap_err();

    let AppError::ValidationError(errors) = err else {
        panic!("esperava ValidationError, veio {err:?}");
    };
    let fields = errors.field_errors();
    assert!(fields.contains_key("first_name"));
    assert!(fields.contains_key("address"));
    assert!(storage.uploads().is_empty());

    let stored = store.get(customer.id);
    assert_eq!(stored.status, CustomerStatus::Pending);
    assert_eq!(stored.first_name, None);
    assert_eq!(stored.name, "Ravi Kumar");
}

#[tokio::test]
async fn blank_name_on_creation_is_rejected() {
    let store = InMemoryCustomerStore::default();
    let service = service(&store, &FakeStorage::default());
    let sales = actor(Role::SalesExecutive, Some(Uuid::new_v4()));

    let payload = NewCustomerPayload {
        name: "  ".into(),
        vehicle_variant: " ".into(),
        ..new_customer_payload()
    };
    let err = service.create_customer(&sales, payload).await.unwrap_err();

    let AppError::ValidationError(errors) = err else {
        panic!("esperava ValidationError, veio {err:?}");
    };
    assert!(errors.field_errors().contains_key("name"));

    let everything = service
        .list_customers(&actor(Role::Admin, None), ListCustomersQuery::default())
        .await
        .unwrap();
    assert!(everything.is_empty());
}

#[tokio::test]
async fn missing_required_document_is_a_validation_error() {
    let customer = sample_customer();
    let store = InMemoryCustomerStore::with_customer(customer.clone());
    let storage = FakeStorage::default();
    let service = service(&store, &storage);

    let uploads = vec![upload(DocumentKind::AadhaarFront), upload(DocumentKind::AadhaarBack)];
    let err = service
        .submit_form(customer.link_token, form_fields(), uploads)
        .await
        .unwrap_err();

    let AppError::ValidationError(errors) = err else {
        panic!("esperava ValidationError, veio {err:?}");
    };
    assert!(errors.field_errors().contains_key("passport"));
    assert!(storage.uploads().is_empty());
    assert_eq!(store.get(customer.id).status, CustomerStatus::Pending);
}

#[tokio::test]
async fn non_image_upload_is_rejected() {
    let customer = sample_customer();
    let store = InMemoryCustomerStore::with_customer(customer.clone());
    let storage = FakeStorage::default();
    let service = service(&store, &storage);

    let mut uploads = required_uploads();
    uploads[0].content_type = "application/pdf".into();

    let err = service
        .submit_form(customer.link_token, form_fields(), uploads)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ValidationError(_)));
    assert!(storage.uploads().is_empty());
}

#[tokio::test]
async fn storage_failure_aborts_the_submission() {
    let customer = sample_customer();
    let store = InMemoryCustomerStore::with_customer(customer.clone());
    let storage = FakeStorage::fail_after(1);
    let service = service(&store, &storage);

    let err = service
        .submit_form(customer.link_token, form_fields(), required_uploads())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::StorageError(_)));
    // o primeiro arquivo subiu mas não chegou ao registro
    assert_eq!(storage.uploads().len(), 1);
    let stored = store.get(customer.id);
    assert_eq!(stored.status, CustomerStatus::Pending);
    assert_eq!(stored.photo_aadhaar_front, None);
    assert_eq!(stored.first_name, None);
}

#[tokio::test]
async fn form_is_locked_after_sales_verification() {
    let mut customer = sample_customer();
    customer.sales_verified = true;
    let store = InMemoryCustomerStore::with_customer(customer.clone());
    let storage = FakeStorage::default();
    let service = service(&store, &storage);

    let err = service
        .submit_form(customer.link_token, form_fields(), required_uploads())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::PreconditionFailed(_)));
    assert!(storage.uploads().is_empty());
}

#[tokio::test]
async fn malformed_dob_is_rejected() {
    let customer = sample_customer();
    let store = InMemoryCustomerStore::with_customer(customer.clone());
    let service = service(&store, &FakeStorage::default());

    let fields = CustomerFormFields {
        dob: Some("17/05/1990".into()),
        ..form_fields()
    };
    let err = service
        .submit_form(customer.link_token, fields, required_uploads())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn unknown_finance_option_is_not_found() {
    let customer = sample_customer();
    let store = InMemoryCustomerStore::with_customer(customer.clone());
    let service = service(&store, &FakeStorage::default());
    let accounts = actor(Role::Accounts, Some(customer.branch_id));

    let patch = FinancePatch {
        finance_id: Patch::Set(Some(Uuid::new_v4())),
        ..Default::default()
    };
    let err = service.update_finance(customer.id, &accounts, patch).await.unwrap_err();

    assert!(matches!(err, AppError::NotFound("Financeira")));
    assert_eq!(store.get(customer.id).finance_id, None);
}

#[tokio::test]
async fn finance_edit_checks_branch_before_the_finance_option() {
    let customer = sample_customer();
    let store = InMemoryCustomerStore::with_customer(customer.clone());
    let service = service(&store, &FakeStorage::default());
    let other_branch = actor(Role::Accounts, Some(Uuid::new_v4()));

    let patch = FinancePatch {
        finance_id: Patch::Set(Some(Uuid::new_v4())),
        ..Default::default()
    };
    let err = service
        .update_finance(customer.id, &other_branch, patch)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(store.get(customer.id).finance_id, None);
}

#[tokio::test]
async fn register_is_rejected_before_rto_and_writes_no_log() {
    let mut customer = sample_customer();
    customer.sales_verified = true;
    customer.accounts_verified = true;
    let store = InMemoryCustomerStore::with_customer(customer.clone());
    let service = service(&store, &FakeStorage::default());
    let rto = actor(Role::Rto, None);

    let err = service
        .register_vehicle(customer.id, &rto, "KA01AB1234".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PreconditionFailed(_)));

    service.verify_rto(customer.id, &rto).await.unwrap();
    service
        .register_vehicle(customer.id, &rto, "KA01AB1234".into())
        .await
        .unwrap();

    // só a verificação do RTO entra na auditoria
    assert_eq!(store.logs().len(), 1);
}

#[tokio::test]
async fn listing_is_scoped_to_the_actor_branch() {
    let mine = sample_customer();
    let mut verified = sample_customer();
    verified.branch_id = mine.branch_id;
    verified.sales_verified = true;
    let theirs = sample_customer();

    let store = InMemoryCustomerStore::default();
    store.put(mine.clone());
    store.put(verified.clone());
    store.put(theirs.clone());
    let service = service(&store, &FakeStorage::default());

    let sales = actor(Role::SalesExecutive, Some(mine.branch_id));
    let listed = service
        .list_customers(&sales, ListCustomersQuery::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|c| c.branch_id == mine.branch_id));

    let by_stage = service
        .list_customers(
            &sales,
            ListCustomersQuery {
                stage: Some(WorkflowStage::SalesVerified),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_stage.len(), 1);
    assert_eq!(by_stage[0].id, verified.id);

    let err = service
        .list_customers(
            &sales,
            ListCustomersQuery {
                branch_id: Some(theirs.branch_id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let admin = actor(Role::Admin, None);
    let everything = service
        .list_customers(&admin, ListCustomersQuery::default())
        .await
        .unwrap();
    assert_eq!(everything.len(), 3);
}

#[tokio::test]
async fn reading_another_branch_customer_is_forbidden() {
    let customer = sample_customer();
    let store = InMemoryCustomerStore::with_customer(customer.clone());
    let service = service(&store, &FakeStorage::default());

    let accounts = actor(Role::Accounts, Some(Uuid::new_v4()));
    let err = service.get_customer(customer.id, &accounts).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = service
        .get_customer(Uuid::new_v4(), &actor(Role::Admin, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
