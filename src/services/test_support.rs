// src/services/test_support.rs
//
// Dublês em memória para os testes dos serviços.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{customer_repo::TransitionFn, ChassisStore, CustomerKey, CustomerStore},
    models::{
        auth::{Actor, Role},
        chassis::Chassis,
        customer::{Customer, CustomerFilter, CustomerStatus},
        finance::FinanceOption,
        verification::VerificationLog,
    },
    services::{document_storage::DocumentStorage, pricing},
};

pub fn actor(role: Role, branch_id: Option<Uuid>) -> Actor {
    Actor {
        user_id: Uuid::new_v4(),
        role,
        branch_id,
    }
}

/// Cliente recém-cadastrado por vendas, sem formulário nem verificações.
pub fn sample_customer() -> Customer {
    let now = Utc::now();
    let mut customer = Customer {
        id: Uuid::new_v4(),
        branch_id: Uuid::new_v4(),
        sales_executive_id: Some(Uuid::new_v4()),
        name: "Ravi Kumar".into(),
        first_name: None,
        last_name: None,
        phone_number: "9876543210".into(),
        alternate_phone_number: None,
        email: None,
        address: None,
        pin_code: None,
        dob: None,
        nominee: None,
        relation: None,
        vehicle_name: "Activa".into(),
        vehicle_variant: "6G".into(),
        vehicle_color: Some("Black".into()),
        ex_showroom_price: Some(dec!(80000)),
        tax: Some(dec!(8000)),
        insurance: None,
        tp_registration: None,
        man_accessories: None,
        optional_accessories: None,
        booking_amount: None,
        total_price: Default::default(),
        balance_amount: Default::default(),
        finance_id: None,
        finance_amount: None,
        amount_paid: None,
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
    pricing::recalculate(&mut customer);
    customer
}

#[derive(Default)]
struct StoreState {
    customers: Vec<Customer>,
    logs: Vec<VerificationLog>,
    finance_options: Vec<FinanceOption>,
}

/// Mesmo contrato do repositório Postgres: a transição roda sobre uma cópia
/// e só é gravada (com a auditoria) se a regra devolver `Ok`.
#[derive(Clone, Default)]
pub struct InMemoryCustomerStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryCustomerStore {
    pub fn with_customer(customer: Customer) -> Self {
        let store = Self::default();
        store.put(customer);
        store
    }

    pub fn put(&self, customer: Customer) {
        let mut state = self.state.lock().unwrap();
        state.customers.retain(|c| c.id != customer.id);
        state.customers.push(customer);
    }

    pub fn add_finance_option(&self, company_name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().finance_options.push(FinanceOption {
            id,
            company_name: company_name.into(),
            details: None,
        });
        id
    }

    pub fn get(&self, id: Uuid) -> Customer {
        self.state
            .lock()
            .unwrap()
            .customers
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .expect("cliente não está no store")
    }

    pub fn logs(&self) -> Vec<VerificationLog> {
        self.state.lock().unwrap().logs.clone()
    }

    fn matches(customer: &Customer, key: CustomerKey) -> bool {
        match key {
            CustomerKey::Id(id) => customer.id == id,
            CustomerKey::LinkToken(token) => customer.link_token == token,
        }
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn insert(&self, customer: &Customer) -> Result<Customer, AppError> {
        self.put(customer.clone());
        Ok(customer.clone())
    }

    async fn find(&self, key: CustomerKey) -> Result<Option<Customer>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.customers.iter().find(|c| Self::matches(c, key)).cloned())
    }

    async fn list(&self, filter: &CustomerFilter) -> Result<Vec<Customer>, AppError> {
        let state = self.state.lock().unwrap();
        let mut customers: Vec<Customer> = state
            .customers
            .iter()
            .filter(|c| filter.branch_id.is_none_or(|b| c.branch_id == b))
            .filter(|c| filter.stage.is_none_or(|s| c.stage() == s))
            .filter(|c| filter.created_from.is_none_or(|from| c.created_at >= from))
            .filter(|c| filter.created_to.is_none_or(|to| c.created_at < to))
            .cloned()
            .collect();
        customers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(customers)
    }

    async fn transition(&self, key: CustomerKey, apply: TransitionFn) -> Result<Customer, AppError> {
        let mut state = self.state.lock().unwrap();
        let index = state
            .customers
            .iter()
            .position(|c| Self::matches(c, key))
            .ok_or(AppError::NotFound("Cliente"))?;

        let mut draft = state.customers[index].clone();
        let entry = apply(&mut draft)?;

        state.customers[index] = draft.clone();
        if let Some(entry) = entry {
            state.logs.push(VerificationLog {
                id: Uuid::new_v4(),
                user_id: entry.user_id,
                customer_id: entry.customer_id,
                action: entry.action,
                timestamp: entry.timestamp,
            });
        }
        Ok(draft)
    }

    async fn list_logs(&self, customer_id: Uuid) -> Result<Vec<VerificationLog>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .logs
            .iter()
            .filter(|l| l.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn find_finance_option(&self, id: Uuid) -> Result<Option<FinanceOption>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.finance_options.iter().find(|f| f.id == id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryChassisStore {
    rows: Arc<Mutex<Vec<Chassis>>>,
}

impl InMemoryChassisStore {
    pub fn all(&self) -> Vec<Chassis> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChassisStore for InMemoryChassisStore {
    async fn insert(&self, chassis: &Chassis) -> Result<Chassis, AppError> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|c| c.chassis_number.eq_ignore_ascii_case(&chassis.chassis_number))
        {
            return Err(AppError::PreconditionFailed("chassi já cadastrado".into()));
        }
        rows.push(chassis.clone());
        Ok(chassis.clone())
    }

    async fn find_by_number(&self, chassis_number: &str) -> Result<Option<Chassis>, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|c| c.chassis_number.eq_ignore_ascii_case(chassis_number))
            .cloned())
    }
}

/// Armazenamento falso. `fail_after(n)` aceita `n` uploads e falha no seguinte.
#[derive(Clone, Default)]
pub struct FakeStorage {
    uploads: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicUsize>,
    fail_after: Option<usize>,
}

impl FakeStorage {
    pub fn fail_after(successes: usize) -> Self {
        Self {
            fail_after: Some(successes),
            ..Default::default()
        }
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStorage for FakeStorage {
    async fn store_document(
        &self,
        _bytes: Vec<u8>,
        bucket: &str,
        filename: &str,
    ) -> Result<String, AppError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| call >= limit) {
            return Err(AppError::StorageError("bucket indisponível".into()));
        }

        let url = format!("https://storage.test/{bucket}/{filename}");
        self.uploads.lock().unwrap().push(url.clone());
        Ok(url)
    }
}
