// src/db/customer_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        customer::{Customer, CustomerFilter, WorkflowStage},
        finance::FinanceOption,
        verification::{NewVerificationLog, VerificationLog},
    },
};

/// Como localizar o cliente: pelo id (funcionários) ou pelo token do link (cliente final).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerKey {
    Id(Uuid),
    LinkToken(Uuid),
}

/// Corpo de uma transição: valida contra o registro recém-lido e aplica as mudanças.
/// `Some(log)` é gravado na mesma transação que o registro.
pub type TransitionFn =
    Box<dyn FnOnce(&mut Customer) -> Result<Option<NewVerificationLog>, AppError> + Send>;

/// Contrato de persistência do cliente.
///
/// `transition` é a única forma de alterar um cliente existente: lê o registro com trava,
/// roda `apply`, grava o registro e a entrada de auditoria juntos. Se `apply` falhar,
/// nada é gravado.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn insert(&self, customer: &Customer) -> Result<Customer, AppError>;
    async fn find(&self, key: CustomerKey) -> Result<Option<Customer>, AppError>;
    async fn list(&self, filter: &CustomerFilter) -> Result<Vec<Customer>, AppError>;
    async fn transition(&self, key: CustomerKey, apply: TransitionFn) -> Result<Customer, AppError>;
    async fn list_logs(&self, customer_id: Uuid) -> Result<Vec<VerificationLog>, AppError>;
    async fn find_finance_option(&self, id: Uuid) -> Result<Option<FinanceOption>, AppError>;
}

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn update_customer<'e, E>(&self, executor: E, c: &Customer) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                name = $1, first_name = $2, last_name = $3, phone_number = $4,
                alternate_phone_number = $5, email = $6, address = $7, pin_code = $8,
                dob = $9, nominee = $10, relation = $11,
                vehicle_name = $12, vehicle_variant = $13, vehicle_color = $14,
                ex_showroom_price = $15, tax = $16, insurance = $17, tp_registration = $18,
                man_accessories = $19, optional_accessories = $20, booking_amount = $21,
                total_price = $22, balance_amount = $23,
                finance_id = $24, finance_amount = $25, amount_paid = $26,
                photo_aadhaar_front = $27, photo_aadhaar_back = $28,
                photo_passport = $29, customer_sign = $30,
                status = $31, sales_verified = $32, accounts_verified = $33,
                rto_verified = $34, registered = $35, vehicle_number = $36,
                updated_at = $37
            WHERE id = $38
            RETURNING *
            "#,
        )
        .bind(&c.name)
        .bind(&c.first_name)
        .bind(&c.last_name)
        .bind(&c.phone_number)
        .bind(&c.alternate_phone_number)
        .bind(&c.email)
        .bind(&c.address)
        .bind(&c.pin_code)
        .bind(c.dob)
        .bind(&c.nominee)
        .bind(&c.relation)
        .bind(&c.vehicle_name)
        .bind(&c.vehicle_variant)
        .bind(&c.vehicle_color)
        .bind(c.ex_showroom_price)
        .bind(c.tax)
        .bind(c.insurance)
        .bind(c.tp_registration)
        .bind(c.man_accessories)
        .bind(c.optional_accessories)
        .bind(c.booking_amount)
        .bind(c.total_price)
        .bind(c.balance_amount)
        .bind(c.finance_id)
        .bind(c.finance_amount)
        .bind(c.amount_paid)
        .bind(&c.photo_aadhaar_front)
        .bind(&c.photo_aadhaar_back)
        .bind(&c.photo_passport)
        .bind(&c.customer_sign)
        .bind(c.status)
        .bind(c.sales_verified)
        .bind(c.accounts_verified)
        .bind(c.rto_verified)
        .bind(c.registered)
        .bind(&c.vehicle_number)
        .bind(c.updated_at)
        .bind(c.id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // finance_id apontando para financeira inexistente
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_foreign_key_violation() {
                    return AppError::NotFound("Financeira");
                }
            }
            e.into()
        })?;

        Ok(updated)
    }

    async fn append_log<'e, E>(&self, executor: E, entry: &NewVerificationLog) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO verification_logs (user_id, customer_id, action, timestamp)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.customer_id)
        .bind(entry.action)
        .bind(entry.timestamp)
        .execute(executor)
        .await?;

        Ok(())
    }
}

// Condição SQL equivalente a `Customer::stage()`
fn stage_condition(stage: WorkflowStage) -> &'static str {
    match stage {
        WorkflowStage::Registered => "registered",
        WorkflowStage::RtoVerified => "rto_verified AND NOT registered",
        WorkflowStage::AccountsVerified => "accounts_verified AND NOT rto_verified AND NOT registered",
        WorkflowStage::SalesVerified => {
            "sales_verified AND NOT accounts_verified AND NOT rto_verified AND NOT registered"
        }
        WorkflowStage::Submitted => {
            "status = 'submitted' AND NOT sales_verified AND NOT accounts_verified AND NOT rto_verified AND NOT registered"
        }
        WorkflowStage::Created => {
            "status = 'pending' AND NOT sales_verified AND NOT accounts_verified AND NOT rto_verified AND NOT registered"
        }
    }
}

#[async_trait]
impl CustomerStore for CustomerRepository {
    async fn insert(&self, c: &Customer) -> Result<Customer, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (
                id, branch_id, sales_executive_id,
                name, first_name, last_name, phone_number, alternate_phone_number,
                email, address, pin_code, dob, nominee, relation,
                vehicle_name, vehicle_variant, vehicle_color,
                ex_showroom_price, tax, insurance, tp_registration,
                man_accessories, optional_accessories, booking_amount,
                total_price, balance_amount, finance_id, finance_amount, amount_paid,
                photo_aadhaar_front, photo_aadhaar_back, photo_passport, customer_sign,
                link_token, status, sales_verified, accounts_verified, rto_verified,
                registered, vehicle_number, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28,
                $29, $30, $31, $32, $33, $34, $35, $36, $37, $38, $39, $40, $41, $42
            )
            RETURNING *
            "#,
        )
        .bind(c.id)
        .bind(c.branch_id)
        .bind(c.sales_executive_id)
        .bind(&c.name)
        .bind(&c.first_name)
        .bind(&c.last_name)
        .bind(&c.phone_number)
        .bind(&c.alternate_phone_number)
        .bind(&c.email)
        .bind(&c.address)
        .bind(&c.pin_code)
        .bind(c.dob)
        .bind(&c.nominee)
        .bind(&c.relation)
        .bind(&c.vehicle_name)
        .bind(&c.vehicle_variant)
        .bind(&c.vehicle_color)
        .bind(c.ex_showroom_price)
        .bind(c.tax)
        .bind(c.insurance)
        .bind(c.tp_registration)
        .bind(c.man_accessories)
        .bind(c.optional_accessories)
        .bind(c.booking_amount)
        .bind(c.total_price)
        .bind(c.balance_amount)
        .bind(c.finance_id)
        .bind(c.finance_amount)
        .bind(c.amount_paid)
        .bind(&c.photo_aadhaar_front)
        .bind(&c.photo_aadhaar_back)
        .bind(&c.photo_passport)
        .bind(&c.customer_sign)
        .bind(c.link_token)
        .bind(c.status)
        .bind(c.sales_verified)
        .bind(c.accounts_verified)
        .bind(c.rto_verified)
        .bind(c.registered)
        .bind(&c.vehicle_number)
        .bind(c.created_at)
        .bind(c.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_foreign_key_violation() {
                    return AppError::NotFound("Filial");
                }
            }
            e.into()
        })?;

        Ok(customer)
    }

    async fn find(&self, key: CustomerKey) -> Result<Option<Customer>, AppError> {
        let (sql, value) = match key {
            CustomerKey::Id(id) => ("SELECT * FROM customers WHERE id = $1", id),
            CustomerKey::LinkToken(token) => ("SELECT * FROM customers WHERE link_token = $1", token),
        };

        let customer = sqlx::query_as::<_, Customer>(sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    async fn list(&self, filter: &CustomerFilter) -> Result<Vec<Customer>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM customers WHERE TRUE");

        if let Some(branch_id) = filter.branch_id {
            qb.push(" AND branch_id = ").push_bind(branch_id);
        }
        if let Some(stage) = filter.stage {
            qb.push(" AND (").push(stage_condition(stage)).push(")");
        }
        if let Some(from) = filter.created_from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.created_to {
            qb.push(" AND created_at < ").push_bind(to);
        }
        qb.push(" ORDER BY created_at DESC");

        let customers = qb.build_query_as::<Customer>().fetch_all(&self.pool).await?;
        Ok(customers)
    }

    async fn transition(&self, key: CustomerKey, apply: TransitionFn) -> Result<Customer, AppError> {
        // 1. Transação + trava da linha: ninguém altera o cliente entre validar e gravar
        let mut tx = self.pool.begin().await?;

        let (sql, value) = match key {
            CustomerKey::Id(id) => ("SELECT * FROM customers WHERE id = $1 FOR UPDATE", id),
            CustomerKey::LinkToken(token) => {
                ("SELECT * FROM customers WHERE link_token = $1 FOR UPDATE", token)
            }
        };

        let mut customer = sqlx::query_as::<_, Customer>(sql)
            .bind(value)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;

        // 2. Regras de negócio. Se falhar, o drop do `tx` faz rollback.
        let log = apply(&mut customer)?;

        // 3. Grava registro + auditoria juntos
        let updated = self.update_customer(&mut *tx, &customer).await?;
        if let Some(entry) = log {
            self.append_log(&mut *tx, &entry).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn list_logs(&self, customer_id: Uuid) -> Result<Vec<VerificationLog>, AppError> {
        let logs = sqlx::query_as::<_, VerificationLog>(
            r#"
            SELECT id, user_id, customer_id, action, timestamp
            FROM verification_logs
            WHERE customer_id = $1
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    async fn find_finance_option(&self, id: Uuid) -> Result<Option<FinanceOption>, AppError> {
        let option = sqlx::query_as::<_, FinanceOption>(
            "SELECT id, company_name, details FROM finance_options WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(option)
    }
}
