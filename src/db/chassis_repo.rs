// src/db/chassis_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{common::error::AppError, models::chassis::Chassis};

#[async_trait]
pub trait ChassisStore: Send + Sync {
    async fn insert(&self, chassis: &Chassis) -> Result<Chassis, AppError>;
    async fn find_by_number(&self, chassis_number: &str) -> Result<Option<Chassis>, AppError>;
}

#[derive(Clone)]
pub struct ChassisRepository {
    pool: PgPool,
}

impl ChassisRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChassisStore for ChassisRepository {
    async fn insert(&self, chassis: &Chassis) -> Result<Chassis, AppError> {
        sqlx::query_as::<_, Chassis>(
            r#"
            INSERT INTO chassis (id, chassis_number, chassis_photo_url, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(chassis.id)
        .bind(&chassis.chassis_number)
        .bind(&chassis.chassis_photo_url)
        .bind(chassis.user_id)
        .bind(chassis.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                // Dois envios simultâneos do mesmo chassi
                if db_err.is_unique_violation() {
                    return AppError::PreconditionFailed("chassi já cadastrado".into());
                }
            }
            e.into()
        })
    }

    async fn find_by_number(&self, chassis_number: &str) -> Result<Option<Chassis>, AppError> {
        let chassis = sqlx::query_as::<_, Chassis>(
            r#"
            SELECT id, chassis_number, chassis_photo_url, user_id, created_at
            FROM chassis
            WHERE upper(chassis_number) = upper($1)
            "#,
        )
        .bind(chassis_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(chassis)
    }
}
