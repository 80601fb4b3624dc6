// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{ChassisRepository, CustomerRepository, UserRepository},
    services::{
        auth::AuthService, chassis_service::ChassisService, customer_service::CustomerService,
        document_storage::LocalDocumentStorage,
    },
};

// Configuração lida do ambiente (.env em desenvolvimento)
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expiration_days: i64,
    pub server_addr: String,
    pub storage_root: String,
    pub storage_public_url: String,
    pub storage_bucket: String,
    pub chassis_bucket: String,
    pub form_base_url: String,
    pub cors_allow: Vec<String>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 5)?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            jwt_expiration_days: parse_env("JWT_EXPIRATION_DAYS", 7)?,
            storage_root: env_or("STORAGE_ROOT", "./uploads"),
            // Sem CDN, os arquivos são servidos pela própria API em /files
            storage_public_url: env_or("STORAGE_PUBLIC_URL", "/files"),
            storage_bucket: env_or("STORAGE_BUCKET", "documents"),
            chassis_bucket: env_or("CHASSIS_BUCKET", "chassis"),
            form_base_url: env_or("FORM_BASE_URL", "http://localhost:5173/customer-form"),
            cors_allow: env_or("CORS_ALLOW_ORIGINS", "*")
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            server_addr: env_or("SERVER_ADDR", "0.0.0.0:3000"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} inválido: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub auth_service: AuthService,
    pub customer_service: CustomerService,
    pub chassis_service: ChassisService,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let auth_service = AuthService::new(
            user_repo,
            settings.jwt_secret.clone(),
            settings.jwt_expiration_days,
        );

        let customer_repo = CustomerRepository::new(db_pool.clone());
        let storage = LocalDocumentStorage::new(
            settings.storage_root.clone(),
            settings.storage_public_url.clone(),
        );
        let storage = Arc::new(storage);
        let customer_service = CustomerService::new(
            Arc::new(customer_repo),
            storage.clone(),
            settings.form_base_url.clone(),
            settings.storage_bucket.clone(),
        );

        let chassis_service = ChassisService::new(
            Arc::new(ChassisRepository::new(db_pool.clone())),
            storage,
            settings.chassis_bucket.clone(),
        );

        Ok(Self {
            db_pool,
            settings: Arc::new(settings),
            auth_service,
            customer_service,
            chassis_service,
        })
    }
}
