//src/main.rs

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, patch, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

// Fotos do formulário (3 documentos + assinatura) e do chassi
const FORM_BODY_LIMIT: usize = 20 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env()?;
    let app_state = AppState::new(settings).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let addr = app_state.settings.server_addr.clone();
    let app = app_router(app_state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}

fn app_router(app_state: AppState) -> Router {
    let settings = app_state.settings.clone();

    // Rotas públicas de autenticação
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    // Formulário do cliente final: o token do link é a credencial
    let public_routes = Router::new()
        .route(
            "/forms/{link_token}",
            get(handlers::public_form::get_form).post(handlers::public_form::submit_form),
        )
        .layer(DefaultBodyLimit::max(FORM_BODY_LIMIT));

    // Rotas de funcionários (protegidas pelo middleware)
    let user_routes = Router::new().route("/me", get(handlers::auth::get_me));

    let customer_routes = Router::new()
        .route("/customers", get(handlers::customers::list_customers))
        .route("/customers/{id}", get(handlers::customers::get_customer))
        .route(
            "/customers/{id}/logs",
            get(handlers::customers::get_verification_history),
        );

    let sales_routes = Router::new()
        .route("/customers", post(handlers::customers::create_customer))
        .route(
            "/customers/{id}",
            patch(handlers::customers::update_sales_details),
        )
        .route(
            "/customers/{id}/verify",
            post(handlers::customers::verify_sales),
        );

    let accounts_routes = Router::new()
        .route(
            "/customers/{id}/finance",
            patch(handlers::customers::update_finance),
        )
        .route(
            "/customers/{id}/verify",
            post(handlers::customers::verify_accounts),
        );

    let rto_routes = Router::new()
        .route("/customers/{id}", patch(handlers::customers::update_post_sale))
        .route("/customers/{id}/verify", post(handlers::customers::verify_rto))
        .route(
            "/customers/{id}/register",
            post(handlers::customers::register_vehicle),
        );

    let chassis_routes = Router::new()
        .route("/", post(handlers::chassis::upload_chassis))
        .route(
            "/{chassis_number}/image",
            get(handlers::chassis::get_chassis_image),
        )
        .layer(DefaultBodyLimit::max(FORM_BODY_LIMIT));

    let staff_routes = Router::new()
        .nest("/users", user_routes)
        .merge(customer_routes)
        .nest("/sales", sales_routes)
        .nest("/accounts", accounts_routes)
        .nest("/rto", rto_routes)
        .nest("/chassis", chassis_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let openapi = ApiDoc::openapi();

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(openapi) }))
        .nest("/api/auth", auth_routes)
        .nest("/api/public", public_routes)
        .nest("/api", staff_routes)
        .nest_service("/files", ServeDir::new(&settings.storage_root))
        .with_state(app_state)
        .layer(cors_layer(&settings.cors_allow))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Origem CORS ignorada (inválida): {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}
