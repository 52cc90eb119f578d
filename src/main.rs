// src/main.rs

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_middleware;

#[tokio::main]
async fn main() {
    // Inicializa o logger
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas de entregas (protegidas pelo middleware de autenticação)
    let delivery_routes = Router::new()
        .route(
            "/",
            post(handlers::deliveries::create_delivery).get(handlers::deliveries::list_deliveries),
        )
        .route(
            "/{delivery_id}/accept",
            post(handlers::deliveries::accept_delivery),
        )
        .route(
            "/{delivery_id}/status",
            put(handlers::deliveries::update_status),
        )
        .route(
            "/{delivery_id}/waiting",
            put(handlers::deliveries::update_waiting),
        )
        .route(
            "/{delivery_id}/validate-pin",
            post(handlers::deliveries::validate_pin),
        )
        .route(
            "/{delivery_id}/receipt",
            get(handlers::deliveries::get_receipt),
        )
        .route(
            "/{delivery_id}/receipt/pdf",
            get(handlers::deliveries::get_receipt_pdf),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_middleware,
        ));

    // Rotas de usuário (protegidas)
    let user_routes = Router::new()
        .route("/profile", get(handlers::users::get_profile))
        .route("/availability", put(handlers::users::update_availability))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_middleware,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/rankings", get(handlers::users::get_rankings))
        .nest("/api/deliveries", delivery_routes)
        .nest("/api/users", user_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
