//src/main.rs

use axum::{
    Router,
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod services;

use crate::config::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    // Si la configuración falla, la aplicación no debe iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falló la inicialización del estado de la aplicación.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Fallaron las migraciones de la base de datos.");

    tracing::info!("migraciones ejecutadas");

    let inventario_routes = Router::new()
        .route("/ajustes", post(handlers::inventario::ajustar_stock))
        .route("/movimientos", get(handlers::inventario::listar_movimientos));

    let compras_routes = Router::new()
        .route("/", post(handlers::compras::crear_compra))
        .route("/{id}", get(handlers::compras::obtener_compra))
        .route("/{id}/recibir", post(handlers::compras::recibir_compra))
        .route("/{id}/cancelar", post(handlers::compras::cancelar_compra));

    let ventas_routes = Router::new()
        .route("/", post(handlers::ventas::crear_venta))
        .route("/{id}", get(handlers::ventas::obtener_venta));

    let creditos_routes = Router::new()
        .route("/{id}", get(handlers::creditos::obtener_credito))
        .route("/{id}/abonos", post(handlers::creditos::registrar_abonos));

    let clientes_routes = Router::new()
        .route(
            "/{id}/resumen-credito",
            get(handlers::creditos::obtener_resumen_credito),
        )
        .route(
            "/{id}/credito-disponible",
            get(handlers::creditos::obtener_credito_disponible),
        );

    let devoluciones_routes = Router::new()
        .route("/", post(handlers::devoluciones::crear_devolucion))
        .route("/{id}", get(handlers::devoluciones::obtener_devolucion))
        .route(
            "/{id}/procesar",
            post(handlers::devoluciones::procesar_devolucion),
        )
        .route(
            "/{id}/estado",
            put(handlers::devoluciones::cambiar_estado_devolucion),
        );

    let app = Router::new()
        .route("/api/salud", get(|| async { "OK" }))
        .nest("/api/inventario", inventario_routes)
        .nest("/api/compras", compras_routes)
        .nest("/api/ventas", ventas_routes)
        .nest("/api/creditos", creditos_routes)
        .nest("/api/clientes", clientes_routes)
        .nest("/api/devoluciones", devoluciones_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falló el listener TCP");
    tracing::info!("servidor escuchando en {}", addr);
    axum::serve(listener, app).await.expect("Error en el servidor Axum");
}
