// src/config.rs

use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, time::Duration};

use crate::{
    db::{
        ComprasRepository, CreditosRepository, DevolucionesRepository, InventarioRepository,
        VentasRepository,
    },
    services::{
        compras_service::ComprasService, creditos_service::CreditosService,
        devoluciones_service::DevolucionesService, inventario_service::InventarioService,
        ventas_service::VentasService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub inventario_service: InventarioService,
    pub compras_service: ComprasService,
    pub ventas_service: VentasService,
    pub creditos_service: CreditosService,
    pub devoluciones_service: DevolucionesService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("conexión con la base de datos establecida");

        // --- Grafo de dependencias ---
        let inventario_repo = InventarioRepository::new(db_pool.clone());
        let compras_repo = ComprasRepository::new(db_pool.clone());
        let ventas_repo = VentasRepository::new(db_pool.clone());
        let creditos_repo = CreditosRepository::new(db_pool.clone());
        let devoluciones_repo = DevolucionesRepository::new(db_pool.clone());

        let inventario_service = InventarioService::new(inventario_repo);
        let compras_service = ComprasService::new(compras_repo, inventario_service.clone());
        let creditos_service = CreditosService::new(creditos_repo.clone(), ventas_repo.clone());
        let ventas_service = VentasService::new(
            ventas_repo.clone(),
            creditos_repo,
            inventario_service.clone(),
            creditos_service.clone(),
        );
        let devoluciones_service = DevolucionesService::new(
            devoluciones_repo,
            ventas_repo,
            inventario_service.clone(),
            creditos_service.clone(),
        );

        Ok(Self {
            db_pool,
            inventario_service,
            compras_service,
            ventas_service,
            creditos_service,
            devoluciones_service,
        })
    }
}
