// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Inventario ---
        handlers::inventario::ajustar_stock,
        handlers::inventario::listar_movimientos,

        // --- Compras ---
        handlers::compras::crear_compra,
        handlers::compras::obtener_compra,
        handlers::compras::recibir_compra,
        handlers::compras::cancelar_compra,

        // --- Ventas ---
        handlers::ventas::crear_venta,
        handlers::ventas::obtener_venta,

        // --- Créditos ---
        handlers::creditos::obtener_credito,
        handlers::creditos::registrar_abonos,
        handlers::creditos::obtener_resumen_credito,
        handlers::creditos::obtener_credito_disponible,

        // --- Devoluciones ---
        handlers::devoluciones::crear_devolucion,
        handlers::devoluciones::obtener_devolucion,
        handlers::devoluciones::procesar_devolucion,
        handlers::devoluciones::cambiar_estado_devolucion,
    ),
    components(
        schemas(
            // --- Inventario ---
            models::inventario::Variante,
            models::inventario::TipoMovimiento,
            models::inventario::OrigenTipo,
            models::inventario::MovimientoInventario,
            handlers::inventario::AjusteStockPayload,

            // --- Compras ---
            models::compras::EstadoCompra,
            models::compras::Compra,
            models::compras::CompraDetalle,
            models::compras::CompraConDetalles,
            services::compras_service::LineaCompraEntrada,
            services::compras_service::LineaRecepcion,
            handlers::compras::CrearCompraPayload,
            handlers::compras::RecibirCompraPayload,

            // --- Ventas ---
            models::ventas::TipoVenta,
            models::ventas::TipoPago,
            models::ventas::EstadoPagoVenta,
            models::ventas::Venta,
            models::ventas::VentaDetalle,
            models::ventas::Pago,
            models::ventas::VentaConDetalles,
            services::ventas_service::LineaVentaEntrada,
            handlers::ventas::CrearVentaPayload,

            // --- Créditos ---
            models::creditos::EstadoCredito,
            models::creditos::Credito,
            models::creditos::ResumenCreditoCliente,
            services::creditos_service::AbonoEntrada,
            handlers::creditos::RegistrarAbonosPayload,

            // --- Devoluciones ---
            models::devoluciones::TipoDevolucion,
            models::devoluciones::EstadoDevolucion,
            models::devoluciones::Devolucion,
            models::devoluciones::DevolucionDetalle,
            models::devoluciones::DevolucionConDetalles,
            services::devoluciones_service::LineaDevolucionEntrada,
            handlers::devoluciones::CrearDevolucionPayload,
            handlers::devoluciones::CambiarEstadoPayload,
        )
    ),
    tags(
        (name = "Inventario", description = "Libro mayor de movimientos y ajustes de stock"),
        (name = "Compras", description = "Órdenes de compra y recepción de mercadería"),
        (name = "Ventas", description = "Ventas de contado y a crédito"),
        (name = "Créditos", description = "Abonos y resumen de crédito por cliente"),
        (name = "Devoluciones", description = "Solicitudes de devolución y su procesamiento")
    )
)]
pub struct ApiDoc;
