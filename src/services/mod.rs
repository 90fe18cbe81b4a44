pub mod compras_service;
pub mod creditos_service;
pub mod devoluciones_service;
pub mod inventario_service;
pub mod ventas_service;
