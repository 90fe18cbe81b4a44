pub mod inventario_repo;
pub use inventario_repo::InventarioRepository;
pub mod compras_repo;
pub use compras_repo::ComprasRepository;
pub mod ventas_repo;
pub use ventas_repo::VentasRepository;
pub mod creditos_repo;
pub use creditos_repo::CreditosRepository;
pub mod devoluciones_repo;
pub use devoluciones_repo::DevolucionesRepository;
