pub mod compras;
pub mod creditos;
pub mod devoluciones;
pub mod inventario;
pub mod ventas;
