pub mod jwt;
pub mod middleware;
pub mod models;

pub use models::{MaybePrincipal, Principal};
