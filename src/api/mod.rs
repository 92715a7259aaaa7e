pub mod ai;
pub mod copyleaks;
pub mod extract;
pub mod models;
pub mod response;
pub mod routes;

pub use routes::create_router;
