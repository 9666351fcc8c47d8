pub mod dashboard_metrics;
pub mod dashboard_queue;
pub mod errors;
pub mod models;
pub mod query_service;
pub mod server;

pub use query_service::DashboardQueryService;
pub use server::{build_router, start_dashboard_server};
