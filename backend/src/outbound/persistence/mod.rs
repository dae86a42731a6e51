//! PostgreSQL persistence adapters for the domain's driven ports.

mod diesel_flag_repository;
mod diesel_issue_repository;
mod diesel_status_request_repository;
mod diesel_user_repository;
mod helpers;
mod models;
mod pool;
pub mod schema;

pub use diesel_flag_repository::DieselFlagRepository;
pub use diesel_issue_repository::DieselIssueRepository;
pub use diesel_status_request_repository::DieselStatusRequestRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
