pub mod focus_time;
pub mod postgres_repository;
pub mod session;
