pub mod error;
pub mod focus_time;
pub mod health;
