pub mod focus_time;
pub mod health;
pub mod session;
