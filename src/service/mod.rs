pub mod focus_time;
