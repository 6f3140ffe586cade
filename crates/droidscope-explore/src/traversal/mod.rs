pub mod controller;
pub mod controls;
pub mod progress;
pub mod trace;
