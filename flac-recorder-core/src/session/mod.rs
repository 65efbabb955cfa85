pub mod capture_loop;
pub mod controller;
pub mod negotiator;
pub mod recorder;
