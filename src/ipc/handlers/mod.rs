pub mod auth;
pub mod backup;
pub mod certificates;
pub mod core;
pub mod setup;
pub mod students;
