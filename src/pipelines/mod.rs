pub mod backend;
pub mod capability;
pub mod models;
pub mod schedulers;
