pub mod bridge;
pub mod config;
pub mod content;
pub mod folders;
pub mod jxa;
pub mod model;
pub mod notes;
pub mod ops;
