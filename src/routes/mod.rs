pub mod admin;
pub mod export;
pub mod health;
pub mod public;
