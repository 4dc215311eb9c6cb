pub mod pagination;
pub mod time;
pub mod token;
