pub mod details;
pub mod handlers;
pub mod search;
pub mod store;
