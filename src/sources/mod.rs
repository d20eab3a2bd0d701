pub mod discord;
pub mod schema;
