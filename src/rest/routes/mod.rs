pub mod auth;
pub mod goals;
pub mod health;
pub mod reports;
pub mod users;
