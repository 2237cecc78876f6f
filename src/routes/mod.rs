pub mod auth;
pub mod health;
pub mod metrics;
pub mod notes;
pub mod tenants;
pub mod users;
