pub mod auth;
pub mod invitation;
pub mod metrics;
pub mod notes;
pub mod password;
pub mod session;
pub mod token;
