pub mod auth;
pub mod note;
pub mod tenant;
pub mod user;
