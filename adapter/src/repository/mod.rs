pub mod auth;
pub mod booking;
pub mod health;
pub mod payment;
pub mod receipt;
pub mod space;
pub mod user;
