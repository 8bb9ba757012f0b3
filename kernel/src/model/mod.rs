pub mod auth;
pub mod booking;
pub mod id;
pub mod list;
pub mod payment;
pub mod role;
pub mod space;
pub mod user;
