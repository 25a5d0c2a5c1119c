pub mod auth;
pub mod event;
pub mod health;
pub mod notification;
pub mod roster;
