pub mod auth;
pub mod event;
pub mod id;
pub mod notification;
pub mod roster;
