pub mod alert;
pub mod channel;
pub mod config;
pub mod connection;
pub mod event;
