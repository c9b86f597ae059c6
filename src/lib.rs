pub mod agent;
pub mod app;
pub mod config;
pub mod dispatch;
pub mod events;
pub mod observer;
pub mod plan;
pub mod policy;
pub mod sandbox;
pub mod shared;
pub mod tui;
