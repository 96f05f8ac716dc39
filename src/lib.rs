// Library exports for integration tests and the server binary

pub mod collab;
pub mod config;
pub mod execute;
pub mod i18n;
pub mod middleware;
pub mod navigation;
pub mod retry;
pub mod routing;
pub mod server;
