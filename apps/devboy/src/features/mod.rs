pub mod deploy;
pub mod dispatch;
pub mod prompt;
pub mod registry;
pub mod routes;
pub mod server;
