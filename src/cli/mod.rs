pub mod app;
pub mod commands;
pub mod compare;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod paths;
pub mod runtime;
pub mod snapshot;

pub use app::run;
