pub mod catalog;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod logging;
pub mod poller;
pub mod push;
pub mod snapshot;
pub mod soc;
pub mod term;
pub mod watcher;
