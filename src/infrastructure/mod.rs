pub mod account;
pub mod control_file;
pub mod exchange;
pub mod http;
pub mod notifier;
pub mod tracker;
