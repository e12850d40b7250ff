pub mod balance;
pub mod fetch;
pub mod rate;
pub mod setup;
pub mod ui;
pub mod watch;
