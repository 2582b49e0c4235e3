// Library root: re-exports all modules so integration tests and the binary
// can reach the client's public API.

pub mod app;
pub mod audio;
pub mod config;
pub mod console;
pub mod db;
pub mod events;
pub mod realtime;
pub mod session;
