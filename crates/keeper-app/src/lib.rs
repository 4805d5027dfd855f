// Library root: re-exports all modules so integration tests and the `keeper`
// binary share the same API.

pub mod config;
pub mod db;
pub mod service;
