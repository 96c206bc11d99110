//! Integration tests for record hooks

mod cli_commands;
mod config_integration;
mod dispatch_flow;
mod paging;
mod resolver_precedence;
mod sled_store;
mod test_utils;
mod weight_scenario;
