#[path = "integration/host_loop.rs"]
mod host_loop;
#[path = "integration/error_handling.rs"]
mod error_handling;
#[path = "integration/properties.rs"]
mod properties;
#[path = "integration/dynamic_yield.rs"]
mod dynamic_yield;
