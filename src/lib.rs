pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod recombine;
pub mod routes;
pub mod state;
pub mod store;

#[cfg(test)]
pub mod test_support;
