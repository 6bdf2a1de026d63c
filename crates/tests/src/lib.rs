//! End-to-end tests for the Euphoriae engine

#[cfg(test)]
mod engine_integration;
