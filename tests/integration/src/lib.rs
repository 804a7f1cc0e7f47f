//! End-to-end protocol tests for meshplane.
//!
//! These tests exercise the public facade the way an embedding control plane
//! would: build a store, publish snapshots, and drive full discovery
//! conversations through the dispatcher and registry.

#[cfg(test)]
mod discovery_flow_tests;

#[cfg(test)]
mod store_tests;
