//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives the bootstrap end to end,
//! either against recording mocks or against the simulation adapters.  All
//! tests run on the host with no real hardware required.

#![cfg(not(target_os = "espidf"))]

mod bootstrap_flow_tests;
mod mocks;
mod sim_stack_tests;
