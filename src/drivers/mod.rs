//! Thin wrappers over ESP-IDF task primitives.

pub mod task_pin;
