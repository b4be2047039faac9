//! Logging and trace export for the Parley service.

pub mod tracing_setup;
