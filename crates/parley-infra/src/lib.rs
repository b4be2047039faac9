//! Infrastructure layer for Parley.
//!
//! Contains implementations of the port traits defined in `parley-core`:
//! SQLite storage for the durable archive, the interest catalog and the
//! ephemeral session store, HTTP clients for the assistant service and the
//! WhatsApp Cloud API, and the configuration loader.

pub mod assistant;
pub mod config;
pub mod ephemeral;
pub mod sqlite;
pub mod whatsapp;

#[cfg(test)]
pub(crate) mod testing;
