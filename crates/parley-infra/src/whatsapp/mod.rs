//! WhatsApp Cloud API delivery.

pub mod client;
pub mod types;

pub use client::WhatsAppSender;
