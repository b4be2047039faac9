//! Interest extraction: filtering raw analysis output against the catalog.

pub mod validator;

pub use validator::{InterestValidator, ValidationOutcome};
