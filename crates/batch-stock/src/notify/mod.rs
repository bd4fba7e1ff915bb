//! Report delivery

mod email;

pub use email::{EmailNotifier, plain_summary, subject};
