//! Prompt templates for AI analysis
//!
//! - `system`: system prompts, one per analysis dimension
//! - `user`: user message templates rendered with MiniJinja

mod system;
mod user;

pub use system::*;
pub use user::*;

use crate::error::{BatchError, Result};
use minijinja::Environment;
use serde::Serialize;

/// Render a MiniJinja template string against serializable variables
pub fn render(name: &str, template: &str, vars: &impl Serialize) -> Result<String> {
    let env = Environment::new();
    let value = minijinja::value::Value::from_serialize(vars);

    env.render_str(template, value)
        .map_err(|e| BatchError::Report(format!("Failed to render prompt {name}: {e}")))
}
