//! Output backends for the value `main` returns.

pub mod abc;

pub use abc::AbcRenderer;

use crate::config::OutputFormat;
use crate::dsl::error::CompileError;
use crate::runtime::RuntimeValue;

/// Turns an evaluated program into text.
pub trait Renderer {
    fn render(&self, output: &RuntimeValue) -> Result<String, CompileError>;
}

/// The value itself, with types and properties, as YAML.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlRenderer;

impl Renderer for YamlRenderer {
    fn render(&self, output: &RuntimeValue) -> Result<String, CompileError> {
        serde_yaml::to_string(output)
            .map_err(|e| CompileError::render(format!("could not serialize the result: {e}")))
    }
}

/// The renderer for `format`.
pub fn renderer_for(format: OutputFormat, title: Option<String>) -> Box<dyn Renderer> {
    match format {
        OutputFormat::Abc => Box::new(AbcRenderer::new(title)),
        OutputFormat::Yaml => Box::new(YamlRenderer),
    }
}
