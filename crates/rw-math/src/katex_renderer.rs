//! In-process KaTeX renderer.

use crate::error::RenderError;
use crate::renderer::{MathRenderer, OutputFormat, RenderOptions};

/// Renderer backed by the `katex` crate (KaTeX in an embedded JS engine).
///
/// Parse errors are returned as [`RenderError::Katex`] instead of being
/// rendered inline by KaTeX.
#[derive(Debug, Clone, Default)]
pub struct KatexRenderer {
    output: OutputFormat,
}

impl KatexRenderer {
    /// Create a renderer producing HTML plus MathML.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the markup flavor.
    #[must_use]
    pub fn output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }
}

impl MathRenderer for KatexRenderer {
    fn render(&self, tex: &str, options: RenderOptions) -> Result<String, RenderError> {
        let output_type = match self.output {
            OutputFormat::Html => ::katex::OutputType::Html,
            OutputFormat::Mathml => ::katex::OutputType::Mathml,
            OutputFormat::HtmlAndMathml => ::katex::OutputType::HtmlAndMathml,
        };

        let opts = ::katex::Opts::builder()
            .display_mode(options.display_mode)
            .output_type(output_type)
            .throw_on_error(true)
            .build()
            .map_err(|err| RenderError::Katex(format!("invalid options: {err}")))?;

        ::katex::render_with_opts(tex, &opts).map_err(|err| RenderError::Katex(err.to_string()))
    }

    fn name(&self) -> &str {
        match self.output {
            OutputFormat::Html => "katex:html",
            OutputFormat::Mathml => "katex:mathml",
            OutputFormat::HtmlAndMathml => "katex:html_and_mathml",
        }
    }
}
