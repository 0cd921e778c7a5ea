//! Math placeholder replacement.
//!
//! This module provides [`MathReplacer`], which finds inline and script math
//! placeholders in a document, renders their source with a [`MathRenderer`]
//! and puts the rendered fragment where the placeholder was.

use crate::error::MathError;
use crate::parser::HtmlParser;
use crate::placeholder::{Markers, PlaceholderKind, script_display_mode};
use crate::renderer::{MathRenderer, RenderOptions};
use crate::serializer::{HtmlSerializer, escape_attr, escape_html};
use crate::tree::TreeNode;

/// What to do when the renderer fails on a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop the current pass and return the error. Placeholders already
    /// replaced stay replaced.
    #[default]
    Abort,
    /// Replace the placeholder with an error marker, record a warning and
    /// continue.
    Inline,
}

/// Outcome of processing one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceReport {
    /// Inline placeholders replaced.
    pub inline: usize,
    /// Script placeholders replaced.
    pub scripts: usize,
    /// Render failures turned into error markers (inline error policy only).
    pub warnings: Vec<String>,
}

impl ReplaceReport {
    /// Total placeholders replaced.
    #[must_use]
    pub fn total(&self) -> usize {
        self.inline + self.scripts
    }
}

/// Result of [`MathReplacer::render_html`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedHtml {
    /// Output document.
    pub html: String,
    /// Replacement summary.
    pub report: ReplaceReport,
}

/// Replaces math placeholders in documents.
///
/// # Example
///
/// ```ignore
/// use rw_math::{CommandRenderer, ErrorPolicy, MathReplacer};
///
/// let replacer = MathReplacer::new(CommandRenderer::default())
///     .error_policy(ErrorPolicy::Inline);
///
/// let rendered = replacer.render_html(r#"<p><a href="/$/">x^2</a></p>"#)?;
/// ```
pub struct MathReplacer<R> {
    renderer: R,
    markers: Markers,
    error_policy: ErrorPolicy,
}

impl<R: MathRenderer> MathReplacer<R> {
    /// Create a replacer with default markers and [`ErrorPolicy::Abort`].
    #[must_use]
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            markers: Markers::default(),
            error_policy: ErrorPolicy::default(),
        }
    }

    /// Set the placeholder markers.
    #[must_use]
    pub fn markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }

    /// Set the render failure policy.
    #[must_use]
    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Parse `html`, replace all placeholders and serialize the result.
    ///
    /// A document without placeholders is returned unchanged, byte for byte.
    ///
    /// # Errors
    ///
    /// Returns [`MathError::Parse`] if the document cannot be parsed, or
    /// [`MathError::Render`] on the first render failure under
    /// [`ErrorPolicy::Abort`].
    pub fn render_html(&self, html: &str) -> Result<RenderedHtml, MathError> {
        let mut document = HtmlParser::new().parse(html)?;

        if !self.has_placeholders(&document) {
            return Ok(RenderedHtml {
                html: html.to_owned(),
                report: ReplaceReport::default(),
            });
        }

        let report = self.replace_math(&mut document)?;
        Ok(RenderedHtml {
            html: HtmlSerializer::new().serialize(&document),
            report,
        })
    }

    /// Replace inline placeholders, then script placeholders.
    ///
    /// # Errors
    ///
    /// Returns [`MathError::Render`] on the first render failure under
    /// [`ErrorPolicy::Abort`]. The document keeps the replacements made so far.
    pub fn replace_math(&self, document: &mut TreeNode) -> Result<ReplaceReport, MathError> {
        let mut report = ReplaceReport::default();
        self.replace_inline(document, &mut report)?;
        self.replace_scripts(document, &mut report)?;
        tracing::info!(
            inline = report.inline,
            scripts = report.scripts,
            warnings = report.warnings.len(),
            "Replaced math placeholders"
        );
        Ok(report)
    }

    /// Replace every inline placeholder with its non-display rendering.
    ///
    /// Placeholders are processed in reverse document order, so a placeholder
    /// nested inside another is replaced before its ancestor and every
    /// queried path stays valid.
    ///
    /// # Errors
    ///
    /// Returns [`MathError::Render`] on render failure under [`ErrorPolicy::Abort`].
    pub fn replace_inline(
        &self,
        document: &mut TreeNode,
        report: &mut ReplaceReport,
    ) -> Result<(), MathError> {
        let paths = document.find_elements(|node, _| self.markers.is_inline(node));

        for path in paths.iter().rev() {
            let Some(node) = document.node(path) else {
                continue;
            };
            let tex = node.text_content();
            let options = RenderOptions {
                display_mode: false,
            };
            let fragment = self.render_one(PlaceholderKind::Inline, &tex, options, report)?;
            document.replace_with_markup(path, fragment);
            report.inline += 1;
        }

        Ok(())
    }

    /// Replace every script placeholder, choosing display mode from context.
    ///
    /// A script with no `<p>` ancestor renders in display mode, one inside a
    /// paragraph renders inline. Processed in reverse document order.
    ///
    /// # Errors
    ///
    /// Returns [`MathError::Render`] on render failure under [`ErrorPolicy::Abort`].
    pub fn replace_scripts(
        &self,
        document: &mut TreeNode,
        report: &mut ReplaceReport,
    ) -> Result<(), MathError> {
        let mut display_modes = Vec::new();
        let paths = document.find_elements(|node, ancestors| {
            let matched = self.markers.is_script(node);
            if matched {
                display_modes.push(script_display_mode(ancestors));
            }
            matched
        });

        for (path, display_mode) in paths.iter().zip(display_modes).rev() {
            let Some(node) = document.node(path) else {
                continue;
            };
            let tex = node.text.clone();
            let options = RenderOptions { display_mode };
            let fragment = self.render_one(PlaceholderKind::Script, &tex, options, report)?;
            document.replace_with_markup(path, fragment);
            report.scripts += 1;
        }

        Ok(())
    }

    /// Whether the document contains any placeholder of either form.
    fn has_placeholders(&self, document: &TreeNode) -> bool {
        !document
            .find_elements(|node, _| self.markers.is_inline(node) || self.markers.is_script(node))
            .is_empty()
    }

    /// Render one placeholder, applying the error policy.
    fn render_one(
        &self,
        kind: PlaceholderKind,
        tex: &str,
        options: RenderOptions,
        report: &mut ReplaceReport,
    ) -> Result<String, MathError> {
        tracing::debug!(%kind, display = options.display_mode, tex, "Rendering math");

        match self.renderer.render(tex, options) {
            Ok(fragment) => Ok(fragment),
            Err(error) => match self.error_policy {
                ErrorPolicy::Abort => Err(MathError::Render {
                    kind,
                    tex: tex.to_owned(),
                    error,
                }),
                ErrorPolicy::Inline => {
                    let message = format!("{kind} math `{tex}`: {error}");
                    tracing::warn!(renderer = self.renderer.name(), "{message}");
                    report.warnings.push(message);
                    Ok(error_fragment(tex, &error.to_string(), options.display_mode))
                }
            },
        }
    }
}

/// Markup standing in for a placeholder that failed to render.
fn error_fragment(tex: &str, message: &str, display_mode: bool) -> String {
    let tex = escape_html(tex);
    if display_mode {
        let message = escape_html(message);
        format!(
            r#"<figure class="math math-error"><pre>Math rendering failed: {message}</pre><code>{tex}</code></figure>"#
        )
    } else {
        let message = escape_attr(message);
        format!(r#"<code class="math math-error" title="Math rendering failed: {message}">{tex}</code>"#)
    }
}
