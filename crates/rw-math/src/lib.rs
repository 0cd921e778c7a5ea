//! Math placeholder rendering for RW.
//!
//! Documents produced by a markdown pipeline carry math as placeholders:
//! - Inline: `<a href="/$/">x^2</a>`, rendered in non-display mode
//! - Script: `<script type="math/tex">E=mc^2</script>`, rendered in display mode
//!   unless it sits inside a `<p>`
//!
//! [`MathReplacer`] finds both forms, hands their source to a [`MathRenderer`]
//! and splices the rendered fragment in place of each placeholder.
//!
//! # Architecture
//!
//! The crate is organized into modules:
//! - `tree`: Owned document tree with path handles and ancestor-aware search
//! - `parser` / `serializer`: Lenient HTML parsing and serialization
//! - `placeholder`: Placeholder markers and display mode detection
//! - `renderer`: [`MathRenderer`] trait and the external [`CommandRenderer`]
//! - `cache`: Content-addressed fragment cache and [`CachedRenderer`]
//! - `replacer`: [`MathReplacer`] and the replacement passes
//!
//! # Example
//!
//! ```ignore
//! use rw_math::{CommandRenderer, MathReplacer};
//!
//! let replacer = MathReplacer::new(CommandRenderer::default());
//! let rendered = replacer.render_html(r#"<p>Area: <a href="/$/">x^2</a></p>"#)?;
//! println!("{} placeholders replaced", rendered.report.total());
//! ```

mod cache;
mod consts;
mod entities;
mod error;
#[cfg(feature = "katex")]
mod katex_renderer;
mod parser;
mod placeholder;
mod renderer;
mod replacer;
mod serializer;
mod tree;

pub use cache::{CachedRenderer, DirFragmentCache, FragmentCache, FragmentKey, NullFragmentCache};
pub use consts::{DEFAULT_COMMAND, DEFAULT_DISPLAY_ARG, DEFAULT_INLINE_HREF, DEFAULT_SCRIPT_TYPE};
pub use error::{MathError, ParseError, RenderError};
#[cfg(feature = "katex")]
pub use katex_renderer::KatexRenderer;
pub use parser::HtmlParser;
pub use placeholder::{Markers, PlaceholderKind};
pub use renderer::{CommandRenderer, MathRenderer, OutputFormat, RenderOptions};
pub use replacer::{ErrorPolicy, MathReplacer, RenderedHtml, ReplaceReport};
pub use serializer::{HtmlSerializer, escape_html};
pub use tree::{Ancestors, NodeKind, NodePath, TreeNode};
