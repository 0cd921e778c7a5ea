//! Error types for math rendering.

use std::str::Utf8Error;

use crate::placeholder::PlaceholderKind;

/// Error while parsing an HTML document.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    /// XML tokenizer error.
    #[error("HTML parse error")]
    Xml(#[from] quick_xml::Error),

    /// UTF-8 decoding error.
    #[error("UTF-8 error")]
    Utf8(#[from] Utf8Error),

    /// Encoding error while decoding names or text.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
}

/// Error from a math renderer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The renderer program could not be started.
    #[error("failed to start renderer `{program}`")]
    Spawn {
        /// Program name or path.
        program: String,
        /// Underlying I/O error.
        #[source]
        error: std::io::Error,
    },

    /// I/O error while talking to the renderer.
    #[error("renderer I/O error")]
    Io(#[from] std::io::Error),

    /// The renderer exited unsuccessfully.
    #[error("renderer exited with {status}: {stderr}")]
    Failed {
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// The renderer produced output that is not valid UTF-8.
    #[error("renderer output is not valid UTF-8")]
    InvalidOutput(#[from] std::string::FromUtf8Error),

    /// KaTeX rejected the input or options.
    #[error("KaTeX error: {0}")]
    Katex(String),
}

/// Error from [`MathReplacer`](crate::MathReplacer).
#[derive(Debug, thiserror::Error)]
pub enum MathError {
    /// The document could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A placeholder failed to render.
    #[error("failed to render {kind} math `{tex}`")]
    Render {
        /// Placeholder form that failed.
        kind: PlaceholderKind,
        /// Math source of the placeholder.
        tex: String,
        /// Renderer error.
        #[source]
        error: RenderError,
    },
}
