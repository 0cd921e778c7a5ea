//! Math renderer abstraction.
//!
//! The replacer never typesets math itself. It hands the source of each
//! placeholder to a [`MathRenderer`] and splices the returned fragment into
//! the document.

use std::ffi::OsString;
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

use crate::consts::{DEFAULT_COMMAND, DEFAULT_DISPLAY_ARG};
use crate::error::RenderError;

/// Options passed to the renderer for a single placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    /// Render as block-level (display) math.
    pub display_mode: bool,
}

/// Converts math source into an HTML fragment.
pub trait MathRenderer: Send + Sync {
    /// Render `tex` to an HTML fragment.
    fn render(&self, tex: &str, options: RenderOptions) -> Result<String, RenderError>;

    /// Short identifier used in cache keys and logs.
    fn name(&self) -> &str;
}

impl<R: MathRenderer + ?Sized> MathRenderer for Box<R> {
    fn render(&self, tex: &str, options: RenderOptions) -> Result<String, RenderError> {
        (**self).render(tex, options)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Markup flavor produced by in-process renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// HTML with CSS-based layout.
    Html,
    /// MathML only.
    Mathml,
    /// HTML for display plus MathML for accessibility.
    #[default]
    HtmlAndMathml,
}

/// Renderer that runs an external program per placeholder.
///
/// The math source is written to the program's stdin and the fragment is read
/// from stdout. In display mode the display argument is appended after the
/// configured arguments. The default program is the KaTeX CLI
/// (`katex [--display-mode]`).
///
/// # Example
///
/// ```ignore
/// use rw_math::CommandRenderer;
///
/// let renderer = CommandRenderer::new("npx")
///     .args(["katex"])
///     .display_arg("--display-mode");
/// ```
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: OsString,
    args: Vec<OsString>,
    display_arg: Option<OsString>,
    name: String,
}

impl CommandRenderer {
    /// Create a renderer running `program`.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        let program = program.into();
        let name = format!("command:{}", program.to_string_lossy());
        Self {
            program,
            args: Vec::new(),
            display_arg: Some(DEFAULT_DISPLAY_ARG.into()),
            name,
        }
    }

    /// Set arguments passed before the display argument.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the argument appended in display mode.
    ///
    /// An empty argument disables it.
    #[must_use]
    pub fn display_arg(mut self, arg: impl Into<OsString>) -> Self {
        let arg = arg.into();
        self.display_arg = (!arg.is_empty()).then_some(arg);
        self
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl Default for CommandRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND)
    }
}

impl MathRenderer for CommandRenderer {
    fn render(&self, tex: &str, options: RenderOptions) -> Result<String, RenderError> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if options.display_mode
            && let Some(arg) = &self.display_arg
        {
            command.arg(arg);
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| RenderError::Spawn {
                program: self.program_name(),
                error,
            })?;

        // A renderer that exits before reading stdin reports through its status
        if let Some(mut stdin) = child.stdin.take()
            && let Err(error) = stdin.write_all(tex.as_bytes())
            && error.kind() != ErrorKind::BrokenPipe
        {
            return Err(error.into());
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(RenderError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let fragment = String::from_utf8(output.stdout)?;
        Ok(fragment.trim_end().to_owned())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
