//! `rw math render` command implementation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use rayon::prelude::*;
use rw_config::{CliSettings, Config, ErrorMode, OutputKind, RendererKind};
use rw_math::{
    CachedRenderer, CommandRenderer, DirFragmentCache, ErrorPolicy, Markers, MathRenderer,
    MathReplacer, ReplaceReport,
};

use crate::error::CliError;
use crate::output::Output;

/// File extensions treated as HTML documents.
const HTML_EXTENSIONS: &[&str] = &["html", "htm"];

/// Arguments for the math render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// HTML files or directories to process.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Write results under this directory instead of rewriting files in place.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover rw.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Renderer backend: katex or command (overrides config).
    #[arg(long)]
    renderer: Option<RendererKind>,

    /// Render failure handling: abort or inline (overrides config).
    #[arg(long)]
    on_error: Option<ErrorMode>,

    /// Disable the rendered fragment cache.
    #[arg(long)]
    no_cache: bool,

    /// Enable verbose output (per-placeholder logs and warnings).
    #[arg(short, long)]
    pub verbose: bool,
}

/// HTML file found on the command line.
#[derive(Debug, PartialEq, Eq)]
struct InputFile {
    /// Path to read from.
    source: PathBuf,
    /// Path relative to the argument it was found under.
    relative: PathBuf,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or any file fails.
    pub(crate) fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            renderer: self.renderer,
            on_error: self.on_error,
            cache_enabled: self.no_cache.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let files = collect_inputs(&self.paths)?;
        if files.is_empty() {
            output.warning("No HTML files found.");
            return Ok(());
        }
        if self.output_dir.is_some() {
            ensure_distinct_targets(&files)?;
        }

        let replacer = MathReplacer::new(build_renderer(&config, version)?)
            .markers(Markers {
                inline_href: config.math.inline_href.clone(),
                script_type: config.math.script_type.clone(),
            })
            .error_policy(match config.math.on_error {
                ErrorMode::Abort => ErrorPolicy::Abort,
                ErrorMode::Inline => ErrorPolicy::Inline,
            });

        let output_dir = self.output_dir.as_deref();
        let results: Vec<Result<ReplaceReport, CliError>> = files
            .par_iter()
            .map(|file| process_file(&replacer, file, output_dir))
            .collect();

        let mut total = ReplaceReport::default();
        let mut failed = 0;
        for (file, result) in files.iter().zip(results) {
            match result {
                Ok(report) => {
                    output.processed(&file.source, report.total());
                    for warning in &report.warnings {
                        output.warning(&format!("  {warning}"));
                    }
                    total.inline += report.inline;
                    total.scripts += report.scripts;
                    total.warnings.extend(report.warnings);
                }
                Err(err) => {
                    output.error(&format!("{}: {err}", file.source.display()));
                    failed += 1;
                }
            }
        }

        output.success(&format!(
            "Rendered {} math placeholders ({} inline, {} script) in {} files",
            total.total(),
            total.inline,
            total.scripts,
            files.len() - failed
        ));
        if !total.warnings.is_empty() {
            output.warning(&format!("{} placeholders failed to render", total.warnings.len()));
        }

        if failed > 0 {
            return Err(CliError::Failed(format!(
                "{failed} of {} files failed",
                files.len()
            )));
        }
        Ok(())
    }
}

/// Render the placeholders of one file and write the result.
fn process_file<R: MathRenderer>(
    replacer: &MathReplacer<R>,
    file: &InputFile,
    output_dir: Option<&Path>,
) -> Result<ReplaceReport, CliError> {
    let html = fs::read_to_string(&file.source)?;
    let rendered = replacer.render_html(&html)?;

    let target = match output_dir {
        Some(dir) => dir.join(&file.relative),
        None => file.source.clone(),
    };

    // In-place files without placeholders are left untouched
    if target != file.source || rendered.report.total() > 0 {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, rendered.html)?;
    }

    tracing::debug!(path = %target.display(), "Processed file");
    Ok(rendered.report)
}

/// Build the configured renderer, with the fragment cache in front when enabled.
fn build_renderer(config: &Config, version: &str) -> Result<Box<dyn MathRenderer>, CliError> {
    let math = &config.math;
    let renderer: Box<dyn MathRenderer> = match math.renderer {
        RendererKind::Command => Box::new(
            CommandRenderer::new(&math.command)
                .args(&math.args)
                .display_arg(&math.display_arg),
        ),
        RendererKind::Katex => katex_renderer(math.output)?,
    };
    tracing::info!(renderer = renderer.name(), "Using math renderer");

    if !config.cache_resolved.enabled {
        return Ok(renderer);
    }
    let cache = DirFragmentCache::new(config.cache_resolved.math_dir(), version);
    Ok(Box::new(CachedRenderer::new(renderer, Box::new(cache))))
}

#[cfg(feature = "katex")]
#[allow(clippy::unnecessary_wraps)]
fn katex_renderer(output: OutputKind) -> Result<Box<dyn MathRenderer>, CliError> {
    use rw_math::{KatexRenderer, OutputFormat};

    let format = match output {
        OutputKind::Html => OutputFormat::Html,
        OutputKind::Mathml => OutputFormat::Mathml,
        OutputKind::HtmlAndMathml => OutputFormat::HtmlAndMathml,
    };
    Ok(Box::new(KatexRenderer::new().output(format)))
}

#[cfg(not(feature = "katex"))]
fn katex_renderer(_output: OutputKind) -> Result<Box<dyn MathRenderer>, CliError> {
    Err(CliError::Validation(
        "katex renderer is not available, rebuild rw with the `katex` feature \
         or set math.renderer = \"command\""
            .to_owned(),
    ))
}

/// Reject inputs that would be written to the same file under `--output-dir`.
fn ensure_distinct_targets(files: &[InputFile]) -> Result<(), CliError> {
    let mut seen: HashMap<&Path, &Path> = HashMap::new();
    for file in files {
        if let Some(previous) = seen.insert(&file.relative, &file.source) {
            return Err(CliError::Validation(format!(
                "{} and {} both map to {} in the output directory",
                previous.display(),
                file.source.display(),
                file.relative.display()
            )));
        }
    }
    Ok(())
}

/// Expand command line paths into HTML files.
///
/// Files are taken as given. Directories are walked recursively, skipping
/// hidden entries; results are sorted per argument. A source reached through
/// several arguments is kept once.
fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<InputFile>, CliError> {
    let mut files: Vec<InputFile> = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            scan_directory(path, path, &mut found);
            found.sort_by(|a, b| a.relative.cmp(&b.relative));
            for file in found {
                push_unique(&mut files, file);
            }
        } else if path.is_file() {
            let relative = path.file_name().map(PathBuf::from).unwrap_or_default();
            push_unique(
                &mut files,
                InputFile {
                    source: path.clone(),
                    relative,
                },
            );
        } else {
            return Err(CliError::Validation(format!(
                "path not found: {}",
                path.display()
            )));
        }
    }
    Ok(files)
}

fn push_unique(files: &mut Vec<InputFile>, file: InputFile) {
    if !files.iter().any(|f| f.source == file.source) {
        files.push(file);
    }
}

fn scan_directory(root: &Path, dir: &Path, files: &mut Vec<InputFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.filter_map(Result::ok) {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            scan_directory(root, &path, files);
        } else if is_html(&path)
            && let Ok(relative) = path.strip_prefix(root)
        {
            files.push(InputFile {
                relative: relative.to_path_buf(),
                source: path,
            });
        }
    }
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| HTML_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}
