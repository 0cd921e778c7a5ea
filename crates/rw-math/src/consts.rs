//! Internal constants for math rendering.

/// Link target marking inline math placeholders.
pub const DEFAULT_INLINE_HREF: &str = "/$/";

/// Content type marking script math placeholders.
pub const DEFAULT_SCRIPT_TYPE: &str = "math/tex";

/// Ancestor tag that switches script placeholders to inline mode.
pub const PARAGRAPH_TAG: &str = "p";

/// Default external renderer program (the KaTeX CLI).
pub const DEFAULT_COMMAND: &str = "katex";

/// Flag passed to the external renderer in display mode.
pub const DEFAULT_DISPLAY_ARG: &str = "--display-mode";
