//! Indented source writer used by every emitter.
//!
//! [`CodeWriter`] accumulates generated C++ line by line. Nesting is tracked
//! by an indentation level so emitters never count spaces themselves.
//!
//! # Example
//!
//! ```
//! use wrapgen_generator::CodeWriter;
//!
//! let mut w = CodeWriter::new();
//! w.block("if (numArgs == 0)", |w| {
//!     w.line("overloadId = 0;");
//! });
//! assert_eq!(w.finish(), "if (numArgs == 0) {\n    overloadId = 0;\n}\n");
//! ```

const INDENT: &str = "    ";

/// Line-oriented writer with indentation tracking.
#[derive(Debug, Default, Clone)]
pub struct CodeWriter {
    out: String,
    level: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at a given indentation level (for fragments spliced into a body).
    pub fn with_level(level: usize) -> Self {
        Self {
            out: String::new(),
            level,
        }
    }

    // ==========================================================================
    // Lines
    // ==========================================================================

    /// Write one line at the current indentation. An empty string writes a
    /// blank line without trailing spaces.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.level {
                self.out.push_str(INDENT);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Write multi-line text (injected code), re-indenting each line.
    ///
    /// Common leading whitespace is stripped first so snippets keep their own
    /// relative layout.
    pub fn code(&mut self, text: &str) {
        let lines: Vec<&str> = text.lines().collect();
        let margin = lines
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.len() - l.trim_start().len())
            .min()
            .unwrap_or(0);
        for line in lines {
            if line.trim().is_empty() {
                self.blank();
            } else {
                self.line(&line[margin.min(line.len())..]);
            }
        }
    }

    /// Append already formatted text verbatim.
    pub fn raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    // ==========================================================================
    // Nesting
    // ==========================================================================

    pub fn indent(&mut self) {
        self.level += 1;
    }

    pub fn dedent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Run `body` one level deeper.
    pub fn indented(&mut self, body: impl FnOnce(&mut Self)) {
        self.indent();
        body(self);
        self.dedent();
    }

    /// `header {` ... `}`.
    pub fn block(&mut self, header: impl AsRef<str>, body: impl FnOnce(&mut Self)) {
        self.block_with(header, "}", body);
    }

    /// `header {` ... `footer`, for `};` terminated definitions.
    pub fn block_with(&mut self, header: impl AsRef<str>, footer: &str, body: impl FnOnce(&mut Self)) {
        let header = header.as_ref();
        if header.is_empty() {
            self.line("{");
        } else {
            self.line(format!("{header} {{"));
        }
        self.indented(body);
        self.line(footer);
    }

    // ==========================================================================
    // Output
    // ==========================================================================

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }
}
