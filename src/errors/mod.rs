// src/errors/mod.rs
//! Diagnostic accumulation for the checker.
//!
//! Checking never fails: every problem becomes a `Diag` record in the
//! `Diagnostics` sink. Errors are deduplicated per source line to avoid
//! cascades; a message limit sets `should_abort` so the checker can bail
//! out of statement/expression loops on pathological inputs.

pub mod sema;

pub use sema::{SemanticError, SemanticNotice, SemanticWarning};

use miette::Diagnostic as MietteDiagnostic;
use rustc_hash::FxHashSet;

use crate::span::Pos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagKind {
    Error,
    Warning,
    Notice,
}

impl std::fmt::Display for DiagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagKind::Error => write!(f, "error"),
            DiagKind::Warning => write!(f, "warning"),
            DiagKind::Notice => write!(f, "notice"),
        }
    }
}

/// One rendered report: kind, source position, message, optional details.
#[derive(Debug, Clone)]
pub struct Diag {
    pub kind: DiagKind,
    pub path: String,
    pub pos: Pos,
    pub message: String,
    pub code: Option<String>,
    pub details: Vec<String>,
}

impl std::fmt::Display for Diag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.path, self.pos, self.kind, self.message
        )
    }
}

#[derive(Debug)]
pub struct Diagnostics {
    diags: Vec<Diag>,
    /// Lines that already produced an error: (path, line).
    error_lines: FxHashSet<(String, u32)>,
    /// Exact warning/notice repeats: (path, line, message).
    soft_repeats: FxHashSet<(String, u32, String)>,
    message_limit: usize,
    strict: bool,
    nr_errors: usize,
    nr_warnings: usize,
    nr_notices: usize,
    pub should_abort: bool,
}

impl Diagnostics {
    pub fn new(message_limit: usize, strict: bool) -> Self {
        Self {
            diags: Vec::new(),
            error_lines: FxHashSet::default(),
            soft_repeats: FxHashSet::default(),
            message_limit,
            strict,
            nr_errors: 0,
            nr_warnings: 0,
            nr_notices: 0,
            should_abort: false,
        }
    }

    pub fn error(&mut self, path: &str, pos: Pos, err: &SemanticError) {
        let code = err.code().map(|c| c.to_string());
        self.push_error(path, pos, err.to_string(), code, Vec::new());
    }

    pub fn error_with_details(
        &mut self,
        path: &str,
        pos: Pos,
        err: &SemanticError,
        details: Vec<String>,
    ) {
        let code = err.code().map(|c| c.to_string());
        self.push_error(path, pos, err.to_string(), code, details);
    }

    fn push_error(
        &mut self,
        path: &str,
        pos: Pos,
        message: String,
        code: Option<String>,
        details: Vec<String>,
    ) {
        if self.should_abort {
            return;
        }
        // One error per line; later ones on the same line are cascades.
        if !self.error_lines.insert((path.to_string(), pos.line)) {
            return;
        }
        self.nr_errors += 1;
        self.diags.push(Diag {
            kind: DiagKind::Error,
            path: path.to_string(),
            pos,
            message,
            code,
            details,
        });
        if self.nr_errors >= self.message_limit {
            self.should_abort = true;
        }
    }

    pub fn warn(&mut self, path: &str, pos: Pos, warning: &SemanticWarning) {
        if self.should_abort {
            return;
        }
        let code = warning.code().map(|c| c.to_string());
        let message = warning.to_string();
        if self.strict {
            self.push_error(path, pos, message, code, Vec::new());
            return;
        }
        if !self
            .soft_repeats
            .insert((path.to_string(), pos.line, message.clone()))
        {
            return;
        }
        self.nr_warnings += 1;
        self.diags.push(Diag {
            kind: DiagKind::Warning,
            path: path.to_string(),
            pos,
            message,
            code,
            details: Vec::new(),
        });
    }

    pub fn notice(&mut self, path: &str, pos: Pos, notice: &SemanticNotice) {
        if self.should_abort {
            return;
        }
        let message = notice.to_string();
        if !self
            .soft_repeats
            .insert((path.to_string(), pos.line, message.clone()))
        {
            return;
        }
        self.nr_notices += 1;
        self.diags.push(Diag {
            kind: DiagKind::Notice,
            path: path.to_string(),
            pos,
            message,
            code: notice.code().map(|c| c.to_string()),
            details: Vec::new(),
        });
    }

    pub fn diags(&self) -> &[Diag] {
        &self.diags
    }

    pub fn into_diags(self) -> Vec<Diag> {
        self.diags
    }

    pub fn has_errors(&self) -> bool {
        self.nr_errors > 0
    }

    pub fn nr_errors(&self) -> usize {
        self.nr_errors
    }

    pub fn nr_warnings(&self) -> usize {
        self.nr_warnings
    }

    pub fn nr_notices(&self) -> usize {
        self.nr_notices
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diag> {
        self.diags.iter().filter(|d| d.kind == DiagKind::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diag> {
        self.diags.iter().filter(|d| d.kind == DiagKind::Warning)
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(100, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::SourceSpan;

    fn span() -> SourceSpan {
        SourceSpan::new(0.into(), 0)
    }

    #[test]
    fn errors_dedup_per_line() {
        let mut diags = Diagnostics::default();
        let pos = Pos::at_line(3);
        diags.error(
            "a.vd",
            pos,
            &SemanticError::UndefinedIdent {
                name: "x".into(),
                span: span(),
            },
        );
        diags.error(
            "a.vd",
            pos,
            &SemanticError::UndefinedIdent {
                name: "y".into(),
                span: span(),
            },
        );
        assert_eq!(diags.nr_errors(), 1);
        // A different line still reports.
        diags.error(
            "a.vd",
            Pos::at_line(4),
            &SemanticError::UndefinedIdent {
                name: "y".into(),
                span: span(),
            },
        );
        assert_eq!(diags.nr_errors(), 2);
    }

    #[test]
    fn strict_promotes_warnings() {
        let mut diags = Diagnostics::new(100, true);
        diags.warn(
            "a.vd",
            Pos::at_line(1),
            &SemanticWarning::UnusedVariable {
                name: "x".into(),
                span: span(),
            },
        );
        assert_eq!(diags.nr_errors(), 1);
        assert_eq!(diags.nr_warnings(), 0);
    }

    #[test]
    fn message_limit_sets_abort() {
        let mut diags = Diagnostics::new(2, false);
        for line in 1..=5 {
            diags.error(
                "a.vd",
                Pos::at_line(line),
                &SemanticError::DivisionByZero { span: span() },
            );
        }
        assert!(diags.should_abort);
        assert_eq!(diags.nr_errors(), 2);
    }

    #[test]
    fn warning_repeats_collapse() {
        let mut diags = Diagnostics::default();
        let w = SemanticWarning::UnusedVariable {
            name: "x".into(),
            span: span(),
        };
        diags.warn("a.vd", Pos::at_line(1), &w);
        diags.warn("a.vd", Pos::at_line(1), &w);
        assert_eq!(diags.nr_warnings(), 1);
    }

    #[test]
    fn diag_display_format() {
        let mut diags = Diagnostics::default();
        diags.error(
            "src/app.vd",
            Pos::new(7, 3, 0, 0),
            &SemanticError::DivisionByZero { span: span() },
        );
        let rendered = diags.diags()[0].to_string();
        assert_eq!(rendered, "src/app.vd:7:3: error: division by zero");
    }
}
