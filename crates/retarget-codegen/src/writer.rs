//! Line-oriented output buffer shared by the emitters.

/// Why a target node could not be printed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    /// A placeholder the transformer already reported.
    #[error("unsupported construct: {0}")]
    Placeholder(String),

    /// A node the emitter cannot print in this position.
    #[error("unsupported construct: {0}")]
    Invalid(String),
}

impl EmitError {
    /// What the marker comment names.
    pub fn construct(&self) -> &str {
        match self {
            EmitError::Placeholder(what) | EmitError::Invalid(what) => what,
        }
    }

    /// Whether the failure still needs a warning.
    pub fn is_new(&self) -> bool {
        matches!(self, EmitError::Invalid(_))
    }
}

/// A position in a [`SourceWriter`] that output can be rolled back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    len: usize,
    level: usize,
}

pub struct SourceWriter {
    output: String,
    unit: String,
    level: usize,
}

impl SourceWriter {
    pub fn new(unit: &str) -> Self {
        Self {
            output: String::new(),
            unit: unit.to_string(),
            level: 0,
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Write one indented line.
    pub fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.output.push('\n');
            return;
        }
        for _ in 0..self.level {
            self.output.push_str(&self.unit);
        }
        self.output.push_str(text);
        self.output.push('\n');
    }

    /// Write several lines; embedded newlines are indented too.
    pub fn lines(&mut self, text: &str) {
        for line in text.lines() {
            self.line(line);
        }
    }

    /// An empty line, unless the output is empty or already ends with one.
    pub fn blank(&mut self) {
        self.blank_lines(1);
    }

    /// Make the output end with exactly `count` empty lines, never removing
    /// any. Nothing is written at the start of the output.
    pub fn blank_lines(&mut self, count: usize) {
        if self.output.is_empty() {
            return;
        }
        let trailing = self.output.len() - self.output.trim_end_matches('\n').len();
        for _ in trailing..=count {
            self.output.push('\n');
        }
    }

    pub fn mark(&self) -> Mark {
        Mark {
            len: self.output.len(),
            level: self.level,
        }
    }

    /// Discard everything written since `mark`.
    pub fn truncate(&mut self, mark: Mark) {
        self.output.truncate(mark.len);
        self.level = mark.level;
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn push_level(&mut self) {
        self.level += 1;
    }

    fn pop_level(&mut self) {
        self.level = self.level.saturating_sub(1);
    }
}

/// Emitters that own a [`SourceWriter`].
pub trait Indented: Sized {
    fn writer(&mut self) -> &mut SourceWriter;

    /// Run `body` one level deeper. The level is restored when `body`
    /// returns, including when it returns an error.
    fn indented<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        self.writer().push_level();
        let result = body(self);
        self.writer().pop_level();
        result
    }

    /// Run `body`; on failure discard whatever it wrote and hand back the error.
    fn guarded(&mut self, body: impl FnOnce(&mut Self) -> Result<(), EmitError>) -> Option<EmitError> {
        let mark = self.writer().mark();
        match body(self) {
            Ok(()) => None,
            Err(err) => {
                self.writer().truncate(mark);
                Some(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doc {
        out: SourceWriter,
    }

    impl Indented for Doc {
        fn writer(&mut self) -> &mut SourceWriter {
            &mut self.out
        }
    }

    #[test]
    fn test_indentation_is_restored_on_error() {
        let mut doc = Doc {
            out: SourceWriter::new("  "),
        };
        doc.out.line("a:");
        let result: Result<(), &str> = doc.indented(|doc| {
            doc.out.line("b");
            doc.indented(|_| Err::<(), _>("boom"))?;
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(doc.out.level(), 0);
        doc.out.line("c");
        assert_eq!(doc.out.finish(), "a:\n  b\nc\n");
    }

    #[test]
    fn test_guarded_discards_partial_output() {
        let mut doc = Doc {
            out: SourceWriter::new("  "),
        };
        doc.out.line("start");
        let err = doc.guarded(|doc| {
            doc.out.line("half");
            doc.indented(|doc| {
                doc.out.line("written");
                Err(EmitError::Invalid("Slice".into()))
            })
        });
        assert_eq!(err, Some(EmitError::Invalid("Slice".into())));
        assert!(doc.guarded(|doc| Ok(doc.out.line("ok"))).is_none());
        assert_eq!(doc.out.finish(), "start\nok\n");
    }

    #[test]
    fn test_blank_lines_do_not_stack() {
        let mut out = SourceWriter::new("    ");
        out.blank();
        out.line("import math");
        out.blank_lines(2);
        out.blank();
        out.line("x = 1");
        assert_eq!(out.finish(), "import math\n\n\nx = 1\n");
    }

    #[test]
    fn test_truncate_rolls_back_output() {
        let mut out = SourceWriter::new("    ");
        out.line("keep");
        let mark = out.mark();
        out.line("drop");
        out.truncate(mark);
        out.line("after");
        assert_eq!(out.finish(), "keep\nafter\n");
    }
}
