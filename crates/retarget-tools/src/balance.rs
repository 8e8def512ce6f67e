//! Balanced-bracket scan that skips string, character and comment literals.

use crate::Language;

/// The first bracket problem found, with 1-based positions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Imbalance {
    #[error("{line}:{column}: unexpected `{found}`")]
    Unexpected { found: char, line: usize, column: usize },

    #[error("{line}:{column}: `{found}` does not close `{open}` from {open_line}:{open_column}")]
    Mismatched {
        open: char,
        open_line: usize,
        open_column: usize,
        found: char,
        line: usize,
        column: usize,
    },

    #[error("{line}:{column}: `{open}` is never closed")]
    Unclosed { open: char, line: usize, column: usize },

    #[error("{line}:{column}: unterminated {what}")]
    Unterminated {
        what: &'static str,
        line: usize,
        column: usize,
    },
}

impl Imbalance {
    pub fn line(&self) -> usize {
        match self {
            Imbalance::Unexpected { line, .. }
            | Imbalance::Mismatched { line, .. }
            | Imbalance::Unclosed { line, .. }
            | Imbalance::Unterminated { line, .. } => *line,
        }
    }
}

/// Check that `()`, `[]` and `{}` nest properly in `source`.
pub fn check_balanced(source: &str, language: Language) -> Result<(), Imbalance> {
    let mut scanner = Scanner {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
        stack: Vec::new(),
        language,
    };
    scanner.code(false)
}

#[derive(Debug, Clone, Copy)]
struct Open {
    bracket: char,
    line: usize,
    column: usize,
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    stack: Vec<Open>,
    language: Language,
}

impl Scanner {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip(&mut self, count: usize) {
        for _ in 0..count {
            self.bump();
        }
    }

    fn unterminated(&self, what: &'static str, line: usize, column: usize) -> Imbalance {
        Imbalance::Unterminated { what, line, column }
    }

    /// Scan code until the end of input, or, inside an interpolation hole,
    /// until the `}` that closes it.
    fn code(&mut self, hole: bool) -> Result<(), Imbalance> {
        let base = self.stack.len();
        while let Some(c) = self.peek() {
            let (line, column) = (self.line, self.column);
            match c {
                '(' | '[' | '{' => {
                    self.stack.push(Open {
                        bracket: c,
                        line,
                        column,
                    });
                    self.bump();
                }
                ')' | ']' | '}' => {
                    if hole && c == '}' && self.stack.len() == base {
                        self.bump();
                        return Ok(());
                    }
                    if self.stack.len() == base {
                        return Err(Imbalance::Unexpected {
                            found: c,
                            line,
                            column,
                        });
                    }
                    if let Some(open) = self.stack.pop()
                        && closer(open.bracket) != c
                    {
                        return Err(Imbalance::Mismatched {
                            open: open.bracket,
                            open_line: open.line,
                            open_column: open.column,
                            found: c,
                            line,
                            column,
                        });
                    }
                    self.bump();
                }
                _ => self.literal_or_comment(c)?,
            }
        }
        if hole {
            return Err(self.unterminated("interpolated string", self.line, self.column));
        }
        match self.stack.last() {
            Some(open) if self.stack.len() > base => Err(Imbalance::Unclosed {
                open: open.bracket,
                line: open.line,
                column: open.column,
            }),
            _ => Ok(()),
        }
    }

    fn literal_or_comment(&mut self, c: char) -> Result<(), Imbalance> {
        match self.language {
            Language::Python => match c {
                '#' => self.line_comment(),
                '\'' | '"' => self.python_string(),
                _ if is_python_prefix(c) => {
                    let mut len = 0;
                    while self.peek_at(len).is_some_and(is_python_prefix) && len < 2 {
                        len += 1;
                    }
                    let preceded = self.pos > 0 && is_ident(self.chars[self.pos - 1]);
                    if !preceded && matches!(self.peek_at(len), Some('\'' | '"')) {
                        self.skip(len);
                        return self.python_string();
                    }
                    self.bump();
                    Ok(())
                }
                _ => {
                    self.bump();
                    Ok(())
                }
            },
            Language::CSharp | Language::Cpp => {
                if self.starts_with("//") {
                    self.line_comment()
                } else if self.starts_with("/*") {
                    self.block_comment()
                } else if c == '"' {
                    self.quoted('"', "string")
                } else if c == '\'' {
                    self.quoted('\'', "character literal")
                } else if self.language == Language::CSharp && (self.starts_with("$@\"") || self.starts_with("@$\"")) {
                    self.skip(3);
                    self.interpolated(true)
                } else if self.language == Language::CSharp && self.starts_with("$\"") {
                    self.skip(2);
                    self.interpolated(false)
                } else if self.language == Language::CSharp && self.starts_with("@\"") {
                    self.bump();
                    self.verbatim()
                } else {
                    self.bump();
                    Ok(())
                }
            }
        }
    }

    fn line_comment(&mut self) -> Result<(), Imbalance> {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
        Ok(())
    }

    fn block_comment(&mut self) -> Result<(), Imbalance> {
        let (line, column) = (self.line, self.column);
        self.skip(2);
        while self.peek().is_some() {
            if self.starts_with("*/") {
                self.skip(2);
                return Ok(());
            }
            self.bump();
        }
        Err(self.unterminated("comment", line, column))
    }

    /// A single-line literal with backslash escapes.
    fn quoted(&mut self, quote: char, what: &'static str) -> Result<(), Imbalance> {
        let (line, column) = (self.line, self.column);
        self.bump();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.unterminated(what, line, column)),
                Some('\\') => {
                    self.bump();
                }
                Some(c) if c == quote => return Ok(()),
                Some(_) => {}
            }
        }
    }

    /// `@"..."`, where `""` is an escaped quote and newlines are allowed.
    fn verbatim(&mut self) -> Result<(), Imbalance> {
        let (line, column) = (self.line, self.column);
        self.bump();
        loop {
            match self.bump() {
                None => return Err(self.unterminated("string", line, column)),
                Some('"') if self.peek() == Some('"') => {
                    self.bump();
                }
                Some('"') => return Ok(()),
                Some(_) => {}
            }
        }
    }

    /// Body of `$"..."` after the opening quote; holes are scanned as code.
    fn interpolated(&mut self, verbatim: bool) -> Result<(), Imbalance> {
        let (line, column) = (self.line, self.column);
        loop {
            match self.bump() {
                None => return Err(self.unterminated("interpolated string", line, column)),
                Some('\n') if !verbatim => return Err(self.unterminated("interpolated string", line, column)),
                Some('\\') if !verbatim => {
                    self.bump();
                }
                Some('"') if verbatim && self.peek() == Some('"') => {
                    self.bump();
                }
                Some('"') => return Ok(()),
                Some('{') if self.peek() == Some('{') => {
                    self.bump();
                }
                Some('{') => self.code(true)?,
                Some('}') if self.peek() == Some('}') => {
                    self.bump();
                }
                Some(_) => {}
            }
        }
    }

    fn python_string(&mut self) -> Result<(), Imbalance> {
        let (line, column) = (self.line, self.column);
        let Some(quote) = self.peek() else {
            return Ok(());
        };
        let triple: String = [quote; 3].iter().collect();
        if self.starts_with(&triple) {
            self.skip(3);
            while self.peek().is_some() {
                if self.peek() == Some('\\') {
                    self.skip(2);
                } else if self.starts_with(&triple) {
                    self.skip(3);
                    return Ok(());
                } else {
                    self.bump();
                }
            }
            return Err(self.unterminated("string", line, column));
        }
        self.quoted(quote, "string")
    }
}

fn closer(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn is_python_prefix(c: char) -> bool {
    matches!(c, 'r' | 'R' | 'b' | 'B' | 'f' | 'F' | 'u' | 'U')
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brackets_in_literals_are_ignored() {
        let cpp = "int main() {\n    // (\n    /* { */ std::cout << \"]\" << ')';\n}\n";
        assert_eq!(check_balanced(cpp, Language::Cpp), Ok(()));
        let python = "x = ['(', \"\"\"\n{\n\"\"\", r'\\\\']  # )\n";
        assert_eq!(check_balanced(python, Language::Python), Ok(()));
        let csharp = "var s = $\"{(a ? \"}\" : b)}\" + @\"\"\"(\";";
        assert_eq!(check_balanced(csharp, Language::CSharp), Ok(()));
    }

    #[test]
    fn test_identifiers_ending_in_prefix_letters_are_not_strings() {
        let python = "for x in (a, b): print(f\"{x}\")\n";
        assert_eq!(check_balanced(python, Language::Python), Ok(()));
    }

    #[test]
    fn test_reports_first_problem() {
        assert_eq!(
            check_balanced("f(]", Language::Cpp),
            Err(Imbalance::Mismatched {
                open: '(',
                open_line: 1,
                open_column: 2,
                found: ']',
                line: 1,
                column: 3,
            })
        );
        assert_eq!(
            check_balanced("a)\n", Language::Python),
            Err(Imbalance::Unexpected {
                found: ')',
                line: 1,
                column: 2,
            })
        );
        assert_eq!(
            check_balanced("{\n  [\n", Language::CSharp),
            Err(Imbalance::Unclosed {
                open: '[',
                line: 2,
                column: 3,
            })
        );
        let err = check_balanced("s = \"open\n", Language::Python).unwrap_err();
        assert_eq!(err.to_string(), "1:5: unterminated string");
    }
}
