//! DOT record labels.

use std::fmt;

/// Soft wrap width: the first space after this many characters breaks the line.
/// The `n` of each inserted `\n` counts toward the next line.
const MIN_LINE_LENGTH: usize = 20;

/// One field of a record label, soft-wrapped with DOT `\n` escapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotField(String);

impl DotField {
    pub fn new(text: &str) -> Self {
        let mut out = String::with_capacity(text.len() + 8);
        let mut line_len = 0;
        for c in text.chars() {
            if line_len > MIN_LINE_LENGTH && c == ' ' {
                out.push_str("\\n");
                line_len = 1;
            } else {
                match c {
                    '"' => out.push_str("\\\""),
                    _ => out.push(c),
                }
                line_len += 1;
            }
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A record label: `a`, or `{ a | b | c }` when there is more than one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotLabel {
    fields: Vec<DotField>,
}

impl DotLabel {
    pub fn new(text: &str) -> Self {
        Self { fields: vec![DotField::new(text)] }
    }

    pub fn with_field(mut self, text: impl AsRef<str>) -> Self {
        self.fields.push(DotField::new(text.as_ref()));
        self
    }
}

impl fmt::Display for DotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.fields.len() > 1;
        if record {
            f.write_str("{ ")?;
        }
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            f.write_str(field.as_str())?;
        }
        if record {
            f.write_str(" }")?;
        }
        Ok(())
    }
}
