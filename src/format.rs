//! Pretty-printing of generated TypeSpec source.

use crate::error::EmitError;

/// Cosmetic pass over the fully generated source.
pub trait Formatter {
    fn format(&self, source: &str) -> Result<String, EmitError>;
}

/// Re-indents by brace depth and collapses runs of blank lines.
///
/// Lines inside triple-quoted strings keep their text and only receive the
/// surrounding indentation, so the string's content is unchanged.
#[derive(Debug, Clone, Copy)]
pub struct BraceFormatter {
    pub indent: usize,
}

impl Default for BraceFormatter {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

impl Formatter for BraceFormatter {
    fn format(&self, source: &str) -> Result<String, EmitError> {
        let mut out = String::with_capacity(source.len());
        let mut depth: usize = 0;
        let mut in_block_string = false;
        let mut previous_blank = true;

        for line in source.lines() {
            let fences = line.matches("\"\"\"").count();
            if in_block_string {
                push_line(&mut out, depth * self.indent, line);
                if fences % 2 == 1 {
                    in_block_string = false;
                    depth = apply_delta(depth, brace_delta(after_fence(line)));
                }
                previous_blank = false;
                continue;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                if !previous_blank {
                    out.push('\n');
                }
                previous_blank = true;
                continue;
            }

            let closers = trimmed
                .chars()
                .take_while(|c| matches!(c, '}' | ']' | ')'))
                .count();
            push_line(&mut out, depth.saturating_sub(closers) * self.indent, trimmed);
            previous_blank = false;

            if fences % 2 == 1 {
                in_block_string = true;
                depth = apply_delta(depth, brace_delta(before_fence(trimmed)));
            } else {
                depth = apply_delta(depth, brace_delta(trimmed));
            }
        }

        while out.ends_with("\n\n") {
            out.pop();
        }
        Ok(out)
    }
}

fn push_line(out: &mut String, indent: usize, text: &str) {
    out.extend(std::iter::repeat(' ').take(indent));
    out.push_str(text);
    out.push('\n');
}

fn apply_delta(depth: usize, delta: isize) -> usize {
    depth.saturating_add_signed(delta)
}

fn before_fence(line: &str) -> &str {
    line.find("\"\"\"").map_or(line, |i| &line[..i])
}

fn after_fence(line: &str) -> &str {
    line.rfind("\"\"\"").map_or("", |i| &line[i + 3..])
}

/// Net bracket depth change of one line, ignoring string literals and
/// line comments.
fn brace_delta(line: &str) -> isize {
    let mut delta = 0;
    let mut in_string = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if in_string {
            match c {
                '\\' => {
                    chars.next();
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '/' if chars.peek() == Some(&'/') => break,
            '{' | '[' | '(' => delta += 1,
            '}' | ']' | ')' => delta -= 1,
            _ => {}
        }
    }
    delta
}
