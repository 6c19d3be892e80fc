//! Hooks for the markdown renderer.
//!
//! Rendering markdown is left to the presentation layer.  The chat session only
//! needs to turn a buffer into display text and to find fenced code blocks for
//! the copy affordances.

/// Appended to a message while its reply is still streaming.
pub const CURSOR: char = '▍';

/// Turns message text into display text.
pub trait MarkdownFormatter: Send + Sync {
    fn format(&self, text: &str) -> String;
}

/// Displays markdown source as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl MarkdownFormatter for Passthrough {
    fn format(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Display text for a reply that is still streaming.
pub fn with_cursor(formatter: &dyn MarkdownFormatter, buffer: &str) -> String {
    let mut rendered = formatter.format(buffer);
    rendered.push(CURSOR);
    rendered
}

/// A fenced code block found in message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Info string after the opening fence, e.g. `rust`.
    pub language: Option<String>,
    /// Contents between the fences, without the trailing newline.
    pub code: String,
}

/// Find the fenced code blocks in `text`.
///
/// Fences are lines starting with three or more backticks or tildes.  A block
/// is closed by a fence of the same character at least as long.  An unclosed
/// block runs to the end of the text.
pub fn code_blocks(text: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<(char, usize, Option<String>, Vec<&str>)> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();
        match open.as_mut() {
            None => {
                if let Some((ch, len)) = fence(trimmed) {
                    let info = trimmed[len..].trim();
                    let language = info.split_whitespace().next().map(String::from);
                    open = Some((ch, len, language, Vec::new()));
                }
            }
            Some((ch, len, _, lines)) => {
                let closes = fence(trimmed)
                    .is_some_and(|(c, l)| c == *ch && l >= *len && trimmed[l..].trim().is_empty());
                if closes {
                    if let Some((_, _, language, lines)) = open.take() {
                        blocks.push(CodeBlock {
                            language,
                            code: lines.join("\n"),
                        });
                    }
                } else {
                    lines.push(line);
                }
            }
        }
    }
    if let Some((_, _, language, lines)) = open {
        blocks.push(CodeBlock {
            language,
            code: lines.join("\n"),
        });
    }
    blocks
}

fn fence(line: &str) -> Option<(char, usize)> {
    let ch = line.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = line.chars().take_while(|c| *c == ch).count();
    if len >= 3 { Some((ch, len)) } else { None }
}
