//! Terminal output for the chat front end.

use std::io::{self, Stdout, Write};

use crate::view::{RenderedMessage, Sender};

/// ANSI escape code for dim text (used for notes and file chips).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the user's avatar).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for magenta text (used for the assistant's avatar).
const ANSI_MAGENTA: &str = "\x1b[35m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Receives the output of a chat session as it happens.
pub trait Renderer: Send {
    /// Called before the first chunk of a reply.
    fn start_response(&mut self) {}

    /// Prints a chunk of streamed reply text.
    fn print_text(&mut self, text: &str);

    /// Prints an error message.
    fn print_error(&mut self, error: &str);

    /// Prints an informational message.
    fn print_info(&mut self, info: &str);

    /// Called once a reply has settled.
    fn finish_response(&mut self, message: &RenderedMessage);

    /// Prints a whole message, e.g. when a conversation is loaded.
    fn print_message(&mut self, index: usize, message: &RenderedMessage);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    in_response: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            in_response: false,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn avatar(&self, sender: Sender) -> String {
        match sender {
            Sender::User => self.paint(ANSI_CYAN, "You"),
            Sender::Assistant => self.paint(ANSI_MAGENTA, "L"),
        }
    }

    fn notes(&self, message: &RenderedMessage) -> Option<String> {
        let mut notes = Vec::new();
        if let Some(file) = &message.file {
            notes.push(format!("[file: {}]", file.filename));
        }
        let blocks = message
            .affordances
            .iter()
            .filter(|a| matches!(a, crate::view::Affordance::CopyCode { .. }))
            .count();
        if blocks > 0 {
            notes.push(format!("[{blocks} code block(s)]"));
        }
        if notes.is_empty() {
            None
        } else {
            Some(self.paint(ANSI_DIM, &notes.join(" ")))
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_response(&mut self) {
        if !self.in_response {
            print!("{}: ", self.avatar(Sender::Assistant));
            self.in_response = true;
            self.flush();
        }
    }

    fn print_text(&mut self, text: &str) {
        self.start_response();
        print!("{text}");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.in_response {
            println!();
            self.in_response = false;
        }
        eprintln!("{}", self.paint(ANSI_RED, error));
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }

    fn finish_response(&mut self, message: &RenderedMessage) {
        println!();
        if let Some(notes) = self.notes(message) {
            println!("{notes}");
        }
        self.in_response = false;
        self.flush();
    }

    fn print_message(&mut self, index: usize, message: &RenderedMessage) {
        let marker = if message.is_editable() { "*" } else { " " };
        println!("{index:>3}{marker} {}: {}", self.avatar(message.sender), message.rendered);
        if let Some(notes) = self.notes(message) {
            println!("      {notes}");
        }
        self.flush();
    }
}
