//! Terminal prompter

use std::io::{self, BufRead, Write};

use roster_sdk::Prompter;
use tracing::warn;

/// Asks on stderr and reads the answer from stdin.
pub struct TerminalPrompter {
    assume_yes: bool,
}

impl TerminalPrompter {
    /// With `assume_yes` every confirmation is accepted without asking.
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        let mut stderr = io::stderr();
        let _ = write!(stderr, "{} [y/N] ", message);
        let _ = stderr.flush();

        let mut answer = String::new();
        if let Err(e) = io::stdin().lock().read_line(&mut answer) {
            warn!(error = %e, "could not read confirmation");
            return false;
        }
        is_yes(&answer)
    }

    fn notify(&self, message: &str) {
        eprintln!("error: {}", message);
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
