//! File and directory choosers used by the demo API.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tracing::warn;

/// Modal choosers. `None` means the user cancelled.
pub trait FileDialogs {
    fn choose_directory(&self) -> Option<PathBuf>;

    fn choose_file(&self) -> Option<PathBuf>;
}

/// Asks on the terminal. An empty answer cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptDialogs;

impl PromptDialogs {
    fn ask(prompt: &str) -> Option<PathBuf> {
        print!("{}: ", prompt);
        if let Err(e) = io::stdout().flush() {
            warn!("failed to show prompt: {}", e);
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => {
                let answer = answer.trim();
                (!answer.is_empty()).then(|| PathBuf::from(answer))
            }
            Err(e) => {
                warn!("failed to read answer: {}", e);
                None
            }
        }
    }
}

impl FileDialogs for PromptDialogs {
    fn choose_directory(&self) -> Option<PathBuf> {
        Self::ask("Choose a directory (empty to cancel)")
    }

    fn choose_file(&self) -> Option<PathBuf> {
        Self::ask("Choose a file (empty to cancel)")
    }
}

/// Answers from a queue, shared by both choosers. An empty queue cancels.
#[derive(Debug, Default)]
pub struct PresetDialogs {
    answers: RefCell<VecDeque<Option<PathBuf>>>,
}

impl PresetDialogs {
    pub fn new(answers: impl IntoIterator<Item = Option<PathBuf>>) -> Self {
        Self {
            answers: RefCell::new(answers.into_iter().collect()),
        }
    }

    pub fn push(&self, answer: Option<PathBuf>) {
        self.answers.borrow_mut().push_back(answer);
    }

    fn next(&self) -> Option<PathBuf> {
        self.answers.borrow_mut().pop_front().flatten()
    }
}

impl FileDialogs for PresetDialogs {
    fn choose_directory(&self) -> Option<PathBuf> {
        self.next()
    }

    fn choose_file(&self) -> Option<PathBuf> {
        self.next()
    }
}
