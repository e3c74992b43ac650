//! Terminal styling for diagnostic lines.

pub(crate) const RED: &str = "\x1b[91m";
pub(crate) const GREEN: &str = "\x1b[92m";
pub(crate) const YELLOW: &str = "\x1b[93m";
pub(crate) const BLUE: &str = "\x1b[94m";
pub(crate) const WHITE: &str = "\x1b[97m";
pub(crate) const RED_BG: &str = "\x1b[101m";
pub(crate) const YELLOW_BG: &str = "\x1b[103m";
pub(crate) const CLEAR: &str = "\x1b[0m";

/// How rendered values and console markers are decorated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    /// ANSI colour escapes, for interactive terminals.
    #[default]
    Ansi,
    /// No escapes at all. Log files, pipes and tests.
    Plain,
}

impl Style {
    /// Pick `Ansi` when `colored` is set, `Plain` otherwise.
    pub fn from_color(colored: bool) -> Self {
        if colored { Style::Ansi } else { Style::Plain }
    }

    /// Wrap string content in quote markers. The content itself is untouched.
    pub fn quote(self, content: &str) -> String {
        match self {
            Style::Ansi => format!("{GREEN}\"{CLEAR}{content}{GREEN}\"{CLEAR}"),
            Style::Plain => format!("\"{content}\""),
        }
    }
}
