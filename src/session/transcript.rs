use chrono::{DateTime, Local};
use serde::Serialize;

/// Who an entry is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sender {
    System,
    You,
    #[serde(rename = "LLM")]
    Llm,
    Error,
}

impl Sender {
    pub fn label(&self) -> &'static str {
        match self {
            Self::System => "System",
            Self::You => "You",
            Self::Llm => "LLM",
            Self::Error => "Error",
        }
    }
}

/// How an entry is styled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    System,
    User,
    Llm,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub sender: Sender,
    pub text: String,
    pub kind: EntryKind,
    pub timestamp: DateTime<Local>,
}

/// Append-only log of what the user has seen
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Text is sanitized before it is stored.
    pub fn push(&mut self, sender: Sender, text: &str, kind: EntryKind) {
        self.entries.push(Entry {
            sender,
            text: sanitize(text),
            kind,
            timestamp: Local::now(),
        });
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }

    /// Entries appended at or after `index`
    pub fn since(&self, index: usize) -> &[Entry] {
        &self.entries[index.min(self.entries.len())..]
    }

    pub(crate) fn restart(&mut self) {
        self.entries.clear();
    }
}

/// Strip terminal control sequences from untrusted text.
///
/// Newlines and tabs survive; CSI/OSC escape sequences are dropped whole,
/// every other C0/C1 control character is dropped on its own.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' | '\t' => out.push(c),
            '\u{1b}' => match chars.peek() {
                // CSI: ESC [ params final-byte(0x40..=0x7e)
                Some('[') => {
                    chars.next();
                    for next in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&next) {
                            break;
                        }
                    }
                }
                // OSC: ESC ] ... terminated by BEL or ESC \
                Some(']') => {
                    chars.next();
                    while let Some(next) = chars.next() {
                        if next == '\u{7}' {
                            break;
                        }
                        if next == '\u{1b}' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                // Two-byte escape: drop ESC and the following char
                Some(_) => {
                    chars.next();
                }
                None => {}
            },
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    out
}
