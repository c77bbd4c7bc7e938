//! Fence detection for directive and code blocks.
//!
//! Directives open with three or more colons or backticks; code blocks with
//! three or more backticks or tildes. A closing fence uses the same character,
//! is at least as long as the opener and has nothing but whitespace after it.

/// An opening fence: the character it is made of and how many of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fence {
    pub ch: char,
    pub len: usize,
}

impl Fence {
    /// Detect a fence of one of `chars` at the start of `trimmed`.
    pub(crate) fn detect(trimmed: &str, chars: &[char]) -> Option<Self> {
        let first = trimmed.chars().next()?;
        if !chars.contains(&first) {
            return None;
        }
        let len = trimmed.chars().take_while(|&c| c == first).count();
        (len >= 3).then_some(Self { ch: first, len })
    }

    /// Whether `line` closes a block opened with this fence.
    pub fn is_closed_by(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        if !trimmed.starts_with(self.ch) {
            return false;
        }
        let count = trimmed.chars().take_while(|&c| c == self.ch).count();
        if count < self.len {
            return false;
        }
        // `count` chars of a single-byte fence char
        trimmed[count..].chars().all(char::is_whitespace)
    }
}

/// Tracks code fence state during line-by-line processing so directive
/// syntax inside code blocks is left alone.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    open: Option<Fence>,
}

impl FenceTracker {
    pub(crate) fn in_fence(&self) -> bool {
        self.open.is_some()
    }

    /// Update fence state for `line`. Returns `true` if the line opened or
    /// closed a code fence.
    pub(crate) fn update(&mut self, line: &str) -> bool {
        match self.open {
            Some(fence) if fence.is_closed_by(line) => {
                self.open = None;
                true
            }
            Some(_) => false,
            None => {
                self.open = Fence::detect(line.trim_start(), &['`', '~']);
                self.open.is_some()
            }
        }
    }
}
