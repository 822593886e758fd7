//! Navigable history: the address bar plus back/forward entries.

use url::Url;

/// How a render should be reflected in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    /// User-initiated change: new entry.
    Push,
    /// Programmatic reset: rewrite the current entry.
    Replace,
    /// Restoring from back/forward: leave history alone.
    Skip,
}

pub trait NavigationHistory {
    fn current(&self) -> &Url;

    fn push(&mut self, url: Url);

    fn replace(&mut self, url: Url);
}

/// History stack kept in memory, with browser-like back/forward semantics.
#[derive(Debug, Clone)]
pub struct InMemoryHistory {
    entries: Vec<Url>,
    index: usize,
}

impl InMemoryHistory {
    pub fn new(initial: Url) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
        }
    }

    pub fn back(&mut self) -> Option<&Url> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index)
    }

    pub fn forward(&mut self) -> Option<&Url> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the initial entry is never removed. Kept alongside
    /// `len` for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl NavigationHistory for InMemoryHistory {
    fn current(&self) -> &Url {
        &self.entries[self.index]
    }

    fn push(&mut self, url: Url) {
        self.entries.truncate(self.index + 1);
        self.entries.push(url);
        self.index = self.entries.len() - 1;
    }

    fn replace(&mut self, url: Url) {
        self.entries[self.index] = url;
    }
}

/// Record `url` according to `mode`. Identical URLs never add an entry.
pub fn record<H: NavigationHistory + ?Sized>(history: &mut H, url: Url, mode: HistoryMode) {
    if history.current() == &url {
        return;
    }
    match mode {
        HistoryMode::Push => history.push(url),
        HistoryMode::Replace => history.replace(url),
        HistoryMode::Skip => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(query: &str) -> Url {
        Url::parse(&format!("https://blog.example/blog/{query}")).expect("url")
    }

    #[test]
    fn push_discards_forward_entries() {
        let mut history = InMemoryHistory::new(url(""));
        history.push(url("?page=2"));
        history.push(url("?page=3"));

        assert_eq!(history.back().map(Url::as_str), Some(url("?page=2").as_str()));
        history.push(url("?search=rust"));

        assert_eq!(history.len(), 3);
        assert!(history.forward().is_none());
        assert_eq!(history.current(), &url("?search=rust"));
    }

    #[test]
    fn replace_keeps_length() {
        let mut history = InMemoryHistory::new(url("?search=rust"));
        history.replace(url(""));

        assert_eq!(history.len(), 1);
        assert!(!history.is_empty());
        assert_eq!(history.current(), &url(""));
        assert!(history.back().is_none());
    }

    #[test]
    fn record_ignores_unchanged_url_and_skip() {
        let mut history = InMemoryHistory::new(url(""));
        record(&mut history, url(""), HistoryMode::Push);
        record(&mut history, url("?page=2"), HistoryMode::Skip);
        assert_eq!(history.len(), 1);

        record(&mut history, url("?page=2"), HistoryMode::Push);
        assert_eq!(history.len(), 2);
    }
}
