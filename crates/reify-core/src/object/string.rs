//! Host strings

use super::monitor::Monitor;

/// Immutable string; viewed as a read-only `char[]` for collection casts
pub struct HostString {
    text: String,
    units: Vec<u16>,
    monitor: Monitor,
}

impl HostString {
    /// Create a string
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let units = text.encode_utf16().collect();
        Self {
            text,
            units,
            monitor: Monitor::new(),
        }
    }

    /// String contents
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// UTF-16 code units
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Length in UTF-16 code units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check for the empty string
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Code unit at `index`
    pub fn char_at(&self, index: usize) -> Option<u16> {
        self.units.get(index).copied()
    }

    /// String monitor
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }
}

impl std::fmt::Debug for HostString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HostString").field(&self.text).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_view() {
        let s = HostString::new("h\u{e9}\u{1F600}");
        assert_eq!(s.as_str().chars().count(), 3);
        assert_eq!(s.len(), 4);
        assert_eq!(s.char_at(0), Some(b'h' as u16));
        assert_eq!(s.char_at(1), Some(0xe9));
        assert!(s.char_at(4).is_none());
    }
}
