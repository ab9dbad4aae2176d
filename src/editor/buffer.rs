use ropey::Rope;
use std::ops::Range;

/// Notification produced by every mutation of a [`Buffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditEvent {
    /// Char offset where the edit starts
    pub offset: usize,
    /// Buffer revision after the edit
    pub revision: u64,
}

/// Source text of the open script
pub struct Buffer {
    text: Rope,
    dirty: bool,
    revision: u64,
}

impl Buffer {
    pub fn new() -> Self {
        Self {
            text: Rope::new(),
            dirty: false,
            revision: 0,
        }
    }

    pub fn text(&self) -> String {
        self.text.to_string()
    }

    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    /// Edited since the last `mark_clean`
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Insert text at a char offset (clamped to the end of the buffer)
    pub fn insert(&mut self, offset: usize, s: &str) -> EditEvent {
        let offset = offset.min(self.text.len_chars());
        self.text.insert(offset, s);
        self.touch(offset)
    }

    /// Remove a char range (clamped to the buffer)
    pub fn remove(&mut self, range: Range<usize>) -> EditEvent {
        let len = self.text.len_chars();
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);
        self.text.remove(start..end);
        self.touch(start)
    }

    /// Replace the whole text
    pub fn replace_all(&mut self, s: &str) -> EditEvent {
        self.text = Rope::from_str(s);
        self.touch(0)
    }

    fn touch(&mut self, offset: usize) -> EditEvent {
        self.dirty = true;
        self.revision += 1;
        EditEvent {
            offset,
            revision: self.revision,
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(s: &str) -> Buffer {
        let mut buf = Buffer::new();
        buf.replace_all(s);
        buf.mark_clean();
        buf
    }

    #[test]
    fn new_buffer_is_empty_and_clean() {
        let buf = Buffer::new();
        assert_eq!(buf.len_chars(), 0);
        assert!(!buf.is_dirty());
        assert_eq!(buf.revision(), 0);
    }

    #[test]
    fn loaded_text_starts_clean() {
        let buf = loaded("int x;\n");
        assert!(!buf.is_dirty());
        assert_eq!(buf.text(), "int x;\n");
    }

    #[test]
    fn insert_reports_offset_and_advances_revision() {
        let mut buf = loaded("int;");
        let ev = buf.insert(3, " x");
        assert_eq!(buf.text(), "int x;");
        assert_eq!(ev, EditEvent { offset: 3, revision: 2 });
        assert!(buf.is_dirty());
    }

    #[test]
    fn insert_past_end_appends() {
        let mut buf = loaded("a");
        let ev = buf.insert(100, "b");
        assert_eq!(buf.text(), "ab");
        assert_eq!(ev.offset, 1);
    }

    #[test]
    fn remove_clamps_range() {
        let mut buf = loaded("hello");
        buf.remove(3..99);
        assert_eq!(buf.text(), "hel");
    }

    #[test]
    fn replace_all_is_an_edit_at_zero() {
        let mut buf = loaded("old");
        buf.insert(0, "x");
        let ev = buf.replace_all("new");
        assert_eq!(buf.text(), "new");
        assert_eq!(ev, EditEvent { offset: 0, revision: 3 });
    }

    #[test]
    fn mark_clean_keeps_revision() {
        let mut buf = Buffer::new();
        buf.insert(0, "x");
        buf.mark_clean();
        assert!(!buf.is_dirty());
        assert_eq!(buf.revision(), 1);
    }
}
