//! The process-local string stack: a bump-allocated char arena plus an
//! index array of string start offsets, matching `ncvm.h`'s `StringStack`.
//! Pushing a string also pushes its index onto the caller's value stack
//! (`vmPushString`); popping truncates the char arena back to where the
//! top string started (`vmPopString`), so strings are strictly LIFO.

pub struct StringStack {
    chars: Vec<u8>,
    char_cap: usize,
    starts: Vec<u32>,
    string_cap: usize,
}

impl StringStack {
    pub fn new(max_char_count: usize, max_string_count: usize) -> Self {
        StringStack {
            chars: Vec::with_capacity(max_char_count),
            char_cap: max_char_count,
            starts: Vec::with_capacity(max_string_count),
            string_cap: max_string_count,
        }
    }

    pub fn string_count(&self) -> usize {
        self.starts.len()
    }

    pub fn char_count(&self) -> usize {
        self.chars.len()
    }

    /// Pushes `s` onto the arena and returns its arena start offset -- the
    /// handle `vmPushString` leaves on the value stack. Two consecutive
    /// single-char strings land `len + 1` apart (1 byte of content + the
    /// NUL terminator), matching spec.md §8's `k`, `k + 2` example.
    pub fn push_str(&mut self, s: &str) -> Option<u32> {
        if self.chars.len() + s.len() + 1 > self.char_cap || self.starts.len() >= self.string_cap {
            return None;
        }
        let start = self.chars.len() as u32;
        self.chars.extend_from_slice(s.as_bytes());
        self.chars.push(0);
        self.starts.push(start);
        Some(start)
    }

    /// Appends one raw byte to the in-progress string being read by `"`,
    /// without yet closing it out as a pushed string (mirrors
    /// `readString`'s char-by-char loop in `std-words.c`).
    pub fn push_byte(&mut self, b: u8) -> bool {
        if self.chars.len() >= self.char_cap {
            return false;
        }
        self.chars.push(b);
        true
    }

    /// Closes the string started at `start_char`, recording it for LIFO
    /// popping and returning that same offset as the caller's handle.
    pub fn finish(&mut self, start_char: u32) -> Option<u32> {
        if self.starts.len() >= self.string_cap {
            return None;
        }
        self.starts.push(start_char);
        Some(start_char)
    }

    pub fn pop(&mut self) {
        if let Some(start) = self.starts.pop() {
            self.chars.truncate(start as usize);
        }
    }

    /// `idx` is the arena start offset handed back by `push_str`/`finish`,
    /// not a position in `starts` -- the NUL terminator alone bounds the
    /// read, so popped entries never need to be consulted.
    pub fn get(&self, idx: u32) -> &str {
        let start = idx as usize;
        let end = self.chars[start..]
            .iter()
            .position(|&b| b == 0)
            .map(|p| start + p)
            .unwrap_or(self.chars.len());
        std::str::from_utf8(&self.chars[start..end]).unwrap_or("")
    }

    pub fn top(&self) -> Option<u32> {
        self.starts.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_get_round_trip() {
        let mut ss = StringStack::new(64, 8);
        let idx = ss.push_str("hello").unwrap();
        assert_eq!(ss.get(idx), "hello");
    }

    #[test]
    fn pop_truncates_char_arena() {
        let mut ss = StringStack::new(64, 8);
        ss.push_str("one");
        let before = ss.char_count();
        ss.push_str("two");
        ss.pop();
        assert_eq!(ss.char_count(), before);
        assert_eq!(ss.string_count(), 1);
    }

    #[test]
    fn overflow_returns_none() {
        let mut ss = StringStack::new(4, 8);
        assert!(ss.push_str("toolong").is_none());
    }

    #[test]
    fn string_count_overflow_returns_none() {
        let mut ss = StringStack::new(64, 1);
        assert!(ss.push_str("a").is_some());
        assert!(ss.push_str("b").is_none());
    }

    #[test]
    fn manual_char_by_char_build_via_finish() {
        let mut ss = StringStack::new(64, 8);
        let start = ss.char_count() as u32;
        for b in b"hi" {
            ss.push_byte(*b);
        }
        ss.push_byte(0);
        let idx = ss.finish(start).unwrap();
        assert_eq!(ss.get(idx), "hi");
    }

    #[test]
    fn consecutive_single_char_strings_are_two_apart() {
        // spec.md §8 scenario 6: two consecutive `" x"` pushes produce
        // indices `k` and `k + 2` (1 content byte + the NUL terminator).
        let mut ss = StringStack::new(64, 8);
        let k = ss.push_str("x").unwrap();
        let next = ss.push_str("y").unwrap();
        assert_eq!(next, k + 2);
    }
}
