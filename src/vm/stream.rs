//! The stream abstraction: refcounted, mode-tagged byte sources, matching
//! `examples/original_source/stream.c`. The reference backs its
//! memory-mode streams with a `tmpfile()`; this crate uses an in-memory
//! cursor instead, the idiomatic Rust substitute with the same read/write/
//! seek/EOS semantics and none of the temp-file cleanup concerns.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::rc::Rc;

use crossterm::tty::IsTty;

use crate::internals::tui::ForthTui;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamMode {
    Ro,
    Wo,
    Rw,
}

/// Line-buffered stdin, the `read_token`/`readChar` source for the
/// interactive REPL. When stdin is a TTY, lines come from `ForthTui`'s
/// raw-mode editor (arrow-key history, ctrl-a/e/k); otherwise (piped
/// input, e.g. a test harness) lines come from a plain `BufRead::read_line`,
/// matching `std-words.c`'s "stdin is line-buffered" contract either way.
struct StdinBacking {
    pending: VecDeque<u8>,
    tui: Option<ForthTui>,
    at_eos: bool,
}

impl StdinBacking {
    fn new(interactive: bool) -> Self {
        let tui = if interactive && io::stdin().is_tty() {
            ForthTui::new().ok()
        } else {
            None
        };
        StdinBacking {
            pending: VecDeque::new(),
            tui,
            at_eos: false,
        }
    }

    /// The REPL driver prints its own `> ` prompt text (spec.md §4.5); the
    /// raw-mode editor, when active, only needs to handle character echo
    /// and editing, so it's invoked with an empty prompt to avoid printing
    /// a second one.
    fn fill(&mut self) {
        if !self.pending.is_empty() || self.at_eos {
            return;
        }
        let line = match &mut self.tui {
            Some(tui) => tui.get_line(""),
            None => {
                let mut buf = String::new();
                match io::stdin().read_line(&mut buf) {
                    Ok(0) | Err(_) => None,
                    Ok(_) => Some(buf.trim_end_matches('\n').to_string()),
                }
            }
        };
        match line {
            Some(line) => {
                self.pending.extend(line.into_bytes());
                self.pending.push_back(b'\n');
            }
            None => self.at_eos = true,
        }
    }
}

enum Backing {
    File(File),
    Memory(Cursor<Vec<u8>>),
    Stdin(StdinBacking),
}

struct StreamInner {
    mode: StreamMode,
    backing: Backing,
    eos: bool,
}

/// A shared handle to a stream. Cloning bumps the reference count the way
/// `vmStreamPush` does; dropping the last clone closes the underlying file,
/// the Rust analogue of `vmStreamPop`'s `refCount == 0` branch.
#[derive(Clone)]
pub struct Stream(Rc<RefCell<StreamInner>>);

impl Stream {
    pub fn open_file(path: &str, mode: StreamMode) -> io::Result<Stream> {
        let file = match mode {
            StreamMode::Ro => File::open(path)?,
            StreamMode::Wo => File::create(path)?,
            StreamMode::Rw => File::options().read(true).write(true).create(true).open(path)?,
        };
        Ok(Stream(Rc::new(RefCell::new(StreamInner {
            mode,
            backing: Backing::File(file),
            eos: false,
        }))))
    }

    pub fn from_file(file: File, mode: StreamMode) -> Stream {
        Stream(Rc::new(RefCell::new(StreamInner {
            mode,
            backing: Backing::File(file),
            eos: false,
        })))
    }

    pub fn from_memory(bytes: &[u8]) -> Stream {
        Stream(Rc::new(RefCell::new(StreamInner {
            mode: StreamMode::Rw,
            backing: Backing::Memory(Cursor::new(bytes.to_vec())),
            eos: bytes.is_empty(),
        })))
    }

    /// Line-buffered stdin. `interactive` gates the raw-mode editor: the
    /// REPL passes `false` while reading a piped script so it behaves
    /// like any other plain line reader.
    pub fn stdin(interactive: bool) -> Stream {
        Stream(Rc::new(RefCell::new(StreamInner {
            mode: StreamMode::Ro,
            backing: Backing::Stdin(StdinBacking::new(interactive)),
            eos: false,
        })))
    }

    pub fn mode(&self) -> StreamMode {
        self.0.borrow().mode
    }

    pub fn read_char(&self) -> u32 {
        let mut inner = self.0.borrow_mut();
        if inner.eos {
            return 0;
        }
        match &mut inner.backing {
            Backing::File(f) => {
                let mut buf = [0u8; 1];
                let n = f.read(&mut buf).unwrap_or(0);
                if n == 0 {
                    inner.eos = true;
                    0
                } else {
                    buf[0] as u32
                }
            }
            Backing::Memory(c) => {
                let mut buf = [0u8; 1];
                let n = c.read(&mut buf).unwrap_or(0);
                if n == 0 {
                    inner.eos = true;
                    0
                } else {
                    buf[0] as u32
                }
            }
            Backing::Stdin(s) => {
                s.fill();
                match s.pending.pop_front() {
                    Some(b) => b as u32,
                    None => {
                        inner.eos = true;
                        0
                    }
                }
            }
        }
    }

    /// For stdin, EOS can only be known after trying to fetch a line, so
    /// this primes the buffer the same way `read_char` would.
    pub fn is_eos(&self) -> bool {
        let mut inner = self.0.borrow_mut();
        if inner.eos {
            return true;
        }
        if let Backing::Stdin(s) = &mut inner.backing {
            s.fill();
            if s.pending.is_empty() && s.at_eos {
                inner.eos = true;
            }
        }
        inner.eos
    }

    pub fn write_char(&self, ch: u32) {
        let mut inner = self.0.borrow_mut();
        let byte = [ch as u8];
        let _ = match &mut inner.backing {
            Backing::File(f) => f.write_all(&byte),
            Backing::Memory(c) => c.write_all(&byte),
            Backing::Stdin(_) => {}
        };
    }

    pub fn size(&self) -> u32 {
        let mut inner = self.0.borrow_mut();
        match &mut inner.backing {
            Backing::File(f) => {
                let pos = f.stream_position().unwrap_or(0);
                let len = f.seek(SeekFrom::End(0)).unwrap_or(0);
                let _ = f.seek(SeekFrom::Start(pos));
                len as u32
            }
            Backing::Memory(c) => c.get_ref().len() as u32,
            Backing::Stdin(_) => 0,
        }
    }

    pub fn pos(&self) -> u32 {
        let mut inner = self.0.borrow_mut();
        match &mut inner.backing {
            Backing::File(f) => f.stream_position().unwrap_or(0) as u32,
            Backing::Memory(c) => c.position() as u32,
            Backing::Stdin(_) => 0,
        }
    }

    pub fn set_pos(&self, pos: u32) {
        let mut inner = self.0.borrow_mut();
        inner.eos = false;
        match &mut inner.backing {
            Backing::File(f) => {
                let _ = f.seek(SeekFrom::Start(pos as u64));
            }
            Backing::Memory(c) => {
                c.set_position(pos as u64);
            }
            Backing::Stdin(_) => {}
        }
    }
}

/// The VM-wide stream table (`vm->strms`), a stack of the streams
/// currently "open" for reading (the top is always the tokenizer's
/// source). Pushing/popping a `load` stream is the Rust analogue of
/// `vmStreamPush`/`vmStreamPop`.
pub struct StreamTable {
    stack: Vec<Stream>,
    cap: usize,
}

impl StreamTable {
    pub fn new(cap: usize) -> Self {
        StreamTable {
            stack: Vec::with_capacity(cap),
            cap,
        }
    }

    pub fn push(&mut self, s: Stream) -> bool {
        if self.stack.len() >= self.cap {
            return false;
        }
        self.stack.push(s);
        true
    }

    pub fn pop(&mut self) -> Option<Stream> {
        self.stack.pop()
    }

    pub fn top(&self) -> Option<&Stream> {
        self.stack.last()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_stream_reads_pushed_bytes() {
        let s = Stream::from_memory(b"hi");
        assert_eq!(s.read_char(), b'h' as u32);
        assert_eq!(s.read_char(), b'i' as u32);
        assert!(!s.is_eos());
        assert_eq!(s.read_char(), 0);
        assert!(s.is_eos());
    }

    #[test]
    fn memory_stream_write_then_read_back() {
        let s = Stream::from_memory(b"");
        s.write_char(b'x' as u32);
        s.set_pos(0);
        assert_eq!(s.read_char(), b'x' as u32);
    }

    #[test]
    fn size_and_pos_track_cursor() {
        let s = Stream::from_memory(b"abcd");
        assert_eq!(s.size(), 4);
        s.read_char();
        s.read_char();
        assert_eq!(s.pos(), 2);
    }

    #[test]
    fn clone_shares_the_same_backing() {
        let s = Stream::from_memory(b"z");
        let s2 = s.clone();
        let _ = s2.read_char();
        assert!(s.is_eos());
    }

    #[test]
    fn stream_table_is_lifo() {
        let mut t = StreamTable::new(2);
        let a = Stream::from_memory(b"a");
        let b = Stream::from_memory(b"b");
        assert!(t.push(a));
        assert!(t.push(b));
        assert_eq!(t.len(), 2);
        t.pop();
        assert_eq!(t.len(), 1);
    }
}
