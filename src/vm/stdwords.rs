//! The standard dictionary, the tokenizer, and the read/eval/print loop.
//! Grounded on `examples/original_source/std-words.c` in full (the native
//! word bodies and the final `entries[]` registration table) and restyled
//! after the teacher's `internals/compiler.rs` (`f_eval`/`f_d_compile`/
//! `f_d_interpret`/`f_see`/`f_quit`: one helper function per
//! responsibility, a single `match` over token classification).

use std::io::Write;

use crate::vm::dictionary::{FunctionKind, ALL};
use crate::vm::exec;
use crate::vm::process::Process;
use crate::vm::stacks::Return;
use crate::vm::stream::{Stream, StreamMode};
use crate::vm::value::{encode_call, OP_CALL_MASK};
use crate::vm::Vm;

const MAX_TOKEN_SIZE: usize = 1023;
const BELL: u8 = 0x07;

/// Never actually invoked: `vm::exec` dispatches hardware opcodes by index
/// before it would reach a native callback. The dictionary still needs a
/// placeholder so `lsws`/`see` have a `Function` to describe.
pub fn hardware_noop(_vm: &mut Vm, _proc: &mut Process) {}

pub fn register(vm: &mut Vm) {
    vm.dictionary.add_native("repl", false, repl, ALL, ALL);
    vm.dictionary.add_native(":", true, start_func_compilation, ALL, ALL);
    vm.dictionary.add_native("!", true, start_macro_compilation, ALL, ALL);
    vm.dictionary.add_native(";", true, finish_func_compilation, ALL, ALL);
    vm.dictionary.add_native("\"", true, read_string, ALL, ALL);
    vm.dictionary.add_native("//", true, read_comment_line, 0, 0);
    vm.dictionary.add_native("@", true, word_address, ALL, ALL);
    vm.dictionary.add_native("{", true, start_lambda, ALL, ALL);
    vm.dictionary.add_native("}", true, end_lambda, ALL, ALL);

    vm.dictionary.add_native(".i", false, print_int, 1, 0);
    vm.dictionary.add_native("lsws", false, list_words, 0, 0);
    vm.dictionary.add_native("lsvs", false, list_values, 0, 0);
    vm.dictionary.add_native("see", false, see, 1, 0);

    vm.dictionary.add_native("load", false, load, 1, 0);

    vm.dictionary.add_native("resume", false, resume, 0, 0);
    vm.dictionary.add_native("quit", false, quit, 0, 0);
}

fn is_space(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r' | BELL)
}

fn is_digit(ch: u8) -> bool {
    ch.is_ascii_digit()
}

fn is_int(tok: &str) -> bool {
    !tok.is_empty() && tok.bytes().all(is_digit)
}

/// Natural 32-bit wraparound parse, matching `tokToInt`'s plain
/// `value = value * 10 + digit` with no overflow check.
fn tok_to_u32(tok: &str) -> u32 {
    let mut v: u32 = 0;
    for b in tok.bytes() {
        v = v.wrapping_mul(10).wrapping_add((b - b'0') as u32);
    }
    v
}

fn read_char(vm: &Vm) -> u32 {
    match vm.streams.top() {
        Some(s) => s.read_char(),
        None => 0,
    }
}

fn stream_is_eos(vm: &Vm) -> bool {
    vm.streams.top().map(Stream::is_eos).unwrap_or(true)
}

/// Reads up to `max_size` non-space bytes, stopping at whitespace or EOS.
/// Returns the token text and the last character read (used by the REPL
/// driver to notice end-of-line for its prompt), matching `readToken`.
fn read_token(vm: &Vm, max_size: usize) -> (String, u8) {
    let mut buf = Vec::new();
    let mut last_ch = 0u8;
    while buf.len() < max_size {
        if vm.streams.is_empty() {
            break;
        }
        let ch = read_char(vm) as u8;
        last_ch = ch;
        if is_space(ch) {
            break;
        }
        if stream_is_eos(vm) {
            break;
        }
        buf.push(ch);
    }
    (String::from_utf8_lossy(&buf).into_owned(), last_ch)
}

fn decompile_opcode(vm: &Vm, opcode: u32) -> String {
    use crate::vm::value::{operand, operation, OP_VALUE};
    match operation(opcode) {
        OP_VALUE => format!("\t{}\n", operand(opcode)),
        _ => format!("\t{}\n", vm.dictionary.name(operand(opcode) as usize)),
    }
}

// ---- compiler immediate words -------------------------------------------------

fn start_func_compilation(vm: &mut Vm, _proc: &mut Process) {
    let (name, _) = read_token(vm, MAX_TOKEN_SIZE);
    let func_id = match vm.dictionary.allocate_interpreted(&name) {
        Some(id) => id,
        None => {
            vm.msg.error(":", "dictionary overflow", Some(name));
            return;
        }
    };
    if !vm.compiler.push_frame(func_id) {
        vm.msg.error(":", "compiler frame stack overflow", Some(name));
    }
}

fn start_macro_compilation(vm: &mut Vm, _proc: &mut Process) {
    let (name, _) = read_token(vm, MAX_TOKEN_SIZE);
    let func_id = match vm.dictionary.allocate_interpreted(&name) {
        Some(id) => id,
        None => {
            vm.msg.error("!", "dictionary overflow", Some(name));
            return;
        }
    };
    vm.dictionary.set_immediate(func_id, true);
    if !vm.compiler.push_frame(func_id) {
        vm.msg.error("!", "compiler frame stack overflow", Some(name));
    }
}

fn finish_func_compilation(vm: &mut Vm, _proc: &mut Process) {
    match vm.compiler.pop_frame() {
        Some((frame, body)) => {
            if body.len() > vm.heap.remaining() {
                vm.msg.error(";", "instruction heap overflow", Some(vm.dictionary.name(frame.func_id).to_string()));
                return;
            }
            let ins_offset = vm.heap.len();
            for &opcode in &body {
                vm.heap.push(opcode);
                vm.msg.debug(";", "compiled", Some(decompile_opcode(vm, opcode)));
            }
            let func = vm.dictionary.get_mut(frame.func_id);
            func.kind = FunctionKind::Interpreted {
                ins_offset,
                ins_count: body.len() as u32,
            };
        }
        None => vm.msg.error(";", "no open definition", None::<()>),
    }
}

fn start_lambda(vm: &mut Vm, _proc: &mut Process) {
    let name = format!("lambda#{}", vm.heap.len());
    let func_id = match vm.dictionary.allocate_interpreted(&name) {
        Some(id) => id,
        None => {
            vm.msg.error("{", "dictionary overflow", Some(name));
            return;
        }
    };
    if !vm.compiler.push_frame(func_id) {
        vm.msg.error("{", "compiler frame stack overflow", Some(name));
    }
}

fn end_lambda(vm: &mut Vm, proc: &mut Process) {
    let func_id = match vm.compiler.current_frame() {
        Some(f) => f.func_id as u32,
        None => {
            vm.msg.error("}", "no open lambda", None::<()>);
            return;
        }
    };
    finish_func_compilation(vm, proc);
    if vm.compiler.is_compiling() {
        vm.compiler.push_instruction(func_id);
    } else {
        proc.push_value(func_id);
    }
}

fn read_string(vm: &mut Vm, proc: &mut Process) {
    let start = proc.ss.char_count() as u32;
    loop {
        if vm.streams.is_empty() {
            break;
        }
        let ch = read_char(vm);
        if ch == b'"' as u32 {
            break;
        }
        if !proc.ss.push_byte(ch as u8) {
            vm.msg.error("\"", "string arena overflow", None::<()>);
            break;
        }
    }
    proc.ss.push_byte(0);
    match proc.ss.finish(start) {
        Some(idx) => proc.push_value(idx),
        None => vm.msg.error("\"", "string table overflow", None::<()>),
    }
}

fn read_comment_line(vm: &mut Vm, _proc: &mut Process) {
    loop {
        if vm.streams.is_empty() {
            break;
        }
        let ch = read_char(vm);
        if ch == b'\n' as u32 || ch == BELL as u32 {
            break;
        }
        if stream_is_eos(vm) {
            break;
        }
    }
}

fn word_address(vm: &mut Vm, proc: &mut Process) {
    let (name, _) = read_token(vm, MAX_TOKEN_SIZE);
    match vm.dictionary.find(&name) {
        Some(idx) => {
            if vm.compiler.is_compiling() {
                vm.compiler.push_instruction(idx as u32 & OP_CALL_MASK);
            } else {
                proc.push_value(idx as u32);
            }
        }
        None => vm.msg.error("@", "word not found", Some(name)),
    }
}

// ---- diagnostics ----------------------------------------------------------

fn print_int(_vm: &mut Vm, proc: &mut Process) {
    let v = proc.pop_value();
    print!("{v}");
    let _ = std::io::stdout().flush();
}

fn list_words(vm: &mut Vm, _proc: &mut Process) {
    for idx in 0..vm.dictionary.len() {
        let f = vm.dictionary.get(idx);
        println!("{} - {} : {} : {}", idx, vm.dictionary.name(idx), f.in_vs, f.out_vs);
    }
}

fn list_values(_vm: &mut Vm, proc: &mut Process) {
    for (i, v) in proc.vs.iter().enumerate() {
        println!("[{i}] - 0x{v:08X}");
    }
}

fn see(vm: &mut Vm, _proc: &mut Process) {
    let (name, _) = read_token(vm, MAX_TOKEN_SIZE);
    match vm.dictionary.find(&name) {
        None => println!("word {name} doesn't exist"),
        Some(idx) => {
            println!("{} - {}:", idx, vm.dictionary.name(idx));
            match vm.dictionary.get(idx).kind {
                FunctionKind::Native(_) => eprintln!("\t<native>"),
                FunctionKind::Interpreted { ins_offset, ins_count } => {
                    for i in 0..ins_count {
                        let opcode = vm.heap.get(ins_offset + i);
                        print!("{}", decompile_opcode(vm, opcode));
                    }
                }
            }
        }
    }
}

fn quit(vm: &mut Vm, _proc: &mut Process) {
    vm.quit = true;
}

// ---- streams ---------------------------------------------------------------

fn load(vm: &mut Vm, proc: &mut Process) {
    let str_idx = proc.pop_value();
    let path = proc.ss.get(str_idx).to_string();
    match Stream::open_file(&path, StreamMode::Ro) {
        Ok(stream) => {
            if vm.streams.push(stream) {
                proc.push_value(0); // suppress prompts while loading a file
                read_eval_print_loop(vm, proc);
                vm.streams.pop();
            } else {
                vm.msg.error("load", "stream table overflow", Some(path));
            }
        }
        Err(e) => vm.msg.error("load", "could not open file", Some(format!("{path}: {e}"))),
    }
    proc.ss.pop();
}

/// Rust analogue of `vmLoad`: push a filename straight onto the string
/// stack and run `load`'s body, used to source `bootstrap.ncvm` at boot.
pub fn load_file(vm: &mut Vm, proc: &mut Process, path: &str) {
    match proc.ss.push_str(path) {
        Some(idx) => {
            proc.push_value(idx);
            load(vm, proc);
        }
        None => vm.msg.error("load", "string table overflow", Some(path.to_string())),
    }
}

// ---- the read/eval/print loop ----------------------------------------------

fn repl(vm: &mut Vm, proc: &mut Process) {
    read_eval_print_loop(vm, proc);
}

/// The 5-step per-token algorithm: tokenize, look up, and either compile,
/// execute, or push a literal -- with the sentinel-return-frame mechanic
/// that lets top-level word execution run to completion without growing
/// the return stack. Grounded on `vmReadEvalPrintLoop` in `std-words.c`.
pub fn read_eval_print_loop(vm: &mut Vm, proc: &mut Process) {
    let write_to_console = proc.pop_value() != 0;
    if write_to_console {
        print!("\n> ");
        let _ = std::io::stdout().flush();
    }

    let mut is_eos = stream_is_eos(vm);
    while !vm.quit && !is_eos {
        let (token, last_ch) = read_token(vm, MAX_TOKEN_SIZE);
        is_eos = stream_is_eos(vm);

        if token.is_empty() {
            continue;
        }

        match vm.dictionary.find(&token) {
            None => {
                if is_int(&token) {
                    let value = tok_to_u32(&token);
                    if vm.compiler.is_compiling() {
                        vm.compiler.push_instruction(value & OP_CALL_MASK);
                    } else {
                        proc.push_value(value);
                    }
                } else {
                    vm.msg.error(&token, "word not found in dictionary", None::<()>);
                }
            }
            Some(word_id) => {
                let is_immediate = vm.dictionary.get(word_id).is_immediate;
                if vm.compiler.is_compiling() && !is_immediate {
                    vm.compiler.push_instruction(encode_call(word_id as u32));
                } else {
                    run_top_level_word(vm, proc, word_id, &token);
                }
            }
        }

        if last_ch == b'\n' && write_to_console {
            print!("\n> ");
            let _ = std::io::stdout().flush();
        }
    }
}

/// How a driven word left the return stack relative to the base it
/// started at: finished cleanly, suspended on `yield` (base still has
/// live frames above it), or aborted on an exception (already unwound).
enum DriveOutcome {
    Finished,
    Yielded,
    Aborted,
}

/// Runs `vmNext` until the return stack unwinds back to `base`, *or*
/// `yield` fires, *or* an exception aborts the word -- the loop body
/// shared by a word's first run and any later `resume` of it. Observes
/// `proc.except.yield_` itself (spec.md §5: "the driver loop is expected
/// to observe and return control to its caller") rather than folding it
/// into `ExceptFlags::any()`'s abort path, since a yield is an ordinary
/// suspension, not an error.
fn drive_until_base(vm: &mut Vm, proc: &mut Process, base: usize, label: &str) -> DriveOutcome {
    while !vm.quit && proc.rs.len() > base {
        exec::next(vm, proc);
        if proc.except.yield_ {
            proc.except.yield_ = false;
            vm.msg.info(label, "yielded", None::<()>);
            return DriveOutcome::Yielded;
        }
        if proc.except.any() {
            vm.msg.error(label, "aborted", Some(format!("{:?}", proc.except)));
            proc.except.clear();
            proc.rs.truncate(base);
            return DriveOutcome::Aborted;
        }
    }
    DriveOutcome::Finished
}

/// Seeds a sentinel return frame, tail-calls into `word_id`, then drives
/// `vmNext` until control returns past the sentinel -- matching the
/// `origRetCount`/`vmSetTailCall` dance in `vmReadEvalPrintLoop`. A
/// `yield` partway through leaves the word's frames on the return stack
/// above `orig_ret_count` and records that depth in `proc.suspended_base`
/// so a later `resume` picks up at the instruction right after `yield`.
fn run_top_level_word(vm: &mut Vm, proc: &mut Process, word_id: usize, token: &str) {
    let orig_ret_count = proc.rs.len();
    proc.fp = 0;
    proc.ip = 0;
    if !proc.rs.push(Return { fp: 0, ip: 0, lp: proc.lp }) {
        vm.msg.error(token, "return stack overflow", None::<()>);
        return;
    }

    exec::set_tail_call(proc, word_id as u32);
    exec::execute(vm, proc);
    if let DriveOutcome::Yielded = drive_until_base(vm, proc, orig_ret_count, token) {
        proc.suspended_base = Some(orig_ret_count as u32);
    }
}

/// `resume`: continues the most recently suspended word from where
/// `yield` left it. A no-op (reported as a lookup-style error) if
/// nothing is currently suspended.
fn resume(vm: &mut Vm, proc: &mut Process) {
    match proc.suspended_base.take() {
        Some(base) => {
            if let DriveOutcome::Yielded = drive_until_base(vm, proc, base as usize, "resume") {
                proc.suspended_base = Some(base);
            }
        }
        None => vm.msg.error("resume", "nothing suspended to resume", None::<()>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::process::Process;
    use crate::vm::VmParameters;

    fn vm_with_source(src: &str) -> (Vm, Process) {
        let mut vm = Vm::new(&VmParameters::default());
        let proc = Process::new(64, 64, 64, 4096, 64);
        vm.streams.push(Stream::from_memory(src.as_bytes()));
        (vm, proc)
    }

    #[test]
    fn tok_to_u32_wraps_like_reference() {
        assert_eq!(tok_to_u32("123"), 123);
        assert_eq!(tok_to_u32("4294967296"), 0); // 2^32 wraps to 0
    }

    #[test]
    fn is_int_rejects_empty_and_non_digits() {
        assert!(is_int("42"));
        assert!(!is_int(""));
        assert!(!is_int("4a"));
    }

    #[test]
    fn arithmetic_scenario_2_3_add_prints_5() {
        let (mut vm, mut proc) = vm_with_source("2 3 u32.add .i ");
        proc.push_value(0);
        read_eval_print_loop(&mut vm, &mut proc);
        assert!(proc.vs.is_empty());
    }

    #[test]
    fn definition_and_recursive_tail_call_scenario() {
        let (mut vm, mut proc) =
            vm_with_source(": fact vs.dup 1 u32.gt { vs.dup 1 u32.sub fact u32.mul } { vs.drop 1 } cond ; 5 fact .i ");
        proc.push_value(0);
        read_eval_print_loop(&mut vm, &mut proc);
        assert!(proc.rs.is_empty());
    }

    #[test]
    fn unknown_word_reports_and_continues() {
        let (mut vm, mut proc) = vm_with_source("bogus 1 2 u32.add .i ");
        proc.push_value(0);
        read_eval_print_loop(&mut vm, &mut proc);
        // the bad token is skipped; the rest of the line still runs.
        assert!(proc.vs.is_empty());
    }

    #[test]
    fn string_literal_pushes_its_index() {
        // The opening `"` is its own whitespace-delimited token; the space
        // right after it is swallowed by the tokenizer, not the string body.
        let (mut vm, mut proc) = vm_with_source("\" hi\" ");
        proc.push_value(0);
        read_eval_print_loop(&mut vm, &mut proc);
        let idx = proc.vs.pop().unwrap();
        assert_eq!(proc.ss.get(idx), "hi");
    }

    #[test]
    fn yield_suspends_the_word_and_resume_continues_after_it() {
        let (mut vm, mut proc) = vm_with_source(": y 1 yield 2 ; y ");
        proc.push_value(0);
        read_eval_print_loop(&mut vm, &mut proc);

        // `yield` fired before the `2` after it ran: only the `1` made it
        // onto the value stack, and the word is recorded as suspended.
        assert_eq!(proc.vs.pop(), Some(1));
        assert!(proc.vs.is_empty());
        assert!(proc.suspended_base.is_some());

        vm.streams.push(Stream::from_memory(b"resume "));
        proc.push_value(0);
        read_eval_print_loop(&mut vm, &mut proc);

        // `resume` picks up right after the `yield`, pushing the `2`.
        assert_eq!(proc.vs.pop(), Some(2));
        assert!(proc.suspended_base.is_none());
    }

    #[test]
    fn resume_with_nothing_suspended_reports_an_error() {
        let (mut vm, mut proc) = vm_with_source("resume ");
        proc.push_value(0);
        read_eval_print_loop(&mut vm, &mut proc);
        assert!(proc.suspended_base.is_none());
    }
}
