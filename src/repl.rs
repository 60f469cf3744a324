//! Process wiring and the REPL entry point: builds a `Vm`+`Process` with
//! the reference's default capacities, optionally sources
//! `bootstrap.ncvm` and a script given on the command line, then drives
//! the interactive loop against stdin. Grounded on
//! `examples/original_source/main.c`'s `main` (exact default capacities
//! and boot sequence) and the teacher's `config.rs::run_forth` wiring
//! style.

use crate::config::Config;
use crate::vm::process::Process;
use crate::vm::stdwords::{load_file, read_eval_print_loop};
use crate::vm::stream::Stream;
use crate::vm::{Vm, VmParameters};

const BOOTSTRAP_SCRIPT: &str = "bootstrap.ncvm";

/// Proc-level capacities from `vmNewProcess(vm, 1024, 1024, 1024, 2 *
/// 65536, 32769)`: value/local/return stack depth, string-stack char
/// capacity, string-stack entry count.
const VALUE_STACK_CAP: usize = 1024;
const LOCAL_STACK_CAP: usize = 1024;
const RETURN_STACK_CAP: usize = 1024;
const STRING_CHAR_CAP: usize = 2 * 65536;
const STRING_COUNT_CAP: usize = 32769;

pub fn run() {
    let config = Config::from_env();

    println!("nCVM -- a small concatenative virtual machine");

    let mut vm = Vm::new(&VmParameters::default());
    vm.msg.set_level(config.debug_level);

    let mut proc = Process::new(
        VALUE_STACK_CAP,
        LOCAL_STACK_CAP,
        RETURN_STACK_CAP,
        STRING_CHAR_CAP,
        STRING_COUNT_CAP,
    );

    if !config.no_bootstrap {
        load_file(&mut vm, &mut proc, BOOTSTRAP_SCRIPT);
    }

    if let Some(script) = &config.script {
        load_file(&mut vm, &mut proc, script);
    }

    if vm.quit {
        std::process::exit(0);
    }

    vm.streams.push(Stream::stdin(true));
    proc.push_value(1); // print "> " prompts while reading interactively
    read_eval_print_loop(&mut vm, &mut proc);
    vm.streams.pop();

    std::process::exit(0);
}
