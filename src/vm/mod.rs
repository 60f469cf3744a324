//! The VM: the shared, append-only dictionary/instruction heap/compiler
//! state, plus the stream table `load` pushes and pops against. One or
//! more `Process`es run against a `Vm`; this crate only ever drives one.

pub mod compiler;
pub mod dictionary;
pub mod exec;
pub mod heap;
pub mod process;
pub mod stacks;
pub mod stdwords;
pub mod stream;
pub mod strings;
pub mod value;

use crate::messages::Msg;
use compiler::CompilerState;
use dictionary::Dictionary;
use heap::InstructionHeap;
use stream::StreamTable;
use value::HardOp;

pub struct VmParameters {
    pub max_function_count: usize,
    pub max_instruction_count: usize,
    pub max_char_segment_size: usize,
    pub max_stream_count: usize,
    pub max_cf_count: usize,
    pub max_cis_count: usize,
}

impl Default for VmParameters {
    /// Matches `main.c`'s `VMParameters` literal exactly.
    fn default() -> Self {
        VmParameters {
            max_function_count: 4096,
            max_instruction_count: 65536,
            max_char_segment_size: 65536,
            max_stream_count: 1024,
            max_cf_count: 64,
            max_cis_count: 65536,
        }
    }
}

pub struct Vm {
    pub dictionary: Dictionary,
    pub heap: InstructionHeap,
    pub compiler: CompilerState,
    pub streams: StreamTable,
    pub quit: bool,
    pub msg: Msg,
}

impl Vm {
    pub fn new(params: &VmParameters) -> Self {
        let mut dictionary = Dictionary::new(params.max_function_count, params.max_char_segment_size);
        for idx in 0..HardOp::COUNT {
            let op = HardOp::from_index(idx).unwrap();
            let (in_vs, out_vs) = op.arity();
            dictionary.add_native(op.name(), false, stdwords::hardware_noop, in_vs, out_vs);
        }
        let mut vm = Vm {
            dictionary,
            heap: InstructionHeap::new(params.max_instruction_count),
            compiler: CompilerState::new(params.max_cf_count, params.max_cis_count),
            streams: StreamTable::new(params.max_stream_count),
            quit: false,
            msg: Msg::new(),
        };
        stdwords::register(&mut vm);
        vm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registers_hardware_opcodes_first() {
        let vm = Vm::new(&VmParameters::default());
        assert_eq!(vm.dictionary.name(0), "nop");
        assert_eq!(vm.dictionary.name(value::HardOp::Yield as usize), "yield");
    }

    #[test]
    fn new_registers_standard_dictionary_after_opcodes() {
        let vm = Vm::new(&VmParameters::default());
        assert!(vm.dictionary.find(":").is_some());
        assert!(vm.dictionary.find("repl").is_some());
        assert!(vm.dictionary.find("quit").is_some());
    }
}
