//! Compiler state shared by all processes: the nested-definition stack
//! (`cfs`) and the scratch instruction buffer (`cis`) words are compiled
//! into before `;`/`}` flushes them to the instruction heap. Matches
//! `ncvm.h`'s `VM::compilerState`.

#[derive(Clone, Copy)]
pub struct CompiledFunctionEntry {
    pub func_id: usize,
    pub ci_start: usize,
}

pub struct CompilerState {
    cfs: Vec<CompiledFunctionEntry>,
    cfs_cap: usize,
    cis: Vec<u32>,
    cis_cap: usize,
}

impl CompilerState {
    pub fn new(max_cf_count: usize, max_cis_count: usize) -> Self {
        CompilerState {
            cfs: Vec::with_capacity(max_cf_count),
            cfs_cap: max_cf_count,
            cis: Vec::with_capacity(max_cis_count),
            cis_cap: max_cis_count,
        }
    }

    /// `isInCompileMode`: true whenever at least one `:`/`!`/`{` is open.
    pub fn is_compiling(&self) -> bool {
        !self.cfs.is_empty()
    }

    pub fn cis_count(&self) -> usize {
        self.cis.len()
    }

    pub fn push_instruction(&mut self, opcode: u32) -> bool {
        if self.cis.len() >= self.cis_cap {
            return false;
        }
        self.cis.push(opcode);
        true
    }

    pub fn pop_instruction(&mut self) {
        self.cis.pop();
    }

    /// Opens a new nested compilation frame (`:`/`!`/`{`).
    pub fn push_frame(&mut self, func_id: usize) -> bool {
        if self.cfs.len() >= self.cfs_cap {
            return false;
        }
        self.cfs.push(CompiledFunctionEntry {
            func_id,
            ci_start: self.cis.len(),
        });
        true
    }

    pub fn current_frame(&self) -> Option<CompiledFunctionEntry> {
        self.cfs.last().copied()
    }

    /// Closes the innermost frame (`;`/`}`), returning the opcodes
    /// compiled inside it and truncating `cis` back to where the frame
    /// began, matching `finishFuncCompilation`.
    pub fn pop_frame(&mut self) -> Option<(CompiledFunctionEntry, Vec<u32>)> {
        let frame = self.cfs.pop()?;
        let body = self.cis.split_off(frame.ci_start);
        Some((frame, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_frames_isolate_their_own_body() {
        let mut cs = CompilerState::new(8, 64);
        assert!(cs.push_frame(0));
        cs.push_instruction(1);
        cs.push_instruction(2);
        assert!(cs.push_frame(1));
        cs.push_instruction(3);
        let (inner, inner_body) = cs.pop_frame().unwrap();
        assert_eq!(inner.func_id, 1);
        assert_eq!(inner_body, vec![3]);
        assert_eq!(cs.cis_count(), 2);
        let (outer, outer_body) = cs.pop_frame().unwrap();
        assert_eq!(outer.func_id, 0);
        assert_eq!(outer_body, vec![1, 2]);
        assert!(!cs.is_compiling());
    }

    #[test]
    fn compiling_flag_tracks_open_frames() {
        let mut cs = CompilerState::new(8, 64);
        assert!(!cs.is_compiling());
        cs.push_frame(0);
        assert!(cs.is_compiling());
    }

    #[test]
    fn frame_overflow_reports_false() {
        let mut cs = CompilerState::new(1, 64);
        assert!(cs.push_frame(0));
        assert!(!cs.push_frame(1));
    }
}
