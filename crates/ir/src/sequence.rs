use crate::{BranchOffset, Error, Instr, Instruction};

/// A growable sequence of [`Instruction`]s under construction.
///
/// The translator appends instructions while visiting the Wasm expression
/// and patches forward branch offsets once their target position is known.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstrSequence {
    /// The instructions of the sequence in execution order.
    instrs: Vec<Instruction>,
}

impl InstrSequence {
    /// Creates a new empty [`InstrSequence`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the sequence so that its allocation can be reused.
    pub fn reset(&mut self) {
        self.instrs.clear();
    }

    /// Returns the number of [`Instruction`]s in the sequence.
    #[inline]
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    /// Returns `true` if the sequence is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Returns the position the next pushed [`Instruction`] will have.
    pub fn next_instr(&self) -> Instr {
        Instr(self.instrs.len())
    }

    /// Pushes an [`Instruction`] and returns its position.
    pub fn push(&mut self, instruction: Instruction) -> Instr {
        let instr = self.next_instr();
        self.instrs.push(instruction);
        instr
    }

    /// Returns the [`Instruction`] at `instr` if any.
    #[inline]
    pub fn get(&self, instr: Instr) -> Option<Instruction> {
        self.instrs.get(instr.0).copied()
    }

    /// Patches the branching [`Instruction`] at `instr` to branch to `dst`.
    ///
    /// # Errors
    ///
    /// If the branch offset does not fit into its encoding.
    ///
    /// # Panics
    ///
    /// If the [`Instruction`] at `instr` is not a branching instruction.
    pub fn patch_branch(&mut self, instr: Instr, dst: Instr) -> Result<(), Error> {
        let offset = BranchOffset::from_src_to_dst(instr, dst)?;
        let Some(instruction) = self.instrs.get_mut(instr.0) else {
            panic!("tried to patch non-existing instruction at {instr:?}")
        };
        let Some(branch_offset) = instruction.branch_offset_mut() else {
            panic!("tried to patch non-branch instruction at {instr:?}: {instruction:?}")
        };
        *branch_offset = offset;
        Ok(())
    }

    /// Returns the underlying [`Instruction`]s as a shared slice.
    pub fn as_slice(&self) -> &[Instruction] {
        &self.instrs[..]
    }
}

impl From<InstrSequence> for Vec<Instruction> {
    fn from(sequence: InstrSequence) -> Self {
        sequence.instrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reg;

    #[test]
    fn push_and_patch() {
        let mut seq = InstrSequence::new();
        let branch = seq.push(Instruction::Branch {
            offset: BranchOffset::uninit(),
        });
        seq.push(Instruction::Return);
        let target = seq.push(Instruction::Return);
        seq.patch_branch(branch, target).unwrap();
        let Some(Instruction::Branch { offset }) = seq.get(branch) else {
            panic!("expected branch instruction")
        };
        assert_eq!(offset.to_isize(), 2);
    }

    #[test]
    fn next_instr_tracks_positions() {
        let mut seq = InstrSequence::new();
        assert_eq!(seq.next_instr().index(), 0);
        seq.push(Instruction::Copy {
            result: Reg::from(0),
            value: Reg::from(1),
        });
        assert_eq!(seq.next_instr().index(), 1);
    }
}
