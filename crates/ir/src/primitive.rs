use crate::Error;

/// An index into the register file of the executing frame.
///
/// A register is a 64-bit untyped cell. Registers `0..P` hold the function
/// parameters, `P..P+L` the non-parameter locals and the remaining
/// registers hold translator-assigned temporaries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Reg(u16);

impl Reg {
    /// Creates a [`Reg`] from the given `usize` index.
    ///
    /// # Errors
    ///
    /// If `index` does not fit into the 16-bit register encoding.
    pub fn from_index(index: usize) -> Result<Self, Error> {
        u16::try_from(index)
            .map(Self)
            .map_err(|_| Error::RegisterOutOfBounds)
    }

    /// Returns the index of the [`Reg`] as `usize`.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl From<u16> for Reg {
    fn from(index: u16) -> Self {
        Self(index)
    }
}

impl From<Reg> for u16 {
    fn from(reg: Reg) -> Self {
        reg.0
    }
}

/// The position of an [`Instruction`] within an instruction sequence.
///
/// [`Instruction`]: crate::Instruction
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Instr(pub(crate) usize);

impl Instr {
    /// Returns the position of the [`Instr`] as `usize`.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A branch target encoded relative to the position of the branching
/// instruction itself.
///
/// A value of zero marks a not yet resolved branch since no branch
/// legitimately jumps to itself.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct BranchOffset(i32);

impl BranchOffset {
    /// Creates an uninitialized [`BranchOffset`] to be patched later.
    pub fn uninit() -> Self {
        Self(0)
    }

    /// Creates a [`BranchOffset`] from the branching instruction at `src`
    /// to the target instruction at `dst`.
    ///
    /// # Errors
    ///
    /// If the computed offset does not fit into the 32-bit encoding.
    pub fn from_src_to_dst(src: Instr, dst: Instr) -> Result<Self, Error> {
        let src = src.0 as i64;
        let dst = dst.0 as i64;
        i32::try_from(dst - src)
            .map(Self)
            .map_err(|_| Error::BranchOffsetOutOfBounds)
    }

    /// Returns `true` if the [`BranchOffset`] has been resolved.
    pub fn is_init(self) -> bool {
        self.0 != 0
    }

    /// Returns the offset as `isize`.
    pub fn to_isize(self) -> isize {
        self.0 as isize
    }
}
