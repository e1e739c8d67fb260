use crate::{
    engine::{CompiledFunc, FRAME_HEADER_LEN},
    func::InternalFunc,
    ir::{Instruction, Reg},
    store::EntityHandle,
    Instance, TrapCode,
};
use wasmlet_core::{hint, UntypedVal};

/// The register-file stack of one invocation.
///
/// Owns a single contiguous buffer of untyped cells. A frame consists of a
/// [`FRAME_HEADER_LEN`] cell header directly below the frame base followed
/// by the dense register array of the executing function. Growth may
/// relocate the buffer, so the executor refreshes its cached frame pointer
/// after every operation that can push a frame.
#[derive(Debug)]
pub struct StackContext {
    /// The cells of the register-file stack.
    values: Vec<UntypedVal>,
    /// The maximum number of cells before `CallStackExhausted`.
    limit: usize,
    /// The base of the current frame's register array.
    frame_base: usize,
}

/// The header of a frame, stored in the cells directly below its base.
#[derive(Debug)]
pub struct FrameHeader {
    /// The program counter execution resumes at after the frame returns.
    pub return_pc: *const Instruction,
    /// The frame base of the calling frame.
    pub prev_base: usize,
    /// The callee function, carrying its interned type and instance.
    pub func: InternalFunc,
    /// The instance of the calling frame.
    pub caller_instance: Instance,
}

/// Offsets of the header cells below the frame base.
const HEADER_RETURN_PC: usize = 4;
const HEADER_PREV_BASE: usize = 3;
const HEADER_FUNC: usize = 2;
const HEADER_CALLER_INSTANCE: usize = 1;

impl StackContext {
    /// Creates a new empty [`StackContext`] with the given cell `limit`.
    pub fn new(limit: usize) -> Self {
        Self {
            values: Vec::new(),
            limit,
            frame_base: FRAME_HEADER_LEN,
        }
    }

    /// Returns the base of the current frame's register array.
    #[inline]
    pub fn frame_base(&self) -> usize {
        self.frame_base
    }

    /// Pushes a frame for `compiled` whose register array starts at `base`
    /// and makes it the current frame.
    ///
    /// The parameter registers have already been written by the caller;
    /// the non-parameter locals are zero-initialized here.
    ///
    /// # Errors
    ///
    /// [`TrapCode::CallStackExhausted`] if the frame exceeds the stack
    /// limit.
    pub fn push_frame(
        &mut self,
        base: usize,
        compiled: &CompiledFunc,
        header: FrameHeader,
    ) -> Result<(), TrapCode> {
        debug_assert!(base >= FRAME_HEADER_LEN);
        let end = base + usize::from(compiled.len_registers);
        if hint::unlikely(end > self.limit) {
            return Err(TrapCode::CallStackExhausted);
        }
        if end > self.values.len() {
            self.values.resize(end, UntypedVal::default());
        }
        self.values[base - HEADER_RETURN_PC] =
            UntypedVal::from_bits(header.return_pc as usize as u64);
        self.values[base - HEADER_PREV_BASE] = UntypedVal::from_bits(header.prev_base as u64);
        self.values[base - HEADER_FUNC] = UntypedVal::from_bits(header.func.to_bits());
        self.values[base - HEADER_CALLER_INSTANCE] =
            UntypedVal::from_bits(header.caller_instance.handle().to_bits() as u64);
        let locals_start = base + usize::from(compiled.len_params);
        let locals_end = locals_start + usize::from(compiled.len_locals);
        self.values[locals_start..locals_end].fill(UntypedVal::default());
        self.frame_base = base;
        Ok(())
    }

    /// Pops the current frame and makes the calling frame current again.
    ///
    /// Returns the stored return program counter and the caller instance.
    pub fn pop_frame(&mut self) -> (*const Instruction, Instance) {
        let base = self.frame_base;
        let return_pc =
            self.values[base - HEADER_RETURN_PC].to_bits() as usize as *const Instruction;
        let prev_base = self.values[base - HEADER_PREV_BASE].to_bits() as usize;
        let caller_bits = self.values[base - HEADER_CALLER_INSTANCE].to_bits() as usize;
        // Safety: the bits were written by `push_frame` from a live
        //         instance handle of the same store.
        let caller_instance = Instance(unsafe { EntityHandle::from_bits(caller_bits) });
        self.frame_base = prev_base;
        (return_pc, caller_instance)
    }

    /// Returns the register file view of the current frame.
    #[inline]
    pub fn frame_registers(&mut self) -> FrameRegisters {
        debug_assert!(self.frame_base <= self.values.len());
        // Safety: `frame_base` always points inside the buffer and every
        //         register index used by translated code lies within the
        //         frame bounds covered by `push_frame`.
        FrameRegisters {
            ptr: unsafe { self.values.as_mut_ptr().add(self.frame_base) },
        }
    }

    /// Reads the cell at the absolute index `index`.
    #[inline]
    pub fn get_abs(&self, index: usize) -> UntypedVal {
        self.values[index]
    }

    /// Writes the cell at the absolute index `index`.
    #[inline]
    pub fn set_abs(&mut self, index: usize, value: UntypedVal) {
        self.values[index] = value;
    }
}

/// A raw view of the register array of the executing frame.
///
/// Register access is the hottest operation of the interpreter; the view
/// indexes the underlying buffer without bounds checks. The translator
/// guarantees that every register operand lies within the frame width the
/// frame was pushed with.
#[derive(Debug, Copy, Clone)]
pub struct FrameRegisters {
    /// Pointer to the first register of the frame.
    ptr: *mut UntypedVal,
}

impl FrameRegisters {
    /// Reads the register `reg`.
    #[inline]
    pub fn get(&self, reg: Reg) -> UntypedVal {
        // Safety: see the type level invariant.
        unsafe { *self.ptr.add(reg.index()) }
    }

    /// Writes the register `reg`.
    #[inline]
    pub fn set(&mut self, reg: Reg, value: UntypedVal) {
        // Safety: see the type level invariant.
        unsafe { *self.ptr.add(reg.index()) = value }
    }
}
