//! Lazy translation of stack-machine Wasm expressions into the register
//! instruction sequence executed by the interpreter.
//!
//! Translation is single-pass: the [`FuncTranslator`] is the visitor driven
//! by the parser over the validated function body. It maintains a value
//! stack of *register numbers* mirroring the Wasm operand stack and a
//! control stack resolving structured control flow into patched branches.
//!
//! Register allocation uses a high-water-mark discipline: registers
//! `0..P` hold parameters, `P..P+L` non-parameter locals, and every
//! operand stack depth `d` above that owns the canonical temporary
//! register `P + L + d`. The final frame width is the high-water mark
//! including the call regions reserved for callee frames.

mod control;
mod labels;
mod visit;

pub(crate) use self::control::{ControlFrame, ControlFrameKind, IfState};
pub(crate) use self::labels::{LabelRef, LabelRegistry};
use super::{CodeArena, CompiledFunc, FRAME_HEADER_LEN};
use crate::{
    ir::{index, InstrSequence, Instruction, Reg},
    module::{Module, TranslationError},
    Error, FuncType,
};
use wasmlet_core::UntypedVal;
use wasmparser::{BinaryReader, FunctionBody};

/// Bails out of the current operator early when translating unreachable
/// code. Operand registers of unreachable operators are never read, so no
/// instruction needs to be emitted for them.
macro_rules! bail_unreachable {
    ($this:ident) => {
        if !$this.reachable {
            return Ok(());
        }
    };
}
pub(self) use bail_unreachable;

/// Translates the body of the function at `func_idx` of `module` into a
/// [`CompiledFunc`] allocated in `code`.
///
/// Translation is deterministic given the input bytes: compiling the same
/// function body twice yields equal instruction sequences modulo arena
/// addresses.
///
/// # Errors
///
/// If the function body fails to translate.
pub(crate) fn translate_func(
    module: &Module,
    func_idx: u32,
    code: &CodeArena,
) -> Result<CompiledFunc, Error> {
    let range = module.body_of_func(func_idx);
    let bytes = &module.inner.bytes[range.start..range.end];
    let reader = BinaryReader::new_features(bytes, range.start, module.inner.features);
    let body = FunctionBody::new(reader);
    let func_type = module.type_of_func(func_idx).clone();
    let mut translator = FuncTranslator::new(module.clone(), &func_type)?;
    let mut locals = body.get_locals_reader()?;
    for _ in 0..locals.get_count() {
        let (amount, _value_type) = locals.read()?;
        translator.register_locals(amount)?;
    }
    translator.finish_locals();
    let mut ops = body.get_operators_reader()?;
    while !ops.eof() {
        ops.visit_operator(&mut translator)??;
    }
    ops.ensure_end()?;
    translator.finish(code)
}

/// Translates a single Wasm function body into register instructions.
pub(crate) struct FuncTranslator {
    /// The module of the translated function.
    module: Module,
    /// The instruction sequence under construction.
    instrs: InstrSequence,
    /// The branch target labels of the function body.
    labels: LabelRegistry,
    /// The value stack of register numbers mirroring the Wasm operand
    /// stack.
    stack: Vec<Reg>,
    /// The stack of open control frames.
    control: Vec<ControlFrame>,
    /// The number of parameters of the translated function.
    len_params: u16,
    /// The number of non-parameter locals of the translated function.
    len_locals: u16,
    /// The first temporary register: `len_params + len_locals`.
    first_temp: usize,
    /// The high-water mark of allocated registers including call regions.
    high_water: usize,
    /// The number of results of the translated function.
    len_results: u16,
    /// `false` while translating unreachable code.
    reachable: bool,
}

impl FuncTranslator {
    /// Creates a new [`FuncTranslator`] for a function of type `func_type`.
    fn new(module: Module, func_type: &FuncType) -> Result<Self, Error> {
        let len_params =
            u16::try_from(func_type.len_params()).map_err(|_| TranslationError::TooManyRegisters)?;
        let len_results = u16::try_from(func_type.len_results())
            .map_err(|_| TranslationError::TooManyRegisters)?;
        let mut translator = Self {
            module,
            instrs: InstrSequence::new(),
            labels: LabelRegistry::default(),
            stack: Vec::new(),
            control: Vec::new(),
            len_params,
            len_locals: 0,
            first_temp: usize::from(len_params),
            high_water: usize::from(len_params),
            len_results,
            reachable: true,
        };
        // The function body behaves like a block whose end returns; its
        // label is never pinned since branches to it emit returns directly.
        let label = translator.labels.new_label();
        translator.control.push(ControlFrame {
            kind: ControlFrameKind::Block,
            len_params: 0,
            len_results,
            height: 0,
            label,
            branched_to: false,
            is_unreachable: false,
        });
        Ok(translator)
    }

    /// Registers `amount` function local variables.
    fn register_locals(&mut self, amount: u32) -> Result<(), Error> {
        let len_locals = u32::from(self.len_locals)
            .checked_add(amount)
            .filter(|len| u16::try_from(*len).is_ok())
            .ok_or(TranslationError::TooManyRegisters)?;
        self.len_locals = len_locals as u16;
        Ok(())
    }

    /// Finishes registration of the function local variables.
    fn finish_locals(&mut self) {
        self.first_temp = usize::from(self.len_params) + usize::from(self.len_locals);
        self.high_water = self.high_water.max(self.first_temp);
    }

    /// Returns the canonical temporary register of operand stack depth
    /// `depth`.
    fn slot(&self, depth: usize) -> Result<Reg, Error> {
        Ok(Reg::from_index(self.first_temp + depth)?)
    }

    /// Bumps the register high-water mark to cover `end` registers.
    fn bump_high_water(&mut self, end: usize) {
        self.high_water = self.high_water.max(end);
    }

    /// Pushes the register of a new temporary onto the value stack.
    fn push_temp(&mut self) -> Result<Reg, Error> {
        let reg = self.slot(self.stack.len())?;
        self.stack.push(reg);
        self.bump_high_water(reg.index() + 1);
        Ok(reg)
    }

    /// Pushes an existing register onto the value stack.
    ///
    /// Used by `local.get` to elide the redundant move: the local's
    /// register itself represents the pushed operand until it is aliased
    /// by a write to the local.
    fn push_reg(&mut self, reg: Reg) {
        self.stack.push(reg);
    }

    /// Pops the top operand register off the value stack.
    fn pop(&mut self) -> Result<Reg, Error> {
        self.stack
            .pop()
            .ok_or_else(|| Error::from(TranslationError::MalformedExpression))
    }

    /// Pushes `instruction` to the sequence under construction.
    fn emit(&mut self, instruction: Instruction) {
        self.instrs.push(instruction);
    }

    /// Emits a copy unless `value` already lives in `result`.
    fn emit_copy(&mut self, result: Reg, value: Reg) {
        if result != value {
            self.emit(Instruction::Copy { result, value });
        }
    }

    /// Returns the register of the local variable at `local_index`.
    fn local_reg(&self, local_index: u32) -> Result<Reg, Error> {
        if local_index as usize >= self.first_temp {
            return Err(TranslationError::UnknownLocal {
                index: local_index,
            }
            .into());
        }
        Ok(Reg::from_index(local_index as usize)?)
    }

    /// Preserves all operand stack entries aliasing the local register
    /// `local` before the local is written.
    ///
    /// Every aliasing entry is copied into its canonical temporary which
    /// is free by construction.
    fn preserve_local(&mut self, local: Reg) -> Result<(), Error> {
        for depth in 0..self.stack.len() {
            if self.stack[depth] == local {
                let slot = self.slot(depth)?;
                self.emit(Instruction::Copy {
                    result: slot,
                    value: local,
                });
                self.bump_high_water(slot.index() + 1);
                self.stack[depth] = slot;
            }
        }
        Ok(())
    }

    /// Emits the copies moving the top `arity` operands into the branch
    /// target slots starting at stack depth `target_height`.
    ///
    /// The operands are peeked, not popped: conditional branches keep
    /// them live on the fallthrough path.
    fn emit_branch_operand_copies(
        &mut self,
        target_height: usize,
        arity: usize,
    ) -> Result<(), Error> {
        let len = self.stack.len();
        debug_assert!(len >= target_height + arity || !self.reachable);
        for i in 0..arity {
            let value = self.stack[len - arity + i];
            let result = self.slot(target_height + i)?;
            self.bump_high_water(result.index() + 1);
            self.emit_copy(result, value);
        }
        Ok(())
    }

    /// Emits the copies moving the top `len_results` operands into the
    /// function's result registers `0..len_results` followed by a return.
    ///
    /// Sources that alias a result register of a later copy are moved to
    /// scratch temporaries first.
    fn emit_return(&mut self) -> Result<(), Error> {
        let len_results = usize::from(self.len_results);
        let len = self.stack.len();
        debug_assert!(len >= len_results);
        for j in 0..len_results {
            let src = self.stack[len - len_results + j];
            if src.index() < len_results && src.index() != j {
                let scratch = self.slot(len + j)?;
                self.bump_high_water(scratch.index() + 1);
                self.emit(Instruction::Copy {
                    result: scratch,
                    value: src,
                });
                self.stack[len - len_results + j] = scratch;
            }
        }
        for i in 0..len_results {
            let value = self.stack[len - len_results + i];
            let result = Reg::from_index(i)?;
            self.emit_copy(result, value);
        }
        self.emit(Instruction::Return);
        Ok(())
    }

    /// Resolves the control frame at relative branch `depth`.
    fn frame_at_depth(&self, depth: u32) -> Result<usize, Error> {
        let len = self.control.len();
        (len - 1)
            .checked_sub(depth as usize)
            .ok_or_else(|| Error::from(TranslationError::UnknownLabel { depth }))
    }

    /// Returns `true` if a branch to the frame at `index` needs operand
    /// copies, i.e. if any branch operand does not already live in its
    /// target slot.
    fn branch_needs_copies(&self, index: usize) -> Result<bool, Error> {
        if index == 0 {
            // Returns always move results; treat the no-result case below.
            let len_results = usize::from(self.len_results);
            let len = self.stack.len();
            for i in 0..len_results {
                if self.stack[len - len_results + i] != Reg::from_index(i)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }
        let frame = &self.control[index];
        let arity = frame.branch_arity();
        let len = self.stack.len();
        for i in 0..arity {
            if self.stack[len - arity + i] != self.slot(frame.height + i)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Reserves the contiguous call region for a callee frame.
    ///
    /// The region starts above every live register: the callee's frame
    /// header occupies its first [`FRAME_HEADER_LEN`] cells and the
    /// callee's register array begins directly after. Returns the caller
    /// relative index of the callee register array, i.e. the `sp_addend`
    /// of the emitted call.
    fn reserve_call_region(
        &mut self,
        len_params: usize,
        len_results: usize,
    ) -> Result<usize, Error> {
        let region = self.first_temp + self.stack.len();
        let callee_regs = region + FRAME_HEADER_LEN;
        // The caller's frame must span the header and parameter/result
        // registers it reads and writes around the call.
        self.bump_high_water(callee_regs + len_params.max(len_results));
        // The register operands of the emitted copies must be encodable.
        Reg::from_index(callee_regs + len_params.max(len_results))?;
        Ok(callee_regs)
    }

    /// Translates a call to the function with signature arity
    /// `(len_params, len_results)`, emitting the argument copies and
    /// pushing the result registers.
    ///
    /// `emit_call` receives the `sp_addend` and emits the concrete call
    /// instruction.
    fn translate_call(
        &mut self,
        len_params: usize,
        len_results: usize,
        emit_call: impl FnOnce(&mut Self, u32),
    ) -> Result<(), Error> {
        let callee_regs = self.reserve_call_region(len_params, len_results)?;
        let len = self.stack.len();
        debug_assert!(len >= len_params);
        for i in 0..len_params {
            let value = self.stack[len - len_params + i];
            let result = Reg::from_index(callee_regs + i)?;
            self.emit(Instruction::Copy { result, value });
        }
        self.stack.truncate(len - len_params);
        emit_call(self, callee_regs as u32);
        for i in 0..len_results {
            let result = self.push_temp()?;
            let value = Reg::from_index(callee_regs + i)?;
            self.emit(Instruction::Copy { result, value });
        }
        Ok(())
    }

    /// Finishes the fallthrough of the frame at the matching `end`:
    /// truncates the operand stack to the frame's height and pushes the
    /// frame's result slots.
    fn finish_frame_operands(&mut self, height: usize, len_results: usize) -> Result<(), Error> {
        self.stack.truncate(height);
        for i in 0..len_results {
            let slot = self.slot(height + i)?;
            self.stack.push(slot);
            self.bump_high_water(slot.index() + 1);
        }
        Ok(())
    }

    /// Finishes translation and allocates the compiled function.
    fn finish(mut self, code: &CodeArena) -> Result<CompiledFunc, Error> {
        debug_assert!(
            self.control.is_empty(),
            "unbalanced control frames after function end"
        );
        let len_registers = self
            .high_water
            .max(self.first_temp)
            .max(usize::from(self.len_results));
        let len_registers =
            u16::try_from(len_registers).map_err(|_| TranslationError::TooManyRegisters)?;
        let instrs = Vec::from(core::mem::take(&mut self.instrs));
        Ok(CompiledFunc {
            iseq: code.alloc(instrs),
            len_registers,
            len_params: self.len_params,
            len_results: self.len_results,
            len_locals: self.len_locals,
        })
    }

    /// Resolves the interned signature of the module type at `type_index`.
    fn sig_of_type(&self, type_index: u32) -> index::Sig {
        self.module.inner.sigs[type_index as usize]
    }

    /// Emits a constant materialization into a fresh temporary.
    fn translate_const(&mut self, value: UntypedVal) -> Result<(), Error> {
        let result = self.push_temp()?;
        self.emit(Instruction::Const { result, value });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::translate_func;
    use crate::{Module, Runtime};

    fn parse(runtime: &mut Runtime, wat: &str) -> Module {
        let wasm = wat::parse_str(wat).unwrap();
        Module::parse(runtime, &wasm).unwrap()
    }

    #[test]
    fn translation_is_deterministic() {
        let mut runtime = Runtime::new();
        let module = parse(
            &mut runtime,
            r#"
            (module
                (func (param i64) (result i64)
                    (if (result i64) (i64.eqz (local.get 0))
                        (then (i64.const 1))
                        (else
                            (i64.mul
                                (local.get 0)
                                (call 0 (i64.sub (local.get 0) (i64.const 1)))
                            )
                        )
                    )
                )
            )
        "#,
        );
        let code = runtime.store().code();
        let fst = translate_func(&module, 0, code).unwrap();
        let snd = translate_func(&module, 0, code).unwrap();
        assert_eq!(fst.iseq.as_slice(), snd.iseq.as_slice());
        assert_eq!(fst.len_registers, snd.len_registers);
        assert_eq!(fst.len_params, snd.len_params);
        assert_eq!(fst.len_results, snd.len_results);
    }

    #[test]
    fn frame_width_covers_params_and_locals() {
        let mut runtime = Runtime::new();
        let module = parse(
            &mut runtime,
            r#"
            (module
                (func (param i32 i32) (local i64)
                    (local.set 2 (i64.const 0))
                )
            )
        "#,
        );
        let code = runtime.store().code();
        let compiled = translate_func(&module, 0, code).unwrap();
        assert_eq!(compiled.len_params, 2);
        assert_eq!(compiled.len_locals, 1);
        assert!(compiled.len_registers >= 3);
    }

    #[test]
    fn branches_are_fully_patched() {
        let mut runtime = Runtime::new();
        let module = parse(
            &mut runtime,
            r#"
            (module
                (func (param i32) (result i32)
                    (block (result i32)
                        (if (i32.eqz (local.get 0))
                            (then (br 1 (i32.const 1)))
                        )
                        (i32.const 2)
                    )
                )
            )
        "#,
        );
        let code = runtime.store().code();
        let compiled = translate_func(&module, 0, code).unwrap();
        for instruction in compiled.iseq.as_slice() {
            let mut instruction = *instruction;
            if let Some(offset) = instruction.branch_offset_mut() {
                assert!(offset.is_init(), "unpatched branch in {instruction:?}");
            }
        }
    }
}
