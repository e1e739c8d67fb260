use super::{bail_unreachable, ControlFrame, ControlFrameKind, FuncTranslator, IfState};
use crate::{
    ir::{index, BinaryOp, Instruction, LoadOp, StoreOp, UnaryOp},
    module::TranslationError,
    Error, TrapCode,
};
use wasmlet_core::UntypedVal;
use wasmparser::{MemArg, VisitOperator};

macro_rules! impl_visit_operator {
    ( @mvp $($rest:tt)* ) => {
        impl_visit_operator!(@@skipped $($rest)*);
    };
    ( @sign_extension $($rest:tt)* ) => {
        impl_visit_operator!(@@skipped $($rest)*);
    };
    ( @saturating_float_to_int $($rest:tt)* ) => {
        impl_visit_operator!(@@skipped $($rest)*);
    };
    ( @bulk_memory $($rest:tt)* ) => {
        impl_visit_operator!(@@skipped $($rest)*);
    };
    ( @reference_types $($rest:tt)* ) => {
        impl_visit_operator!(@@skipped $($rest)*);
    };
    ( @@skipped $op:ident $({ $($arg:ident: $argty:ty),* })? => $visit:ident $_ann:tt $($rest:tt)* ) => {
        // Skipped: implemented manually below.
        impl_visit_operator!($($rest)*);
    };
    ( @$proposal:ident $op:ident $({ $($arg:ident: $argty:ty),* })? => $visit:ident $_ann:tt $($rest:tt)* ) => {
        // Wildcard match arm for the unsupported Wasm proposals.
        fn $visit(&mut self $($(, $arg: $argty)*)?) -> Self::Output {
            self.unsupported_operator(stringify!($op))
        }
        impl_visit_operator!($($rest)*);
    };
    () => {};
}

macro_rules! impl_visit_binary {
    ( $( fn $visit:ident => $op:ident; )* ) => {
        $(
            fn $visit(&mut self) -> Self::Output {
                self.translate_binary(BinaryOp::$op)
            }
        )*
    };
}

macro_rules! impl_visit_unary {
    ( $( fn $visit:ident => $op:ident; )* ) => {
        $(
            fn $visit(&mut self) -> Self::Output {
                self.translate_unary(UnaryOp::$op)
            }
        )*
    };
}

macro_rules! impl_visit_load {
    ( $( fn $visit:ident => $op:ident, align: $align:literal; )* ) => {
        $(
            fn $visit(&mut self, memarg: MemArg) -> Self::Output {
                self.translate_load(LoadOp::$op, memarg, $align)
            }
        )*
    };
}

macro_rules! impl_visit_store {
    ( $( fn $visit:ident => $op:ident, align: $align:literal; )* ) => {
        $(
            fn $visit(&mut self, memarg: MemArg) -> Self::Output {
                self.translate_store(StoreOp::$op, memarg, $align)
            }
        )*
    };
}

impl FuncTranslator {
    /// Called when translating an operator of an unsupported Wasm
    /// proposal.
    ///
    /// We panic instead of returning an error because unsupported Wasm
    /// proposals have been rejected by the validation procedure already;
    /// encountering one of their operators during translation is a bug.
    fn unsupported_operator(&self, name: &str) -> Result<(), Error> {
        panic!("tried to translate an unsupported Wasm operator: {name}")
    }

    /// Translates a binary instruction: two operands, one result.
    fn translate_binary(&mut self, op: BinaryOp) -> Result<(), Error> {
        bail_unreachable!(self);
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        let result = self.push_temp()?;
        self.emit(Instruction::Binary {
            op,
            result,
            lhs,
            rhs,
        });
        Ok(())
    }

    /// Translates a unary or conversion instruction.
    fn translate_unary(&mut self, op: UnaryOp) -> Result<(), Error> {
        bail_unreachable!(self);
        let value = self.pop()?;
        let result = self.push_temp()?;
        self.emit(Instruction::Unary { op, result, value });
        Ok(())
    }

    /// Translates a load from the default linear memory.
    fn translate_load(&mut self, op: LoadOp, memarg: MemArg, max_align: u8) -> Result<(), Error> {
        bail_unreachable!(self);
        if memarg.align > max_align {
            return Err(TranslationError::InvalidAlignment {
                align: memarg.align,
            }
            .into());
        }
        let ptr = self.pop()?;
        let result = self.push_temp()?;
        self.emit(Instruction::Load {
            op,
            result,
            ptr,
            align_hint: memarg.align,
            offset: memarg.offset,
        });
        Ok(())
    }

    /// Translates a store to the default linear memory.
    fn translate_store(&mut self, op: StoreOp, memarg: MemArg, max_align: u8) -> Result<(), Error> {
        bail_unreachable!(self);
        if memarg.align > max_align {
            return Err(TranslationError::InvalidAlignment {
                align: memarg.align,
            }
            .into());
        }
        let value = self.pop()?;
        let ptr = self.pop()?;
        self.emit(Instruction::Store {
            op,
            ptr,
            value,
            align_hint: memarg.align,
            offset: memarg.offset,
        });
        Ok(())
    }

    /// Emits the taken path of a branch to the control frame at `index`:
    /// the operand copies followed by the jump, or the return sequence for
    /// the function frame.
    fn translate_branch_taken(&mut self, index: usize) -> Result<(), Error> {
        if index == 0 {
            return self.emit_return();
        }
        let frame = &self.control[index];
        let (target_height, arity, label) = (frame.height, frame.branch_arity(), frame.label);
        self.control[index].branched_to = true;
        self.emit_branch_operand_copies(target_height, arity)?;
        self.labels
            .branch_to(label, &mut self.instrs, |offset| Instruction::Branch {
                offset,
            })?;
        Ok(())
    }
}

impl<'a> VisitOperator<'a> for FuncTranslator {
    type Output = Result<(), Error>;

    wasmparser::for_each_visit_operator!(impl_visit_operator);

    fn visit_unreachable(&mut self) -> Self::Output {
        bail_unreachable!(self);
        self.emit(Instruction::Trap {
            trap_code: TrapCode::Unreachable,
        });
        self.reachable = false;
        Ok(())
    }

    fn visit_nop(&mut self) -> Self::Output {
        Ok(())
    }

    fn visit_block(&mut self, block_ty: wasmparser::BlockType) -> Self::Output {
        let label = self.labels.new_label();
        if !self.reachable {
            self.control
                .push(ControlFrame::unreachable(ControlFrameKind::Block, label));
            return Ok(());
        }
        let (len_params, len_results) = self.module.block_type_arity(block_ty);
        let height = self.stack.len() - len_params;
        self.control.push(ControlFrame {
            kind: ControlFrameKind::Block,
            len_params: len_params as u16,
            len_results: len_results as u16,
            height,
            label,
            branched_to: false,
            is_unreachable: false,
        });
        Ok(())
    }

    fn visit_loop(&mut self, block_ty: wasmparser::BlockType) -> Self::Output {
        let label = self.labels.new_label();
        if !self.reachable {
            self.control
                .push(ControlFrame::unreachable(ControlFrameKind::Loop, label));
            return Ok(());
        }
        let (len_params, len_results) = self.module.block_type_arity(block_ty);
        let height = self.stack.len() - len_params;
        // Move the loop parameters into their canonical slots so that
        // back-edges always copy to the same registers.
        for i in 0..len_params {
            let slot = self.slot(height + i)?;
            let current = self.stack[height + i];
            if current != slot {
                self.emit(Instruction::Copy {
                    result: slot,
                    value: current,
                });
                self.stack[height + i] = slot;
            }
            self.bump_high_water(slot.index() + 1);
        }
        self.labels.pin_label(label, &mut self.instrs)?;
        self.control.push(ControlFrame {
            kind: ControlFrameKind::Loop,
            len_params: len_params as u16,
            len_results: len_results as u16,
            height,
            label,
            branched_to: false,
            is_unreachable: false,
        });
        Ok(())
    }

    fn visit_if(&mut self, block_ty: wasmparser::BlockType) -> Self::Output {
        let label = self.labels.new_label();
        if !self.reachable {
            let else_label = self.labels.new_label();
            self.control.push(ControlFrame::unreachable(
                ControlFrameKind::If(IfState {
                    else_label,
                    else_operands: Box::default(),
                    visited_else: false,
                    then_end_reachable: false,
                }),
                label,
            ));
            return Ok(());
        }
        let (len_params, len_results) = self.module.block_type_arity(block_ty);
        let condition = self.pop()?;
        let height = self.stack.len() - len_params;
        let else_operands = Box::from(&self.stack[height..]);
        let else_label = self.labels.new_label();
        self.labels
            .branch_to(else_label, &mut self.instrs, |offset| {
                Instruction::BranchEqz { condition, offset }
            })?;
        self.control.push(ControlFrame {
            kind: ControlFrameKind::If(IfState {
                else_label,
                else_operands,
                visited_else: false,
                then_end_reachable: false,
            }),
            len_params: len_params as u16,
            len_results: len_results as u16,
            height,
            label,
            branched_to: false,
            is_unreachable: false,
        });
        Ok(())
    }

    fn visit_else(&mut self) -> Self::Output {
        let then_reachable = self.reachable;
        let Some(frame) = self.control.last_mut() else {
            return Err(TranslationError::MalformedExpression.into());
        };
        if frame.is_unreachable {
            return Ok(());
        }
        let height = frame.height;
        let len_results = usize::from(frame.len_results);
        let end_label = frame.label;
        let ControlFrameKind::If(if_state) = &mut frame.kind else {
            return Err(TranslationError::MalformedExpression.into());
        };
        if_state.visited_else = true;
        if_state.then_end_reachable = then_reachable;
        let else_label = if_state.else_label;
        let else_operands = if_state.else_operands.clone();
        if then_reachable {
            self.emit_branch_operand_copies(height, len_results)?;
            self.labels
                .branch_to(end_label, &mut self.instrs, |offset| Instruction::Branch {
                    offset,
                })?;
        }
        self.labels.pin_label(else_label, &mut self.instrs)?;
        self.stack.truncate(height);
        self.stack.extend(else_operands.iter().copied());
        self.reachable = true;
        Ok(())
    }

    fn visit_end(&mut self) -> Self::Output {
        let Some(frame) = self.control.pop() else {
            return Err(TranslationError::MalformedExpression.into());
        };
        if self.control.is_empty() {
            // The end of the function body itself.
            if !frame.is_unreachable && self.reachable {
                self.emit_return()?;
            }
            return Ok(());
        }
        if frame.is_unreachable {
            return Ok(());
        }
        let height = frame.height;
        let len_results = usize::from(frame.len_results);
        match frame.kind {
            ControlFrameKind::Block => {
                let fallthrough = self.reachable;
                if fallthrough {
                    self.emit_branch_operand_copies(height, len_results)?;
                }
                self.labels.pin_label(frame.label, &mut self.instrs)?;
                self.finish_frame_operands(height, len_results)?;
                self.reachable = fallthrough || frame.branched_to;
            }
            ControlFrameKind::Loop => {
                // The loop label was pinned at the loop header; back-edges
                // cannot make the end reachable.
                let fallthrough = self.reachable;
                if fallthrough {
                    self.emit_branch_operand_copies(height, len_results)?;
                }
                self.finish_frame_operands(height, len_results)?;
                self.reachable = fallthrough;
            }
            ControlFrameKind::If(if_state) => {
                if if_state.visited_else {
                    let else_fallthrough = self.reachable;
                    if else_fallthrough {
                        self.emit_branch_operand_copies(height, len_results)?;
                    }
                    self.labels.pin_label(frame.label, &mut self.instrs)?;
                    self.finish_frame_operands(height, len_results)?;
                    self.reachable = else_fallthrough
                        || if_state.then_end_reachable
                        || frame.branched_to;
                } else {
                    // An `if` without `else`: synthesize the else arm from
                    // the saved parameter operands. Validation guarantees
                    // that parameters and results agree here.
                    let then_fallthrough = self.reachable;
                    if then_fallthrough {
                        self.emit_branch_operand_copies(height, len_results)?;
                        self.labels
                            .branch_to(frame.label, &mut self.instrs, |offset| {
                                Instruction::Branch { offset }
                            })?;
                    }
                    self.labels.pin_label(if_state.else_label, &mut self.instrs)?;
                    for (i, operand) in if_state.else_operands.iter().enumerate() {
                        let slot = self.slot(height + i)?;
                        self.bump_high_water(slot.index() + 1);
                        self.emit_copy(slot, *operand);
                    }
                    self.labels.pin_label(frame.label, &mut self.instrs)?;
                    self.finish_frame_operands(height, len_results)?;
                    self.reachable = true;
                }
            }
        }
        Ok(())
    }

    fn visit_br(&mut self, relative_depth: u32) -> Self::Output {
        bail_unreachable!(self);
        let index = self.frame_at_depth(relative_depth)?;
        self.translate_branch_taken(index)?;
        self.reachable = false;
        Ok(())
    }

    fn visit_br_if(&mut self, relative_depth: u32) -> Self::Output {
        bail_unreachable!(self);
        let condition = self.pop()?;
        let index = self.frame_at_depth(relative_depth)?;
        if index != 0 && !self.branch_needs_copies(index)? {
            let label = self.control[index].label;
            self.control[index].branched_to = true;
            self.labels
                .branch_to(label, &mut self.instrs, |offset| Instruction::BranchNez {
                    condition,
                    offset,
                })?;
            return Ok(());
        }
        // The taken path needs operand copies (or is a return): skip it
        // when the condition is zero.
        let skip = self.labels.new_label();
        self.labels.branch_to(skip, &mut self.instrs, |offset| {
            Instruction::BranchEqz { condition, offset }
        })?;
        self.translate_branch_taken(index)?;
        self.labels.pin_label(skip, &mut self.instrs)?;
        Ok(())
    }

    fn visit_br_table(&mut self, targets: wasmparser::BrTable<'a>) -> Self::Output {
        bail_unreachable!(self);
        let index = self.pop()?;
        let mut depths = targets
            .targets()
            .collect::<Result<Vec<_>, _>>()?;
        depths.push(targets.default());
        self.emit(Instruction::BranchTable {
            index,
            len_targets: depths.len() as u32,
        });
        let entries = depths
            .iter()
            .map(|_| {
                self.instrs.push(Instruction::Branch {
                    offset: crate::ir::BranchOffset::uninit(),
                })
            })
            .collect::<Vec<_>>();
        // Emit one stub per target performing the operand copies before
        // jumping to the target label; entries without copies branch to
        // the label directly.
        for (entry, depth) in entries.into_iter().zip(depths) {
            let frame_index = self.frame_at_depth(depth)?;
            if frame_index != 0 && !self.branch_needs_copies(frame_index)? {
                let label = self.control[frame_index].label;
                self.control[frame_index].branched_to = true;
                self.labels.register_user(label, entry, &mut self.instrs)?;
                continue;
            }
            let stub = self.instrs.next_instr();
            self.instrs.patch_branch(entry, stub)?;
            self.translate_branch_taken(frame_index)?;
        }
        self.reachable = false;
        Ok(())
    }

    fn visit_return(&mut self) -> Self::Output {
        bail_unreachable!(self);
        self.emit_return()?;
        self.reachable = false;
        Ok(())
    }

    fn visit_call(&mut self, function_index: u32) -> Self::Output {
        bail_unreachable!(self);
        let func_type = self.module.type_of_func(function_index).clone();
        self.translate_call(
            func_type.len_params(),
            func_type.len_results(),
            |this, sp_addend| {
                this.emit(Instruction::Call {
                    func: index::Func::from(function_index),
                    sp_addend,
                });
            },
        )
    }

    fn visit_call_indirect(&mut self, type_index: u32, table_index: u32) -> Self::Output {
        bail_unreachable!(self);
        let index = self.pop()?;
        let expected_sig = self.sig_of_type(type_index);
        let func_type = self.module.inner.func_types[type_index as usize].clone();
        self.translate_call(
            func_type.len_params(),
            func_type.len_results(),
            |this, sp_addend| {
                this.emit(Instruction::CallIndirect {
                    table: index::Table::from(table_index),
                    expected_sig,
                    index,
                    sp_addend,
                });
            },
        )
    }

    fn visit_drop(&mut self) -> Self::Output {
        bail_unreachable!(self);
        self.pop()?;
        Ok(())
    }

    fn visit_select(&mut self) -> Self::Output {
        bail_unreachable!(self);
        let condition = self.pop()?;
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        let result = self.push_temp()?;
        self.emit(Instruction::Select {
            result,
            condition,
            lhs,
            rhs,
        });
        Ok(())
    }

    fn visit_typed_select(&mut self, _ty: wasmparser::ValType) -> Self::Output {
        self.visit_select()
    }

    fn visit_local_get(&mut self, local_index: u32) -> Self::Output {
        bail_unreachable!(self);
        // Move elision: the local's register itself represents the pushed
        // operand until a write to the local aliases it.
        let local = self.local_reg(local_index)?;
        self.push_reg(local);
        Ok(())
    }

    fn visit_local_set(&mut self, local_index: u32) -> Self::Output {
        bail_unreachable!(self);
        let local = self.local_reg(local_index)?;
        let value = self.pop()?;
        self.preserve_local(local)?;
        self.emit_copy(local, value);
        Ok(())
    }

    fn visit_local_tee(&mut self, local_index: u32) -> Self::Output {
        bail_unreachable!(self);
        let local = self.local_reg(local_index)?;
        self.preserve_local(local)?;
        let value = *self
            .stack
            .last()
            .ok_or(TranslationError::MalformedExpression)?;
        self.emit_copy(local, value);
        Ok(())
    }

    fn visit_global_get(&mut self, global_index: u32) -> Self::Output {
        bail_unreachable!(self);
        let result = self.push_temp()?;
        match global_index {
            0 => self.emit(Instruction::GlobalGetZero { result }),
            _ => self.emit(Instruction::GlobalGet {
                result,
                global: index::Global::from(global_index),
            }),
        }
        Ok(())
    }

    fn visit_global_set(&mut self, global_index: u32) -> Self::Output {
        bail_unreachable!(self);
        let value = self.pop()?;
        match global_index {
            0 => self.emit(Instruction::GlobalSetZero { value }),
            _ => self.emit(Instruction::GlobalSet {
                global: index::Global::from(global_index),
                value,
            }),
        }
        Ok(())
    }

    fn visit_i32_const(&mut self, value: i32) -> Self::Output {
        bail_unreachable!(self);
        self.translate_const(UntypedVal::from(value))
    }

    fn visit_i64_const(&mut self, value: i64) -> Self::Output {
        bail_unreachable!(self);
        self.translate_const(UntypedVal::from(value))
    }

    fn visit_f32_const(&mut self, value: wasmparser::Ieee32) -> Self::Output {
        bail_unreachable!(self);
        self.translate_const(UntypedVal::from(f32::from_bits(value.bits())))
    }

    fn visit_f64_const(&mut self, value: wasmparser::Ieee64) -> Self::Output {
        bail_unreachable!(self);
        self.translate_const(UntypedVal::from(f64::from_bits(value.bits())))
    }

    fn visit_memory_size(&mut self, _mem: u32) -> Self::Output {
        bail_unreachable!(self);
        let result = self.push_temp()?;
        self.emit(Instruction::MemorySize { result });
        Ok(())
    }

    fn visit_memory_grow(&mut self, _mem: u32) -> Self::Output {
        bail_unreachable!(self);
        let delta = self.pop()?;
        let result = self.push_temp()?;
        self.emit(Instruction::MemoryGrow { result, delta });
        Ok(())
    }

    fn visit_memory_copy(&mut self, _dst_mem: u32, _src_mem: u32) -> Self::Output {
        bail_unreachable!(self);
        let len = self.pop()?;
        let src = self.pop()?;
        let dst = self.pop()?;
        self.emit(Instruction::MemoryCopy { dst, src, len });
        Ok(())
    }

    fn visit_memory_fill(&mut self, _mem: u32) -> Self::Output {
        bail_unreachable!(self);
        let len = self.pop()?;
        let value = self.pop()?;
        let dst = self.pop()?;
        self.emit(Instruction::MemoryFill { dst, value, len });
        Ok(())
    }

    fn visit_memory_init(&mut self, data_index: u32, _mem: u32) -> Self::Output {
        bail_unreachable!(self);
        let len = self.pop()?;
        let src = self.pop()?;
        let dst = self.pop()?;
        self.emit(Instruction::MemoryInit {
            data: index::Data::from(data_index),
            dst,
            src,
            len,
        });
        Ok(())
    }

    fn visit_data_drop(&mut self, data_index: u32) -> Self::Output {
        bail_unreachable!(self);
        self.emit(Instruction::DataDrop {
            data: index::Data::from(data_index),
        });
        Ok(())
    }

    fn visit_table_get(&mut self, table: u32) -> Self::Output {
        bail_unreachable!(self);
        let index = self.pop()?;
        let result = self.push_temp()?;
        self.emit(Instruction::TableGet {
            result,
            table: index::Table::from(table),
            index,
        });
        Ok(())
    }

    fn visit_table_set(&mut self, table: u32) -> Self::Output {
        bail_unreachable!(self);
        let value = self.pop()?;
        let index = self.pop()?;
        self.emit(Instruction::TableSet {
            table: index::Table::from(table),
            index,
            value,
        });
        Ok(())
    }

    fn visit_table_size(&mut self, table: u32) -> Self::Output {
        bail_unreachable!(self);
        let result = self.push_temp()?;
        self.emit(Instruction::TableSize {
            result,
            table: index::Table::from(table),
        });
        Ok(())
    }

    fn visit_table_grow(&mut self, table: u32) -> Self::Output {
        bail_unreachable!(self);
        let delta = self.pop()?;
        let init = self.pop()?;
        let result = self.push_temp()?;
        self.emit(Instruction::TableGrow {
            result,
            table: index::Table::from(table),
            delta,
            init,
        });
        Ok(())
    }

    fn visit_table_fill(&mut self, table: u32) -> Self::Output {
        bail_unreachable!(self);
        let len = self.pop()?;
        let value = self.pop()?;
        let dst = self.pop()?;
        self.emit(Instruction::TableFill {
            table: index::Table::from(table),
            dst,
            value,
            len,
        });
        Ok(())
    }

    fn visit_table_copy(&mut self, dst_table: u32, src_table: u32) -> Self::Output {
        bail_unreachable!(self);
        let len = self.pop()?;
        let src = self.pop()?;
        let dst = self.pop()?;
        self.emit(Instruction::TableCopy {
            dst_table: index::Table::from(dst_table),
            src_table: index::Table::from(src_table),
            dst,
            src,
            len,
        });
        Ok(())
    }

    fn visit_table_init(&mut self, elem_index: u32, table: u32) -> Self::Output {
        bail_unreachable!(self);
        let len = self.pop()?;
        let src = self.pop()?;
        let dst = self.pop()?;
        self.emit(Instruction::TableInit {
            table: index::Table::from(table),
            elem: index::Elem::from(elem_index),
            dst,
            src,
            len,
        });
        Ok(())
    }

    fn visit_elem_drop(&mut self, elem_index: u32) -> Self::Output {
        bail_unreachable!(self);
        self.emit(Instruction::ElemDrop {
            elem: index::Elem::from(elem_index),
        });
        Ok(())
    }

    fn visit_ref_null(&mut self, _hty: wasmparser::HeapType) -> Self::Output {
        bail_unreachable!(self);
        // Null references are the zero bit pattern, distinct from any
        // valid entity address.
        self.translate_const(UntypedVal::from_bits(0))
    }

    fn visit_ref_is_null(&mut self) -> Self::Output {
        // A reference is null exactly if all of its 64 bits are zero.
        self.translate_unary(UnaryOp::I64Eqz)
    }

    fn visit_ref_func(&mut self, function_index: u32) -> Self::Output {
        bail_unreachable!(self);
        let result = self.push_temp()?;
        self.emit(Instruction::RefFunc {
            result,
            func: index::Func::from(function_index),
        });
        Ok(())
    }

    impl_visit_binary! {
        fn visit_i32_add => I32Add;
        fn visit_i32_sub => I32Sub;
        fn visit_i32_mul => I32Mul;
        fn visit_i32_div_s => I32DivS;
        fn visit_i32_div_u => I32DivU;
        fn visit_i32_rem_s => I32RemS;
        fn visit_i32_rem_u => I32RemU;
        fn visit_i32_and => I32And;
        fn visit_i32_or => I32Or;
        fn visit_i32_xor => I32Xor;
        fn visit_i32_shl => I32Shl;
        fn visit_i32_shr_s => I32ShrS;
        fn visit_i32_shr_u => I32ShrU;
        fn visit_i32_rotl => I32Rotl;
        fn visit_i32_rotr => I32Rotr;
        fn visit_i64_add => I64Add;
        fn visit_i64_sub => I64Sub;
        fn visit_i64_mul => I64Mul;
        fn visit_i64_div_s => I64DivS;
        fn visit_i64_div_u => I64DivU;
        fn visit_i64_rem_s => I64RemS;
        fn visit_i64_rem_u => I64RemU;
        fn visit_i64_and => I64And;
        fn visit_i64_or => I64Or;
        fn visit_i64_xor => I64Xor;
        fn visit_i64_shl => I64Shl;
        fn visit_i64_shr_s => I64ShrS;
        fn visit_i64_shr_u => I64ShrU;
        fn visit_i64_rotl => I64Rotl;
        fn visit_i64_rotr => I64Rotr;
        fn visit_i32_eq => I32Eq;
        fn visit_i32_ne => I32Ne;
        fn visit_i32_lt_s => I32LtS;
        fn visit_i32_lt_u => I32LtU;
        fn visit_i32_gt_s => I32GtS;
        fn visit_i32_gt_u => I32GtU;
        fn visit_i32_le_s => I32LeS;
        fn visit_i32_le_u => I32LeU;
        fn visit_i32_ge_s => I32GeS;
        fn visit_i32_ge_u => I32GeU;
        fn visit_i64_eq => I64Eq;
        fn visit_i64_ne => I64Ne;
        fn visit_i64_lt_s => I64LtS;
        fn visit_i64_lt_u => I64LtU;
        fn visit_i64_gt_s => I64GtS;
        fn visit_i64_gt_u => I64GtU;
        fn visit_i64_le_s => I64LeS;
        fn visit_i64_le_u => I64LeU;
        fn visit_i64_ge_s => I64GeS;
        fn visit_i64_ge_u => I64GeU;
        fn visit_f32_eq => F32Eq;
        fn visit_f32_ne => F32Ne;
        fn visit_f32_lt => F32Lt;
        fn visit_f32_gt => F32Gt;
        fn visit_f32_le => F32Le;
        fn visit_f32_ge => F32Ge;
        fn visit_f64_eq => F64Eq;
        fn visit_f64_ne => F64Ne;
        fn visit_f64_lt => F64Lt;
        fn visit_f64_gt => F64Gt;
        fn visit_f64_le => F64Le;
        fn visit_f64_ge => F64Ge;
        fn visit_f32_add => F32Add;
        fn visit_f32_sub => F32Sub;
        fn visit_f32_mul => F32Mul;
        fn visit_f32_div => F32Div;
        fn visit_f32_min => F32Min;
        fn visit_f32_max => F32Max;
        fn visit_f32_copysign => F32Copysign;
        fn visit_f64_add => F64Add;
        fn visit_f64_sub => F64Sub;
        fn visit_f64_mul => F64Mul;
        fn visit_f64_div => F64Div;
        fn visit_f64_min => F64Min;
        fn visit_f64_max => F64Max;
        fn visit_f64_copysign => F64Copysign;
    }

    impl_visit_unary! {
        fn visit_i32_eqz => I32Eqz;
        fn visit_i64_eqz => I64Eqz;
        fn visit_i32_clz => I32Clz;
        fn visit_i32_ctz => I32Ctz;
        fn visit_i32_popcnt => I32Popcnt;
        fn visit_i64_clz => I64Clz;
        fn visit_i64_ctz => I64Ctz;
        fn visit_i64_popcnt => I64Popcnt;
        fn visit_f32_abs => F32Abs;
        fn visit_f32_neg => F32Neg;
        fn visit_f32_ceil => F32Ceil;
        fn visit_f32_floor => F32Floor;
        fn visit_f32_trunc => F32Trunc;
        fn visit_f32_nearest => F32Nearest;
        fn visit_f32_sqrt => F32Sqrt;
        fn visit_f64_abs => F64Abs;
        fn visit_f64_neg => F64Neg;
        fn visit_f64_ceil => F64Ceil;
        fn visit_f64_floor => F64Floor;
        fn visit_f64_trunc => F64Trunc;
        fn visit_f64_nearest => F64Nearest;
        fn visit_f64_sqrt => F64Sqrt;
        fn visit_i32_wrap_i64 => I32WrapI64;
        fn visit_i64_extend_i32_s => I64ExtendI32S;
        fn visit_i64_extend_i32_u => I64ExtendI32U;
        fn visit_f32_demote_f64 => F32DemoteF64;
        fn visit_f64_promote_f32 => F64PromoteF32;
        fn visit_i32_trunc_f32_s => I32TruncF32S;
        fn visit_i32_trunc_f32_u => I32TruncF32U;
        fn visit_i32_trunc_f64_s => I32TruncF64S;
        fn visit_i32_trunc_f64_u => I32TruncF64U;
        fn visit_i64_trunc_f32_s => I64TruncF32S;
        fn visit_i64_trunc_f32_u => I64TruncF32U;
        fn visit_i64_trunc_f64_s => I64TruncF64S;
        fn visit_i64_trunc_f64_u => I64TruncF64U;
        fn visit_i32_trunc_sat_f32_s => I32TruncSatF32S;
        fn visit_i32_trunc_sat_f32_u => I32TruncSatF32U;
        fn visit_i32_trunc_sat_f64_s => I32TruncSatF64S;
        fn visit_i32_trunc_sat_f64_u => I32TruncSatF64U;
        fn visit_i64_trunc_sat_f32_s => I64TruncSatF32S;
        fn visit_i64_trunc_sat_f32_u => I64TruncSatF32U;
        fn visit_i64_trunc_sat_f64_s => I64TruncSatF64S;
        fn visit_i64_trunc_sat_f64_u => I64TruncSatF64U;
        fn visit_f32_convert_i32_s => F32ConvertI32S;
        fn visit_f32_convert_i32_u => F32ConvertI32U;
        fn visit_f32_convert_i64_s => F32ConvertI64S;
        fn visit_f32_convert_i64_u => F32ConvertI64U;
        fn visit_f64_convert_i32_s => F64ConvertI32S;
        fn visit_f64_convert_i32_u => F64ConvertI32U;
        fn visit_f64_convert_i64_s => F64ConvertI64S;
        fn visit_f64_convert_i64_u => F64ConvertI64U;
        fn visit_i32_reinterpret_f32 => I32ReinterpretF32;
        fn visit_i64_reinterpret_f64 => I64ReinterpretF64;
        fn visit_f32_reinterpret_i32 => F32ReinterpretI32;
        fn visit_f64_reinterpret_i64 => F64ReinterpretI64;
        fn visit_i32_extend8_s => I32Extend8S;
        fn visit_i32_extend16_s => I32Extend16S;
        fn visit_i64_extend8_s => I64Extend8S;
        fn visit_i64_extend16_s => I64Extend16S;
        fn visit_i64_extend32_s => I64Extend32S;
    }

    impl_visit_load! {
        fn visit_i32_load => Load32, align: 2;
        fn visit_i64_load => Load64, align: 3;
        fn visit_f32_load => Load32, align: 2;
        fn visit_f64_load => Load64, align: 3;
        fn visit_i32_load8_s => I32Load8S, align: 0;
        fn visit_i32_load8_u => I32Load8U, align: 0;
        fn visit_i32_load16_s => I32Load16S, align: 1;
        fn visit_i32_load16_u => I32Load16U, align: 1;
        fn visit_i64_load8_s => I64Load8S, align: 0;
        fn visit_i64_load8_u => I64Load8U, align: 0;
        fn visit_i64_load16_s => I64Load16S, align: 1;
        fn visit_i64_load16_u => I64Load16U, align: 1;
        fn visit_i64_load32_s => I64Load32S, align: 2;
        fn visit_i64_load32_u => I64Load32U, align: 2;
    }

    impl_visit_store! {
        fn visit_i32_store => Store32, align: 2;
        fn visit_i64_store => Store64, align: 3;
        fn visit_f32_store => Store32, align: 2;
        fn visit_f64_store => Store64, align: 3;
        fn visit_i32_store8 => I32Store8, align: 0;
        fn visit_i32_store16 => I32Store16, align: 1;
        fn visit_i64_store8 => I64Store8, align: 0;
        fn visit_i64_store16 => I64Store16, align: 1;
        fn visit_i64_store32 => I64Store32, align: 2;
    }
}
