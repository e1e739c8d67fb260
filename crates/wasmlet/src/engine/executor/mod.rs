//! The direct-threaded execution loop of the register machine.

mod cache;
mod ops;
mod stack;

use self::{
    cache::CachedInstance,
    stack::{FrameHeader, FrameRegisters, StackContext},
};
use crate::{
    engine::FRAME_HEADER_LEN,
    func::{Caller, Func, FuncEntity, FuncError, InternalFunc},
    ir::{index, BranchOffset, Instruction, Reg},
    store::{EntityHandle, Store},
    DataSegmentEntity, ElementSegmentEntity, Error, FuncType, GlobalEntity, Instance, TableEntity,
    Trap, TrapCode, Val,
};
use wasmlet_core::UntypedVal;

/// The sentinel instruction outside of every function body.
///
/// It is installed as the return target of root frames: when the root
/// frame unwinds, the restored program counter lands on the sentinel and
/// the dispatch loop terminates.
static END_OF_EXECUTION: Instruction = Instruction::EndOfExecution;

/// Executes `func` with the given arguments and returns its results.
///
/// Every invocation allocates a fresh [`StackContext`], so host functions
/// may re-enter other exports of the same store with an independent
/// execution state.
///
/// # Errors
///
/// - If the argument values do not match the function's parameter types.
/// - If execution traps.
pub(crate) fn execute_func(store: &mut Store, func: Func, args: &[Val]) -> Result<Vec<Val>, Error> {
    let ty = store.resolve_func_type(func.sig()).clone();
    check_args(&ty, args)?;
    match func.as_internal().entity() {
        FuncEntity::Host(handle) => {
            let entity = handle.get();
            let mut results = ty
                .results()
                .iter()
                .map(|ty| Val::default(*ty))
                .collect::<Vec<_>>();
            (entity.callable)(Caller::new(store, None), args, &mut results)?;
            check_results(&ty, &results)?;
            Ok(results)
        }
        FuncEntity::Wasm(handle) => {
            let entity = handle.get();
            let compiled = entity.code.get_or_compile(store.code())?;
            let instance = entity.instance;
            let mut stack = StackContext::new(store.stack_limit());
            stack.push_frame(
                FRAME_HEADER_LEN,
                &compiled,
                FrameHeader {
                    return_pc: &END_OF_EXECUTION,
                    prev_base: FRAME_HEADER_LEN,
                    func: func.as_internal(),
                    caller_instance: instance,
                },
            )?;
            for (i, arg) in args.iter().enumerate() {
                stack.set_abs(FRAME_HEADER_LEN + i, arg.to_untyped());
            }
            Executor::new(&mut stack, compiled.iseq.as_ptr(), instance).execute(store)?;
            let results = ty
                .results()
                .iter()
                .enumerate()
                .map(|(i, ty)| Val::from_untyped(stack.get_abs(FRAME_HEADER_LEN + i), *ty))
                .collect();
            Ok(results)
        }
    }
}

/// Checks the argument values element-wise against the parameter types.
fn check_args(ty: &FuncType, args: &[Val]) -> Result<(), Error> {
    let expected = ty.params();
    let matches = args.len() == expected.len()
        && args.iter().zip(expected).all(|(arg, ty)| arg.ty() == *ty);
    if !matches {
        let error = FuncError::MismatchingParameters {
            expected: expected.to_vec(),
            actual: args.iter().map(Val::ty).collect(),
        };
        return Err(Trap::new(error.to_string()).into());
    }
    Ok(())
}

/// Checks the values returned by a host function element-wise against the
/// result types.
fn check_results(ty: &FuncType, results: &[Val]) -> Result<(), Error> {
    let expected = ty.results();
    let matches = results.len() == expected.len()
        && results.iter().zip(expected).all(|(res, ty)| res.ty() == *ty);
    if !matches {
        let error = FuncError::MismatchingResults {
            expected: expected.to_vec(),
            actual: results.iter().map(Val::ty).collect(),
        };
        return Err(Trap::new(error.to_string()).into());
    }
    Ok(())
}

/// The execution context of one invocation.
///
/// The four hottest pieces of state live in the struct fields so that the
/// dispatch loop keeps them register-bound: the program counter, the frame
/// base pointer and, inside [`CachedInstance`], the default memory base
/// and size.
#[derive(Debug)]
struct Executor<'engine> {
    /// Pointer to the currently executed instruction.
    pc: *const Instruction,
    /// The register file view of the current frame.
    sp: FrameRegisters,
    /// The cached hot state of the current frame's instance.
    cache: CachedInstance,
    /// The register-file stack of the invocation.
    stack: &'engine mut StackContext,
}

impl<'engine> Executor<'engine> {
    /// Creates a new [`Executor`] with the root frame already pushed.
    fn new(stack: &'engine mut StackContext, pc: *const Instruction, instance: Instance) -> Self {
        let sp = stack.frame_registers();
        Self {
            pc,
            sp,
            cache: CachedInstance::new(instance),
            stack,
        }
    }

    /// Reads the currently executed instruction.
    #[inline]
    fn instr(&self) -> Instruction {
        // Safety: the program counter always points into a live
        //         instruction sequence or at the sentinel.
        unsafe { *self.pc }
    }

    /// Advances the program counter to the next instruction.
    #[inline]
    fn next_instr(&mut self) {
        // Safety: translated sequences never fall off their end: every
        //         path ends in a return, trap or branch.
        self.pc = unsafe { self.pc.add(1) };
    }

    /// Branches relative to the current instruction.
    #[inline]
    fn branch_to(&mut self, offset: BranchOffset) {
        // Safety: branch offsets only ever target instructions of the
        //         same sequence.
        self.pc = unsafe { self.pc.offset(offset.to_isize()) };
    }

    /// Executes instructions until the root frame returns or a trap
    /// aborts the invocation.
    fn execute(&mut self, store: &mut Store) -> Result<(), Error> {
        use Instruction as Instr;
        loop {
            match self.instr() {
                Instr::Trap { trap_code } => return Err(trap_code.into()),
                Instr::EndOfExecution => return Ok(()),
                Instr::Return => self.execute_return(),
                Instr::Branch { offset } => self.branch_to(offset),
                Instr::BranchEqz { condition, offset } => {
                    match u64::from(self.sp.get(condition)) == 0 {
                        true => self.branch_to(offset),
                        false => self.next_instr(),
                    }
                }
                Instr::BranchNez { condition, offset } => {
                    match u64::from(self.sp.get(condition)) != 0 {
                        true => self.branch_to(offset),
                        false => self.next_instr(),
                    }
                }
                Instr::BranchTable { index, len_targets } => {
                    let chosen = u32::from(self.sp.get(index)).min(len_targets - 1);
                    // Jump onto the selected branch entry following this
                    // instruction; it executes in the next iteration.
                    self.pc = unsafe { self.pc.add(1 + chosen as usize) };
                }
                Instr::Copy { result, value } => {
                    let value = self.sp.get(value);
                    self.sp.set(result, value);
                    self.next_instr();
                }
                Instr::Const { result, value } => {
                    self.sp.set(result, value);
                    self.next_instr();
                }
                Instr::Select {
                    result,
                    condition,
                    lhs,
                    rhs,
                } => {
                    let chosen = match u64::from(self.sp.get(condition)) != 0 {
                        true => self.sp.get(lhs),
                        false => self.sp.get(rhs),
                    };
                    self.sp.set(result, chosen);
                    self.next_instr();
                }
                Instr::Binary {
                    op,
                    result,
                    lhs,
                    rhs,
                } => {
                    let value = ops::eval_binary(op, self.sp.get(lhs), self.sp.get(rhs))?;
                    self.sp.set(result, value);
                    self.next_instr();
                }
                Instr::Unary { op, result, value } => {
                    let value = ops::eval_unary(op, self.sp.get(value))?;
                    self.sp.set(result, value);
                    self.next_instr();
                }
                Instr::Call { func, sp_addend } => self.execute_call(store, func, sp_addend)?,
                Instr::CallIndirect {
                    table,
                    expected_sig,
                    index,
                    sp_addend,
                } => self.execute_call_indirect(store, table, expected_sig, index, sp_addend)?,
                Instr::GlobalGet { result, global } => {
                    let handle = self.global_handle(global);
                    self.sp.set(result, handle.get().get());
                    self.next_instr();
                }
                Instr::GlobalSet { global, value } => {
                    let value = self.sp.get(value);
                    let mut handle = self.global_handle(global);
                    handle.get_mut().set(value);
                    self.next_instr();
                }
                Instr::GlobalGetZero { result } => {
                    let value = self.cache.global0();
                    self.sp.set(result, value);
                    self.next_instr();
                }
                Instr::GlobalSetZero { value } => {
                    let value = self.sp.get(value);
                    self.cache.set_global0(value);
                    self.next_instr();
                }
                Instr::Load {
                    op,
                    result,
                    ptr,
                    offset,
                    ..
                } => {
                    let ptr = u64::from(u32::from(self.sp.get(ptr)));
                    let value = ops::eval_load(op, self.cache.memory_slice(), ptr, offset)?;
                    self.sp.set(result, value);
                    self.next_instr();
                }
                Instr::Store {
                    op,
                    ptr,
                    value,
                    offset,
                    ..
                } => {
                    let ptr = u64::from(u32::from(self.sp.get(ptr)));
                    let value = self.sp.get(value);
                    ops::eval_store(op, self.cache.memory_slice_mut(), ptr, offset, value)?;
                    self.next_instr();
                }
                Instr::MemorySize { result } => {
                    let size = match self.cache.memory_handle() {
                        Some(memory) => memory.get().size(),
                        None => 0,
                    };
                    self.sp.set(result, UntypedVal::from(size));
                    self.next_instr();
                }
                Instr::MemoryGrow { result, delta } => {
                    let delta = u32::from(self.sp.get(delta));
                    let previous = match self.cache.memory_handle() {
                        Some(mut memory) => memory
                            .get_mut()
                            .grow(delta, store.limiter_mut())
                            .map_or(-1_i32, |previous| previous as i32),
                        None => -1,
                    };
                    self.cache.refresh_memory();
                    self.sp.set(result, UntypedVal::from(previous));
                    self.next_instr();
                }
                Instr::MemoryCopy { dst, src, len } => {
                    let dst = u32::from(self.sp.get(dst)) as usize;
                    let src = u32::from(self.sp.get(src)) as usize;
                    let len = u32::from(self.sp.get(len)) as usize;
                    let mem = self.cache.memory_slice_mut();
                    let len_mem = mem.len();
                    let dst_end = dst.checked_add(len).filter(|end| *end <= len_mem);
                    let src_end = src.checked_add(len).filter(|end| *end <= len_mem);
                    if dst_end.is_none() || src_end.is_none() {
                        return Err(TrapCode::OutOfBoundsMemoryAccess.into());
                    }
                    mem.copy_within(src..src + len, dst);
                    self.next_instr();
                }
                Instr::MemoryFill { dst, value, len } => {
                    let dst = u32::from(self.sp.get(dst)) as usize;
                    let byte = u32::from(self.sp.get(value)) as u8;
                    let len = u32::from(self.sp.get(len)) as usize;
                    let mem = self.cache.memory_slice_mut();
                    let slice = dst
                        .checked_add(len)
                        .and_then(|end| mem.get_mut(dst..end))
                        .ok_or(TrapCode::OutOfBoundsMemoryAccess)?;
                    slice.fill(byte);
                    self.next_instr();
                }
                Instr::MemoryInit {
                    data,
                    dst,
                    src,
                    len,
                } => {
                    let dst = u32::from(self.sp.get(dst)) as usize;
                    let src = u32::from(self.sp.get(src)) as usize;
                    let len = u32::from(self.sp.get(len)) as usize;
                    let segment = self.data_segment(data);
                    let bytes = segment.get().bytes();
                    let src_slice = src
                        .checked_add(len)
                        .and_then(|end| bytes.get(src..end))
                        .ok_or(TrapCode::OutOfBoundsMemoryAccess)?;
                    let mem = self.cache.memory_slice_mut();
                    let dst_slice = dst
                        .checked_add(len)
                        .and_then(|end| mem.get_mut(dst..end))
                        .ok_or(TrapCode::OutOfBoundsMemoryAccess)?;
                    dst_slice.copy_from_slice(src_slice);
                    self.next_instr();
                }
                Instr::DataDrop { data } => {
                    self.data_segment(data).get_mut().drop_bytes();
                    self.next_instr();
                }
                Instr::TableGet {
                    result,
                    table,
                    index,
                } => {
                    let index = u32::from(self.sp.get(index));
                    let handle = self.table_handle(table);
                    let value = handle.get().get(index)?;
                    self.sp.set(result, value);
                    self.next_instr();
                }
                Instr::TableSet {
                    table,
                    index,
                    value,
                } => {
                    let index = u32::from(self.sp.get(index));
                    let value = self.sp.get(value);
                    let mut handle = self.table_handle(table);
                    handle.get_mut().set(index, value)?;
                    self.next_instr();
                }
                Instr::TableSize { result, table } => {
                    let handle = self.table_handle(table);
                    let size = handle.get().size();
                    self.sp.set(result, UntypedVal::from(size));
                    self.next_instr();
                }
                Instr::TableGrow {
                    result,
                    table,
                    delta,
                    init,
                } => {
                    let delta = u32::from(self.sp.get(delta));
                    let init = self.sp.get(init);
                    let mut handle = self.table_handle(table);
                    let previous = handle
                        .get_mut()
                        .grow(delta, init, store.limiter_mut())
                        .map_or(-1_i32, |previous| previous as i32);
                    self.sp.set(result, UntypedVal::from(previous));
                    self.next_instr();
                }
                Instr::TableFill {
                    table,
                    dst,
                    value,
                    len,
                } => {
                    let dst = u32::from(self.sp.get(dst));
                    let value = self.sp.get(value);
                    let len = u32::from(self.sp.get(len));
                    let mut handle = self.table_handle(table);
                    handle.get_mut().fill(dst, value, len)?;
                    self.next_instr();
                }
                Instr::TableCopy {
                    dst_table,
                    src_table,
                    dst,
                    src,
                    len,
                } => {
                    let dst = u32::from(self.sp.get(dst));
                    let src = u32::from(self.sp.get(src));
                    let len = u32::from(self.sp.get(len));
                    let mut dst_handle = self.table_handle(dst_table);
                    if dst_table == src_table {
                        dst_handle.get_mut().copy_within(dst, src, len)?;
                    } else {
                        // Distinct table indices resolve to distinct
                        // entities; the handles cannot alias.
                        let src_handle = self.table_handle(src_table);
                        let src_entity = src_handle.get();
                        let items = (src as usize)
                            .checked_add(len as usize)
                            .and_then(|end| src_entity.elements().get(src as usize..end))
                            .ok_or(TrapCode::OutOfBoundsTableAccess)?;
                        dst_handle.get_mut().init(dst, items, 0, len)?;
                    }
                    self.next_instr();
                }
                Instr::TableInit {
                    table,
                    elem,
                    dst,
                    src,
                    len,
                } => {
                    let dst = u32::from(self.sp.get(dst));
                    let src = u32::from(self.sp.get(src));
                    let len = u32::from(self.sp.get(len));
                    let segment = self.element_segment(elem);
                    let items = segment.get().items();
                    let src_slice = (src as usize)
                        .checked_add(len as usize)
                        .and_then(|end| items.get(src as usize..end))
                        .ok_or(TrapCode::OutOfBoundsTableAccess)?;
                    let mut handle = self.table_handle(table);
                    handle.get_mut().init(dst, src_slice, 0, len)?;
                    self.next_instr();
                }
                Instr::ElemDrop { elem } => {
                    self.element_segment(elem).get_mut().drop_items();
                    self.next_instr();
                }
                Instr::RefFunc { result, func } => {
                    let func = self
                        .cache
                        .instance
                        .entity()
                        .get_func(u32::from(func))
                        .ok_or(TrapCode::InvalidFunctionIndex)?;
                    let bits = func.as_internal().to_bits();
                    self.sp.set(result, UntypedVal::from_bits(bits));
                    self.next_instr();
                }
            }
        }
    }

    /// Executes a return from the current frame.
    ///
    /// Restores the program counter and frame base of the calling frame
    /// and refreshes the instance cache if the caller lives in a
    /// different instance. Returning from the root frame restores the
    /// sentinel program counter which terminates the loop.
    #[inline]
    fn execute_return(&mut self) {
        let (return_pc, caller_instance) = self.stack.pop_frame();
        self.pc = return_pc;
        self.sp = self.stack.frame_registers();
        if caller_instance != self.cache.instance {
            self.cache = CachedInstance::new(caller_instance);
        }
    }

    /// Executes a call to the function at `func` of the current
    /// instance's function space.
    fn execute_call(
        &mut self,
        store: &mut Store,
        func: index::Func,
        sp_addend: u32,
    ) -> Result<(), Error> {
        let func = self
            .cache
            .instance
            .entity()
            .get_func(u32::from(func))
            .ok_or(TrapCode::InvalidFunctionIndex)?;
        self.call_internal(store, func.as_internal(), sp_addend)
    }

    /// Executes an indirect call through `table`.
    fn execute_call_indirect(
        &mut self,
        store: &mut Store,
        table: index::Table,
        expected_sig: index::Sig,
        index: Reg,
        sp_addend: u32,
    ) -> Result<(), Error> {
        let index = u32::from(self.sp.get(index));
        let handle = self.table_handle(table);
        let element = handle
            .get()
            .get(index)
            .map_err(|_| TrapCode::UndefinedElement)?;
        let Some(internal) = InternalFunc::from_bits(element.to_bits()) else {
            return Err(TrapCode::UninitializedElement.into());
        };
        let actual_sig = match internal.entity() {
            FuncEntity::Wasm(handle) => handle.get().ty,
            FuncEntity::Host(handle) => handle.get().ty,
        };
        if actual_sig != expected_sig {
            return Err(TrapCode::IndirectCallTypeMismatch.into());
        }
        self.call_internal(store, internal, sp_addend)
    }

    /// Dispatches a call to a Wasm or host callee.
    fn call_internal(
        &mut self,
        store: &mut Store,
        callee: InternalFunc,
        sp_addend: u32,
    ) -> Result<(), Error> {
        match callee.entity() {
            FuncEntity::Wasm(handle) => {
                let entity = handle.get();
                // Lazily lower the callee on its first call; translation
                // failures surface as traps at the call site.
                let compiled = entity
                    .code
                    .get_or_compile(store.code())
                    .map_err(|error| Trap::new(error.to_string()))?;
                let base = self.stack.frame_base() + sp_addend as usize;
                let return_pc = unsafe { self.pc.add(1) };
                self.stack.push_frame(
                    base,
                    &compiled,
                    FrameHeader {
                        return_pc,
                        prev_base: self.stack.frame_base(),
                        func: callee,
                        caller_instance: self.cache.instance,
                    },
                )?;
                self.pc = compiled.iseq.as_ptr();
                self.sp = self.stack.frame_registers();
                if entity.instance != self.cache.instance {
                    self.cache = CachedInstance::new(entity.instance);
                }
                Ok(())
            }
            FuncEntity::Host(handle) => {
                let entity = handle.get();
                let ty = store.resolve_func_type(entity.ty).clone();
                let region = self.stack.frame_base() + sp_addend as usize;
                let args = ty
                    .params()
                    .iter()
                    .enumerate()
                    .map(|(i, ty)| Val::from_untyped(self.stack.get_abs(region + i), *ty))
                    .collect::<Vec<_>>();
                let mut results = ty
                    .results()
                    .iter()
                    .map(|ty| Val::default(*ty))
                    .collect::<Vec<_>>();
                let caller = Caller::new(store, Some(self.cache.instance));
                (entity.callable)(caller, &args, &mut results)?;
                check_results(&ty, &results)?;
                for (i, result) in results.iter().enumerate() {
                    self.stack.set_abs(region + i, result.to_untyped());
                }
                // The host may have grown the default memory or re-entered
                // the store; the stack buffer itself is untouched since
                // re-entrant invocations execute on their own contexts.
                self.cache.refresh_memory();
                self.next_instr();
                Ok(())
            }
        }
    }

    /// Resolves the handle of a global variable of the current instance.
    ///
    /// Translated indices have been validated, so the lookup cannot fail.
    fn global_handle(&self, global: index::Global) -> EntityHandle<GlobalEntity> {
        self.cache
            .instance
            .entity()
            .get_global(u32::from(global))
            .unwrap_or_else(|| panic!("missing global for validated index {global:?}"))
            .handle()
    }

    /// Resolves the handle of a table of the current instance.
    fn table_handle(&self, table: index::Table) -> EntityHandle<TableEntity> {
        self.cache
            .instance
            .entity()
            .get_table(u32::from(table))
            .unwrap_or_else(|| panic!("missing table for validated index {table:?}"))
            .handle()
    }

    /// Resolves the handle of a data segment of the current instance.
    fn data_segment(&self, data: index::Data) -> EntityHandle<DataSegmentEntity> {
        self.cache
            .instance
            .entity()
            .get_data_segment(u32::from(data))
            .unwrap_or_else(|| panic!("missing data segment for validated index {data:?}"))
            .handle()
    }

    /// Resolves the handle of an element segment of the current instance.
    fn element_segment(&self, elem: index::Elem) -> EntityHandle<ElementSegmentEntity> {
        self.cache
            .instance
            .entity()
            .get_element_segment(u32::from(elem))
            .unwrap_or_else(|| panic!("missing element segment for validated index {elem:?}"))
            .handle()
    }
}
