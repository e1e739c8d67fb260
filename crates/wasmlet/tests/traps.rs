//! Trap propagation and boundary behavior tests.

use wasmlet::{Extern, Func, Instance, Module, Runtime, TrapCode, Val};

fn instantiate(wat: &str) -> (Runtime, Instance) {
    let wasm = wat::parse_str(wat).unwrap();
    let mut runtime = Runtime::new();
    let module = Module::parse(&mut runtime, &wasm).unwrap();
    let instance = runtime.instantiate(&module, &[]).unwrap();
    (runtime, instance)
}

fn exported_func(instance: &Instance, name: &str) -> Func {
    instance
        .export(name)
        .and_then(Extern::into_func)
        .unwrap_or_else(|| panic!("missing exported function: {name}"))
}

/// Invokes `name` and returns the [`TrapCode`] it trapped with.
fn invoke_for_trap(runtime: &mut Runtime, instance: &Instance, name: &str, args: &[Val]) -> TrapCode {
    let func = exported_func(instance, name);
    let error = func
        .invoke(runtime, args)
        .expect_err("expected invocation to trap");
    error
        .as_trap_code()
        .unwrap_or_else(|| panic!("expected a coded trap, got: {error}"))
}

#[test]
fn division_overflow_traps() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (func (export "div") (param i32 i32) (result i32)
                (i32.div_s (local.get 0) (local.get 1))
            )
        )
    "#,
    );
    assert_eq!(
        invoke_for_trap(
            &mut runtime,
            &instance,
            "div",
            &[Val::I32(i32::MIN), Val::I32(-1)]
        ),
        TrapCode::IntegerOverflow,
    );
    assert_eq!(
        invoke_for_trap(&mut runtime, &instance, "div", &[Val::I32(1), Val::I32(0)]),
        TrapCode::IntegerDivideByZero,
    );
    let div = exported_func(&instance, "div");
    assert_eq!(
        div.invoke(&mut runtime, &[Val::I32(-7), Val::I32(2)])
            .unwrap(),
        [Val::I32(-3)]
    );
}

#[test]
fn nan_truncation_traps_and_saturates() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (func (export "trunc") (param f32) (result i32)
                (i32.trunc_f32_s (local.get 0))
            )
            (func (export "trunc_sat") (param f32) (result i32)
                (i32.trunc_sat_f32_s (local.get 0))
            )
        )
    "#,
    );
    assert_eq!(
        invoke_for_trap(
            &mut runtime,
            &instance,
            "trunc",
            &[Val::F32(f32::NAN.into())]
        ),
        TrapCode::InvalidConversionToInteger,
    );
    assert_eq!(
        invoke_for_trap(
            &mut runtime,
            &instance,
            "trunc",
            &[Val::F32(2147483648.0_f32.into())]
        ),
        TrapCode::IntegerOverflow,
    );
    let trunc_sat = exported_func(&instance, "trunc_sat");
    assert_eq!(
        trunc_sat
            .invoke(&mut runtime, &[Val::F32(f32::NAN.into())])
            .unwrap(),
        [Val::I32(0)]
    );
    assert_eq!(
        trunc_sat
            .invoke(&mut runtime, &[Val::F32(f32::INFINITY.into())])
            .unwrap(),
        [Val::I32(i32::MAX)]
    );
}

#[test]
fn load_at_memory_end_boundary() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (memory 1)
            (func (export "load_at") (param i32) (result i32)
                (i32.load (local.get 0))
            )
        )
    "#,
    );
    // `offset + access_size == size` succeeds; one byte past traps.
    let load_at = exported_func(&instance, "load_at");
    assert_eq!(
        load_at
            .invoke(&mut runtime, &[Val::I32(65532)])
            .unwrap(),
        [Val::I32(0)]
    );
    assert_eq!(
        invoke_for_trap(&mut runtime, &instance, "load_at", &[Val::I32(65533)]),
        TrapCode::OutOfBoundsMemoryAccess,
    );
    assert_eq!(
        invoke_for_trap(&mut runtime, &instance, "load_at", &[Val::I32(-1)]),
        TrapCode::OutOfBoundsMemoryAccess,
    );
}

#[test]
fn unreachable_traps() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (func (export "boom") unreachable)
        )
    "#,
    );
    assert_eq!(
        invoke_for_trap(&mut runtime, &instance, "boom", &[]),
        TrapCode::Unreachable,
    );
}

#[test]
fn call_indirect_type_mismatch() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (type $int2int (func (param i32) (result i32)))
            (type $void (func))
            (func $inc (type $int2int) (i32.add (local.get 0) (i32.const 1)))
            (func $noop (type $void))
            (table 2 funcref)
            (elem (i32.const 0) $noop $inc)
            (func (export "call_void_at_one")
                (call_indirect (type $void) (i32.const 1))
            )
        )
    "#,
    );
    assert_eq!(
        invoke_for_trap(&mut runtime, &instance, "call_void_at_one", &[]),
        TrapCode::IndirectCallTypeMismatch,
    );
}

#[test]
fn call_indirect_null_and_out_of_bounds() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (type $void (func))
            (table 2 funcref)
            (func (export "call_at") (param i32)
                (call_indirect (type $void) (local.get 0))
            )
        )
    "#,
    );
    assert_eq!(
        invoke_for_trap(&mut runtime, &instance, "call_at", &[Val::I32(0)]),
        TrapCode::UninitializedElement,
    );
    assert_eq!(
        invoke_for_trap(&mut runtime, &instance, "call_at", &[Val::I32(5)]),
        TrapCode::UndefinedElement,
    );
}

#[test]
fn runaway_recursion_exhausts_call_stack() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (func $runaway (export "runaway") (call $runaway))
            (func (export "ok") (result i32) (i32.const 1))
        )
    "#,
    );
    assert_eq!(
        invoke_for_trap(&mut runtime, &instance, "runaway", &[]),
        TrapCode::CallStackExhausted,
    );
    // The trap unwound cleanly: the next invocation on the same instance
    // observes a fresh execution state.
    let ok = exported_func(&instance, "ok");
    assert_eq!(ok.invoke(&mut runtime, &[]).unwrap(), [Val::I32(1)]);
    assert_eq!(
        invoke_for_trap(&mut runtime, &instance, "runaway", &[]),
        TrapCode::CallStackExhausted,
    );
}

#[test]
fn table_access_out_of_bounds() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (table 2 funcref)
            (func (export "get_at") (param i32) (result funcref)
                (table.get 0 (local.get 0))
            )
        )
    "#,
    );
    assert_eq!(
        invoke_for_trap(&mut runtime, &instance, "get_at", &[Val::I32(2)]),
        TrapCode::OutOfBoundsTableAccess,
    );
}

#[test]
fn mismatching_arguments_trap() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (func (export "id") (param i32) (result i32) (local.get 0))
        )
    "#,
    );
    let id = exported_func(&instance, "id");
    let error = id
        .invoke(&mut runtime, &[Val::I64(1)])
        .expect_err("expected a type mismatch");
    assert!(error.to_string().contains("mismatching function arguments"));
    let error = id
        .invoke(&mut runtime, &[])
        .expect_err("expected an arity mismatch");
    assert!(error.to_string().contains("mismatching function arguments"));
}
