//! Instance allocation and instantiation tests.

use assert_matches::assert_matches;
use wasmlet::{
    errors::{ErrorKind, InstantiationError},
    Extern, Global, Module, Mutability, Runtime, StoreLimits, TrapCode, Val,
};

fn parse(runtime: &mut Runtime, wat: &str) -> Module {
    let wasm = wat::parse_str(wat).unwrap();
    Module::parse(runtime, &wasm).unwrap()
}

#[test]
fn start_function_runs_on_instantiation() {
    let mut runtime = Runtime::new();
    let module = parse(
        &mut runtime,
        r#"
        (module
            (global $g (mut i32) (i32.const 0))
            (func $init (global.set $g (i32.const 42)))
            (start $init)
            (func (export "get") (result i32) (global.get $g))
        )
    "#,
    );
    let instance = runtime.instantiate(&module, &[]).unwrap();
    let get = instance.export("get").and_then(Extern::into_func).unwrap();
    assert_eq!(get.invoke(&mut runtime, &[]).unwrap(), [Val::I32(42)]);
}

#[test]
fn global_initializers_see_previous_globals() {
    let mut runtime = Runtime::new();
    let module = parse(
        &mut runtime,
        r#"
        (module
            (global $a i32 (i32.const 7))
            (global $b i32 (global.get $a))
            (func (export "b") (result i32) (global.get $b))
        )
    "#,
    );
    let instance = runtime.instantiate(&module, &[]).unwrap();
    let b = instance.export("b").and_then(Extern::into_func).unwrap();
    assert_eq!(b.invoke(&mut runtime, &[]).unwrap(), [Val::I32(7)]);
}

#[test]
fn imported_global_is_linked() {
    let mut runtime = Runtime::new();
    let module = parse(
        &mut runtime,
        r#"
        (module
            (import "env" "base" (global $base i32))
            (func (export "plus_one") (result i32)
                (i32.add (global.get $base) (i32.const 1))
            )
        )
    "#,
    );
    let base = Global::new(&mut runtime, Val::I32(9), Mutability::Const);
    let instance = runtime
        .instantiate(&module, &[Extern::Global(base)])
        .unwrap();
    let plus_one = instance
        .export("plus_one")
        .and_then(Extern::into_func)
        .unwrap();
    assert_eq!(plus_one.invoke(&mut runtime, &[]).unwrap(), [Val::I32(10)]);
}

#[test]
fn import_kind_mismatch_is_rejected() {
    let mut runtime = Runtime::new();
    let module = parse(
        &mut runtime,
        r#"
        (module
            (import "env" "f" (func (param i32)))
        )
    "#,
    );
    let global = Global::new(&mut runtime, Val::I32(0), Mutability::Const);
    let error = runtime
        .instantiate(&module, &[Extern::Global(global)])
        .expect_err("expected an import kind mismatch");
    assert_matches!(
        error.kind(),
        ErrorKind::Instantiation(InstantiationError::ImportKindMismatch { index: 0, .. })
    );
}

#[test]
fn import_count_mismatch_is_rejected() {
    let mut runtime = Runtime::new();
    let module = parse(
        &mut runtime,
        r#"
        (module
            (import "env" "g" (global i32))
        )
    "#,
    );
    let error = runtime
        .instantiate(&module, &[])
        .expect_err("expected an import count mismatch");
    assert_matches!(
        error.kind(),
        ErrorKind::Instantiation(InstantiationError::ImportCountMismatch {
            expected: 1,
            actual: 0,
        })
    );
}

#[test]
fn exports_are_resolvable_and_iterable() {
    let mut runtime = Runtime::new();
    let module = parse(
        &mut runtime,
        r#"
        (module
            (memory (export "mem") 1)
            (table (export "tab") 4 funcref)
            (global (export "g") i32 (i32.const 3))
            (func (export "f"))
        )
    "#,
    );
    let instance = runtime.instantiate(&module, &[]).unwrap();
    assert!(instance.export("mem").and_then(Extern::into_memory).is_some());
    assert!(instance.export("tab").and_then(Extern::into_table).is_some());
    assert!(instance.export("g").and_then(Extern::into_global).is_some());
    assert!(instance.export("f").and_then(Extern::into_func).is_some());
    assert!(instance.export("missing").is_none());
    let names = instance.exports().map(|(name, _)| name).collect::<Vec<_>>();
    assert_eq!(names, ["f", "g", "mem", "tab"]);
}

#[test]
fn active_element_segment_populates_table() {
    let mut runtime = Runtime::new();
    let module = parse(
        &mut runtime,
        r#"
        (module
            (type $void (func (result i32)))
            (func $forty_two (type $void) (i32.const 42))
            (table 2 funcref)
            (elem (i32.const 1) $forty_two)
            (func (export "call_one") (result i32)
                (call_indirect (type $void) (i32.const 1))
            )
        )
    "#,
    );
    let instance = runtime.instantiate(&module, &[]).unwrap();
    assert!(instance.init_trap().is_none());
    let call_one = instance
        .export("call_one")
        .and_then(Extern::into_func)
        .unwrap();
    assert_eq!(call_one.invoke(&mut runtime, &[]).unwrap(), [Val::I32(42)]);
}

#[test]
fn out_of_bounds_active_data_segment_returns_instance_with_trap() {
    let mut runtime = Runtime::new();
    let module = parse(
        &mut runtime,
        r#"
        (module
            (memory 1)
            (data (i32.const 65535) "\01\02")
        )
    "#,
    );
    // A trapping active segment copy does not discard the instance: it is
    // returned with the trap recorded on it.
    let instance = runtime
        .instantiate(&module, &[])
        .expect("the instance is returned even when a copy traps");
    assert_eq!(
        instance.init_trap(),
        Some(TrapCode::OutOfBoundsMemoryAccess)
    );
}

#[test]
fn trapping_copy_skips_the_start_function() {
    let mut runtime = Runtime::new();
    let module = parse(
        &mut runtime,
        r#"
        (module
            (memory 1)
            (global $g (mut i32) (i32.const 0))
            (data (i32.const 65536) "\01")
            (func $init (global.set $g (i32.const 1)))
            (start $init)
            (func (export "get") (result i32) (global.get $g))
        )
    "#,
    );
    let instance = runtime
        .instantiate(&module, &[])
        .expect("the instance is returned even when a copy traps");
    assert_eq!(
        instance.init_trap(),
        Some(TrapCode::OutOfBoundsMemoryAccess)
    );
    let get = instance.export("get").and_then(Extern::into_func).unwrap();
    assert_eq!(get.invoke(&mut runtime, &[]).unwrap(), [Val::I32(0)]);
}

#[test]
fn passive_data_segment_with_memory_init() {
    let mut runtime = Runtime::new();
    let module = parse(
        &mut runtime,
        r#"
        (module
            (memory 1)
            (data $payload "\AA\BB")
            (func (export "init_and_load") (result i32)
                (memory.init $payload (i32.const 8) (i32.const 0) (i32.const 2))
                (data.drop $payload)
                (i32.load8_u (i32.const 9))
            )
        )
    "#,
    );
    let instance = runtime.instantiate(&module, &[]).unwrap();
    let run = instance
        .export("init_and_load")
        .and_then(Extern::into_func)
        .unwrap();
    assert_eq!(run.invoke(&mut runtime, &[]).unwrap(), [Val::I32(0xBB)]);
}

#[test]
fn store_limits_deny_memory_growth() {
    let mut runtime = Runtime::new();
    runtime.set_limiter(StoreLimits::builder().memory_size(65536).build());
    let module = parse(
        &mut runtime,
        r#"
        (module
            (memory 1)
            (func (export "grow") (result i32)
                (memory.grow (i32.const 1))
            )
        )
    "#,
    );
    let instance = runtime.instantiate(&module, &[]).unwrap();
    let grow = instance.export("grow").and_then(Extern::into_func).unwrap();
    // A limiter rejection makes `memory.grow` return -1 without trapping.
    assert_eq!(grow.invoke(&mut runtime, &[]).unwrap(), [Val::I32(-1)]);
}

#[test]
fn store_limits_deny_allocation_at_minimum() {
    let mut runtime = Runtime::new();
    runtime.set_limiter(StoreLimits::builder().memory_size(65536).build());
    let module = parse(
        &mut runtime,
        r#"
        (module
            (memory 4)
        )
    "#,
    );
    let error = runtime
        .instantiate(&module, &[])
        .expect_err("expected the limiter to deny the allocation");
    assert!(error
        .to_string()
        .contains("resource limiter denied the memory allocation"));
}
