//! End-to-end execution tests driving exported functions.

use wasmlet::{Extern, Func, FuncType, Instance, Module, Runtime, Trap, Val, ValType};

/// Parses `wat`, instantiates it without imports and returns the pair.
fn instantiate(wat: &str) -> (Runtime, Instance) {
    let wasm = wat::parse_str(wat).unwrap();
    let mut runtime = Runtime::new();
    let module = Module::parse(&mut runtime, &wasm).unwrap();
    let instance = runtime.instantiate(&module, &[]).unwrap();
    (runtime, instance)
}

/// Returns the exported function `name` of `instance`.
fn exported_func(instance: &Instance, name: &str) -> Func {
    instance
        .export(name)
        .and_then(Extern::into_func)
        .unwrap_or_else(|| panic!("missing exported function: {name}"))
}

#[test]
fn add_two_numbers() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (func (export "add") (param i32 i32) (result i32)
                local.get 0
                local.get 1
                i32.add
            )
        )
    "#,
    );
    let add = exported_func(&instance, "add");
    let results = add.invoke(&mut runtime, &[Val::I32(3), Val::I32(4)]).unwrap();
    assert_eq!(results, [Val::I32(7)]);
}

#[test]
fn recursive_factorial() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (func (export "fact") (param i64) (result i64)
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
    let fact = exported_func(&instance, "fact");
    let results = fact.invoke(&mut runtime, &[Val::I64(5)]).unwrap();
    assert_eq!(results, [Val::I64(120)]);
    let results = fact.invoke(&mut runtime, &[Val::I64(0)]).unwrap();
    assert_eq!(results, [Val::I64(1)]);
}

#[test]
fn memory_load_is_little_endian() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (memory 1)
            (data (i32.const 0) "\01\02\03\04")
            (func (export "load") (result i32)
                (i32.load (i32.const 0))
            )
        )
    "#,
    );
    let load = exported_func(&instance, "load");
    let results = load.invoke(&mut runtime, &[]).unwrap();
    assert_eq!(results, [Val::I32(0x0403_0201)]);
}

#[test]
fn memory_grow_at_maximum_returns_minus_one() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (memory 1 1)
            (func (export "grow") (result i32)
                (memory.grow (i32.const 1))
            )
            (func (export "size") (result i32)
                (memory.size)
            )
        )
    "#,
    );
    let grow = exported_func(&instance, "grow");
    let size = exported_func(&instance, "size");
    assert_eq!(grow.invoke(&mut runtime, &[]).unwrap(), [Val::I32(-1)]);
    assert_eq!(size.invoke(&mut runtime, &[]).unwrap(), [Val::I32(1)]);
}

#[test]
fn memory_grow_observed_by_loads() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (memory 1 2)
            (func (export "grow_and_probe") (result i32)
                ;; Grow by one page, then store and load beyond the old size.
                (drop (memory.grow (i32.const 1)))
                (i32.store (i32.const 65540) (i32.const 99))
                (i32.load (i32.const 65540))
            )
        )
    "#,
    );
    let probe = exported_func(&instance, "grow_and_probe");
    assert_eq!(probe.invoke(&mut runtime, &[]).unwrap(), [Val::I32(99)]);
}

#[test]
fn loop_sums_range() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (func (export "sum") (param i32) (result i32)
                (local $acc i32)
                (local $i i32)
                (block $exit
                    (loop $continue
                        (br_if $exit (i32.gt_u (local.get $i) (local.get 0)))
                        (local.set $acc (i32.add (local.get $acc) (local.get $i)))
                        (local.set $i (i32.add (local.get $i) (i32.const 1)))
                        (br $continue)
                    )
                )
                (local.get $acc)
            )
        )
    "#,
    );
    let sum = exported_func(&instance, "sum");
    assert_eq!(
        sum.invoke(&mut runtime, &[Val::I32(10)]).unwrap(),
        [Val::I32(55)]
    );
    assert_eq!(
        sum.invoke(&mut runtime, &[Val::I32(0)]).unwrap(),
        [Val::I32(0)]
    );
}

#[test]
fn br_table_selects_target() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (func (export "classify") (param i32) (result i32)
                (block $b2
                    (block $b1
                        (block $b0
                            (br_table $b0 $b1 $b2 (local.get 0))
                        )
                        (return (i32.const 10))
                    )
                    (return (i32.const 20))
                )
                (i32.const 30)
            )
        )
    "#,
    );
    let classify = exported_func(&instance, "classify");
    for (input, expected) in [(0, 10), (1, 20), (2, 30), (7, 30)] {
        assert_eq!(
            classify.invoke(&mut runtime, &[Val::I32(input)]).unwrap(),
            [Val::I32(expected)]
        );
    }
}

#[test]
fn select_picks_operand() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (func (export "pick") (param i32) (result i32)
                (select (i32.const 7) (i32.const 9) (local.get 0))
            )
        )
    "#,
    );
    let pick = exported_func(&instance, "pick");
    assert_eq!(
        pick.invoke(&mut runtime, &[Val::I32(1)]).unwrap(),
        [Val::I32(7)]
    );
    assert_eq!(
        pick.invoke(&mut runtime, &[Val::I32(0)]).unwrap(),
        [Val::I32(9)]
    );
}

#[test]
fn global_fast_path_roundtrips() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (global $g (mut i32) (i32.const 5))
            (func (export "bump") (result i32)
                (global.set $g (i32.add (global.get $g) (i32.const 1)))
                (global.get $g)
            )
        )
    "#,
    );
    let bump = exported_func(&instance, "bump");
    assert_eq!(bump.invoke(&mut runtime, &[]).unwrap(), [Val::I32(6)]);
    assert_eq!(bump.invoke(&mut runtime, &[]).unwrap(), [Val::I32(7)]);
}

#[test]
fn multi_value_results() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (func (export "divmod") (param i32 i32) (result i32 i32)
                (i32.div_u (local.get 0) (local.get 1))
                (i32.rem_u (local.get 0) (local.get 1))
            )
        )
    "#,
    );
    let divmod = exported_func(&instance, "divmod");
    assert_eq!(
        divmod
            .invoke(&mut runtime, &[Val::I32(7), Val::I32(3)])
            .unwrap(),
        [Val::I32(2), Val::I32(1)]
    );
}

#[test]
fn swapped_parameters_return() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (func (export "swap") (param i32 i32) (result i32 i32)
                local.get 1
                local.get 0
            )
        )
    "#,
    );
    let swap = exported_func(&instance, "swap");
    assert_eq!(
        swap.invoke(&mut runtime, &[Val::I32(1), Val::I32(2)])
            .unwrap(),
        [Val::I32(2), Val::I32(1)]
    );
}

#[test]
fn call_indirect_dispatch() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (type $binop (func (param i32 i32) (result i32)))
            (func $add (type $binop) (i32.add (local.get 0) (local.get 1)))
            (func $sub (type $binop) (i32.sub (local.get 0) (local.get 1)))
            (table 2 funcref)
            (elem (i32.const 0) $add $sub)
            (func (export "apply") (param i32 i32 i32) (result i32)
                (call_indirect (type $binop)
                    (local.get 1)
                    (local.get 2)
                    (local.get 0)
                )
            )
        )
    "#,
    );
    let apply = exported_func(&instance, "apply");
    assert_eq!(
        apply
            .invoke(&mut runtime, &[Val::I32(0), Val::I32(5), Val::I32(3)])
            .unwrap(),
        [Val::I32(8)]
    );
    assert_eq!(
        apply
            .invoke(&mut runtime, &[Val::I32(1), Val::I32(5), Val::I32(3)])
            .unwrap(),
        [Val::I32(2)]
    );
}

#[test]
fn imported_host_function() {
    let wasm = wat::parse_str(
        r#"
        (module
            (import "env" "mul3" (func $mul3 (param i32) (result i32)))
            (func (export "run") (param i32) (result i32)
                (call $mul3 (local.get 0))
            )
        )
    "#,
    )
    .unwrap();
    let mut runtime = Runtime::new();
    let module = Module::parse(&mut runtime, &wasm).unwrap();
    let mul3 = Func::new(
        &mut runtime,
        FuncType::new([ValType::I32], [ValType::I32]),
        |_caller, args, results| {
            let value = args[0].i32().expect("i32 argument");
            results[0] = Val::I32(value * 3);
            Ok(())
        },
    );
    let instance = runtime.instantiate(&module, &[Extern::Func(mul3)]).unwrap();
    let run = exported_func(&instance, "run");
    assert_eq!(
        run.invoke(&mut runtime, &[Val::I32(14)]).unwrap(),
        [Val::I32(42)]
    );
}

#[test]
fn host_function_reenters_export() {
    let wasm = wat::parse_str(
        r#"
        (module
            (import "env" "callback" (func $callback (param i32) (result i32)))
            (func (export "twice") (param i32) (result i32)
                (i32.add (local.get 0) (local.get 0))
            )
            (func (export "run") (param i32) (result i32)
                (call $callback (local.get 0))
            )
        )
    "#,
    )
    .unwrap();
    let mut runtime = Runtime::new();
    let module = Module::parse(&mut runtime, &wasm).unwrap();
    let callback = Func::new(
        &mut runtime,
        FuncType::new([ValType::I32], [ValType::I32]),
        |mut caller, args, results| {
            // Re-enter the calling instance through its `twice` export.
            let twice = caller
                .get_export("twice")
                .and_then(Extern::into_func)
                .expect("missing `twice` export");
            let value = args[0].clone();
            let reentered = caller
                .invoke(&twice, &[value])
                .map_err(|error| Trap::new(error.to_string()))?;
            results[0] = reentered[0].clone();
            Ok(())
        },
    );
    let instance = runtime
        .instantiate(&module, &[Extern::Func(callback)])
        .unwrap();
    let run = exported_func(&instance, "run");
    assert_eq!(
        run.invoke(&mut runtime, &[Val::I32(21)]).unwrap(),
        [Val::I32(42)]
    );
}

#[test]
fn bulk_memory_fill_and_copy() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (memory (export "mem") 1)
            (func (export "blit")
                (memory.fill (i32.const 16) (i32.const 0xAB) (i32.const 4))
                (memory.copy (i32.const 32) (i32.const 16) (i32.const 4))
            )
        )
    "#,
    );
    let blit = exported_func(&instance, "blit");
    blit.invoke(&mut runtime, &[]).unwrap();
    let memory = instance
        .export("mem")
        .and_then(Extern::into_memory)
        .unwrap();
    let mut buffer = [0x00_u8; 4];
    memory.read(&runtime, 32, &mut buffer).unwrap();
    assert_eq!(buffer, [0xAB; 4]);
}

#[test]
fn sign_extension_operators() {
    let (mut runtime, instance) = instantiate(
        r#"
        (module
            (func (export "ext8") (param i32) (result i32)
                (i32.extend8_s (local.get 0))
            )
        )
    "#,
    );
    let ext8 = exported_func(&instance, "ext8");
    assert_eq!(
        ext8.invoke(&mut runtime, &[Val::I32(0xFF)]).unwrap(),
        [Val::I32(-1)]
    );
}
