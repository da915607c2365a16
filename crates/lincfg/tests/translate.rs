mod common;

use common::{build, i1, i32, param, set_incoming, stmts, succ_labels, try_build};
use rstest::rstest;

use lincfg::build::{BuildError, Config, ConfigFlags};
use lincfg::mem::NoMemAnalysis;
use lincfg::ssa::{
    BinOp, Callee, CastOp, CmpPred, FuncBody, FuncId, Function, InstKind, Module, Terminator,
    Type, Value,
};

/// `sum(n)`: adds up `0..n` in a loop.
fn sum_module() -> (Module, FuncId) {
    let mut module = Module::default();
    let mut body = FuncBody::new("entry");
    let entry = body.entry();
    let header = body.add_block("loop");
    let latch = body.add_block("body");
    let done = body.add_block("done");
    let n = Value::Arg(0);

    body.set_term(entry, Terminator::Br(header));

    let i = body.push(header, Some("i"), i32(), InstKind::Phi(vec![]));
    let acc = body.push(header, Some("acc"), i32(), InstKind::Phi(vec![]));
    let c = body.push(header, Some("c"), i1(), InstKind::Cmp(CmpPred::Slt, i, n));
    body.set_term(header, Terminator::CondBr(c, [latch, done]));

    let acc1 = body.push(latch, Some("acc1"), i32(), InstKind::Binary(BinOp::Add, acc, i));
    let i1 = body.push(
        latch,
        Some("i1"),
        i32(),
        InstKind::Binary(BinOp::Add, i, Value::int(32, 1)),
    );
    body.set_term(latch, Terminator::Br(header));
    body.set_term(done, Terminator::Ret(Some(acc)));

    set_incoming(&mut body, i, vec![(entry, Value::int(32, 0)), (latch, i1)]);
    set_incoming(&mut body, acc, vec![(entry, Value::int(32, 0)), (latch, acc1)]);

    let func = Function::new("sum", vec![param("n", i32())], i32()).with_body(body);
    let func_id = module.add_func(func);

    (module, func_id)
}

/// `f(x, y)` with a single block: the instructions pushed by `fill`, then `ret void`.
fn straight_line(fill: impl FnOnce(&mut Module, &mut FuncBody)) -> (Module, FuncId) {
    let mut module = Module::default();
    let mut body = FuncBody::new("entry");
    fill(&mut module, &mut body);

    let entry = body.entry();

    if matches!(body.blocks[entry].term, Terminator::Unreachable) {
        body.set_term(entry, Terminator::Ret(None));
    }

    let params = vec![param("x", i32()), param("y", i32())];
    let func_id = module.add_func(Function::new("f", params, Type::Void).with_body(body));

    (module, func_id)
}

fn declare(module: &mut Module, name: &str, params: Vec<Type>) -> FuncId {
    let params = params
        .into_iter()
        .enumerate()
        .map(|(idx, ty)| param(&format!("p{idx}"), ty))
        .collect();

    module.add_func(Function::new(name, params, Type::Void))
}

#[test]
fn test_loop() {
    let (module, func_id) = sum_module();
    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(stmts(&cfg, "entry"), ["i = 0", "acc = 0"]);
    assert_eq!(stmts(&cfg, "loop_body"), ["assume(i - n <= -1)"]);
    assert_eq!(stmts(&cfg, "loop_done"), ["assume(-i + n <= 0)"]);
    assert_eq!(
        stmts(&cfg, "body"),
        ["acc1 = acc + i", "i1 = i + 1", "i = i1", "acc = acc1"]
    );
    assert_eq!(succ_labels(&cfg, "loop"), ["loop_body", "loop_done"]);
    assert_eq!(succ_labels(&cfg, "body"), ["loop"]);
    assert_eq!(cfg.blocks[cfg.exit].label, "done");
}

#[test]
fn test_determinism() {
    let (module, func_id) = sum_module();
    let config = Config::with_flags(ConfigFlags::INCLUDE_HAVOC | ConfigFlags::INTER_PROC);

    let first = build(&module, func_id, &NoMemAnalysis, &config).to_string();
    let second = build(&module, func_id, &NoMemAnalysis, &config).to_string();

    assert_eq!(first, second);
    assert!(first.starts_with("decl int sum(n:int)\n"));
}

#[test]
fn test_functions_translate_on_separate_threads() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    assert_send::<lincfg::cfg::Cfg>();
    assert_sync::<Module>();
    assert_sync::<lincfg::mem::StaticMemAnalysis>();

    let (module, func_id) = sum_module();
    let config = Config::default();
    let expected = build(&module, func_id, &NoMemAnalysis, &config).to_string();

    let outputs = std::thread::scope(|scope| {
        let handles = (0..2)
            .map(|_| scope.spawn(|| build(&module, func_id, &NoMemAnalysis, &config).to_string()))
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    });

    assert_eq!(outputs, [expected.clone(), expected]);
}

#[test]
fn test_multiple_returns_are_unified() {
    let mut module = Module::default();
    let mut body = FuncBody::new("entry");
    let entry = body.entry();
    let a = body.add_block("a");
    let b = body.add_block("b");

    body.set_term(entry, Terminator::CondBr(Value::Arg(0), [a, b]));
    body.set_term(a, Terminator::Ret(None));
    body.set_term(b, Terminator::Ret(None));

    let func = Function::new("f", vec![param("c", i1())], Type::Void).with_body(body);
    let func_id = module.add_func(func);
    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(cfg.blocks[cfg.exit].label, "exit");
    assert_eq!(succ_labels(&cfg, "a"), ["exit"]);
    assert_eq!(succ_labels(&cfg, "b"), ["exit"]);
    assert_eq!(stmts(&cfg, "entry_a"), ["assume(c = 1)"]);
    assert_eq!(stmts(&cfg, "entry_b"), ["assume(c = 0)"]);

    let sinks = cfg
        .blocks
        .values()
        .filter(|block| block.succs.is_empty())
        .count();
    assert_eq!(sinks, 1);
}

#[test]
fn test_no_return_gets_exit() {
    let mut module = Module::default();
    let body = FuncBody::new("entry");
    let func_id = module.add_func(Function::new("f", vec![], Type::Void).with_body(body));
    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(stmts(&cfg, "entry"), ["unreachable"]);
    assert_eq!(cfg.blocks[cfg.exit].label, "exit");
    assert_ne!(cfg.entry, cfg.exit);
    assert!(cfg.predecessors()[cfg.exit].is_empty());
}

#[test]
fn test_phi_swap_reads_old_values() {
    let mut module = Module::default();
    let mut body = FuncBody::new("entry");
    let entry = body.entry();
    let header = body.add_block("loop");
    let done = body.add_block("done");

    body.set_term(entry, Terminator::Br(header));
    let a = body.push(header, Some("a"), i32(), InstKind::Phi(vec![]));
    let b = body.push(header, Some("b"), i32(), InstKind::Phi(vec![]));
    body.set_term(header, Terminator::CondBr(Value::Arg(0), [header, done]));
    body.set_term(done, Terminator::Ret(None));

    set_incoming(&mut body, a, vec![(entry, Value::int(32, 0)), (header, b)]);
    set_incoming(&mut body, b, vec![(entry, Value::int(32, 1)), (header, a)]);

    let func = Function::new("f", vec![param("c", i1())], Type::Void).with_body(body);
    let func_id = module.add_func(func);
    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(stmts(&cfg, "entry"), ["a = 0", "b = 1"]);
    assert_eq!(
        stmts(&cfg, "loop_loop"),
        ["assume(c = 1)", "_3 = b", "_4 = a", "a = _3", "b = _4"]
    );
    assert_eq!(stmts(&cfg, "loop_done"), ["assume(c = 0)"]);
}

#[test]
fn test_missing_incoming_is_an_error() {
    let mut module = Module::default();
    let mut body = FuncBody::new("entry");
    let entry = body.entry();
    let other = body.add_block("other");
    let join = body.add_block("join");

    body.set_term(entry, Terminator::Br(join));
    body.set_term(other, Terminator::Br(join));
    body.push(
        join,
        Some("p"),
        i32(),
        InstKind::Phi(vec![(other, Value::int(32, 1))]),
    );
    body.set_term(join, Terminator::Ret(None));

    let func_id = module.add_func(Function::new("f", vec![], Type::Void).with_body(body));
    let err = try_build(&module, func_id, &NoMemAnalysis, &Config::default()).unwrap_err();

    assert!(matches!(err, BuildError::MissingIncoming { ref pred, .. } if pred == "entry"));
}

#[test]
fn test_conjunctive_branch() {
    let mut module = Module::default();
    let mut body = FuncBody::new("entry");
    let entry = body.entry();
    let bb1 = body.add_block("bb1");
    let bb2 = body.add_block("bb2");
    let (x, y, z) = (Value::Arg(0), Value::Arg(1), Value::Arg(2));

    let c1 = body.push(entry, Some("c1"), i1(), InstKind::Cmp(CmpPred::Slt, x, y));
    let c2 = body.push(entry, Some("c2"), i1(), InstKind::Cmp(CmpPred::Slt, y, z));
    let c = body.push(entry, Some("c"), i1(), InstKind::Binary(BinOp::And, c1, c2));
    body.set_term(entry, Terminator::CondBr(c, [bb1, bb2]));
    body.set_term(bb1, Terminator::Ret(None));
    body.set_term(bb2, Terminator::Ret(None));

    let params = vec![param("x", i32()), param("y", i32()), param("z", i32())];
    let func_id = module.add_func(Function::new("f", params, Type::Void).with_body(body));
    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(stmts(&cfg, "entry"), ["c = c1 & c2"]);
    assert_eq!(
        stmts(&cfg, "entry_bb1"),
        ["assume(x - y <= -1)", "assume(y - z <= -1)"]
    );
    assert!(stmts(&cfg, "entry_bb2").is_empty());
}

#[test]
fn test_negated_disjunction() {
    let mut module = Module::default();
    let mut body = FuncBody::new("entry");
    let entry = body.entry();
    let bb1 = body.add_block("bb1");
    let bb2 = body.add_block("bb2");
    let (x, y) = (Value::Arg(0), Value::Arg(1));

    body.push(entry, Some("s"), i32(), InstKind::Binary(BinOp::Add, x, y));
    let c1 = body.push(entry, Some("c1"), i1(), InstKind::Cmp(CmpPred::Eq, x, Value::int(32, 0)));
    let c2 = body.push(entry, Some("c2"), i1(), InstKind::Cmp(CmpPred::Slt, x, y));
    let c = body.push(entry, Some("c"), i1(), InstKind::Binary(BinOp::Or, c1, c2));
    body.set_term(entry, Terminator::CondBr(c, [bb1, bb2]));
    body.set_term(bb1, Terminator::Ret(None));
    body.set_term(bb2, Terminator::Ret(None));

    let params = vec![param("x", i32()), param("y", i32())];
    let func_id = module.add_func(Function::new("f", params, Type::Void).with_body(body));
    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert!(stmts(&cfg, "entry_bb1").is_empty());
    assert_eq!(
        stmts(&cfg, "entry_bb2"),
        ["assume(x != 0)", "assume(-x + y <= 0)"]
    );
}

#[rstest]
#[case(true, "entry_b")]
#[case(false, "entry_a")]
fn test_constant_branch(#[case] cond: bool, #[case] untaken: &str) {
    let mut module = Module::default();
    let mut body = FuncBody::new("entry");
    let entry = body.entry();
    let a = body.add_block("a");
    let b = body.add_block("b");

    body.set_term(entry, Terminator::CondBr(Value::bool(cond), [a, b]));
    body.set_term(a, Terminator::Ret(None));
    body.set_term(b, Terminator::Ret(None));

    let func_id = module.add_func(Function::new("f", vec![], Type::Void).with_body(body));
    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());
    let taken = if cond { "entry_a" } else { "entry_b" };

    assert!(stmts(&cfg, taken).is_empty());
    assert_eq!(stmts(&cfg, untaken), ["unreachable"]);
}

#[rstest]
#[case(CmpPred::Eq, &["assume(x - y = 0)"], &["assume(x - y != 0)"])]
#[case(CmpPred::Ne, &["assume(x - y != 0)"], &["assume(x - y = 0)"])]
#[case(CmpPred::Slt, &["assume(x - y <= -1)"], &["assume(-x + y <= 0)"])]
#[case(CmpPred::Sle, &["assume(x - y <= 0)"], &["assume(-x + y <= -1)"])]
#[case(CmpPred::Sgt, &["assume(-x + y <= -1)"], &["assume(x - y <= 0)"])]
#[case(CmpPred::Sge, &["assume(-x + y <= 0)"], &["assume(x - y <= -1)"])]
#[case(
    CmpPred::Ult,
    &["assume(-x <= 0)", "assume(-y <= 0)", "assume(x - y <= -1)"],
    &["assume(-x <= 0)", "assume(-y <= 0)", "assume(-x + y <= 0)"]
)]
#[case(
    CmpPred::Ugt,
    &["assume(-y <= 0)", "assume(-x <= 0)", "assume(-x + y <= -1)"],
    &["assume(-y <= 0)", "assume(-x <= 0)", "assume(x - y <= 0)"]
)]
fn test_cmp_predicates(#[case] pred: CmpPred, #[case] taken: &[&str], #[case] not_taken: &[&str]) {
    let mut module = Module::default();
    let mut body = FuncBody::new("entry");
    let entry = body.entry();
    let t = body.add_block("t");
    let f = body.add_block("f");
    let (x, y) = (Value::Arg(0), Value::Arg(1));

    // mints `x` before `y` so terms print in a fixed order
    body.push(entry, Some("s"), i32(), InstKind::Binary(BinOp::Add, x, y));
    let c = body.push(entry, Some("c"), i1(), InstKind::Cmp(pred, x, y));
    body.set_term(entry, Terminator::CondBr(c, [t, f]));
    body.set_term(t, Terminator::Ret(None));
    body.set_term(f, Terminator::Ret(None));

    let params = vec![param("x", i32()), param("y", i32())];
    let func_id = module.add_func(Function::new("f", params, Type::Void).with_body(body));
    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(stmts(&cfg, "entry_t"), taken);
    assert_eq!(stmts(&cfg, "entry_f"), not_taken);
}

#[test]
fn test_materialized_condition_is_pinned() {
    let mut module = Module::default();
    let mut body = FuncBody::new("entry");
    let entry = body.entry();
    let t = body.add_block("t");
    let f = body.add_block("f");
    let (x, y) = (Value::Arg(0), Value::Arg(1));

    body.push(entry, Some("s"), i32(), InstKind::Binary(BinOp::Add, x, y));
    let c = body.push(entry, Some("c"), i1(), InstKind::Cmp(CmpPred::Eq, x, y));
    body.push(entry, Some("w"), i32(), InstKind::Cast(CastOp::ZExt, c));
    body.set_term(entry, Terminator::CondBr(c, [t, f]));
    body.set_term(t, Terminator::Ret(None));
    body.set_term(f, Terminator::Ret(None));

    let params = vec![param("x", i32()), param("y", i32())];
    let func_id = module.add_func(Function::new("f", params, Type::Void).with_body(body));
    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(stmts(&cfg, "entry_t"), ["assume(x - y = 0)", "assume(c = 1)"]);
    assert_eq!(stmts(&cfg, "entry_f"), ["assume(x - y != 0)", "assume(c = 0)"]);
}

#[rstest]
#[case(ConfigFlags::INCLUDE_HAVOC, &["havoc(r)"])]
#[case(ConfigFlags::empty(), &[])]
fn test_conservative_absence(#[case] flags: ConfigFlags, #[case] expected: &[&str]) {
    let (module, func_id) = straight_line(|_, body| {
        let entry = body.entry();
        body.push(
            entry,
            Some("r"),
            i32(),
            InstKind::Binary(BinOp::Add, Value::Arg(0), Value::undef_int(32)),
        );
    });

    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::with_flags(flags));

    assert_eq!(stmts(&cfg, "entry"), expected);
}

#[test]
fn test_extending_undefined_bool_is_bounded() {
    let (module, func_id) = straight_line(|_, body| {
        let entry = body.entry();
        let d = body.push(
            entry,
            Some("d"),
            i32(),
            InstKind::Cast(CastOp::ZExt, Value::undef_int(1)),
        );
        body.push(entry, Some("s"), i32(), InstKind::Binary(BinOp::Add, d, Value::Arg(0)));
    });

    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(
        stmts(&cfg, "entry"),
        ["assume(-d <= 0)", "assume(d <= 1)", "s = d + x"]
    );
}

#[rstest]
#[case(BinOp::Shl, Value::int(32, 3), "r = x * 8")]
#[case(BinOp::AShr, Value::int(32, 2), "r = x / 4")]
#[case(BinOp::Shl, Value::Arg(1), "havoc(r)")]
#[case(BinOp::Shl, Value::int(32, 200), "havoc(r)")]
#[case(BinOp::LShr, Value::int(32, 1), "havoc(r)")]
#[case(BinOp::Mul, Value::Arg(1), "r = x * y")]
#[case(BinOp::SRem, Value::int(32, 7), "r = x % 7")]
#[case(BinOp::URem, Value::Arg(1), "r = x %_u y")]
#[case(BinOp::Xor, Value::Arg(1), "r = x ^ y")]
fn test_binary(#[case] op: BinOp, #[case] rhs: Value, #[case] expected: &str) {
    let (module, func_id) = straight_line(|_, body| {
        let entry = body.entry();
        body.push(
            entry,
            Some("r"),
            i32(),
            InstKind::Binary(op, Value::Arg(0), rhs),
        );
    });

    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(stmts(&cfg, "entry"), [expected]);
}

#[rstest]
#[case(BinOp::Sub, "r = r - x")]
#[case(BinOp::SDiv, "r = r / x")]
#[case(BinOp::URem, "r = r %_u x")]
fn test_constant_first_operand(#[case] op: BinOp, #[case] expected: &str) {
    let (module, func_id) = straight_line(|_, body| {
        let entry = body.entry();
        body.push(
            entry,
            Some("r"),
            i32(),
            InstKind::Binary(op, Value::int(32, 5), Value::Arg(0)),
        );
    });

    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(stmts(&cfg, "entry"), ["r = 5", expected]);
}

#[test]
fn test_unsigned_division_of_constants() {
    let (module, func_id) = straight_line(|_, body| {
        let entry = body.entry();
        body.push(
            entry,
            Some("r"),
            i32(),
            InstKind::Binary(BinOp::UDiv, Value::int(32, 6), Value::int(32, 3)),
        );
    });

    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(stmts(&cfg, "entry"), ["havoc(r)"]);
}

#[test]
fn test_casts() {
    let (module, func_id) = straight_line(|_, body| {
        let entry = body.entry();
        let t = body.push(
            entry,
            Some("t"),
            Type::Int(8),
            InstKind::Cast(CastOp::Trunc, Value::Arg(0)),
        );
        let u = body.push(entry, Some("u"), i32(), InstKind::Cast(CastOp::SExt, t));
        body.push(entry, Some("v"), i32(), InstKind::Binary(BinOp::Add, u, t));

        // no users: nothing to translate
        body.push(
            entry,
            Some("dead"),
            Type::Int(64),
            InstKind::Cast(CastOp::SExt, Value::Arg(1)),
        );
    });

    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(stmts(&cfg, "entry"), ["t = x", "u = t", "v = u + t"]);
}

#[test]
fn test_select() {
    let (module, func_id) = straight_line(|_, body| {
        let entry = body.entry();
        let (x, y) = (Value::Arg(0), Value::Arg(1));

        body.push(entry, Some("s"), i32(), InstKind::Binary(BinOp::Add, x, y));
        let lt = body.push(entry, Some("lt"), i1(), InstKind::Cmp(CmpPred::Slt, x, y));
        let ult = body.push(entry, Some("ult"), i1(), InstKind::Cmp(CmpPred::Ult, x, y));

        for (name, cond) in [("m", lt), ("n", ult), ("k", Value::bool(false))] {
            body.push(
                entry,
                Some(name),
                i32(),
                InstKind::Select {
                    cond,
                    on_true: x,
                    on_false: y,
                },
            );
        }
    });

    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(
        stmts(&cfg, "entry"),
        [
            "s = x + y",
            "m = ite(x - y <= -1, x, y)",
            "n = ite(ult, x, y)",
            "k = y",
        ]
    );
}

#[test]
fn test_switch() {
    let mut module = Module::default();
    let mut body = FuncBody::new("entry");
    let entry = body.entry();
    let d = body.add_block("d");
    let a = body.add_block("a");
    let b = body.add_block("b");

    body.set_term(
        entry,
        Terminator::Switch {
            value: Value::Arg(0),
            cases: vec![1, 2],
            targets: vec![d, a, b],
        },
    );

    for block_id in [d, a, b] {
        body.set_term(block_id, Terminator::Ret(None));
    }

    let func = Function::new("f", vec![param("x", i32())], Type::Void).with_body(body);
    let func_id = module.add_func(func);
    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(stmts(&cfg, "entry_d"), ["assume(x != 1)", "assume(x != 2)"]);
    assert_eq!(stmts(&cfg, "entry_a"), ["assume(x = 1)"]);
    assert_eq!(stmts(&cfg, "entry_b"), ["assume(x = 2)"]);
    assert_eq!(succ_labels(&cfg, "entry"), ["entry_d", "entry_a", "entry_b"]);
}

#[test]
fn test_wide_constants_constrain_nothing() {
    let mut module = Module::default();
    let mut body = FuncBody::new("entry");
    let entry = body.entry();
    let a = body.add_block("a");
    let b = body.add_block("b");
    let x = Value::Arg(0);

    let c = body.push(
        entry,
        Some("c"),
        i1(),
        InstKind::Cmp(CmpPred::Slt, x, Value::int(128, i128::MIN)),
    );
    body.set_term(entry, Terminator::CondBr(c, [a, b]));
    body.set_term(
        a,
        Terminator::Switch {
            value: x,
            cases: vec![i128::MAX, 3],
            targets: vec![b, b, b],
        },
    );
    body.set_term(b, Terminator::Ret(None));

    let func = Function::new("f", vec![param("x", Type::Int(128))], Type::Void).with_body(body);
    let func_id = module.add_func(func);
    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert!(stmts(&cfg, "entry_a").is_empty());
    assert!(stmts(&cfg, "entry_b").is_empty());
    assert_eq!(stmts(&cfg, "a_b"), ["assume(x != 3)"]);
    assert!(stmts(&cfg, "a_b.1").is_empty());
    assert_eq!(stmts(&cfg, "a_b.2"), ["assume(x = 3)"]);
}

#[rstest]
#[case("verifier.assume", "assume(x - y <= -1)")]
#[case("verifier.assume.not", "assume(-x + y <= 0)")]
fn test_assume_calls(#[case] callee: &str, #[case] expected: &str) {
    let (module, func_id) = straight_line(|module, body| {
        let entry = body.entry();
        let (x, y) = (Value::Arg(0), Value::Arg(1));
        let assume = declare(module, callee, vec![i32()]);

        body.push(entry, Some("s"), i32(), InstKind::Binary(BinOp::Add, x, y));
        let c = body.push(entry, Some("c"), i1(), InstKind::Cmp(CmpPred::Slt, x, y));
        let z = body.push(entry, Some("z"), i32(), InstKind::Cast(CastOp::ZExt, c));
        body.push(
            entry,
            None,
            Type::Void,
            InstKind::Call {
                callee: Callee::Direct(assume),
                args: vec![z],
            },
        );
    });

    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(stmts(&cfg, "entry"), ["s = x + y", "z = c", expected]);
}

#[test]
fn test_assume_false_is_unreachable() {
    let (module, func_id) = straight_line(|module, body| {
        let entry = body.entry();
        let assume = declare(module, "verifier.assume", vec![i1()]);

        body.push(
            entry,
            None,
            Type::Void,
            InstKind::Call {
                callee: Callee::Direct(assume),
                args: vec![Value::bool(false)],
            },
        );
    });

    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(stmts(&cfg, "entry"), ["unreachable"]);
}

#[test]
fn test_opaque_and_indirect_calls_are_havocked() {
    let (module, func_id) = straight_line(|_, body| {
        let entry = body.entry();

        body.push(entry, Some("o"), i32(), InstKind::Opaque(vec![Value::Arg(0)]));
        body.push(
            entry,
            Some("r"),
            i32(),
            InstKind::Call {
                callee: Callee::Indirect(Value::Arg(1)),
                args: vec![],
            },
        );
    });

    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    assert_eq!(stmts(&cfg, "entry"), ["havoc(o)", "havoc(r)"]);
}

#[test]
fn test_simplify_merges_chain() {
    let mut module = Module::default();
    let mut body = FuncBody::new("entry");
    let entry = body.entry();
    let a = body.add_block("a");
    let b = body.add_block("b");

    let s = body.push(
        entry,
        Some("s"),
        i32(),
        InstKind::Binary(BinOp::Add, Value::Arg(0), Value::int(32, 1)),
    );
    body.set_term(entry, Terminator::Br(a));
    body.push(
        a,
        Some("t"),
        i32(),
        InstKind::Binary(BinOp::Add, s, Value::int(32, 1)),
    );
    body.set_term(a, Terminator::Br(b));
    body.set_term(b, Terminator::Ret(None));

    let func = Function::new("f", vec![param("x", i32())], Type::Void).with_body(body);
    let func_id = module.add_func(func);
    let config = Config::with_flags(ConfigFlags::INCLUDE_HAVOC | ConfigFlags::SIMPLIFY);
    let cfg = build(&module, func_id, &NoMemAnalysis, &config);

    assert_eq!(cfg.blocks.len(), 1);
    assert_eq!(cfg.entry, cfg.exit);
    assert_eq!(stmts(&cfg, "entry"), ["s = x + 1", "t = s + 1"]);
}

#[test]
fn test_simplify_keeps_empty_entry() {
    let mut module = Module::default();
    let mut body = FuncBody::new("entry");
    let entry = body.entry();
    let header = body.add_block("loop");
    let done = body.add_block("done");

    body.set_term(entry, Terminator::Br(header));
    body.set_term(header, Terminator::CondBr(Value::Arg(0), [header, done]));
    body.set_term(done, Terminator::Ret(None));

    let func = Function::new("f", vec![param("c", i1())], Type::Void).with_body(body);
    let func_id = module.add_func(func);
    let config = Config::with_flags(ConfigFlags::INCLUDE_HAVOC | ConfigFlags::SIMPLIFY);
    let cfg = build(&module, func_id, &NoMemAnalysis, &config);

    assert_eq!(cfg.blocks[cfg.entry].label, "entry");
    assert!(cfg.predecessors()[cfg.entry].is_empty());
    assert_eq!(succ_labels(&cfg, "entry"), ["loop"]);
    assert_eq!(succ_labels(&cfg, "loop_loop"), ["loop"]);
}

#[test]
fn test_edge_labels_never_clash() {
    let mut module = Module::default();
    let mut body = FuncBody::new("entry");
    let entry = body.entry();
    let b = body.add_block("b");
    let b1 = body.add_block("entry_b");
    let b2 = body.add_block("entry_b.1");

    body.set_term(entry, Terminator::CondBr(Value::Arg(0), [b, b]));

    for block in [b, b1, b2] {
        body.set_term(block, Terminator::Ret(None));
    }

    let func = Function::new("f", vec![param("c", i1())], Type::Void).with_body(body);
    let func_id = module.add_func(func);
    let cfg = build(&module, func_id, &NoMemAnalysis, &Config::default());

    let mut labels = cfg
        .blocks
        .values()
        .map(|block| block.label.as_str())
        .collect::<Vec<_>>();
    let len = labels.len();
    labels.sort_unstable();
    labels.dedup();

    assert_eq!(labels.len(), len);
    assert_eq!(succ_labels(&cfg, "entry"), ["entry_b.2", "entry_b.3"]);
}

#[test]
fn test_function_without_body() {
    let mut module = Module::default();
    let func_id = declare(&mut module, "ext", vec![]);
    let err = try_build(&module, func_id, &NoMemAnalysis, &Config::default()).unwrap_err();

    assert_eq!(err, BuildError::NoBody { func: "ext".into() });
}

#[test]
fn test_variadic_definition_in_inter_proc_mode() {
    let mut module = Module::default();
    let mut func = Function::new("f", vec![], Type::Void).with_body(FuncBody::new("entry"));
    func.var_arg = true;
    let func_id = module.add_func(func);

    let config = Config::with_flags(ConfigFlags::INTER_PROC);
    let err = try_build(&module, func_id, &NoMemAnalysis, &config).unwrap_err();
    assert_eq!(err, BuildError::VarArgDefinition { func: "f".into() });

    assert!(try_build(&module, func_id, &NoMemAnalysis, &Config::default()).is_ok());
}
