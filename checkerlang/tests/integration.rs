//! Integration tests for the checkerlang runtime
//!
//! Programs are assembled with `ast::build` (or decoded from JSON, the way a
//! parser hands them over) and run through the public `Interpreter` API:
//! - Value semantics (aliasing, immutable strings, ordering)
//! - Argument binding and natives
//! - Control flow, comprehensions and objects
//! - Error reporting with stack frames
//! - Free-variable analysis

use checkerlang::ast::build::*;
use checkerlang::ast::{analyze, Adapter, Arg, BinOp, Binder, Formal, Signature};
use checkerlang::interp::{
    Args, Builtin, EnvRef, ErrorKind, InputStream, InterpResult, Interpreter, InterpreterConfig, OutputStream,
    RuntimeError, Value,
};
use checkerlang::{Expr, SourcePos, Spanned};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::io::{self, Cursor, Write};
use std::rc::Rc;

fn length(_: &mut Interpreter, args: &Args, _: &EnvRef, _: &SourcePos) -> InterpResult<Value> {
    let n = match args.get("obj")? {
        Value::List(items) => items.borrow().len(),
        Value::Set(items) => items.borrow().len(),
        Value::Map(entries) => entries.borrow().len(),
        Value::Str(s) => s.chars().count(),
        other => return Err(RuntimeError::type_mismatch("collection", other.type_name()).at(args.pos())),
    };
    Ok(Value::Int(n as i64))
}

fn scale(_: &mut Interpreter, args: &Args, _: &EnvRef, _: &SourcePos) -> InterpResult<Value> {
    Ok(Value::Int(args.get_int("x")? * args.get_int("factor")?))
}

/// Calls `f` on every element, through the interpreter
fn map_list(interp: &mut Interpreter, args: &Args, env: &EnvRef, pos: &SourcePos) -> InterpResult<Value> {
    let items = args.get_list("lst")?;
    let func = args.get("f")?;
    let snapshot: Vec<Value> = items.borrow().clone();
    let mut out = Vec::with_capacity(snapshot.len());
    for item in snapshot {
        out.push(interp.call(&func, vec![item], env, pos)?);
    }
    Ok(Value::list(out))
}

fn print(_: &mut Interpreter, args: &Args, _: &EnvRef, _: &SourcePos) -> InterpResult<Value> {
    let out = args.get_output("out")?;
    let text = args.get_as_string("obj")?;
    out.write_str(&text)
        .map_err(|err| RuntimeError::io_error(&err.to_string()).at(args.pos()))?;
    Ok(Value::Null)
}

/// Appends `tag` to the `log` list and passes `value` through
fn note(_: &mut Interpreter, args: &Args, _: &EnvRef, _: &SourcePos) -> InterpResult<Value> {
    args.get_list("log")?.borrow_mut().push(args.get("tag")?);
    args.get("value")
}

/// Interpreter with a small native library
fn interpreter() -> Interpreter {
    interpreter_with(InterpreterConfig::default())
}

fn interpreter_with(config: InterpreterConfig) -> Interpreter {
    let mut interp = Interpreter::with_config(config);
    interp.register(Builtin::new("length", Signature::new(["obj"]), length));
    interp.register(Builtin::new(
        "scale",
        Signature::new(["x"]).with_formal(Formal::with_default("factor", int(2))),
        scale,
    ));
    interp.register(Builtin::new("map_list", Signature::new(["lst", "f"]), map_list));
    interp.register(Builtin::new("print", Signature::new(["out", "obj"]), print));
    interp.register(Builtin::new("note", Signature::new(["log", "tag", "value"]), note));
    interp
}

fn run(program: Spanned<Expr>) -> InterpResult<Value> {
    let mut interp = interpreter();
    let env = interp.new_env();
    interp.evaluate(&program, &env)
}

fn ints(ns: &[i64]) -> Spanned<Expr> {
    list(ns.iter().copied().map(int).collect())
}

fn add(l: Spanned<Expr>, r: Spanned<Expr>) -> Spanned<Expr> {
    binary(l, BinOp::Add, r)
}

fn noted(tag: &str, value: Spanned<Expr>) -> Spanned<Expr> {
    call_pos(ident("note"), vec![ident("log"), string(tag), value])
}

/// `o = <*x=1*>` holding itself as member `me`
fn self_referencing_object() -> Vec<Spanned<Expr>> {
    vec![
        def("o", object(vec![("x", int(1))])),
        deref_assign(ident("o"), string("me"), ident("o")),
    ]
}

fn name(n: &str) -> Binder {
    Binder::Name(n.to_string())
}

/// Shared in-memory sink
#[derive(Clone, Default)]
struct Sink(Rc<RefCell<Vec<u8>>>);

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================
// Value semantics
// ============================================

#[test]
fn test_list_aliasing_through_bindings() {
    let program = block(vec![
        def("l", ints(&[1, 2, 3])),
        def("m", ident("l")),
        deref_assign(ident("l"), int(0), int(9)),
        deref(ident("m"), int(0)),
    ]);
    assert_eq!(run(program).unwrap(), Value::Int(9));
}

#[test]
fn test_map_aliasing_through_function_argument() {
    let program = block(vec![
        def("put", lambda(["m"], deref_assign(ident("m"), string("k"), int(1)))),
        def("m", map(vec![])),
        call_pos(ident("put"), vec![ident("m")]),
        ident("m"),
    ]);
    assert_eq!(run(program).unwrap().to_string(), "<<<\"k\" => 1>>>");
}

#[test]
fn test_string_index_assignment_does_not_rebind() {
    let program = block(vec![
        def("s", string("abc")),
        def("t", deref_assign(ident("s"), int(0), string("X"))),
        list(vec![ident("s"), ident("t")]),
    ]);
    assert_eq!(run(program).unwrap().to_string(), "[\"abc\", \"Xbc\"]");
}

#[test]
fn test_slices() {
    let program = slice(ints(&[1, 2, 3, 4, 5]), int(-2), None);
    assert_eq!(run(program).unwrap().to_string(), "[4, 5]");
    let program = slice(ints(&[1, 2, 3, 4, 5]), int(1), Some(int(-1)));
    assert_eq!(run(program).unwrap().to_string(), "[2, 3, 4]");
    let program = slice(null(), int(0), Some(int(2)));
    assert_eq!(run(program).unwrap(), Value::Null);
    let program = slice(string("checker"), int(0), Some(int(5)));
    assert_eq!(run(program).unwrap(), Value::str("check"));
}

#[test]
fn test_equality_and_ordering_operators() {
    assert_eq!(run(binary(ints(&[1, 2]), BinOp::Eq, ints(&[1, 2]))).unwrap(), Value::TRUE);
    assert_eq!(run(binary(int(2), BinOp::Eq, decimal(2.0))).unwrap(), Value::TRUE);
    assert_eq!(run(binary(int(2), BinOp::Eq, string("2"))).unwrap(), Value::FALSE);
    assert_eq!(run(binary(string("a"), BinOp::Lt, string("b"))).unwrap(), Value::TRUE);
    assert_eq!(run(binary(ints(&[1]), BinOp::Lt, ints(&[1, 0]))).unwrap(), Value::TRUE);
}

#[test]
fn test_heterogeneous_set_is_sorted_deterministically() {
    let program = set(vec![string("b"), int(2), string("a"), int(1)]);
    let first = run(program.clone()).unwrap().to_string();
    assert_eq!(first, run(program).unwrap().to_string());
    assert_eq!(first, "<<\"a\", \"b\", 1, 2>>");
}

#[test]
fn test_deref_default_and_missing_key() {
    let m = map(vec![(string("a"), int(1))]);
    assert_eq!(run(deref_or(m.clone(), string("zz"), int(0))).unwrap(), Value::Int(0));
    let err = run(deref(m, string("zz"))).unwrap_err();
    assert_eq!(err.kind, ErrorKind::KeyNotFound);
    let err = run(deref(ints(&[1]), int(5))).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IndexOutOfBounds);
    assert_eq!(run(deref(null(), int(5))).unwrap(), Value::Null);
}

#[test]
fn test_in_operator() {
    assert_eq!(run(is_in(int(2), ints(&[1, 2]))).unwrap(), Value::TRUE);
    assert_eq!(run(is_in(string("k"), map(vec![(string("k"), null())]))).unwrap(), Value::TRUE);
    assert_eq!(run(is_in(string("x"), string("abc"))).unwrap(), Value::FALSE);
}

#[test]
fn test_integer_overflow_is_an_error() {
    let err = run(binary(int(i64::MAX), BinOp::Mul, int(2))).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Overflow);
}

// ============================================
// Functions and argument binding
// ============================================

#[test]
fn test_self_referencing_object_renders() {
    let mut program = self_referencing_object();
    program.push(add(string(""), ident("o")));
    assert_eq!(run(block(program)).unwrap(), Value::str("<*me=..., x=1*>"));
}

#[test]
fn test_map_keyed_by_itself() {
    let program = block(vec![
        def("m", map(vec![(int(1), int(1))])),
        deref_assign(ident("m"), ident("m"), int(2)),
        list(vec![deref(ident("m"), ident("m")), deref(ident("m"), int(1))]),
    ]);
    assert_eq!(run(program).unwrap().to_string(), "[2, 1]");
}

#[test]
fn test_indexed_assignment_evaluation_order() {
    let program = block(vec![
        def("log", list(vec![])),
        def("l", ints(&[0])),
        deref_assign(noted("container", ident("l")), noted("index", int(0)), noted("value", int(9))),
        list(vec![ident("log"), ident("l")]),
    ]);
    assert_eq!(run(program).unwrap().to_string(), r#"[["index", "container", "value"], [9]]"#);
}

#[test]
fn test_xor_evaluates_both_operands() {
    let program = block(vec![
        def("log", list(vec![])),
        list(vec![
            xor(noted("a", boolean(true)), noted("b", boolean(true))),
            xor(noted("c", boolean(false)), noted("d", boolean(true))),
            ident("log"),
        ]),
    ]);
    assert_eq!(
        run(program).unwrap().to_string(),
        r#"[FALSE, TRUE, ["a", "b", "c", "d"]]"#
    );
}

#[test]
fn test_xor_requires_booleans() {
    let err = run(xor(boolean(true), int(1))).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NonBooleanCondition);
    let err = run(xor(string("x"), boolean(false))).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NonBooleanCondition);
}

#[test]
fn test_named_and_positional_arguments() {
    let sig = Signature::new(["a", "b"]).with_formal(Formal::with_default("c", int(0)));
    let body = add(add(binary(ident("a"), BinOp::Mul, int(100)), binary(ident("b"), BinOp::Mul, int(10))), ident("c"));
    let program = block(vec![
        def("f", lambda_sig(sig, body)),
        call(ident("f"), vec![Arg::positional(int(1)), Arg::named("c", int(3)), Arg::named("b", int(2))]),
    ]);
    assert_eq!(run(program).unwrap(), Value::Int(123));
}

#[test]
fn test_positional_after_named_is_rejected() {
    let program = block(vec![
        def("f", lambda(["a", "b"], ident("a"))),
        call(ident("f"), vec![Arg::named("a", int(1)), Arg::positional(int(2))]),
    ]);
    let err = run(program).unwrap_err();
    assert_eq!(err.kind, ErrorKind::PositionalAfterNamed);
}

#[test]
fn test_too_many_arguments() {
    let program = block(vec![
        def("f", lambda(["a"], ident("a"))),
        call_pos(ident("f"), vec![int(1), int(2)]),
    ]);
    assert_eq!(run(program).unwrap_err().kind, ErrorKind::TooManyArguments);
}

#[test]
fn test_unknown_named_argument_suggests_formal() {
    let program = block(vec![
        def("f", lambda(["count"], ident("count"))),
        call(ident("f"), vec![Arg::named("cout", int(1))]),
    ]);
    let err = run(program).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownArgument);
    assert_eq!(err.message, "argument cout is unknown (did you mean `count`?)");
}

#[test]
fn test_rest_formal_collects_remaining() {
    let sig = Signature::new(["first"]).with_rest("others");
    let program = block(vec![
        def("f", lambda_sig(sig, list(vec![ident("first"), ident("others")]))),
        list(vec![
            call_pos(ident("f"), vec![int(1), int(2), int(3)]),
            call_pos(ident("f"), vec![int(1)]),
        ]),
    ]);
    assert_eq!(run(program).unwrap().to_string(), "[[1, [2, 3]], [1, []]]");
}

#[test]
fn test_spread_arguments() {
    let body = add(add(binary(ident("a"), BinOp::Mul, int(100)), binary(ident("b"), BinOp::Mul, int(10))), ident("c"));
    let program = block(vec![
        def("f", lambda(["a", "b", "c"], body)),
        list(vec![
            call(ident("f"), vec![Arg::positional(spread(ints(&[1, 2, 3])))]),
            call(
                ident("f"),
                vec![Arg::positional(spread(map(vec![
                    (string("c"), int(3)),
                    (string("a"), int(1)),
                    (string("b"), int(2)),
                ])))],
            ),
        ]),
    ]);
    assert_eq!(run(program).unwrap().to_string(), "[123, 123]");
}

#[test]
fn test_spread_map_with_mixed_keys() {
    // "b" sorts before 1 in the map, yet 1 still binds positionally
    let program = block(vec![
        def("f", lambda(["a", "b"], list(vec![ident("a"), ident("b")]))),
        call(
            ident("f"),
            vec![Arg::positional(spread(map(vec![(string("b"), int(2)), (int(1), int(10))])))],
        ),
    ]);
    assert_eq!(run(program).unwrap().to_string(), "[10, 2]");
}

#[test]
fn test_spread_in_list_literal() {
    let program = list(vec![int(0), spread(ints(&[1, 2])), int(3)]);
    assert_eq!(run(program).unwrap().to_string(), "[0, 1, 2, 3]");
    let err = run(list(vec![spread(int(1))])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidSpread);
}

#[test]
fn test_closures_see_later_definitions() {
    let cond = |n: i64| binary(ident("n"), BinOp::Eq, int(n));
    let minus_one = binary(ident("n"), BinOp::Sub, int(1));
    let program = block(vec![
        def(
            "is_even",
            lambda(["n"], if_then_else(cond(0), boolean(true), call_pos(ident("is_odd"), vec![minus_one.clone()]))),
        ),
        def(
            "is_odd",
            lambda(["n"], if_then_else(cond(0), boolean(false), call_pos(ident("is_even"), vec![minus_one]))),
        ),
        call_pos(ident("is_even"), vec![int(10)]),
    ]);
    assert_eq!(run(program).unwrap(), Value::TRUE);
}

#[test]
fn test_closure_captures_counter() {
    // make_counter returns a closure over its own `count`
    let program = block(vec![
        def(
            "make_counter",
            lambda(
                [],
                block(vec![
                    def("count", int(0)),
                    lambda([], assign("count", add(ident("count"), int(1)))),
                ]),
            ),
        ),
        def("c", call_pos(ident("make_counter"), vec![])),
        call_pos(ident("c"), vec![]),
        call_pos(ident("c"), vec![]),
        call_pos(ident("c"), vec![]),
    ]);
    assert_eq!(run(program).unwrap(), Value::Int(3));
}

#[test]
fn test_native_functions() {
    assert_eq!(run(call_pos(ident("length"), vec![string("héllo")])).unwrap(), Value::Int(5));
    assert_eq!(run(call_pos(ident("scale"), vec![int(21)])).unwrap(), Value::Int(42));
    let program = call(ident("scale"), vec![Arg::positional(int(5)), Arg::named("factor", int(3))]);
    assert_eq!(run(program).unwrap(), Value::Int(15));
}

#[test]
fn test_native_calls_back_into_closure() {
    let program = call_pos(
        ident("map_list"),
        vec![ints(&[1, 2, 3]), lambda(["x"], binary(ident("x"), BinOp::Mul, ident("x")))],
    );
    assert_eq!(run(program).unwrap().to_string(), "[1, 4, 9]");
}

#[test]
fn test_calling_non_function() {
    let err = run(call_pos(int(3), vec![])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotCallable);
    assert_eq!(err.message, "expected function, got int");
}

#[test]
fn test_function_value_renders_with_def_name() {
    let program = block(vec![def("twice", lambda(["x"], ident("x"))), ident("twice")]);
    assert_eq!(run(program).unwrap().to_string(), "<#twice>");
    assert_eq!(run(lambda(["x"], ident("x"))).unwrap().to_string(), "<#lambda>");
}

// ============================================
// Objects
// ============================================

#[test]
fn test_invoke_method_through_proto() {
    let describe = lambda(["self"], add(string("name: "), deref(ident("self"), string("name"))));
    let program = block(vec![
        def("animal", object(vec![("describe", describe)])),
        def("dog", object(vec![("_proto_", ident("animal")), ("name", string("rex"))])),
        invoke(ident("dog"), "describe", vec![]),
    ]);
    assert_eq!(run(program).unwrap(), Value::str("name: rex"));
}

#[test]
fn test_invoke_falls_back_to_function_in_scope() {
    let program = invoke(ints(&[4, 5, 6]), "length", vec![]);
    assert_eq!(run(program).unwrap(), Value::Int(3));
}

#[test]
fn test_object_member_assignment() {
    let program = block(vec![
        def("o", object(vec![("a", int(1))])),
        deref_assign(ident("o"), string("b"), int(2)),
        ident("o"),
    ]);
    assert_eq!(run(program).unwrap().to_string(), "<*a=1, b=2*>");
}

#[test]
fn test_class_builds_object_with_methods() {
    let program = block(vec![
        class(
            "Shape",
            vec![
                ("sides", int(4)),
                ("describe", lambda(["self"], add(string("sides="), deref(ident("self"), string("sides"))))),
            ],
        ),
        def("square", object(vec![("_proto_", ident("Shape"))])),
        invoke(ident("square"), "describe", vec![]),
    ]);
    assert_eq!(run(program).unwrap(), Value::str("sides=4"));
}

// ============================================
// Loops and comprehensions
// ============================================

#[test]
fn test_control_signal_in_member_is_an_error() {
    let err = run(while_loop(boolean(true), object(vec![("a", brk())]))).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ControlOutsideLoop);
    let err = run(while_loop(boolean(true), class("C", vec![("a", cont())]))).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ControlOutsideLoop);
    let program = block(vec![
        def("f", lambda([], object(vec![("a", ret(Some(int(1))))]))),
        call_pos(ident("f"), vec![]),
    ]);
    assert_eq!(run(program).unwrap_err().kind, ErrorKind::ControlOutsideLoop);
}

#[test]
fn test_for_over_map_entries_with_destructuring() {
    let m = map(vec![(string("a"), int(1)), (string("b"), int(2))]);
    let program = block(vec![
        def("total", int(0)),
        for_each(
            Binder::Destructure(vec!["k".into(), "v".into()]),
            Adapter::Entries,
            m,
            assign("total", add(ident("total"), ident("v"))),
        ),
        ident("total"),
    ]);
    assert_eq!(run(program).unwrap(), Value::Int(3));
}

#[test]
fn test_for_over_null_runs_no_iterations() {
    let program = block(vec![
        def("n", int(0)),
        for_each(name("x"), Adapter::Elements, null(), assign("n", int(1))),
        ident("n"),
    ]);
    assert_eq!(run(program).unwrap(), Value::Int(0));
}

#[test]
fn test_loop_body_may_mutate_source() {
    let program = block(vec![
        def("l", ints(&[1, 2])),
        for_each(name("x"), Adapter::Elements, ident("l"), deref_assign(ident("l"), int(0), int(7))),
        ident("l"),
    ]);
    assert_eq!(run(program).unwrap().to_string(), "[7, 2]");
}

#[test]
fn test_comprehensions() {
    let squares = map_comprehension(
        ident("x"),
        binary(ident("x"), BinOp::Mul, ident("x")),
        comprehension(name("x"), Adapter::Elements, ints(&[1, 2, 3]), Some(binary(ident("x"), BinOp::Gt, int(1)))),
    );
    assert_eq!(run(squares).unwrap().to_string(), "<<<2 => 4, 3 => 9>>>");

    let parity = set_comprehension(
        binary(ident("x"), BinOp::Mod, int(2)),
        comprehension(name("x"), Adapter::Elements, ints(&[1, 2, 3, 4]), None),
    );
    assert_eq!(run(parity).unwrap().to_string(), "<<0, 1>>");

    let keys = list_comprehension(
        ident("k"),
        comprehension(name("k"), Adapter::Keys, map(vec![(string("b"), int(1)), (string("a"), int(2))]), None),
    );
    assert_eq!(run(keys).unwrap().to_string(), "[\"a\", \"b\"]");
}

#[test]
fn test_comprehension_variable_does_not_leak() {
    let program = block(vec![
        list_comprehension(ident("x"), comprehension(name("x"), Adapter::Elements, ints(&[1]), None)),
        ident("x"),
    ]);
    assert_eq!(run(program).unwrap_err().kind, ErrorKind::UndefinedVariable);
}

#[test]
fn test_iterate_input_lines_and_write_output() {
    let mut interp = interpreter();
    let sink = Sink::default();
    interp.define("stdin", Value::Input(Rc::new(InputStream::new(Cursor::new("alpha\nbeta\n")))));
    interp.define("stdout", Value::Output(Rc::new(OutputStream::new(sink.clone()))));
    let env = interp.new_env();
    let program = for_each(
        name("line"),
        Adapter::Elements,
        ident("stdin"),
        call_pos(ident("print"), vec![ident("stdout"), add(ident("line"), string(";"))]),
    );
    interp.evaluate(&program, &env).unwrap();
    assert_eq!(String::from_utf8(sink.0.borrow().clone()).unwrap(), "alpha;beta;");
}

#[test]
fn test_destructuring_def_pads_with_null() {
    let program = block(vec![def_destructuring(&["a", "b", "c"], ints(&[1, 2])), list(vec![ident("a"), ident("c")])]);
    assert_eq!(run(program).unwrap().to_string(), "[1, NULL]");
}

// ============================================
// Errors and limits
// ============================================

#[test]
fn test_error_carries_stack_frames() {
    let at = |line| SourcePos::new("main", line, 1);
    let program = block(vec![
        def("g", lambda(["x"], raise(add(string("boom "), ident("x"))).at(at(1)))),
        def("f", lambda(["a"], call_pos(ident("g"), vec![ident("a")]).at(at(2)))),
        call_pos(ident("f"), vec![int(1)]).at(at(3)),
    ]);
    let err = run(program).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Raised);
    assert_eq!(err.pos, Some(at(1)));
    let frames: Vec<String> = err.frames().iter().map(ToString::to_string).collect();
    insta::assert_snapshot!(frames.join("\n"), @r"
    g(x=1) (main:2:1)
    f(a=1) (main:3:1)
    ");
    insta::assert_snapshot!(err.to_string(), @"Runtime error: boom 1 (main:1:1)");
}

#[test]
fn test_frame_values_are_abbreviated() {
    let config = InterpreterConfig {
        frame_value_width: 6,
        ..InterpreterConfig::default()
    };
    let mut interp = interpreter_with(config);
    let env = interp.new_env();
    let program = block(vec![
        def("f", lambda(["s"], raise(string("no")))),
        call_pos(ident("f"), vec![string("a rather long argument")]),
    ]);
    let err = interp.evaluate(&program, &env).unwrap_err();
    assert_eq!(err.frames()[0].signature, "f(s=\"a rat...)");
}

#[test]
fn test_frame_renders_self_referencing_argument() {
    let mut program = self_referencing_object();
    program.push(def("f", lambda(["x"], raise(string("no")))));
    program.push(call_pos(ident("f"), vec![ident("o")]));
    let err = run(block(program)).unwrap_err();
    assert_eq!(err.frames()[0].signature, "f(x=<*me=..., x=1*>)");
}

#[test]
fn test_recursion_limit() {
    let config = InterpreterConfig::from_toml("max_depth = 50").unwrap();
    let mut interp = interpreter_with(config);
    let env = interp.new_env();
    let program = block(vec![
        def("down", lambda(["n"], call_pos(ident("down"), vec![add(ident("n"), int(1))]))),
        call_pos(ident("down"), vec![int(0)]),
    ]);
    let err = interp.evaluate(&program, &env).unwrap_err();
    assert_eq!(err.kind, ErrorKind::StackOverflow);
    assert_eq!(err.frames().len(), 50);

    // the interpreter is usable again after the overflow unwound
    let ok = interp.evaluate(&call_pos(ident("length"), vec![ints(&[1])]), &env).unwrap();
    assert_eq!(ok, Value::Int(1));
}

#[test]
fn test_deep_recursion_within_limit() {
    let body = if_then_else(
        binary(ident("n"), BinOp::Eq, int(0)),
        int(0),
        add(int(1), call_pos(ident("count"), vec![binary(ident("n"), BinOp::Sub, int(1))])),
    );
    let program = block(vec![def("count", lambda(["n"], body)), call_pos(ident("count"), vec![int(5000)])]);
    assert_eq!(run(program).unwrap(), Value::Int(5000));
}

#[test]
fn test_undefined_variable_reports_position() {
    let pos = SourcePos::new("rules", 7, 3);
    let err = run(ident("missing").at(pos.clone())).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UndefinedVariable);
    assert_eq!(err.pos, Some(pos));
}

// ============================================
// Interchange and analysis
// ============================================

#[test]
fn test_evaluate_tree_decoded_from_json() {
    let json = r#"{
        "node": {"Binary": {
            "left": {"node": {"Literal": {"Int": 6}}, "pos": {"source": "json", "line": 1, "column": 1}},
            "op": "Mul",
            "right": {"node": {"Identifier": "seven"}, "pos": {"source": "json", "line": 1, "column": 5}}
        }},
        "pos": {"source": "json", "line": 1, "column": 3}
    }"#;
    let program = Spanned::<Expr>::from_json(json).unwrap();
    let mut interp = interpreter();
    interp.define("seven", Value::Int(7));
    let env = interp.new_env();
    assert_eq!(interp.evaluate(&program, &env).unwrap(), Value::Int(42));
}

#[test]
fn test_free_variables_of_program() {
    let program = block(vec![
        def("f", lambda(["x"], add(ident("x"), ident("offset")))),
        def("g", lambda(["y"], call_pos(ident("h"), vec![ident("y")]))),
        def("h", lambda(["z"], call_pos(ident("length"), vec![ident("z")]))),
    ]);
    let sets = analyze(&program);
    assert_eq!(
        sets.free.into_iter().collect::<Vec<_>>(),
        vec!["length".to_string(), "offset".to_string()]
    );
    assert!(sets.bound.contains("h"));
}
