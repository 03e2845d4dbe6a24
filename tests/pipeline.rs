use keto::compiler::Location;
use keto::disassembler::{disassemble_chunk, disassemble_instruction};
use keto::lexer::{Scanner, TokenKind};
use keto::{
    Chunk, Config, Fault, InterpretError, InterpretResult, OpCode, RuntimeError, Value, Vm, compile,
    compile_source,
};

fn eval(source: &str) -> Value {
    Vm::new().interpret(source).unwrap_or_else(|e| panic!("{source}: {e}"))
}

// --- Disassembly ---

#[test]
fn golden_disassembly_of_hand_built_chunk() {
    let mut chunk = Chunk::new();
    let constant = chunk.add_constant(Value::Number(1.2)).unwrap();
    chunk.write_op(OpCode::Constant, 123);
    chunk.write(constant, 123);
    chunk.write_op(OpCode::Negate, 123);
    chunk.write_op(OpCode::Return, 123);

    assert_eq!(
        disassemble_chunk(&chunk, "test"),
        "== test ==\n0000  123 CONSTANT            0 '1.2'\n0002    | NEGATE\n0003    | RETURN\n"
    );
    assert_eq!(Vm::new().run(&chunk), Ok(Value::Number(-1.2)));
}

#[test]
fn disassembly_walks_every_compiled_instruction() {
    let (chunk, result) = compile_source("!(1 + 2 > 3) == false");
    assert!(result.is_ok());
    let mut offset = 0;
    let mut count = 0;
    while offset < chunk.len() {
        let (_, next) = disassemble_instruction(&chunk, offset);
        assert!(next > offset);
        offset = next;
        count += 1;
    }
    assert_eq!(offset, chunk.len());
    // 3 constants, Add, Greater, Not, False, Equal, Return
    assert_eq!(count, 9);
}

// --- Evaluation ---

#[test]
fn arithmetic_precedence() {
    assert_eq!(eval("-2 + 3 * 4"), Value::Number(10.0));
    assert_eq!(eval("(-2 + 3) * 4"), Value::Number(4.0));
    assert_eq!(eval("8 / 2 / 2"), Value::Number(2.0));
    assert_eq!(eval("--1"), Value::Number(1.0));
}

#[test]
fn less_equal_compiles_to_greater_not() {
    let (chunk, result) = compile_source("3 <= 3");
    assert!(result.is_ok());
    assert!(chunk.code().contains(&(OpCode::Greater as u8)));
    assert!(chunk.code().contains(&(OpCode::Not as u8)));
    assert_eq!(eval("3 <= 3"), Value::Bool(true));
    assert_eq!(eval("4 <= 3"), Value::Bool(false));
    assert_eq!(eval("2 >= 3"), Value::Bool(false));
}

#[test]
fn falsey_rules() {
    assert_eq!(eval("!nil"), Value::Bool(true));
    assert_eq!(eval("!false"), Value::Bool(true));
    assert_eq!(eval("!0"), Value::Bool(true));
    assert_eq!(eval("!-0"), Value::Bool(true));
    assert_eq!(eval("!true"), Value::Bool(false));
    assert_eq!(eval("!1"), Value::Bool(false));
    assert_eq!(eval("!0.5"), Value::Bool(false));
}

#[test]
fn equality_across_types() {
    assert_eq!(eval("nil == nil"), Value::Bool(true));
    assert_eq!(eval("nil == false"), Value::Bool(false));
    assert_eq!(eval("0 == false"), Value::Bool(false));
    assert_eq!(eval("1 == 1.0"), Value::Bool(true));
    assert_eq!(eval("true != false"), Value::Bool(true));
    assert_eq!(eval("0 / 0 == 0 / 0"), Value::Bool(false));
}

#[test]
fn division_follows_ieee() {
    assert_eq!(eval("1 / 0"), Value::Number(f64::INFINITY));
    assert!(eval("0 / 0").as_number().is_some_and(f64::is_nan));
}

// --- Errors ---

#[test]
fn add_with_bool_is_runtime_error_and_empties_stack() {
    let mut vm = Vm::new();
    let outcome = vm.interpret("1 + true");
    assert_eq!(InterpretResult::from(&outcome), InterpretResult::RuntimeError);
    assert_eq!(
        outcome,
        Err(InterpretError::Runtime(RuntimeError { fault: Fault::OperandsMustBeNumbers, line: 1 }))
    );
    assert!(vm.stack().is_empty());

    // The VM stays usable afterwards.
    assert_eq!(vm.interpret("1 + 2"), Ok(Value::Number(3.0)));
}

#[test]
fn runtime_error_display() {
    let err = Vm::new().interpret("\n-nil").unwrap_err();
    assert_eq!(err.to_string(), "Operand must be a number.\n[line 2] in script");
}

#[test]
fn compile_error_never_runs() {
    let mut vm = Vm::new();
    let outcome = vm.interpret("1 + + 2");
    assert_eq!(InterpretResult::from(&outcome), InterpretResult::CompileError);
    let Err(InterpretError::Compile(errors)) = outcome else {
        panic!("expected compile error");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.to_string(), "[line    1] Error at '+': Expect expression.");
}

#[test]
fn unterminated_string() {
    let mut scanner = Scanner::new("\"abc");
    let token = scanner.scan_token();
    assert_eq!(token.kind, TokenKind::Error);
    assert_eq!(token.lexeme, "Unterminated string.");
    assert_eq!(scanner.scan_token().kind, TokenKind::Eof);

    let (_, result) = compile_source("\"abc");
    let errors = result.unwrap_err();
    let first = errors.iter().next().unwrap();
    assert_eq!(first.location, Location::Lexical);
    assert_eq!(first.to_string(), "[line    1] Error: Unterminated string.");
}

#[test]
fn trailing_input_is_rejected() {
    let (_, result) = compile_source("1 2");
    let errors = result.unwrap_err();
    assert_eq!(errors.to_string(), "[line    1] Error at '2': Expect end of expression.");
}

#[test]
fn empty_source_reports_at_end() {
    let (_, result) = compile_source("");
    assert_eq!(result.unwrap_err().to_string(), "[line    1] Error at end: Expect expression.");
}

// --- Invariants ---

#[test]
fn compiling_is_idempotent() {
    let source = "(1 + 2) * -3 >= !nil == false";
    let (a, ra) = compile_source(source);
    let (b, rb) = compile_source(source);
    assert_eq!(ra, rb);
    assert_eq!(a.code(), b.code());
    assert_eq!(a.lines(), b.lines());
    assert_eq!(a.constants(), b.constants());
}

#[test]
fn code_and_lines_stay_parallel() {
    for source in ["1", "1 +\n2 *\n3", "((((1))))", "1 +", "", "!true == nil"] {
        let mut chunk = Chunk::new();
        let _ = compile(source, &mut chunk);
        assert_eq!(chunk.code().len(), chunk.lines().len(), "source: {source:?}");
        assert_eq!(chunk.code().last(), Some(&(OpCode::Return as u8)), "source: {source:?}");
    }
}

#[test]
fn constant_pool_overflow() {
    let source = (0..=256).map(|n| n.to_string()).collect::<Vec<_>>().join(" + ");
    let (chunk, result) = compile_source(&source);

    let errors = result.unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.to_string(),
        "[line    1] Error at '256': Too many constants in one chunk."
    );
    assert_eq!(chunk.constants().len(), 256);

    // 255 constants fit and still run.
    let source = (0..255).map(|_| "1").collect::<Vec<_>>().join(" + ");
    assert_eq!(eval(&source), Value::Number(255.0));
}

#[test]
fn config_switches_do_not_change_results() {
    let config = Config::default().with_trace_execution(true).with_print_code(true);
    let mut vm = Vm::with_config(config);
    assert_eq!(vm.interpret("(1 + 2) * 3"), Ok(Value::Number(9.0)));
}

#[test]
fn deep_nesting_overflows_stack_at_runtime() {
    // Each left operand stays on the stack until the innermost one is pushed.
    let source = format!("{}nil{}", "nil == (".repeat(300), ")".repeat(300));
    let err = Vm::new().interpret(&source).unwrap_err();
    assert_eq!(
        err,
        InterpretError::Runtime(RuntimeError { fault: Fault::StackOverflow, line: 1 })
    );
}
