// Integration tests: Mila source through lowering to execution on the VM

use mila::codegen::SemanticError;
use mila::vm::{Limits, Machine, MockConsole, RuntimeError, DEFAULT_MAX_CALL_DEPTH};
use mila::{compile, CompileError};

fn run_with_input(source: &str, input: &str) -> Vec<String> {
    let module = compile(source).expect("Compilation failed");
    let mut machine = Machine::new(&module, MockConsole::with_input(input));
    let result = machine.run();
    assert!(result.is_ok(), "Execution failed: {:?}", result);
    machine.into_console().get_output()
}

fn run(source: &str) -> Vec<String> {
    run_with_input(source, "")
}

fn run_err(source: &str, limits: Limits) -> RuntimeError {
    let module = compile(source).expect("Compilation failed");
    let mut machine = Machine::new(&module, MockConsole::new()).with_limits(limits);
    machine.run().expect_err("Execution should fail")
}

#[test]
fn test_for_directions() {
    let source = r#"
        program loops;
        var i: integer;
        begin
          for i := 1 to 3 do writeln(i);
          for i := 3 downto 1 do writeln(i)
        end.
    "#;

    assert_eq!(run(source), vec!["1", "2", "3", "3", "2", "1"]);
}

#[test]
fn test_for_limit_is_reevaluated() {
    let source = r#"
        program limit;
        var i, n: integer;
        begin
          n := 3;
          for i := 1 to n do
          begin
            writeln(i);
            n := 2
          end
        end.
    "#;

    assert_eq!(run(source), vec!["1", "2"]);
}

#[test]
fn test_break_leaves_innermost_loop() {
    let source = r#"
        program brk;
        var i, j: integer;
        begin
          i := 0;
          while i < 3 do
          begin
            j := 0;
            while 1 do
            begin
              if j = 2 then break;
              j := j + 1
            end;
            writeln(i * 10 + j);
            i := i + 1
          end
        end.
    "#;

    assert_eq!(run(source), vec!["2", "12", "22"]);
}

#[test]
fn test_break_in_for_skips_step() {
    let source = r#"
        program brk;
        var i: integer;
        begin
          for i := 1 to 10 do
            if i = 4 then break;
          writeln(i)
        end.
    "#;

    assert_eq!(run(source), vec!["4"]);
}

#[test]
fn test_arrays_with_negative_bounds() {
    let source = r#"
        program arr;
        var a: array [-2 .. 2] of integer;
            i, s: integer;
        begin
          for i := -2 to 2 do a[i] := i * i;
          s := 0;
          for i := -2 to 2 do s := s + a[i];
          writeln(s);
          writeln(a[-2]);
          writeln(a[2])
        end.
    "#;

    assert_eq!(run(source), vec!["10", "4", "4"]);
}

#[test]
fn test_recursive_function() {
    let source = r#"
        program fact;
        function fact(n: integer): integer;
        begin
          if n <= 1 then fact := 1
          else fact := n * fact(n - 1)
        end;
        begin
          writeln(fact(10))
        end.
    "#;

    assert_eq!(run(source), vec!["3628800"]);
}

#[test]
fn test_forward_mutual_recursion() {
    let source = r#"
        program parity;
        function isodd(n: integer): integer; forward;

        function iseven(n: integer): integer;
        begin
          if n = 0 then iseven := 1 else iseven := isodd(n - 1)
        end;

        function isodd(n: integer): integer;
        begin
          if n = 0 then isodd := 0 else isodd := iseven(n - 1)
        end;

        begin
          writeln(iseven(10));
          writeln(isodd(7));
          writeln(iseven(3))
        end.
    "#;

    assert_eq!(run(source), vec!["1", "1", "0"]);
}

#[test]
fn test_exit_returns_accumulator() {
    let source = r#"
        program ex;
        function firstover(limit: integer): integer;
        var i: integer;
        begin
          firstover := -1;
          for i := 1 to 100 do
            if i * i > limit then
            begin
              firstover := i;
              exit
            end
        end;
        begin
          writeln(firstover(50));
          writeln(firstover(100000))
        end.
    "#;

    assert_eq!(run(source), vec!["8", "-1"]);
}

#[test]
fn test_exit_in_procedure_and_program() {
    let source = r#"
        program stop;
        procedure p;
        begin
          writeln(1);
          exit;
          writeln(2)
        end;
        begin
          p;
          writeln(3);
          exit;
          writeln(4)
        end.
    "#;

    assert_eq!(run(source), vec!["1", "3"]);
}

#[test]
fn test_readln_and_write() {
    let source = r#"
        program io;
        var a: integer;
            v: array [1 .. 2] of integer;
        begin
          readln(a);
          readln(v[2]);
          write(a);
          write(v[2]);
          writeln;
          writeln(a + v[2])
        end.
    "#;

    assert_eq!(run_with_input(source, "5 7"), vec!["57", "12"]);
}

#[test]
fn test_constants_inc_dec_and_division() {
    let source = r#"
        program misc;
        const base = 10;
              neg = -3;
        var x: integer;
        begin
          x := base;
          inc(x);
          inc(x);
          dec(x);
          writeln(x);
          writeln(x div 3);
          writeln(x mod 3);
          writeln(x / 2);
          writeln(neg * 2);
          writeln(-7 div 2);
          writeln(-7 mod 2)
        end.
    "#;

    assert_eq!(run(source), vec!["11", "3", "2", "5", "-6", "-3", "-1"]);
}

#[test]
fn test_logical_and_bitwise_operators() {
    let source = r#"
        program logic;
        begin
          writeln(not 0);
          writeln(not 5);
          writeln((1 < 2) and (3 > 2));
          writeln(6 and 3);
          writeln(6 or 1);
          writeln(2 <> 2)
        end.
    "#;

    assert_eq!(run(source), vec!["1", "0", "1", "2", "7", "0"]);
}

#[test]
fn test_if_else_chain() {
    let source = r#"
        program grade;
        procedure classify(n: integer);
        begin
          if n < 0 then writeln(-1)
          else if n = 0 then writeln(0)
          else writeln(1)
        end;
        begin
          classify(-5);
          classify(0);
          classify(9)
        end.
    "#;

    assert_eq!(run(source), vec!["-1", "0", "1"]);
}

#[test]
fn test_zero_argument_function_without_parens() {
    let source = r#"
        program bare;
        var counter: integer;
        function seven: integer;
        begin
          seven := 7
        end;
        begin
          counter := seven + seven();
          writeln(counter)
        end.
    "#;

    assert_eq!(run(source), vec!["14"]);
}

#[test]
fn test_routine_locals_are_fresh_per_call() {
    let source = r#"
        program depth;
        function sum(n: integer): integer;
        var rest: integer;
        begin
          rest := 0;
          if n > 0 then rest := sum(n - 1);
          sum := n + rest
        end;
        begin
          writeln(sum(100))
        end.
    "#;

    assert_eq!(run(source), vec!["5050"]);
}

#[test]
fn test_division_by_zero_is_runtime_error() {
    let source = "program z; var x: integer; begin x := 0; writeln(1 div x) end.";
    assert!(matches!(
        run_err(source, Limits::default()),
        RuntimeError::DivisionByZero { .. }
    ));
}

#[test]
fn test_forward_without_body_fails_when_called() {
    let source = "program f; procedure p; forward; begin p end.";
    assert_eq!(
        run_err(source, Limits::default()),
        RuntimeError::UndefinedFunction {
            name: "p".to_string()
        }
    );
}

#[test]
fn test_call_depth_limit() {
    let source = r#"
        program deep;
        procedure down(n: integer);
        begin
          down(n + 1)
        end;
        begin
          down(0)
        end.
    "#;

    assert_eq!(
        run_err(source, Limits::default().with_max_call_depth(50)),
        RuntimeError::StackOverflow { limit: 50 }
    );
}

#[test]
fn test_deep_recursion_within_default_limit() {
    let source = r#"
        program deep;
        function down(n: integer): integer;
        begin
          if n = 0 then down := 0
          else down := down(n - 1) + 1
        end;
        begin
          writeln(down(900))
        end.
    "#;

    assert_eq!(run(source), vec!["900"]);
}

#[test]
fn test_default_call_depth_limit() {
    let source = r#"
        program deep;
        function down(n: integer): integer;
        begin
          down := down(n + 1) + 1
        end;
        begin
          writeln(down(0))
        end.
    "#;

    assert_eq!(
        run_err(source, Limits::default()),
        RuntimeError::StackOverflow {
            limit: DEFAULT_MAX_CALL_DEPTH
        }
    );
}

#[test]
fn test_call_depth_limit_on_small_thread() {
    let source = r#"
        program deep;
        procedure down(n: integer);
        begin
          down(n + 1)
        end;
        begin
          down(0)
        end.
    "#;
    let module = compile(source).expect("Compilation failed");

    let handle = std::thread::Builder::new()
        .stack_size(256 * 1024)
        .spawn(move || {
            let limits = Limits::default().with_max_call_depth(100_000);
            Machine::new(&module, MockConsole::new())
                .with_limits(limits)
                .run()
        })
        .expect("Failed to spawn thread");

    assert_eq!(
        handle.join().expect("Execution thread panicked"),
        Err(RuntimeError::StackOverflow { limit: 100_000 })
    );
}

#[test]
fn test_extra_array_indices_are_ignored() {
    let source = r#"
        program chain;
        var a: array [0 .. 9] of integer;
        begin
          a[2][9] := 5;
          writeln(a[2][7]);
          writeln(a[2])
        end.
    "#;

    assert_eq!(run(source), vec!["5", "5"]);
}

#[test]
fn test_step_limit() {
    let source = "program spin; begin while 1 do ; end.";
    assert_eq!(
        run_err(source, Limits::default().with_max_steps(1000)),
        RuntimeError::StepLimitExceeded { limit: 1000 }
    );
}

#[test]
fn test_out_of_range_index_is_runtime_error() {
    let source = r#"
        program oob;
        var a: array [1 .. 3] of integer;
        begin
          a[4] := 1
        end.
    "#;

    assert!(matches!(
        run_err(source, Limits::default()),
        RuntimeError::OutOfBounds {
            index: 3,
            size: 3,
            ..
        }
    ));
}

#[test]
fn test_parse_error_reported() {
    let err = compile("program p; begin x := 1 < 2 < 3 end.").unwrap_err();
    assert!(matches!(err, CompileError::Parse(_)), "{:?}", err);
}

#[test]
fn test_routine_bodies_do_not_see_outer_variables() {
    let err = compile(
        r#"
        program vis;
        var g: integer;
        procedure p;
        begin
          g := 1
        end;
        begin
          g := 2
        end.
    "#,
    )
    .unwrap_err();

    match err {
        CompileError::Lower(errors) => {
            assert!(matches!(
                errors.errors[..],
                [SemanticError::Unbound { ref name, .. }] if name == "g"
            ));
        }
        other => panic!("Expected lowering errors, got {:?}", other),
    }
}

#[test]
fn test_all_semantic_errors_reported() {
    let err = compile(
        r#"
        program many;
        const k = 1;
        var a: array [0 .. 3] of integer;
        begin
          k := 2;
          a := 1;
          break;
          undefined(1)
        end.
    "#,
    )
    .unwrap_err();

    let message = err.to_string();
    match err {
        CompileError::Lower(errors) => assert_eq!(errors.errors.len(), 4),
        other => panic!("Expected lowering errors, got {:?}", other),
    }
    assert!(message.contains("cannot assign to constant 'k'"), "{}", message);
    assert!(message.contains("'break' outside of a loop"), "{}", message);
}
