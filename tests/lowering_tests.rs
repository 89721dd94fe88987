// IR shape of lowered programs, plus property tests over array bounds and loops

use mila::codegen::ENTRY_POINT;
use mila::compile;
use mila::ir::{BinaryOp, Function, Instr, Module, Terminator, ValueId};
use mila::vm::{Machine, MockConsole};
use proptest::prelude::*;

fn function<'m>(module: &'m Module, name: &str) -> &'m Function {
    let id = module.find(name).expect("function not found");
    module.get(id).expect("dangling function id")
}

/// Fold a value built from constants, `add` and `sub`
fn constant(function: &Function, value: ValueId) -> Option<i64> {
    let defining = function
        .blocks
        .iter()
        .flat_map(|block| &block.instrs)
        .find(|instr| match instr {
            Instr::Const { dest, .. } | Instr::Binary { dest, .. } | Instr::Load { dest, .. } => {
                *dest == value
            }
            _ => false,
        })?;

    match defining {
        Instr::Const { value, .. } => Some(*value),
        Instr::Binary { op, lhs, rhs, .. } => {
            let lhs = constant(function, *lhs)?;
            let rhs = constant(function, *rhs)?;
            match op {
                BinaryOp::Add => Some(lhs + rhs),
                BinaryOp::Sub => Some(lhs - rhs),
                _ => None,
            }
        }
        _ => None,
    }
}

fn store_offsets(function: &Function) -> Vec<Option<i64>> {
    function
        .blocks
        .iter()
        .flat_map(|block| &block.instrs)
        .filter_map(|instr| match instr {
            Instr::Store {
                offset: Some(offset),
                ..
            } => Some(constant(function, *offset)),
            _ => None,
        })
        .collect()
}

fn run(source: &str) -> Vec<String> {
    let module = compile(source).expect("Compilation failed");
    let mut machine = Machine::new(&module, MockConsole::new());
    let result = machine.run();
    assert!(result.is_ok(), "Execution failed: {:?}", result);
    machine.into_console().get_output()
}

#[test]
fn test_forward_and_definition_share_one_function() {
    let module = compile(
        r#"
        program fwd;
        procedure p(a, b: integer); forward;
        procedure q;
        begin
          p(1, 2)
        end;
        procedure p(a, b: integer);
        begin
          writeln(a + b)
        end;
        begin
          q
        end.
    "#,
    )
    .expect("Compilation failed");

    let matching: Vec<_> = module.functions.iter().filter(|f| f.name == "p").collect();
    assert_eq!(matching.len(), 1);
    assert!(!matching[0].is_declaration());
    assert_eq!(matching[0].signature.param_count, 2);
    assert!(!matching[0].signature.returns_value);
}

#[test]
fn test_every_block_is_terminated() {
    let module = compile(
        r#"
        program shapes;
        var i, s: integer;
        function twice(x: integer): integer;
        begin
          twice := x * 2;
          exit;
          twice := 0
        end;
        begin
          s := 0;
          for i := 1 to 10 do
          begin
            if i mod 2 = 0 then s := s + twice(i) else s := s - 1;
            while s > 100 do
            begin
              s := s - 100;
              break
            end
          end;
          writeln(s)
        end.
    "#,
    )
    .expect("Compilation failed");

    for function in &module.functions {
        for block in &function.blocks {
            assert!(
                block.terminator.is_some(),
                "block '{}' of {} is open",
                block.label,
                function.name
            );
        }
    }
}

#[test]
fn test_if_lowers_to_three_blocks() {
    let module = compile("program t; var x: integer; begin if x then x := 1 end.")
        .expect("Compilation failed");
    let main = function(&module, ENTRY_POINT);

    let labels: Vec<_> = main.blocks.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, vec!["entry", "then", "else", "ifcont"]);
    assert!(matches!(
        main.blocks[0].terminator,
        Some(Terminator::CondBranch {
            then_block: 1,
            else_block: 2,
            ..
        })
    ));
    assert_eq!(main.blocks[1].terminator, Some(Terminator::Branch(3)));
    assert_eq!(main.blocks[2].terminator, Some(Terminator::Branch(3)));
}

#[test]
fn test_while_body_branches_back_to_condition() {
    let module = compile("program t; var x: integer; begin while x < 3 do inc(x) end.")
        .expect("Compilation failed");
    let main = function(&module, ENTRY_POINT);

    let labels: Vec<_> = main.blocks.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, vec!["entry", "cond", "loop", "after"]);
    assert_eq!(main.blocks[0].terminator, Some(Terminator::Branch(1)));
    assert_eq!(main.blocks[2].terminator, Some(Terminator::Branch(1)));
    assert_eq!(main.blocks[3].terminator, Some(Terminator::Return(None)));
}

#[test]
fn test_function_returns_accumulator() {
    let module = compile("program t; function one: integer; begin one := 1 end; begin end.")
        .expect("Compilation failed");
    let one = function(&module, "one");

    assert!(one.signature.returns_value);
    assert!(matches!(
        one.blocks.last().and_then(|b| b.terminator),
        Some(Terminator::Return(Some(_)))
    ));
}

#[test]
fn test_only_first_index_of_chain_is_lowered() {
    let module = compile(
        "program t; var a: array [1 .. 3] of integer; begin a[2][9] := 5; a[3][1][1] := 6 end.",
    )
    .expect("Compilation failed");

    let offsets = store_offsets(function(&module, ENTRY_POINT));
    assert_eq!(offsets, vec![Some(1), Some(2)]);
}

proptest! {
    #[test]
    fn array_bounds_map_to_first_and_last_cell(from in -1000i64..1000, len in 1i64..64) {
        let to = from + len - 1;
        let source = format!(
            "program t; var a: array [{from} .. {to}] of integer; begin a[{from}] := 1; a[{to}] := 2 end."
        );
        let module = compile(&source).expect("Compilation failed");
        let offsets = store_offsets(function(&module, ENTRY_POINT));
        prop_assert_eq!(offsets, vec![Some(0), Some(to - from)]);
    }

    #[test]
    fn filled_array_reads_back(from in -50i64..50, len in 1i64..20) {
        let to = from + len - 1;
        let source = format!(
            "program t;
             var a: array [{from} .. {to}] of integer; i: integer;
             begin
               for i := {from} to {to} do a[i] := i * 3;
               writeln(a[{from}]);
               writeln(a[{to}])
             end."
        );
        prop_assert_eq!(run(&source), vec![(from * 3).to_string(), (to * 3).to_string()]);
    }

    #[test]
    fn for_loops_visit_inclusive_range(a in -5i64..5, b in -5i64..5) {
        let source = format!(
            "program t; var i: integer;
             begin
               for i := {a} to {b} do writeln(i);
               for i := {b} downto {a} do writeln(i)
             end."
        );
        let up: Vec<String> = (a..=b).map(|i| i.to_string()).collect();
        let down: Vec<String> = (a..=b).rev().map(|i| i.to_string()).collect();
        prop_assert_eq!(run(&source), [up, down].concat());
    }
}
