//! End-to-end tests: source programs through the parser and engine with
//! collected output.

use trifold::{
    parse, run_program, CollectOutput, EngineOptions, FaultKind, InputSource, NoInput, RunStats,
    ScriptedInput,
};

/// Parses and runs `source` with no input, returning the run result and the
/// collected output streams.
fn run(source: &str) -> (Result<RunStats, trifold::Fault>, CollectOutput) {
    run_with_input(source, &mut NoInput)
}

fn run_with_input(
    source: &str,
    input: &mut impl InputSource,
) -> (Result<RunStats, trifold::Fault>, CollectOutput) {
    let program = parse(source).unwrap_or_else(|error| panic!("parse failed: {error}"));
    let mut output = CollectOutput::new();
    let result = run_program(&program, EngineOptions::default(), input, &mut output);
    (result, output)
}

fn expect_output(source: &str) -> String {
    let (result, output) = run(source);
    result.unwrap_or_else(|fault| panic!("run failed: {fault}"));
    output.into_primary()
}

fn expect_fault(source: &str) -> (FaultKind, CollectOutput) {
    let (result, output) = run(source);
    (result.unwrap_err().kind(), output)
}

#[test]
fn write_of_moved_string() {
    let output = expect_output(
        ".TRIFOLD
         DEFVAR GF@x
         MOVE GF@x string@hello
         WRITE GF@x",
    );
    assert_eq!(output, "hello\n");
}

#[test]
fn global_values_persist_across_frame_cycles() {
    let output = expect_output(
        ".TRIFOLD
         DEFVAR GF@g
         MOVE GF@g int@99
         CREATEFRAME
         PUSHFRAME
         POPFRAME
         CREATEFRAME
         PUSHFRAME
         POPFRAME
         WRITE GF@g",
    );
    assert_eq!(output, "99\n");
}

#[test]
fn push_pop_round_trip_restores_temporary() {
    let output = expect_output(
        ".TRIFOLD
         CREATEFRAME
         DEFVAR TF@v
         MOVE TF@v string@kept
         PUSHFRAME
         MOVE LF@v string@updated
         POPFRAME
         WRITE TF@v",
    );
    assert_eq!(output, "updated\n");
}

#[test]
fn local_frame_is_top_of_stack() {
    // Two nested frames: LF tracks the most recently pushed one, and popping
    // re-exposes the outer frame.
    let output = expect_output(
        ".TRIFOLD
         CREATEFRAME
         DEFVAR TF@depth
         MOVE TF@depth int@1
         PUSHFRAME
         CREATEFRAME
         DEFVAR TF@depth
         MOVE TF@depth int@2
         PUSHFRAME
         WRITE LF@depth
         POPFRAME
         WRITE LF@depth",
    );
    assert_eq!(output, "2\n1\n");
}

#[test]
fn equality_is_reflexive_including_unassigned() {
    let output = expect_output(
        ".TRIFOLD
         DEFVAR GF@a
         DEFVAR GF@b
         DEFVAR GF@r
         EQ GF@r GF@a GF@b
         WRITE GF@r
         EQ GF@r int@3 int@3
         WRITE GF@r
         EQ GF@r string@x string@y
         WRITE GF@r",
    );
    assert_eq!(output, "true\ntrue\nfalse\n");
}

#[test]
fn lt_gt_mutually_exclusive_with_eq() {
    let output = expect_output(
        ".TRIFOLD
         DEFVAR GF@r
         LT GF@r int@3 int@3
         WRITE GF@r
         GT GF@r int@3 int@3
         WRITE GF@r
         LT GF@r string@abc string@abd
         WRITE GF@r",
    );
    assert_eq!(output, "false\nfalse\ntrue\n");
}

#[test]
fn data_stack_is_lifo_for_stack_flavored_ops() {
    let output = expect_output(
        ".TRIFOLD
         DEFVAR GF@r
         PUSHS int@10
         PUSHS int@4
         SUBS
         POPS GF@r
         WRITE GF@r",
    );
    assert_eq!(output, "6\n");
}

#[test]
fn clears_empties_the_stack() {
    let (kind, output) = expect_fault(
        ".TRIFOLD
         DEFVAR GF@r
         PUSHS int@1
         PUSHS int@2
         CLEARS
         POPS GF@r",
    );
    assert_eq!(kind, FaultKind::MissingValue);
    assert_eq!(output.primary_output(), "");
}

#[test]
fn duplicate_global_define_halts_before_later_instructions() {
    let (kind, output) = expect_fault(
        ".TRIFOLD
         WRITE string@first
         DEFVAR GF@x
         DEFVAR GF@x
         WRITE string@never",
    );
    assert_eq!(kind, FaultKind::DuplicateDefinition);
    // Output produced before the fault stands.
    assert_eq!(output.primary_output(), "first\n");
}

#[test]
fn call_returns_to_instruction_after_call_site() {
    let output = expect_output(
        ".TRIFOLD
         CALL greet
         WRITE string@back
         JUMP done
         LABEL greet
         WRITE string@inside
         RETURN
         LABEL done",
    );
    assert_eq!(output, "inside\nback\n");
}

#[test]
fn stack_divide_by_zero_is_arithmetic_error() {
    let (kind, _) = expect_fault(
        ".TRIFOLD
         PUSHS int@5
         PUSHS int@0
         IDIVS",
    );
    assert_eq!(kind, FaultKind::ArithmeticError);
}

#[test]
fn high_water_mark_counts_peak_not_final() {
    let source = ".TRIFOLD
         DEFVAR GF@a
         CREATEFRAME
         DEFVAR TF@b
         DEFVAR TF@c
         PUSHFRAME
         POPFRAME
         CREATEFRAME";
    let (result, _) = run(source);
    let stats = result.unwrap();
    assert_eq!(stats.max_vars, 3);
    assert_eq!(stats.executed, 7);
}

#[test]
fn arithmetic_and_conversions() {
    let output = expect_output(
        ".TRIFOLD
         DEFVAR GF@i
         DEFVAR GF@f
         ADD GF@i int@2 int@3
         WRITE GF@i
         INT2FLOAT GF@f GF@i
         DIV GF@f GF@f float@2.0
         WRITE GF@f
         FLOAT2INT GF@i GF@f
         WRITE GF@i
         MUL GF@f float@0x1.8p+1 float@2.0
         WRITE GF@f",
    );
    assert_eq!(output, "5\n0x1.4000000000000p+1\n2\n0x1.8000000000000p+2\n");
}

#[test]
fn mixed_numeric_operands_are_wrong_operand_type() {
    let (kind, _) = expect_fault(
        ".TRIFOLD
         DEFVAR GF@r
         ADD GF@r int@1 float@1.0",
    );
    assert_eq!(kind, FaultKind::WrongOperandType);
}

#[test]
fn string_operations() {
    let output = expect_output(
        ".TRIFOLD
         DEFVAR GF@s
         DEFVAR GF@n
         DEFVAR GF@c
         CONCAT GF@s string@hello string@\\032world
         WRITE GF@s
         STRLEN GF@n GF@s
         WRITE GF@n
         GETCHAR GF@c GF@s int@0
         WRITE GF@c
         SETCHAR GF@s int@0 string@J
         WRITE GF@s
         STRI2INT GF@n GF@s int@1
         WRITE GF@n
         INT2CHAR GF@c int@33
         WRITE GF@c",
    );
    assert_eq!(output, "hello world\n11\nh\nJello world\n101\n!\n");
}

#[test]
fn getchar_out_of_bounds() {
    let (kind, _) = expect_fault(
        ".TRIFOLD
         DEFVAR GF@c
         GETCHAR GF@c string@abc int@3",
    );
    assert_eq!(kind, FaultKind::StringIndexError);
}

#[test]
fn type_of_reports_unassigned_as_empty_string() {
    let output = expect_output(
        ".TRIFOLD
         DEFVAR GF@x
         DEFVAR GF@t
         TYPE GF@t GF@x
         CONCAT GF@t string@< GF@t
         CONCAT GF@t GF@t string@>
         WRITE GF@t
         MOVE GF@x float@1.0
         TYPE GF@t GF@x
         WRITE GF@t",
    );
    assert_eq!(output, "<>\nfloat\n");
}

#[test]
fn write_of_unassigned_is_missing_value() {
    let (kind, _) = expect_fault(
        ".TRIFOLD
         DEFVAR GF@x
         WRITE GF@x",
    );
    assert_eq!(kind, FaultKind::MissingValue);
}

#[test]
fn read_converts_and_defaults() {
    let mut input = ScriptedInput::new(["42", "not-a-number", "TRUE", "0x1.8p+1"]);
    let (result, output) = run_with_input(
        ".TRIFOLD
         DEFVAR GF@x
         READ GF@x int
         WRITE GF@x
         READ GF@x int
         WRITE GF@x
         READ GF@x bool
         WRITE GF@x
         READ GF@x float
         WRITE GF@x
         READ GF@x string
         WRITE GF@x",
        &mut input,
    );
    result.unwrap();
    // Last READ hits end-of-input and substitutes the empty string.
    assert_eq!(output.primary_output(), "42\n0\ntrue\n0x1.8000000000000p+1\n\n");
}

#[test]
fn undefined_variable_and_missing_frames() {
    let (kind, _) = expect_fault(".TRIFOLD\nWRITE GF@ghost");
    assert_eq!(kind, FaultKind::UndefinedVariable);

    let (kind, _) = expect_fault(".TRIFOLD\nDEFVAR TF@x");
    assert_eq!(kind, FaultKind::FrameError);

    let (kind, _) = expect_fault(".TRIFOLD\nDEFVAR LF@x");
    assert_eq!(kind, FaultKind::FrameError);

    let (kind, _) = expect_fault(".TRIFOLD\nPOPFRAME");
    assert_eq!(kind, FaultKind::FrameError);
}

#[test]
fn duplicate_label_fails_before_any_execution() {
    let (kind, output) = expect_fault(
        ".TRIFOLD
         WRITE string@unreached
         LABEL twice
         LABEL twice",
    );
    assert_eq!(kind, FaultKind::DuplicateDefinition);
    // Table construction precedes execution, so even the first WRITE never ran.
    assert_eq!(output.primary_output(), "");
}

#[test]
fn jump_to_missing_label_is_undefined_label() {
    let (kind, _) = expect_fault(".TRIFOLD\nJUMP nowhere");
    assert_eq!(kind, FaultKind::UndefinedLabel);
}

#[test]
fn conditional_jumps_branch_on_equality() {
    let output = expect_output(
        ".TRIFOLD
         JUMPIFEQ eq int@1 int@1
         WRITE string@skipped
         LABEL eq
         JUMPIFNEQ neq int@1 int@1
         WRITE string@shown
         LABEL neq
         PUSHS string@a
         PUSHS string@b
         JUMPIFNEQS end
         WRITE string@skipped
         LABEL end",
    );
    assert_eq!(output, "shown\n");
}

#[test]
fn loop_with_stack_conversions() {
    // Counts down from 3, writing each character code.
    let output = expect_output(
        ".TRIFOLD
         DEFVAR GF@n
         DEFVAR GF@c
         MOVE GF@n int@3
         LABEL loop
         JUMPIFEQ done GF@n int@0
         PUSHS GF@n
         PUSHS int@96
         ADDS
         INT2CHARS
         POPS GF@c
         WRITE GF@c
         SUB GF@n GF@n int@1
         JUMP loop
         LABEL done",
    );
    assert_eq!(output, "c\nb\na\n");
}

#[test]
fn local_duplicate_define_is_silent_no_op() {
    let output = expect_output(
        ".TRIFOLD
         CREATEFRAME
         DEFVAR TF@x
         PUSHFRAME
         MOVE LF@x int@7
         DEFVAR LF@x
         WRITE LF@x",
    );
    // The redefinition did not reset the value to unassigned.
    assert_eq!(output, "7\n");
}

#[test]
fn strict_option_rejects_local_duplicate_define() {
    let program = parse(
        ".TRIFOLD
         CREATEFRAME
         DEFVAR TF@x
         PUSHFRAME
         DEFVAR LF@x",
    )
    .unwrap();
    let mut output = CollectOutput::new();
    let options = EngineOptions {
        strict_local_redefine: true,
    };
    let fault = run_program(&program, options, &mut NoInput, &mut output).unwrap_err();
    assert_eq!(fault.kind(), FaultKind::DuplicateDefinition);
}

#[test]
fn dprint_and_break_leave_primary_output_untouched() {
    let (result, output) = run(
        ".TRIFOLD
         DEFVAR GF@x
         MOVE GF@x string@diag
         DPRINT GF@x
         BREAK
         WRITE string@out",
    );
    result.unwrap();
    assert_eq!(output.primary_output(), "out\n");
    assert!(output.diagnostic_output().starts_with("diag\n"));
    assert!(output.diagnostic_output().contains("BREAK at instruction 3"));
    assert!(output.diagnostic_output().contains("x = string@diag"));
}

#[test]
fn fault_statuses_reach_the_cli_contract() {
    let (kind, _) = expect_fault(".TRIFOLD\nPUSHS int@1\nPUSHS int@0\nIDIVS");
    assert_eq!(kind.exit_status(), 57);
    let (kind, _) = expect_fault(".TRIFOLD\nWRITE GF@ghost");
    assert_eq!(kind.exit_status(), 54);
}
