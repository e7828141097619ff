// End-to-end scenarios driving whole source programs through the public
// m_interpreter API, one parse/check/evaluate pass per test.

use pretty_assertions::assert_eq;

use m_interpreter::{check_source, run_source, RunOutcome};

fn run(source: &str) -> RunOutcome {
    run_source(source)
}

fn expect_ran(source: &str) -> i32 {
    match run(source) {
        RunOutcome::Ran(code) => code,
        other => panic!("expected the program to run, got {:?}", other),
    }
}

#[test]
fn s1_indexed_assignment_then_read_back() {
    let source = "A = zeros(3, 3); A[0,0] = 1; print A[0,0]; return A[0,0];";
    let (_, errors) = check_source(source).unwrap();
    assert!(errors.is_empty(), "unexpected static errors: {:?}", errors);
    assert_eq!(expect_ran(source), 1);
}

#[test]
fn s2_for_loop_leaves_scope_depth_unchanged() {
    let source = "for i = 0:3 { print i; }\nreturn 0;";
    assert_eq!(expect_ran(source), 0);
}

#[test]
fn s3_continue_skips_the_rest_of_the_while_body() {
    // i=0: prints, i becomes 1. i=1: continue before print. i=2: prints, i becomes 3. loop ends.
    // total counts how many times the print line was actually reached.
    let source = "
        i = 0;
        total = 0;
        while (i < 3) {
            if (i == 1) { i = i + 1; continue; }
            total = total + 1;
            i = i + 1;
        }
        return total;
    ";
    assert_eq!(expect_ran(source), 2);
}

#[test]
fn s4_transpose_swaps_matrix_dimensions() {
    let source = "
        A = [[1,2],[3,4]];
        B = A';
        print B;
        return 0;
    ";
    let (_, errors) = check_source(source).unwrap();
    assert!(errors.is_empty(), "unexpected static errors: {:?}", errors);
    assert_eq!(expect_ran(source), 0);
}

#[test]
fn s5_elementwise_shape_mismatch_is_rejected_and_never_runs() {
    let source = "A = [1,2,3]; B = [1,2]; C = A .+ B;";
    match run(source) {
        RunOutcome::StaticErrors(errors) => {
            assert_eq!(errors.len(), 1);
        }
        other => panic!("expected static errors, got {:?}", other),
    }
}

#[test]
fn s6_top_level_return_sets_the_exit_code() {
    let source = "x = 5; return x + 2;";
    assert_eq!(expect_ran(source), 7);
}

#[test]
fn assignment_inside_nested_block_mutates_the_enclosing_binding() {
    let source = "
        total = 0;
        for i = 0:5 {
            if (i < 3) {
                total = total + 1;
            }
        }
        return total;
    ";
    assert_eq!(expect_ran(source), 3);
}

#[test]
fn break_exits_only_the_nearest_loop() {
    let source = "
        count = 0;
        for i = 0:3 {
            for j = 0:10 {
                if (j == 2) { break; }
                count = count + 1;
            }
        }
        return count;
    ";
    assert_eq!(expect_ran(source), 6);
}

#[test]
fn return_inside_deeply_nested_loops_exits_the_whole_program() {
    let source = "
        for i = 0:10 {
            for j = 0:10 {
                if (j == 2) { return 99; }
            }
        }
        return -1;
    ";
    assert_eq!(expect_ran(source), 99);
}

#[test]
fn returning_a_non_int_value_yields_exit_code_negative_one() {
    let source = "return \"done\";";
    assert_eq!(expect_ran(source), -1);
}

#[test]
fn division_by_zero_terminates_with_a_runtime_error() {
    let source = "x = 1 / 0;";
    match run(source) {
        RunOutcome::RuntimeError(err) => assert!(err.to_string().contains("division by zero")),
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

#[test]
fn break_outside_any_loop_is_a_static_error() {
    let source = "break;";
    match run(source) {
        RunOutcome::StaticErrors(errors) => assert_eq!(errors.len(), 1),
        other => panic!("expected a static error, got {:?}", other),
    }
}

#[test]
fn string_concatenation_uses_plus() {
    let source = "
        a = \"foo\";
        b = \"bar\";
        c = a + b;
        print c;
        return 0;
    ";
    let (_, errors) = check_source(source).unwrap();
    assert!(errors.is_empty(), "unexpected static errors: {:?}", errors);
    assert_eq!(expect_ran(source), 0);
}

#[test]
fn malformed_source_is_reported_as_a_parse_error() {
    match run("x = ;") {
        RunOutcome::ParseError(_) => {}
        other => panic!("expected a parse error, got {:?}", other),
    }
}
