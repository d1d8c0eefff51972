mod utils;

use minicc::data::prelude::*;
use utils::{assert_compiles, assert_errs, assert_message};

#[test]
fn hex_literal_global() {
    // 0x2A lexes to 42 and initializes inside __minic_init
    let functions = assert_compiles("int a = 0x2A;");
    let init = utils::function(&functions, "__minic_init");
    assert_eq!(
        utils::code(init),
        vec![
            "('VARI', 'a')",
            "('MOVI', 42, 'R1')",
            "('STOREI', 'R1', 'a')",
        ]
    );
}

#[test]
fn mixed_arithmetic_reports_once() {
    assert_message(
        "int a;\nfloat b;\nvoid f(void) {\na = a + b;\n}",
        4,
        "Binary operation 'int + float' not supported",
    );
}

#[test]
fn break_outside_loop() {
    assert_message(
        "void f(void) { break; }",
        1,
        "Break statement must be within a loop",
    );
}

#[test]
fn break_inside_loop_is_fine() {
    assert_compiles("void f(void) { while (true) { break; } return; }");
}

#[test]
fn recursion_checks_clean() {
    assert_compiles(
        "int fact(int n) {
            if (n < 2) return 1;
            return n * fact(n - 1);
        }",
    );
}

#[test]
fn unterminated_comment_fails_the_compile() {
    let errs = assert_errs("int a; /* never closed");
    assert!(errs.iter().any(|e| e.data.to_string() == "Unterminated comment"));
}

#[test]
fn void_parameter_means_no_arguments() {
    assert_compiles("int f(void) { return 0; }\nint a = f();");
    let errs = assert_errs("int g(void x) { return 0; }");
    assert!(errs.iter().any(|e| e.data.to_string()
        == "Parameter 'x' has invalid type 'void' at function definition"));
}

#[test]
fn undefined_name_message() {
    assert_message(
        "void f(void) { x = 1; }",
        1,
        "Name 'x' was not defined",
    );
}

#[test]
fn redefinition_message_points_at_the_first_definition() {
    assert_message(
        "int a;\nfloat a;",
        2,
        "Name 'a' has already been defined at line 1",
    );
}

#[test]
fn missing_return_message() {
    assert_message(
        "int f(void) { 1; }",
        1,
        "Function 'f' has no return statement",
    );
}

#[test]
fn argument_tuple_rendering() {
    assert_message(
        "int f(int a) { return a; }\nint b = f(1.5);",
        2,
        "Function 'f' expects ('int',), but was called with ('float',)",
    );
}

#[test]
fn syntax_error_message_names_the_token() {
    let errs = assert_errs("int a @;");
    // the lexer complains about '@', then the parser about the ';'
    assert!(errs
        .iter()
        .any(|e| e.data.to_string() == "Illegal character '@'"));
}

#[test]
fn syntax_error_at_eof() {
    let errs = assert_errs("int f(void) {");
    assert!(errs
        .iter()
        .any(|e| e.data.to_string() == "Error de sintaxis. No mas entrada."));
    assert!(errs.iter().any(|e| e.location == Location::EOF));
}

#[test]
fn every_error_in_one_run() {
    let errs = assert_errs("int a = 1.5;\nbool b = 2;\nchar c = true;");
    assert_eq!(errs.len(), 3);
}

#[test]
fn exit_state_matches_error_presence() {
    // well-formed input: no diagnostics at all
    assert!(minicc::compile("int a;").is_ok());
    // ill-formed input: at least one diagnostic
    assert!(minicc::compile("int a = ;").is_err());
}
