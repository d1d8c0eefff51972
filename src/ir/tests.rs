use super::{compile, Function, Instr, Opcode};
use crate::check;
use crate::lex::Lexer;
use crate::parse::Parser;

fn compile_src(src: &str) -> Vec<Function> {
    let mut parser = Parser::new(Lexer::new(src));
    let mut program = parser.program();
    assert!(
        parser.error_handler.is_empty(),
        "test source should parse cleanly: {:?}",
        parser.error_handler.pop_front()
    );
    let mut errs = check::check(&mut program);
    assert!(
        errs.is_empty(),
        "test source should check cleanly: {:?}",
        errs.pop_front()
    );
    compile(&program)
}

fn find<'a>(functions: &'a [Function], name: &str) -> &'a Function {
    functions
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("no function {} in {:?}", name, functions))
}

fn tuples(func: &Function) -> Vec<String> {
    func.code.iter().map(|instr| instr.to_string()).collect()
}

#[test]
fn init_function_collects_global_initializers() {
    let functions = compile_src("int a = 0x2A;");
    let init = find(&functions, "__minic_init");
    assert_eq!(init.return_type, "I");
    assert_eq!(
        tuples(init),
        vec![
            "('VARI', 'a')",
            "('MOVI', 42, 'R1')",
            "('STOREI', 'R1', 'a')",
        ]
    );
}

#[test]
fn globals_initialize_in_source_order() {
    let functions = compile_src("int a = 1;\nfloat b = 2.5;\nint c;");
    let init = find(&functions, "__minic_init");
    assert_eq!(
        tuples(init),
        vec![
            "('VARI', 'a')",
            "('MOVI', 1, 'R1')",
            "('STOREI', 'R1', 'a')",
            "('VARF', 'b')",
            "('MOVF', 2.5, 'R2')",
            "('STOREF', 'R2', 'b')",
            "('VARI', 'c')",
        ]
    );
}

#[test]
fn literal_tags() {
    let functions = compile_src("char c = 'A';\nbool b = true;");
    let init = find(&functions, "__minic_init");
    assert_eq!(
        tuples(init),
        vec![
            "('VARB', 'c')",
            "('MOVB', 65, 'R1')",
            "('STOREB', 'R1', 'c')",
            "('VARI', 'b')",
            "('MOVI', 1, 'R2')",
            "('STOREI', 'R2', 'b')",
        ]
    );
}

#[test]
fn main_is_renamed() {
    let functions = compile_src("int main(void) { return 0; }");
    let main = find(&functions, "__minic_main");
    assert_eq!(tuples(main), vec!["('MOVI', 0, 'R1')", "('RET', 'R1')"]);
}

#[test]
fn function_headers_carry_parameter_tags() {
    let functions = compile_src("int f(int n, float x) { return n; }");
    let f = find(&functions, "f");
    assert_eq!(f.to_string(), "f(['n:I', 'x:F']) -> I");
}

#[test]
fn void_return() {
    let functions = compile_src("void f(void) { return; }");
    assert_eq!(tuples(find(&functions, "f")), vec!["('RET',)"]);
}

#[test]
fn local_declarations_allocate() {
    let functions = compile_src("void f(void) { int a; int b[4]; return; }");
    let f = find(&functions, "f");
    assert_eq!(
        tuples(f),
        vec![
            "('ALLOCI', 'a')",
            "('MOVI', 4, 'R1')",
            "('ALLOCI', 'b[R1]')",
            "('RET',)",
        ]
    );
}

#[test]
fn if_else_shape() {
    let functions = compile_src("void f(bool c) { if (c) 1; else 2; return; }");
    let f = find(&functions, "f");
    assert_eq!(
        tuples(f),
        vec![
            "('LOADI', 'c', 'R1')",
            "('CBRANCH', 'R1', 'L1', 'L2')",
            "('LABEL', 'L1')",
            "('MOVI', 1, 'R2')",
            "('BRANCH', 'L3')",
            "('LABEL', 'L2')",
            "('MOVI', 2, 'R3')",
            "('BRANCH', 'L3')",
            "('LABEL', 'L3')",
            "('RET',)",
        ]
    );
}

#[test]
fn while_loop_shape_and_break() {
    let functions = compile_src("void f(void) { while (true) { break; } return; }");
    let f = find(&functions, "f");
    assert_eq!(
        tuples(f),
        vec![
            "('BRANCH', 'L1')",
            "('LABEL', 'L1')",
            "('MOVI', 1, 'R1')",
            "('CBRANCH', 'R1', 'L2', 'L3')",
            "('LABEL', 'L2')",
            // break branches to the loop's merge label
            "('BRANCH', 'L3')",
            "('BRANCH', 'L1')",
            "('LABEL', 'L3')",
            "('RET',)",
        ]
    );
}

#[test]
fn break_targets_the_innermost_loop() {
    let functions = compile_src(
        "void f(void) { while (true) { while (true) { break; } } return; }",
    );
    let f = find(&functions, "f");
    // the inner loop's merge label is L6; the break must use it
    let code = tuples(f);
    let inner_break = code
        .iter()
        .filter(|i| i.starts_with("('BRANCH', 'L6')"))
        .count();
    assert!(inner_break >= 1, "break should target L6 in {:#?}", code);
}

#[test]
fn for_loop_shape() {
    let functions = compile_src(
        "void f(void) { int i; for (i = 0; i < 3; i += 1) { break; } return; }",
    );
    let f = find(&functions, "f");
    assert_eq!(
        tuples(f),
        vec![
            "('ALLOCI', 'i')",
            // init
            "('MOVI', 0, 'R1')",
            "('STOREI', 'R1', 'i')",
            "('BRANCH', 'L1')",
            "('LABEL', 'L1')",
            // condition
            "('LOADI', 'i', 'R2')",
            "('MOVI', 3, 'R3')",
            "('CMPI', '<', 'R2', 'R3', 'R4')",
            "('CBRANCH', 'R4', 'L2', 'L3')",
            "('LABEL', 'L2')",
            // body: break
            "('BRANCH', 'L3')",
            // step
            "('MOVI', 1, 'R5')",
            "('LOADI', 'i', 'R6')",
            "('ADDI', 'R6', 'R5', 'R7')",
            "('STOREI', 'R7', 'i')",
            "('BRANCH', 'L1')",
            "('LABEL', 'L3')",
            "('RET',)",
        ]
    );
}

#[test]
fn comparisons_keep_their_text() {
    let functions = compile_src("bool b = 1 <= 2;");
    let init = find(&functions, "__minic_init");
    assert!(tuples(init).contains(&"('CMPI', '<=', 'R1', 'R2', 'R3')".to_string()));
}

#[test]
fn logical_operators_use_integer_opcodes() {
    let functions = compile_src("bool b = true && false;");
    let init = find(&functions, "__minic_init");
    assert!(tuples(init).contains(&"('ANDI', 'R1', 'R2', 'R3')".to_string()));
}

#[test]
fn unary_minus_subtracts_from_zero() {
    let functions = compile_src("int a;\nvoid f(void) { a = -a; return; }");
    let f = find(&functions, "f");
    assert_eq!(
        tuples(f),
        vec![
            "('LOADI', 'a', 'R1')",
            "('MOVI', 0, 'R2')",
            "('SUBI', 'R2', 'R1', 'R3')",
            "('STOREI', 'R3', 'a')",
            "('RET',)",
        ]
    );
}

#[test]
fn logical_not_is_xor_with_one() {
    let functions = compile_src("bool b;\nvoid f(void) { b = !b; return; }");
    let f = find(&functions, "f");
    assert_eq!(
        tuples(f),
        vec![
            "('LOADI', 'b', 'R1')",
            "('MOVI', 1, 'R2')",
            // XOR takes no type suffix
            "('XOR', 'R2', 'R1', 'R3')",
            "('STOREI', 'R3', 'b')",
            "('RET',)",
        ]
    );
}

#[test]
fn unary_plus_is_free() {
    let functions = compile_src("int a = +3;");
    let init = find(&functions, "__minic_init");
    assert_eq!(
        tuples(init),
        vec![
            "('VARI', 'a')",
            "('MOVI', 3, 'R1')",
            "('STOREI', 'R1', 'a')",
        ]
    );
}

#[test]
fn increment_stores_and_keeps_both_values() {
    let functions = compile_src("int i;\nvoid f(void) { int a; a = ++i; a = i++; return; }");
    let f = find(&functions, "f");
    assert_eq!(
        tuples(f),
        vec![
            "('ALLOCI', 'a')",
            // prefix: result is the incremented value R4
            "('LOADI', 'i', 'R1')",
            "('MOVI', 1, 'R2')",
            "('ADDI', 'R1', 'R2', 'R3')",
            "('STOREI', 'R3', 'i')",
            "('STOREI', 'R3', 'a')",
            // postfix: result is the original value R4
            "('LOADI', 'i', 'R4')",
            "('MOVI', 1, 'R5')",
            "('ADDI', 'R4', 'R5', 'R6')",
            "('STOREI', 'R6', 'i')",
            "('STOREI', 'R4', 'a')",
            "('RET',)",
        ]
    );
}

#[test]
fn compound_assignment_loads_then_stores() {
    let functions = compile_src("int x;\nvoid f(void) { x += 2; return; }");
    let f = find(&functions, "f");
    assert_eq!(
        tuples(f),
        vec![
            "('MOVI', 2, 'R1')",
            "('LOADI', 'x', 'R2')",
            "('ADDI', 'R2', 'R1', 'R3')",
            "('STOREI', 'R3', 'x')",
            "('RET',)",
        ]
    );
}

#[test]
fn array_assignment_evaluates_value_before_index() {
    let functions = compile_src("int a[4];\nvoid f(void) { a[1] = 2; return; }");
    let f = find(&functions, "f");
    assert_eq!(
        tuples(f),
        vec![
            // value first, then index: observable in the register numbers
            "('MOVI', 2, 'R2')",
            "('MOVI', 1, 'R3')",
            "('STOREI', 'R2', 'a[R3]')",
            "('RET',)",
        ]
    );
}

#[test]
fn array_reads_index_inline() {
    let functions = compile_src("int a[4];\nint g(void) { return a[2]; }");
    let g = find(&functions, "g");
    assert_eq!(
        tuples(g),
        vec![
            "('MOVI', 2, 'R2')",
            "('LOADI', 'a[R2]', 'R3')",
            "('RET', 'R3')",
        ]
    );
}

#[test]
fn recursion_emits_two_calls() {
    let functions = compile_src(
        "int fact(int n) {
            if (n < 2) return 1;
            return n * fact(n - 1);
        }",
    );
    let fact = find(&functions, "fact");
    let calls = fact
        .code
        .iter()
        .filter(|instr| matches!(instr, Instr::Call(name, ..) if *name == "fact"))
        .count();
    assert_eq!(calls, 1);
    // one call here plus the external entry; the if-branch return and the
    // recursive return both appear
    let rets = fact
        .code
        .iter()
        .filter(|instr| matches!(instr, Instr::Ret(Some(_))))
        .count();
    assert_eq!(rets, 2);
    assert_eq!(fact.to_string(), "fact(['n:I']) -> I");
}

#[test]
fn call_arguments_precede_the_target() {
    let functions = compile_src(
        "int add(int a, int b) { return a + b; }\nint c = add(1, 2);",
    );
    let init = find(&functions, "__minic_init");
    let call = init
        .code
        .iter()
        .find(|instr| matches!(instr, Instr::Call(..)))
        .unwrap();
    // R4 and R5 hold the arguments, R6 is the result
    assert_eq!(call.to_string(), "('CALL', 'add', 'R4', 'R5', 'R6')");
}

#[test]
fn new_array_allocates_under_its_own_register() {
    let functions = compile_src("void f(void) { new int[8]; return; }");
    let f = find(&functions, "f");
    assert_eq!(
        tuples(f),
        vec!["('MOVI', 8, 'R1')", "('ALLOCI', 'R2[R1]')", "('RET',)"]
    );
}

#[test]
fn array_size_loads_a_pseudo_location() {
    let functions = compile_src("int a[4];\nint n = a.size;");
    let init = find(&functions, "__minic_init");
    assert!(tuples(init).contains(&"('LOADI', 'a.size', 'R2')".to_string()));
}

#[test]
fn alternate_lvalue_forms_load_and_store() {
    use crate::data::prelude::*;
    use crate::data::LocationExpr;
    // WriteLocation(a, ReadLocation(a)) lowers like a load plus a store
    let read = Expr::new(
        ExprType::Read(LocationExpr::Simple("a".into())),
        Location::new(2),
    );
    let mut program = Program {
        decls: vec![
            Location::new(1).with(StmtType::StaticVarDecl(VarDecl {
                datatype: DataType {
                    name: "int".into(),
                    ctype: None,
                    location: Location::new(1),
                },
                name: "a".into(),
                value: None,
            })),
            Location::new(2).with(StmtType::Write(
                LocationExpr::Simple("a".into()),
                read,
            )),
        ],
    };
    let errs = crate::check::check(&mut program);
    assert!(errs.is_empty());
    let functions = compile(&program);
    assert_eq!(
        tuples(&functions[0]),
        vec![
            "('VARI', 'a')",
            "('LOADI', 'a', 'R1')",
            "('STOREI', 'R1', 'a')",
        ]
    );
}

#[test]
fn xor_has_no_suffix_even_when_printed_generically() {
    let instr = Instr::Binary(Opcode::Xor, "I", super::Reg(1), super::Reg(2), super::Reg(3));
    assert_eq!(instr.to_string(), "('XOR', 'R1', 'R2', 'R3')");
}
