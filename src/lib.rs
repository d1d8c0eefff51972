#![warn(absolute_paths_not_starting_with_crate)]
#![warn(explicit_outlives_requirements)]
#![warn(unreachable_pub)]
#![deny(unsafe_code)]
#![deny(unused_extern_crates)]

use std::collections::VecDeque;

pub mod data;
pub mod intern;

mod check;
mod ir;
mod lex;
mod parse;

pub use data::prelude::*;
pub use ir::{BlockLabel, Function, Instr, Opcode, Reg, Value};
pub use lex::Lexer;
pub use parse::Parser;

/// Tokenize `source`, returning every token alongside every lexical
/// diagnostic. The token stream is complete even when errors occurred;
/// offending characters are skipped, not fatal.
pub fn lex(source: &str) -> (Vec<Locatable<Token>>, VecDeque<CompileError>) {
    let mut lexer = Lexer::new(source);
    let tokens: Vec<_> = (&mut lexer).collect();
    let errors = lexer.into_errors().into_errors();
    log::debug!("lexed {} tokens, {} errors", tokens.len(), errors.len());
    (tokens, errors)
}

/// Parse `source` into a program. The tree may be partial when diagnostics
/// were reported; callers must consult the error queue before trusting it.
pub fn parse(source: &str) -> (Program, VecDeque<CompileError>) {
    let mut lexer = Lexer::new(source);
    let mut parser = Parser::new(&mut lexer);
    let program = parser.program();
    let mut parse_errors = std::mem::take(&mut parser.error_handler);
    drop(parser);
    // lexical diagnostics first, then syntactic ones
    let mut errors = lexer.into_errors();
    errors.append(&mut parse_errors);
    log::debug!(
        "parsed {} top-level declarations, {} errors",
        program.decls.len(),
        errors.len()
    );
    (program, errors.into_errors())
}

/// Parse and type-check `source`. On success every expression in the
/// returned tree carries a resolved type. The checker does not run at all
/// if the parser reported errors.
pub fn check(source: &str) -> (Program, VecDeque<CompileError>) {
    let (mut program, errors) = parse(source);
    if !errors.is_empty() {
        log::debug!("skipping semantic analysis: the parse reported errors");
        return (program, errors);
    }
    let errors = check::check(&mut program);
    log::debug!("checked program, {} errors", errors.len());
    (program, errors.into_errors())
}

/// Run the whole front-end: lex, parse, check, and lower to IR.
///
/// Each pass refuses to run if the one before it reported diagnostics, so
/// the error queue always describes the earliest failing stage.
pub fn compile(source: &str) -> Result<Vec<Function>, VecDeque<CompileError>> {
    let (program, errors) = check(source);
    if !errors.is_empty() {
        log::debug!("skipping IR generation: earlier passes reported errors");
        return Err(errors);
    }
    let functions = ir::compile(&program);
    log::debug!("lowered {} functions", functions.len());
    Ok(functions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_halt_the_pipeline() {
        // a lexical error stops the parse from being trusted
        let errs = compile("int a = `;").unwrap_err();
        assert!(errs.iter().any(|e| e.data.is_lex_err()));

        // a syntax error prevents checking
        let errs = compile("int = 3;").unwrap_err();
        assert!(errs.iter().all(|e| e.data.is_syntax_err()));

        // a semantic error prevents IR generation
        let errs = compile("int a = 1.5;").unwrap_err();
        assert!(errs.iter().all(|e| e.data.is_semantic_err()));
    }

    #[test]
    fn empty_program_compiles_to_just_the_init_function() {
        let functions = compile("").unwrap();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].name, "__minic_init");
        assert!(functions[0].code.is_empty());
    }

    #[test]
    fn all_independent_errors_are_reported() {
        let (_, errs) = check("int a = 1.5;\nfloat b = 2;");
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].location.line, 1);
        assert_eq!(errs[1].location.line, 2);
    }

    #[test]
    fn partial_tree_is_returned_on_syntax_error() {
        let (program, errs) = parse("int a;\nint !;\nint b;");
        assert!(!errs.is_empty());
        // the declarations around the bad one survive
        assert_eq!(program.decls.len(), 2);
    }
}
