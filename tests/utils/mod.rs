// not every test crate uses every helper
#![allow(dead_code)]

use std::collections::VecDeque;

use minicc::data::prelude::*;
use minicc::Function;

/// Compile `src` all the way to IR, panicking on any diagnostic.
pub fn assert_compiles(src: &str) -> Vec<Function> {
    minicc::compile(src).unwrap_or_else(|errs| {
        panic!("{:?} should compile but errored with {:?}", src, errs)
    })
}

/// Assert that `src` fails somewhere in the pipeline and return the
/// diagnostics.
pub fn assert_errs(src: &str) -> VecDeque<CompileError> {
    match minicc::compile(src) {
        Ok(_) => panic!("{:?} should not compile", src),
        Err(errs) => {
            assert!(!errs.is_empty());
            errs
        }
    }
}

/// Assert that compiling `src` reports exactly one diagnostic, and that its
/// rendered message and line match.
pub fn assert_message(src: &str, line: u32, message: &str) {
    let errs = assert_errs(src);
    assert_eq!(errs.len(), 1, "expected one error, got {:?}", errs);
    assert_eq!(errs[0].location.line, line, "wrong line for {:?}", errs[0]);
    assert_eq!(errs[0].data.to_string(), message);
}

/// Find a lowered function by name.
pub fn function<'a>(functions: &'a [Function], name: &str) -> &'a Function {
    functions
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("no function named {}", name))
}

/// The printed tuple forms of a function's instructions.
pub fn code(func: &Function) -> Vec<String> {
    func.code.iter().map(|instr| instr.to_string()).collect()
}
