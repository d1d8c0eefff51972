use std::collections::VecDeque;
use std::fmt;

use thiserror::Error;

use super::lex::{Locatable, Location, Token};
use super::types::{BinaryOp, Type, UnaryOp};
use crate::intern::InternedStr;

pub type CompileError = Locatable<Error>;

/// ErrorHandler is a struct that holds errors generated by the compiler
///
/// The error sink is used because each pass may generate any number of
/// diagnostics before giving up; this cannot be represented well with Rust's
/// normal `Result`. A pass never aborts on a diagnostic: it records it here,
/// recovers, and keeps going. The driver checks `is_empty` between passes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorHandler {
    errors: VecDeque<CompileError>,
}

impl ErrorHandler {
    /// Construct a new error handler.
    pub fn new() -> ErrorHandler {
        Default::default()
    }

    /// Add an error to the error handler.
    pub fn push_back<E: Into<CompileError>>(&mut self, error: E) {
        self.errors.push_back(error.into());
    }

    /// Shortcut for adding an error
    pub fn error<E: Into<Error>>(&mut self, error: E, location: Location) {
        self.errors.push_back(location.with(error.into()));
    }

    /// Remove the first error from the queue
    pub fn pop_front(&mut self) -> Option<CompileError> {
        self.errors.pop_front()
    }

    /// Whether any diagnostic has been recorded
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Move another handler's errors into this one.
    pub fn append(&mut self, other: &mut ErrorHandler) {
        self.errors.append(&mut other.errors);
    }

    pub fn into_errors(self) -> VecDeque<CompileError> {
        self.errors
    }
}

impl Iterator for ErrorHandler {
    type Item = CompileError;

    fn next(&mut self) -> Option<CompileError> {
        self.pop_front()
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("{0}")]
    Lex(#[from] LexError),

    #[error("{0}")]
    Syntax(#[from] SyntaxError),

    #[error("{0}")]
    Semantic(#[from] SemanticError),
}

impl Error {
    pub fn is_lex_err(&self) -> bool {
        matches!(self, Error::Lex(_))
    }
    pub fn is_syntax_err(&self) -> bool {
        matches!(self, Error::Syntax(_))
    }
    pub fn is_semantic_err(&self) -> bool {
        matches!(self, Error::Semantic(_))
    }
}

/// Diagnostics produced while scanning. All of these are recoverable: the
/// lexer records the error and keeps consuming input.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("Illegal character '{0}'")]
    IllegalChar(char),

    #[error("Unterminated string")]
    UnterminatedString,

    #[error("Unterminated comment")]
    UnterminatedComment,

    // the offending escapes, already quoted and comma-separated
    #[error("Disallowed characters {0} within string")]
    DisallowedEscape(String),

    #[error("Missing terminating ' character")]
    UnterminatedChar,

    #[error("overflow while parsing integer literal")]
    IntegerOverflow,

    #[error("exponent for floating literal has no digits")]
    ExponentMissingDigits,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SyntaxError {
    #[error("Error de sintaxis en la entrada en el token '{0}'")]
    UnexpectedToken(Token),

    #[error("Error de sintaxis. No mas entrada.")]
    EndOfFile,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SemanticError {
    #[error("Invalid type '{0}'")]
    InvalidType(InternedStr),

    #[error("Name '{0}' was not defined")]
    UndefinedName(InternedStr),

    #[error("Name '{0}' has already been defined at line {1}")]
    Redefinition(InternedStr, u32),

    #[error("Name '{0}' is not a legal name for variable declaration")]
    ReservedName(InternedStr),

    #[error("Variable '{0}' declared as 'void'")]
    VoidVariable(InternedStr),

    #[error("Array '{0}' declared as 'void'")]
    VoidArray(InternedStr),

    #[error("Declaring variable '{name}' of type '{declared}' but assigned expression of type '{value}'")]
    InitTypeMismatch {
        name: InternedStr,
        declared: Type,
        value: Type,
    },

    #[error("Size of array '{0}' must be a positive integer")]
    BadArraySize(InternedStr),

    #[error("Condition must be of type 'bool' but got type '{0}'")]
    NonBoolCondition(Type),

    #[error("Break statement must be within a loop")]
    BreakOutsideLoop,

    #[error("Return statement must be within a function")]
    ReturnOutsideFunction,

    #[error("Function returns '{0}' but return statement value is of type '{1}'")]
    ReturnTypeMismatch(Type, Type),

    #[error("Function '{0}' already defined at line {1}")]
    FunctionRedefinition(InternedStr, u32),

    #[error("Invalid parameter type at function definition")]
    InvalidParameterType,

    #[error("Duplicate parameter names at function definition")]
    DuplicateParameters,

    #[error("Parameter '{0}' has invalid type 'void' at function definition")]
    VoidParameter(InternedStr),

    #[error("Illegal nested function declaration '{0}'")]
    NestedFunction(InternedStr),

    #[error("Function '{0}' has no return statement")]
    MissingReturn(InternedStr),

    #[error("Function '{0}' is not declared")]
    UndeclaredFunction(InternedStr),

    #[error("Function '{name}' expects {expected}, but was called with {actual}")]
    ArgumentMismatch {
        name: InternedStr,
        expected: TypeTuple,
        actual: TypeTuple,
    },

    #[error("Function '{0}' has undefined argument(s) at function call")]
    UntypedArgument(InternedStr),

    #[error("Unary operation '{0} {1}' not supported")]
    BadUnaryOp(UnaryOp, Type),

    #[error("Operator '{0}' requires its operand to be an lvalue")]
    NotAnLvalue(UnaryOp),

    #[error("Binary operation '{left} {op} {right}' not supported")]
    BadBinaryOp {
        left: Type,
        op: BinaryOp,
        right: Type,
    },

    #[error("Cannot assign type '{value}' to variable '{name}' of type '{declared}'")]
    AssignTypeMismatch {
        name: InternedStr,
        declared: Type,
        value: Type,
    },

    #[error("Cannot assign type '{value}' to array '{name}' of type '{declared}'")]
    ArrayAssignTypeMismatch {
        name: InternedStr,
        declared: Type,
        value: Type,
    },

    #[error("Index of array '{0}' must be 'int' type")]
    NonIntegerIndex(InternedStr),

    #[error("Cannot perform '%' assignment operation on 'float' type")]
    FloatModAssign,

    #[error("Cannot allocate an array of type 'void'")]
    VoidNewArray,

    #[error("Size of array expression must be 'int' type")]
    NewArraySize,
}

/// A parameter- or argument-type list, displayed the way the diagnostic
/// stream has always shown it: `('int', 'float')`, with the single-element
/// form `('int',)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeTuple(pub Vec<&'static str>);

impl fmt::Display for TypeTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "'{}'", name)?;
        }
        if self.0.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}

impl From<Locatable<LexError>> for CompileError {
    fn from(err: Locatable<LexError>) -> Self {
        err.map(Error::Lex)
    }
}

impl From<Locatable<SyntaxError>> for CompileError {
    fn from(err: Locatable<SyntaxError>) -> Self {
        err.map(Error::Syntax)
    }
}

impl From<Locatable<SemanticError>> for CompileError {
    fn from(err: Locatable<SemanticError>) -> Self {
        err.map(Error::Semantic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_error() -> CompileError {
        Location::default().with(Error::Lex(LexError::UnterminatedComment))
    }

    #[test]
    fn error_handler_into_iterator() {
        let mut error_handler = ErrorHandler::new();
        error_handler.push_back(dummy_error());
        let errors = error_handler.collect::<Vec<_>>();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn error_kind_queries() {
        let e = Error::Lex(LexError::UnterminatedComment);
        assert!(e.is_lex_err());
        assert!(!e.is_semantic_err());
        assert!(!e.is_syntax_err());

        let e = Error::Semantic(SemanticError::BreakOutsideLoop);
        assert!(!e.is_lex_err());
        assert!(e.is_semantic_err());

        let e = Error::Syntax(SyntaxError::EndOfFile);
        assert!(e.is_syntax_err());
        assert!(!e.is_semantic_err());
    }

    #[test]
    fn display_matches_diagnostic_format() {
        assert_eq!(
            dummy_error().data.to_string(),
            "Unterminated comment"
        );
        assert_eq!(
            Error::Syntax(SyntaxError::EndOfFile).to_string(),
            "Error de sintaxis. No mas entrada."
        );
        assert_eq!(
            SemanticError::BadBinaryOp {
                left: Type::Int,
                op: BinaryOp::Add,
                right: Type::Float,
            }
            .to_string(),
            "Binary operation 'int + float' not supported"
        );
    }

    #[test]
    fn type_tuples_render_like_tuples() {
        assert_eq!(TypeTuple(vec![]).to_string(), "()");
        assert_eq!(TypeTuple(vec!["int"]).to_string(), "('int',)");
        assert_eq!(
            TypeTuple(vec!["int", "float"]).to_string(),
            "('int', 'float')"
        );
    }

    #[test]
    fn eof_location_displays_as_eof() {
        let err: CompileError = Location::EOF.with(SyntaxError::EndOfFile.into());
        assert_eq!(
            format!("{}: {}", err.location, err.data),
            "EOF: Error de sintaxis. No mas entrada."
        );
    }
}
