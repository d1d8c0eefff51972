use std::collections::HashMap;

use crate::data::error::{SemanticError, TypeTuple};
use crate::data::lex::AssignmentToken;
use crate::data::prelude::*;
use crate::data::Scope;
use crate::intern::InternedStr;


/// Annotate `program` with resolved types and report every semantic error
/// found. The returned handler is empty exactly when the program is valid.
pub(crate) fn check(program: &mut Program) -> ErrorHandler {
    let mut analyzer = Analyzer::new();
    for decl in &mut program.decls {
        analyzer.visit_stmt(decl);
    }
    analyzer.error_handler
}

/// What the symbol table remembers about a declared name. The type is
/// optional because a declaration whose own checking failed still shadows
/// the name; uses of it stay untyped instead of cascading.
#[derive(Copy, Clone, Debug)]
struct Symbol {
    ctype: Option<Type>,
    location: Location,
}

#[derive(Clone, Debug)]
struct Signature {
    params: Vec<Option<Type>>,
    return_type: Option<Type>,
    location: Location,
}

struct Analyzer {
    /// two live levels: globals, and the current function frame
    scope: Scope<InternedStr, Symbol>,
    /// `name -> signature`; entries are inserted before the body is checked
    /// so recursive calls resolve, and removed again if the body's observed
    /// return type disagrees with the declaration
    functions: HashMap<InternedStr, Signature>,
    /// return type of the function currently being checked
    expected_ret_type: Option<Type>,
    /// type of the last `return` seen in the current function body
    current_ret_type: Option<Type>,
    /// `break` is legal iff this is non-zero
    loop_depth: u32,
    error_handler: ErrorHandler,
}

impl Analyzer {
    fn new() -> Analyzer {
        Analyzer {
            scope: Scope::new(),
            functions: HashMap::new(),
            expected_ret_type: None,
            current_ret_type: None,
            loop_depth: 0,
            error_handler: ErrorHandler::new(),
        }
    }

    fn error(&mut self, err: SemanticError, location: Location) {
        self.error_handler.error(err, location);
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        let location = stmt.location;
        match &mut stmt.data {
            StmtType::Null => {}
            StmtType::Expr(expr) => self.visit_expr(expr),
            StmtType::If(condition, then, otherwise) => {
                self.visit_expr(condition);
                if let Some(cond_type) = condition.ctype {
                    if cond_type == Type::Bool {
                        self.visit_stmt(then);
                        if let Some(otherwise) = otherwise {
                            self.visit_stmt(otherwise);
                        }
                    } else {
                        self.error(SemanticError::NonBoolCondition(cond_type), location);
                    }
                }
            }
            StmtType::While(condition, body) => {
                self.visit_expr(condition);
                if let Some(cond_type) = condition.ctype {
                    if cond_type == Type::Bool {
                        self.loop_depth += 1;
                        self.visit_stmt(body);
                        self.loop_depth -= 1;
                    } else {
                        self.error(SemanticError::NonBoolCondition(cond_type), location);
                    }
                }
            }
            StmtType::For(init, condition, step, body) => {
                self.visit_expr(init);
                self.visit_expr(condition);
                self.visit_expr(step);
                self.loop_depth += 1;
                self.visit_stmt(body);
                self.loop_depth -= 1;
            }
            StmtType::Return(value) => self.visit_return(value.as_mut(), location),
            StmtType::Break => {
                if self.loop_depth == 0 {
                    self.error(SemanticError::BreakOutsideLoop, location);
                }
            }
            StmtType::Compound(decls, stmts) => {
                for decl in decls {
                    self.visit_stmt(decl);
                }
                for stmt in stmts {
                    self.visit_stmt(stmt);
                }
            }
            StmtType::FuncDecl(decl) => self.visit_func_decl(decl, location),
            StmtType::StaticVarDecl(decl) | StmtType::LocalVarDecl(decl) => {
                self.visit_var_decl(decl, location)
            }
            StmtType::StaticArrayDecl(decl) | StmtType::LocalArrayDecl(decl) => {
                self.visit_array_decl(decl, location)
            }
            StmtType::Write(target, value) => {
                self.visit_expr(value);
                let name = target.name();
                match self.scope.get(&name).copied() {
                    Some(symbol) => {
                        if let (Some(declared), Some(value_type)) = (symbol.ctype, value.ctype) {
                            if declared != value_type {
                                self.error(
                                    SemanticError::AssignTypeMismatch {
                                        name,
                                        declared,
                                        value: value_type,
                                    },
                                    location,
                                );
                            }
                        }
                    }
                    None => self.error(SemanticError::UndefinedName(name), location),
                }
            }
        }
    }

    fn visit_return(&mut self, value: Option<&mut Expr>, location: Location) {
        let value_type = value.map(|value| {
            self.visit_expr(value);
            value.ctype
        });
        let expected = match self.expected_ret_type {
            Some(expected) => expected,
            None => {
                self.error(SemanticError::ReturnOutsideFunction, location);
                return;
            }
        };
        match value_type {
            // `return;` only counts as an observed return when the function
            // is void; a bare return in a non-void function surfaces later
            // as a missing return statement
            None => {
                if expected == Type::Void {
                    self.current_ret_type = Some(Type::Void);
                }
            }
            Some(value_type) => {
                self.current_ret_type = value_type;
                if let Some(value_type) = value_type {
                    if value_type != expected {
                        self.error(
                            SemanticError::ReturnTypeMismatch(expected, value_type),
                            location,
                        );
                    }
                }
            }
        }
    }

    /// Resolve a written type name against the primitive types.
    fn visit_datatype(&mut self, datatype: &mut DataType) {
        datatype.ctype = Type::get_by_name(&datatype.name.resolve_and_clone());
        if datatype.ctype.is_none() {
            self.error(
                SemanticError::InvalidType(datatype.name),
                datatype.location,
            );
        }
    }

    /// A declared name may not shadow the primitive type names.
    fn is_reserved(name: InternedStr) -> bool {
        Type::get_by_name(&name.resolve_and_clone()).is_some()
    }

    fn declare(&mut self, name: InternedStr, ctype: Type, location: Location) {
        self.scope.insert(
            name,
            Symbol {
                ctype: Some(ctype),
                location,
            },
        );
    }

    fn visit_var_decl(&mut self, decl: &mut VarDecl, location: Location) {
        let name = decl.name;
        if Self::is_reserved(name) {
            self.error(SemanticError::ReservedName(name), location);
            return;
        }
        if let Some(prev) = self.scope.get(&name) {
            let prev_line = prev.location.line;
            self.error(SemanticError::Redefinition(name, prev_line), location);
            return;
        }
        self.visit_datatype(&mut decl.datatype);
        let declared = match decl.datatype.ctype {
            Some(ctype) => ctype,
            // the unknown type was already diagnosed
            None => return,
        };
        if declared == Type::Void {
            self.error(SemanticError::VoidVariable(name), location);
            return;
        }
        match &mut decl.value {
            None => self.declare(name, declared, location),
            Some(value) => {
                self.visit_expr(value);
                match value.ctype {
                    // if the value has no type, a previous error suppressed it
                    None => {}
                    Some(value_type) if value_type == declared => {
                        self.declare(name, declared, location)
                    }
                    Some(value_type) => self.error(
                        SemanticError::InitTypeMismatch {
                            name,
                            declared,
                            value: value_type,
                        },
                        location,
                    ),
                }
            }
        }
    }

    fn visit_array_decl(&mut self, decl: &mut ArrayDecl, location: Location) {
        let name = decl.name;
        if Self::is_reserved(name) {
            self.error(SemanticError::ReservedName(name), location);
            return;
        }
        if let Some(prev) = self.scope.get(&name) {
            let prev_line = prev.location.line;
            self.error(SemanticError::Redefinition(name, prev_line), location);
            return;
        }
        self.visit_datatype(&mut decl.datatype);
        let declared = match decl.datatype.ctype {
            Some(ctype) => ctype,
            None => return,
        };
        if declared == Type::Void {
            self.error(SemanticError::VoidArray(name), location);
            return;
        }
        self.visit_expr(&mut decl.size);
        // the size must be a compile-time integer constant, not just any
        // int-typed expression
        if let ExprType::Literal(Literal::Int(_)) = decl.size.expr {
            self.declare(name, declared, location);
        } else {
            self.error(SemanticError::BadArraySize(name), location);
        }
    }

    fn visit_func_decl(&mut self, decl: &mut FuncDecl, location: Location) {
        let name = decl.name;
        if let Some(prev) = self.functions.get(&name) {
            let prev_line = prev.location.line;
            self.error(
                SemanticError::FunctionRedefinition(name, prev_line),
                location,
            );
        }
        for param in &mut decl.params {
            self.visit_datatype(&mut param.datatype);
        }
        if !decl.params.is_empty() {
            if decl.params.iter().any(|p| p.datatype.ctype.is_none()) {
                self.error(SemanticError::InvalidParameterType, location);
            }
            let mut names: Vec<_> = decl.params.iter().map(|p| p.name).collect();
            names.sort_unstable();
            names.dedup();
            if names.len() != decl.params.len() {
                self.error(SemanticError::DuplicateParameters, location);
            }
            let void_params: Vec<_> = decl
                .params
                .iter()
                .filter(|p| p.datatype.ctype == Some(Type::Void))
                .map(|p| p.name)
                .collect();
            for param in void_params {
                self.error(SemanticError::VoidParameter(param), location);
            }
        }
        self.visit_datatype(&mut decl.datatype);

        if !self.scope.is_global() {
            self.error(SemanticError::NestedFunction(name), location);
            return;
        }
        // parameters shadow globals for the duration of the body
        self.scope.enter_scope();
        for param in &decl.params {
            self.scope.insert(
                param.name,
                Symbol {
                    ctype: param.datatype.ctype,
                    location: param.location,
                },
            );
        }
        self.expected_ret_type = decl.datatype.ctype;
        // insert before checking the body so recursive calls resolve
        self.functions.insert(
            name,
            Signature {
                params: decl.params.iter().map(|p| p.datatype.ctype).collect(),
                return_type: decl.datatype.ctype,
                location,
            },
        );
        self.visit_stmt(&mut decl.body);

        if self.current_ret_type != self.expected_ret_type {
            self.functions.remove(&name);
            if self.current_ret_type.is_none() && self.expected_ret_type != Some(Type::Void) {
                self.error(SemanticError::MissingReturn(name), location);
            }
        }
        self.scope.leave_scope();
        self.expected_ret_type = None;
        self.current_ret_type = None;
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        let location = expr.location;
        expr.ctype = self.expr_type(&mut expr.expr, location);
    }

    fn expr_type(&mut self, expr: &mut ExprType, location: Location) -> Option<Type> {
        match expr {
            ExprType::Literal(lit) => match lit {
                Literal::Int(_) => Some(Type::Int),
                Literal::Float(_) => Some(Type::Float),
                Literal::Char(_) => Some(Type::Char),
                Literal::Bool(_) => Some(Type::Bool),
                // strings have no type; nothing in the language consumes them
                Literal::Str(_) => None,
            },
            ExprType::Var(name) => {
                let name = *name;
                match self.scope.get(&name) {
                    Some(symbol) => symbol.ctype,
                    None => {
                        self.error(SemanticError::UndefinedName(name), location);
                        None
                    }
                }
            }
            ExprType::Read(target) => {
                let name = target.name();
                match self.scope.get(&name) {
                    Some(symbol) => symbol.ctype,
                    None => {
                        self.error(SemanticError::UndefinedName(name), location);
                        None
                    }
                }
            }
            ExprType::ArrayLookup(name, index) => {
                let name = *name;
                self.visit_expr(index);
                let index_type = index.ctype;
                match self.scope.get(&name).copied() {
                    Some(symbol) => {
                        if index_type == Some(Type::Float) {
                            self.error(SemanticError::NonIntegerIndex(name), location);
                        }
                        symbol.ctype
                    }
                    None => {
                        self.error(SemanticError::UndefinedName(name), location);
                        None
                    }
                }
            }
            ExprType::FuncCall(name, args) => {
                let name = *name;
                if !self.functions.contains_key(&name) {
                    self.error(SemanticError::UndeclaredFunction(name), location);
                    return None;
                }
                for arg in args.iter_mut() {
                    self.visit_expr(arg);
                }
                let signature = self.functions[&name].clone();
                if args.iter().any(|arg| arg.ctype.is_none())
                    || signature.params.iter().any(|param| param.is_none())
                {
                    self.error(SemanticError::UntypedArgument(name), location);
                } else {
                    let arg_types: Vec<_> =
                        args.iter().map(|arg| arg.ctype.unwrap().name()).collect();
                    let param_types: Vec<_> = signature
                        .params
                        .iter()
                        .map(|param| param.unwrap().name())
                        .collect();
                    if arg_types != param_types {
                        self.error(
                            SemanticError::ArgumentMismatch {
                                name,
                                expected: TypeTuple(param_types),
                                actual: TypeTuple(arg_types),
                            },
                            location,
                        );
                    }
                }
                // the type of the call is the callee's return type
                signature.return_type
            }
            ExprType::Unary(op, operand) => {
                let op = *op;
                self.visit_expr(operand);
                let operand_type = operand.ctype?;
                match operand_type.unaryop_type(op) {
                    Some(result) => Some(result),
                    None => {
                        self.error(SemanticError::BadUnaryOp(op, operand_type), location);
                        None
                    }
                }
            }
            ExprType::IncDec(op, _, name) => {
                let (op, name) = (*op, *name);
                let symbol = match self.scope.get(&name) {
                    Some(symbol) => *symbol,
                    None => {
                        self.error(SemanticError::UndefinedName(name), location);
                        return None;
                    }
                };
                let operand_type = symbol.ctype?;
                match operand_type.unaryop_type(op) {
                    Some(result) => Some(result),
                    None => {
                        self.error(SemanticError::BadUnaryOp(op, operand_type), location);
                        None
                    }
                }
            }
            ExprType::Binary(op, left, right) => {
                let op = *op;
                self.visit_expr(left);
                self.visit_expr(right);
                let (left_type, right_type) = (left.ctype?, right.ctype?);
                match left_type.binop_type(op, right_type) {
                    Some(result) => Some(result),
                    None => {
                        self.error(
                            SemanticError::BadBinaryOp {
                                left: left_type,
                                op,
                                right: right_type,
                            },
                            location,
                        );
                        None
                    }
                }
            }
            ExprType::VarAssign(op, name, value) => {
                let (op, name) = (*op, *name);
                self.visit_expr(value);
                let symbol = match self.scope.get(&name).copied() {
                    Some(symbol) => symbol,
                    None => {
                        self.error(SemanticError::UndefinedName(name), location);
                        return None;
                    }
                };
                let (declared, value_type) = match (symbol.ctype, value.ctype) {
                    (Some(declared), Some(value_type)) => (declared, value_type),
                    _ => return None,
                };
                if declared != value_type {
                    self.error(
                        SemanticError::AssignTypeMismatch {
                            name,
                            declared,
                            value: value_type,
                        },
                        location,
                    );
                    return None;
                }
                if declared == Type::Float && op == AssignmentToken::ModEqual {
                    self.error(SemanticError::FloatModAssign, location);
                }
                Some(declared)
            }
            ExprType::ArrayAssign(op, name, index, value) => {
                let (op, name) = (*op, *name);
                self.visit_expr(value);
                self.visit_expr(index);
                let index_type = index.ctype;
                let symbol = match self.scope.get(&name).copied() {
                    Some(symbol) => symbol,
                    None => {
                        self.error(SemanticError::UndefinedName(name), location);
                        return None;
                    }
                };
                let (declared, value_type) = match (symbol.ctype, value.ctype) {
                    (Some(declared), Some(value_type)) => (declared, value_type),
                    _ => return None,
                };
                if declared != value_type {
                    self.error(
                        SemanticError::ArrayAssignTypeMismatch {
                            name,
                            declared,
                            value: value_type,
                        },
                        location,
                    );
                    return None;
                }
                if index_type == Some(Type::Float) {
                    self.error(SemanticError::NonIntegerIndex(name), location);
                }
                if declared == Type::Float && op == AssignmentToken::ModEqual {
                    self.error(SemanticError::FloatModAssign, location);
                }
                Some(declared)
            }
            ExprType::ArraySize(name) => {
                let name = *name;
                if self.scope.get(&name).is_some() {
                    Some(Type::Int)
                } else {
                    self.error(SemanticError::UndefinedName(name), location);
                    None
                }
            }
            ExprType::NewArray(datatype, size) => {
                self.visit_datatype(datatype);
                self.visit_expr(size);
                match datatype.ctype {
                    Some(Type::Void) => {
                        self.error(SemanticError::VoidNewArray, location);
                        None
                    }
                    Some(element) => {
                        match size.ctype {
                            Some(Type::Int) | None => {}
                            Some(_) => self.error(SemanticError::NewArraySize, location),
                        }
                        Some(element)
                    }
                    None => None,
                }
            }
        }
    }
}
