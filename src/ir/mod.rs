use std::fmt::{self, Display, Formatter};

use crate::data::lex::AssignmentToken;
use crate::data::prelude::*;
use crate::data::Fixity;
use crate::intern::InternedStr;

#[cfg(test)]
mod tests;

/// Lower a checked program to its IR functions.
///
/// Must only be called once the checker has run without errors: the
/// generator relies on every reachable expression carrying a resolved type.
pub(crate) fn compile(program: &Program) -> Vec<Function> {
    let mut generator = Generator::new();
    for decl in &program.decls {
        generator.visit_stmt(decl);
    }
    generator.functions
}

/// A virtual register. The SSA counter hands these out one at a time and
/// never reuses one; mapping them onto real registers is the backend's job.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Reg(u32);

/// A branch target within a function.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockLabel(u32);

impl Display for Reg {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}
impl Display for BlockLabel {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// An immediate operand to a MOV.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            // keep the trailing `.0` on round floats, like the tuples the
            // backend has always consumed
            Value::Float(v) => write!(f, "{:?}", v),
        }
    }
}

/// The arithmetic and bitwise opcode families. `Xor` only ever comes from
/// lowering `!` and is printed without a type suffix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
}

impl Opcode {
    fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Rem => "REM",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
        }
    }
    fn from_binop(op: BinaryOp) -> Opcode {
        match op {
            BinaryOp::Add => Opcode::Add,
            BinaryOp::Sub => Opcode::Sub,
            BinaryOp::Mul => Opcode::Mul,
            BinaryOp::Div => Opcode::Div,
            BinaryOp::Mod => Opcode::Rem,
            BinaryOp::LogicalAnd => Opcode::And,
            BinaryOp::LogicalOr => Opcode::Or,
            _ => unreachable!("comparisons lower to CMP, not to {:?}", op),
        }
    }
}

/// One three-address instruction. `Display` renders the tuple form the
/// `ircode` command prints, e.g. `('ADDI', 'R1', 'R2', 'R3')`.
///
/// The conversion opcodes and `PRINT` are part of the instruction set
/// contract with the backend even though no current lowering emits them:
/// MiniC has no implicit conversions and no print production.
#[derive(Clone, Debug, PartialEq)]
pub enum Instr {
    /// (MOV_T, literal, dst)
    Mov(&'static str, Value, Reg),
    /// (VAR_T, name) for a global declaration; arrays use `name[size_reg]`
    Var(&'static str, String),
    /// (ALLOC_T, name) for a stack declaration inside a function
    Alloc(&'static str, String),
    /// (LOAD_T, name, dst)
    Load(&'static str, String, Reg),
    /// (STORE_T, src, name)
    Store(&'static str, Reg, String),
    /// (OP_T, lhs, rhs, dst)
    Binary(Opcode, &'static str, Reg, Reg, Reg),
    /// (CMP_T, op, lhs, rhs, dst); the comparison keeps its source text
    Cmp(&'static str, &'static str, Reg, Reg, Reg),
    /// (PRINT_T, src)
    Print(&'static str, Reg),
    /// (LABEL, name)
    Label(BlockLabel),
    /// (BRANCH, label)
    Branch(BlockLabel),
    /// (CBRANCH, test, true_label, false_label)
    CBranch(Reg, BlockLabel, BlockLabel),
    /// (CALL, fname, arg1, ..., argN, dst)
    Call(InternedStr, Vec<Reg>, Reg),
    /// (RET, src), or `('RET',)` for a void return
    Ret(Option<Reg>),
    /// (ITOF, src, dst)
    IntToFloat(Reg, Reg),
    /// (FTOI, src, dst)
    FloatToInt(Reg, Reg),
    /// (BTOI, src, dst)
    ByteToInt(Reg, Reg),
    /// (ITOB, src, dst)
    IntToByte(Reg, Reg),
}

impl Display for Instr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use Instr::*;
        match self {
            Mov(tag, value, dst) => write!(f, "('MOV{}', {}, '{}')", tag, value, dst),
            Var(tag, name) => write!(f, "('VAR{}', '{}')", tag, name),
            Alloc(tag, name) => write!(f, "('ALLOC{}', '{}')", tag, name),
            Load(tag, name, dst) => write!(f, "('LOAD{}', '{}', '{}')", tag, name, dst),
            Store(tag, src, name) => write!(f, "('STORE{}', '{}', '{}')", tag, src, name),
            Binary(op, tag, lhs, rhs, dst) => {
                // XOR carries no type suffix
                let tag = if *op == Opcode::Xor { "" } else { *tag };
                write!(
                    f,
                    "('{}{}', '{}', '{}', '{}')",
                    op.mnemonic(),
                    tag,
                    lhs,
                    rhs,
                    dst
                )
            }
            Cmp(tag, op, lhs, rhs, dst) => write!(
                f,
                "('CMP{}', '{}', '{}', '{}', '{}')",
                tag, op, lhs, rhs, dst
            ),
            Print(tag, src) => write!(f, "('PRINT{}', '{}')", tag, src),
            Label(label) => write!(f, "('LABEL', '{}')", label),
            Branch(label) => write!(f, "('BRANCH', '{}')", label),
            CBranch(test, yes, no) => {
                write!(f, "('CBRANCH', '{}', '{}', '{}')", test, yes, no)
            }
            Call(func, args, dst) => {
                write!(f, "('CALL', '{}'", func)?;
                for arg in args {
                    write!(f, ", '{}'", arg)?;
                }
                write!(f, ", '{}')", dst)
            }
            Ret(None) => write!(f, "('RET',)"),
            Ret(Some(src)) => write!(f, "('RET', '{}')", src),
            IntToFloat(src, dst) => write!(f, "('ITOF', '{}', '{}')", src, dst),
            FloatToInt(src, dst) => write!(f, "('FTOI', '{}', '{}')", src, dst),
            ByteToInt(src, dst) => write!(f, "('BTOI', '{}', '{}')", src, dst),
            IntToByte(src, dst) => write!(f, "('ITOB', '{}', '{}')", src, dst),
        }
    }
}

/// A function and its linear instruction stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: InternedStr,
    pub parameters: Vec<(InternedStr, &'static str)>,
    pub return_type: &'static str,
    pub code: Vec<Instr>,
}

impl Function {
    fn new(
        name: InternedStr,
        parameters: Vec<(InternedStr, &'static str)>,
        return_type: &'static str,
    ) -> Function {
        Function {
            name,
            parameters,
            return_type,
            code: Vec::new(),
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let params: Vec<_> = self
            .parameters
            .iter()
            .map(|(name, tag)| format!("'{}:{}'", name, tag))
            .collect();
        write!(
            f,
            "{}([{}]) -> {}",
            self.name,
            params.join(", "),
            self.return_type
        )
    }
}

struct Generator {
    register_count: u32,
    label_count: u32,
    functions: Vec<Function>,
    /// index of the function whose code buffer is being filled
    current: usize,
    /// merge labels of the enclosing loops; `break` branches to the top
    loop_merge_labels: Vec<BlockLabel>,
}

impl Generator {
    fn new() -> Generator {
        // all top-level initialization code collects here
        let init = Function::new("__minic_init".into(), vec![], Type::Int.ir_tag());
        Generator {
            register_count: 0,
            label_count: 0,
            functions: vec![init],
            current: 0,
            loop_merge_labels: Vec::new(),
        }
    }

    fn new_register(&mut self) -> Reg {
        self.register_count += 1;
        Reg(self.register_count)
    }
    fn new_label(&mut self) -> BlockLabel {
        self.label_count += 1;
        BlockLabel(self.label_count)
    }
    fn emit(&mut self, instr: Instr) {
        self.functions[self.current].code.push(instr);
    }

    fn expr_tag(expr: &Expr) -> &'static str {
        expr.ctype
            .expect("the checker annotates every reachable expression")
            .ir_tag()
    }
    fn datatype_tag(datatype: &DataType) -> &'static str {
        datatype
            .ctype
            .expect("the checker resolves every declared type")
            .ir_tag()
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.data {
            StmtType::Null => {}
            StmtType::Expr(expr) => {
                self.visit_expr(expr);
            }
            StmtType::If(condition, then, otherwise) => {
                let test = self.visit_expr(condition);
                let true_label = self.new_label();
                let false_label = self.new_label();
                let merge_label = self.new_label();
                self.emit(Instr::CBranch(test, true_label, false_label));
                self.emit(Instr::Label(true_label));
                self.visit_stmt(then);
                self.emit(Instr::Branch(merge_label));
                self.emit(Instr::Label(false_label));
                if let Some(otherwise) = otherwise {
                    self.visit_stmt(otherwise);
                }
                self.emit(Instr::Branch(merge_label));
                self.emit(Instr::Label(merge_label));
            }
            StmtType::While(condition, body) => {
                let top_label = self.new_label();
                let start_label = self.new_label();
                let merge_label = self.new_label();
                self.loop_merge_labels.push(merge_label);
                // the backend requires an explicit branch into the header
                self.emit(Instr::Branch(top_label));
                self.emit(Instr::Label(top_label));
                let test = self.visit_expr(condition);
                self.emit(Instr::CBranch(test, start_label, merge_label));
                self.emit(Instr::Label(start_label));
                self.visit_stmt(body);
                self.loop_merge_labels.pop();
                self.emit(Instr::Branch(top_label));
                self.emit(Instr::Label(merge_label));
            }
            StmtType::For(init, condition, step, body) => {
                self.visit_expr(init);
                let top_label = self.new_label();
                let start_label = self.new_label();
                let merge_label = self.new_label();
                self.loop_merge_labels.push(merge_label);
                self.emit(Instr::Branch(top_label));
                self.emit(Instr::Label(top_label));
                let test = self.visit_expr(condition);
                self.emit(Instr::CBranch(test, start_label, merge_label));
                self.emit(Instr::Label(start_label));
                self.visit_stmt(body);
                // the step runs after the body, before looping back
                self.visit_expr(step);
                self.loop_merge_labels.pop();
                self.emit(Instr::Branch(top_label));
                self.emit(Instr::Label(merge_label));
            }
            StmtType::Return(value) => {
                let reg = value.as_ref().map(|value| self.visit_expr(value));
                self.emit(Instr::Ret(reg));
            }
            StmtType::Break => {
                let label = *self
                    .loop_merge_labels
                    .last()
                    .expect("the checker rejects break outside a loop");
                self.emit(Instr::Branch(label));
            }
            StmtType::Compound(decls, stmts) => {
                for decl in decls {
                    self.visit_stmt(decl);
                }
                for stmt in stmts {
                    self.visit_stmt(stmt);
                }
            }
            StmtType::FuncDecl(decl) => self.visit_func_decl(decl),
            StmtType::StaticVarDecl(decl) => self.visit_var_decl(decl, false),
            StmtType::LocalVarDecl(decl) => self.visit_var_decl(decl, true),
            StmtType::StaticArrayDecl(decl) => self.visit_array_decl(decl, false),
            StmtType::LocalArrayDecl(decl) => self.visit_array_decl(decl, true),
            StmtType::Write(target, value) => {
                let tag = Self::expr_tag(value);
                let src = self.visit_expr(value);
                self.emit(Instr::Store(tag, src, target.name().to_string()));
            }
        }
    }

    fn visit_func_decl(&mut self, decl: &FuncDecl) {
        let parameters = decl
            .params
            .iter()
            .map(|param| (param.name, Self::datatype_tag(&param.datatype)))
            .collect();
        let mut func = Function::new(decl.name, parameters, Self::datatype_tag(&decl.datatype));
        if func.name == "main" {
            func.name = "__minic_main".into();
        }
        self.functions.push(func);
        // swap the code buffer to the new function for the body
        let old = self.current;
        self.current = self.functions.len() - 1;
        self.visit_stmt(&decl.body);
        self.current = old;
    }

    fn visit_var_decl(&mut self, decl: &VarDecl, local: bool) {
        let tag = Self::datatype_tag(&decl.datatype);
        let name = decl.name.to_string();
        if local {
            self.emit(Instr::Alloc(tag, name.clone()));
        } else {
            self.emit(Instr::Var(tag, name.clone()));
        }
        if let Some(value) = &decl.value {
            let src = self.visit_expr(value);
            self.emit(Instr::Store(tag, src, name));
        }
    }

    fn visit_array_decl(&mut self, decl: &ArrayDecl, local: bool) {
        let tag = Self::datatype_tag(&decl.datatype);
        let size = self.visit_expr(&decl.size);
        let name = format!("{}[{}]", decl.name, size);
        if local {
            self.emit(Instr::Alloc(tag, name));
        } else {
            self.emit(Instr::Var(tag, name));
        }
    }

    /// Emit the code for an expression; returns the register holding its
    /// value.
    fn visit_expr(&mut self, expr: &Expr) -> Reg {
        match &expr.expr {
            ExprType::Literal(lit) => {
                let (tag, value) = match lit {
                    Literal::Int(i) => (Type::Int.ir_tag(), Value::Int(*i)),
                    Literal::Float(v) => (Type::Float.ir_tag(), Value::Float(*v)),
                    // chars are immediate byte values
                    Literal::Char(c) => (Type::Char.ir_tag(), Value::Int(i64::from(*c))),
                    Literal::Bool(b) => (Type::Bool.ir_tag(), Value::Int(i64::from(*b))),
                    Literal::Str(_) => {
                        // strings never acquire a type, so nothing consumes
                        // this register; reserve it and move on
                        return self.new_register();
                    }
                };
                let dst = self.new_register();
                self.emit(Instr::Mov(tag, value, dst));
                dst
            }
            ExprType::Var(name) => {
                let dst = self.new_register();
                self.emit(Instr::Load(Self::expr_tag(expr), name.to_string(), dst));
                dst
            }
            ExprType::Read(target) => {
                let dst = self.new_register();
                self.emit(Instr::Load(
                    Self::expr_tag(expr),
                    target.name().to_string(),
                    dst,
                ));
                dst
            }
            ExprType::ArrayLookup(name, index) => {
                let index = self.visit_expr(index);
                let dst = self.new_register();
                self.emit(Instr::Load(
                    Self::expr_tag(expr),
                    format!("{}[{}]", name, index),
                    dst,
                ));
                dst
            }
            ExprType::FuncCall(name, args) => {
                let arg_regs: Vec<_> = args.iter().map(|arg| self.visit_expr(arg)).collect();
                let dst = self.new_register();
                self.emit(Instr::Call(*name, arg_regs, dst));
                dst
            }
            ExprType::Unary(op, operand) => self.visit_unary(expr, *op, operand),
            ExprType::IncDec(op, fixity, name) => {
                let tag = Self::expr_tag(expr);
                let loaded = self.new_register();
                self.emit(Instr::Load(tag, name.to_string(), loaded));
                let one = self.new_register();
                self.emit(Instr::Mov(tag, Value::Int(1), one));
                let dst = self.new_register();
                let opcode = if *op == UnaryOp::Inc {
                    Opcode::Add
                } else {
                    Opcode::Sub
                };
                self.emit(Instr::Binary(opcode, tag, loaded, one, dst));
                self.emit(Instr::Store(tag, dst, name.to_string()));
                // postfix yields the value from before the store
                match fixity {
                    Fixity::Prefix => dst,
                    Fixity::Postfix => loaded,
                }
            }
            ExprType::Binary(op, left, right) => {
                let lhs = self.visit_expr(left);
                let rhs = self.visit_expr(right);
                let tag = Self::expr_tag(left);
                let dst = self.new_register();
                if op.is_comparison() {
                    self.emit(Instr::Cmp(tag, comparison_text(*op), lhs, rhs, dst));
                } else {
                    self.emit(Instr::Binary(Opcode::from_binop(*op), tag, lhs, rhs, dst));
                }
                dst
            }
            ExprType::VarAssign(op, name, value) => {
                let tag = Self::expr_tag(expr);
                let value = self.visit_expr(value);
                let result = self.visit_compound_assign(*op, tag, name.to_string(), value);
                self.emit(Instr::Store(tag, result, name.to_string()));
                result
            }
            ExprType::ArrayAssign(op, name, index, value) => {
                let tag = Self::expr_tag(expr);
                let value = self.visit_expr(value);
                let index = self.visit_expr(index);
                let element = format!("{}[{}]", name, index);
                let result = self.visit_compound_assign(*op, tag, element.clone(), value);
                self.emit(Instr::Store(tag, result, element));
                result
            }
            ExprType::ArraySize(name) => {
                // the backend resolves the pseudo-location `a.size`
                let dst = self.new_register();
                self.emit(Instr::Load(
                    Type::Int.ir_tag(),
                    format!("{}.size", name),
                    dst,
                ));
                dst
            }
            ExprType::NewArray(datatype, size) => {
                let size = self.visit_expr(size);
                // a fresh allocation named by its own handle register
                let dst = self.new_register();
                self.emit(Instr::Alloc(
                    Self::datatype_tag(datatype),
                    format!("{}[{}]", dst, size),
                ));
                dst
            }
        }
    }

    /// `-x` and `!x` have no machine ops of their own; both load a helper
    /// constant and lower to SUB/XOR.
    fn visit_unary(&mut self, expr: &Expr, op: UnaryOp, operand: &Expr) -> Reg {
        let src = self.visit_expr(operand);
        match op {
            // unary plus generates no code
            UnaryOp::Plus => src,
            UnaryOp::Minus => {
                let tag = Self::expr_tag(expr);
                let zero = self.new_register();
                self.emit(Instr::Mov(tag, Value::Int(0), zero));
                let dst = self.new_register();
                self.emit(Instr::Binary(Opcode::Sub, tag, zero, src, dst));
                dst
            }
            UnaryOp::Not => {
                let tag = Self::expr_tag(expr);
                let one = self.new_register();
                self.emit(Instr::Mov(tag, Value::Int(1), one));
                let dst = self.new_register();
                self.emit(Instr::Binary(Opcode::Xor, tag, one, src, dst));
                dst
            }
            UnaryOp::Inc | UnaryOp::Dec => {
                unreachable!("increment and decrement parse as IncDec nodes")
            }
        }
    }

    /// For `x op= e`, load the old value and apply the operator; for a
    /// plain `x = e` the value register passes straight through to the
    /// caller's store.
    fn visit_compound_assign(
        &mut self,
        op: AssignmentToken,
        tag: &'static str,
        name: String,
        value: Reg,
    ) -> Reg {
        let base = match op {
            AssignmentToken::Equal => return value,
            AssignmentToken::PlusEqual => Opcode::Add,
            AssignmentToken::MinusEqual => Opcode::Sub,
            AssignmentToken::StarEqual => Opcode::Mul,
            AssignmentToken::DivideEqual => Opcode::Div,
            AssignmentToken::ModEqual => Opcode::Rem,
        };
        let loaded = self.new_register();
        self.emit(Instr::Load(tag, name, loaded));
        let dst = self.new_register();
        self.emit(Instr::Binary(base, tag, loaded, value, dst));
        dst
    }
}

fn comparison_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Less => "<",
        BinaryOp::LessEqual => "<=",
        BinaryOp::Greater => ">",
        BinaryOp::GreaterEqual => ">=",
        BinaryOp::EqualEqual => "==",
        BinaryOp::NotEqual => "!=",
        _ => unreachable!("not a comparison: {:?}", op),
    }
}
