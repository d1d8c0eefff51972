use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use ansi_term::{ANSIString, Colour};
use pico_args::Arguments;

use minicc::data::prelude::*;

const HELP: &str = concat!(
    env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"), "\n",
    env!("CARGO_PKG_DESCRIPTION"), "\n",
    "\n",
    "usage: ", env!("CARGO_PKG_NAME"), " [FLAGS] [OPTIONS] [<command>] [<file>]

COMMANDS:
    lex       Print one token per line and stop.
    parse     Print the abstract syntax tree and stop.
    check     Run semantic analysis and stop.
    ircode    Lower to three-address code and print each function. [default]

FLAGS:
        --show-types    With `check`, print each node with its resolved type.
    -h, --help          Prints help information
    -V, --version       Prints version information

OPTIONS:
        --color <when>  When to use color. May be \"never\", \"auto\", or \"always\". [default: auto]

ARGS:
    <file>    The file to read MiniC source from. \"-\" means stdin
              (use ./- to read a file called '-'). [default: -]"
);

const USAGE: &str = "\
usage: minicc [--help | -h] [--version | -V] [--show-types] [--color <when>]
              [lex | parse | check | ircode] [<file>]";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Command {
    Lex,
    Parse,
    Check,
    IrCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorChoice {
    Always,
    Auto,
    Never,
}

impl ColorChoice {
    fn use_color_for(self, stream: atty::Stream) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => atty::is(stream),
        }
    }
}

impl std::str::FromStr for ColorChoice {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<ColorChoice, &'static str> {
        match s {
            "always" => Ok(ColorChoice::Always),
            "auto" => Ok(ColorChoice::Auto),
            "never" => Ok(ColorChoice::Never),
            _ => Err("Invalid color choice"),
        }
    }
}

struct Opt {
    command: Command,
    show_types: bool,
    color: ColorChoice,
    filename: PathBuf,
}

fn main() {
    env_logger::init();
    let opt = match parse_args() {
        Ok(opt) => opt,
        Err(err) => {
            eprintln!(
                "{}: error parsing args: {}",
                std::env::args()
                    .next()
                    .unwrap_or_else(|| env!("CARGO_PKG_NAME").into()),
                err
            );
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };

    // NOTE: only holds valid UTF-8; will fail otherwise
    let mut buf = String::new();
    if opt.filename == PathBuf::from("-") {
        io::stdin().read_to_string(&mut buf).unwrap_or_else(|err| {
            eprintln!("Failed to read stdin: {}", err);
            process::exit(3);
        });
    } else {
        File::open(&opt.filename)
            .and_then(|mut file| file.read_to_string(&mut buf))
            .unwrap_or_else(|err| {
                eprintln!(
                    "Failed to read {}: {}",
                    opt.filename.to_string_lossy(),
                    err
                );
                process::exit(3);
            });
    }

    let errors = real_main(&buf, &opt);
    if errors.is_empty() {
        return;
    }
    print_diagnostics(errors, opt.color);
    process::exit(2);
}

fn real_main(buf: &str, opt: &Opt) -> VecDeque<CompileError> {
    log::trace!(
        "running {:?} on {} ({} bytes)",
        opt.command,
        opt.filename.to_string_lossy(),
        buf.len()
    );
    match opt.command {
        Command::Lex => {
            let (tokens, errors) = minicc::lex(buf);
            for token in tokens {
                println!("{}: {:?}", token.location, token.data);
            }
            errors
        }
        Command::Parse => {
            let (program, errors) = minicc::parse(buf);
            if errors.is_empty() {
                print!("{}", dump::program(&program, false));
            }
            errors
        }
        Command::Check => {
            let (program, errors) = minicc::check(buf);
            if errors.is_empty() && opt.show_types {
                print!("{}", dump::program(&program, true));
            }
            errors
        }
        Command::IrCode => match minicc::compile(buf) {
            Ok(functions) => {
                for func in functions {
                    println!("{0} {1} {0}", "::".repeat(5), func);
                    for instruction in &func.code {
                        println!("{}", instruction);
                    }
                    println!("{}", "*".repeat(30));
                }
                VecDeque::new()
            }
            Err(errors) => errors,
        },
    }
}

fn print_diagnostics(errors: VecDeque<CompileError>, color: ColorChoice) {
    let use_color = color.use_color_for(atty::Stream::Stderr);
    for err in &errors {
        let prefix = if use_color {
            Colour::Red.bold().paint(err.location.to_string())
        } else {
            ANSIString::from(err.location.to_string())
        };
        eprintln!("{}: {}", prefix, err.data);
    }
    let count = errors.len();
    eprintln!(
        "{} error{} generated",
        count,
        if count == 1 { "" } else { "s" }
    );
}

fn parse_args() -> Result<Opt, pico_args::Error> {
    let mut input = Arguments::from_env();
    if input.contains(["-h", "--help"]) {
        println!("{}", HELP);
        process::exit(0);
    }
    if input.contains(["-V", "--version"]) {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        process::exit(0);
    }
    let show_types = input.contains("--show-types");
    let color = input
        .opt_value_from_str("--color")?
        .unwrap_or(ColorChoice::Auto);
    let first: Option<String> = input.free_from_str()?;
    let (command, filename) = match first.as_deref() {
        Some("lex") => (Command::Lex, input.free_from_str()?),
        Some("parse") => (Command::Parse, input.free_from_str()?),
        Some("check") => (Command::Check, input.free_from_str()?),
        Some("ircode") => (Command::IrCode, input.free_from_str()?),
        // no command word: the argument, if any, is the file
        other => (Command::IrCode, other.map(String::from)),
    };
    Ok(Opt {
        command,
        show_types,
        color,
        filename: filename.unwrap_or_else(|| "-".into()).into(),
    })
}

/// Depth-first AST printer: one `line: <indent>NodeRepr` row per node,
/// four spaces per level, optionally suffixed with the resolved type.
mod dump {
    use super::*;
    use minicc::data::{ArrayDecl, DataType, Expr, ExprType, FuncDecl, VarDecl};

    pub(super) fn program(program: &Program, with_types: bool) -> String {
        let mut out = String::new();
        for decl in &program.decls {
            stmt(decl, 0, with_types, &mut out);
        }
        out
    }

    fn line(
        location: Location,
        depth: usize,
        node: &dyn std::fmt::Display,
        ctype: Option<Type>,
        with_types: bool,
        out: &mut String,
    ) {
        let type_suffix = if with_types {
            format!(
                " type: {}",
                ctype.map_or_else(|| "None".to_string(), |t| t.to_string())
            )
        } else {
            String::new()
        };
        out.push_str(&format!(
            "{}: {}{}{}\n",
            location,
            "    ".repeat(depth),
            node,
            type_suffix
        ));
    }

    fn stmt(node: &Stmt, depth: usize, with_types: bool, out: &mut String) {
        line(node.location, depth, &node.data, None, with_types, out);
        let next = depth + 1;
        match &node.data {
            StmtType::Null | StmtType::Break => {}
            StmtType::Expr(e) => expr(e, next, with_types, out),
            StmtType::If(cond, then, otherwise) => {
                expr(cond, next, with_types, out);
                stmt(then, next, with_types, out);
                if let Some(otherwise) = otherwise {
                    stmt(otherwise, next, with_types, out);
                }
            }
            StmtType::While(cond, body) => {
                expr(cond, next, with_types, out);
                stmt(body, next, with_types, out);
            }
            StmtType::For(init, cond, step, body) => {
                expr(init, next, with_types, out);
                expr(cond, next, with_types, out);
                expr(step, next, with_types, out);
                stmt(body, next, with_types, out);
            }
            StmtType::Return(value) => {
                if let Some(value) = value {
                    expr(value, next, with_types, out);
                }
            }
            StmtType::Compound(decls, stmts) => {
                for decl in decls {
                    stmt(decl, next, with_types, out);
                }
                for s in stmts {
                    stmt(s, next, with_types, out);
                }
            }
            StmtType::FuncDecl(decl) => func_decl(decl, next, with_types, out),
            StmtType::StaticVarDecl(decl) | StmtType::LocalVarDecl(decl) => {
                var_decl(decl, next, with_types, out)
            }
            StmtType::StaticArrayDecl(decl) | StmtType::LocalArrayDecl(decl) => {
                array_decl(decl, next, with_types, out)
            }
            StmtType::Write(_, value) => expr(value, next, with_types, out),
        }
    }

    fn func_decl(decl: &FuncDecl, depth: usize, with_types: bool, out: &mut String) {
        datatype(&decl.datatype, depth, with_types, out);
        for param in &decl.params {
            line(
                param.location,
                depth,
                param,
                param.datatype.ctype,
                with_types,
                out,
            );
        }
        stmt(&decl.body, depth, with_types, out);
    }

    fn var_decl(decl: &VarDecl, depth: usize, with_types: bool, out: &mut String) {
        datatype(&decl.datatype, depth, with_types, out);
        if let Some(value) = &decl.value {
            expr(value, depth, with_types, out);
        }
    }

    fn array_decl(decl: &ArrayDecl, depth: usize, with_types: bool, out: &mut String) {
        datatype(&decl.datatype, depth, with_types, out);
        expr(&decl.size, depth, with_types, out);
    }

    fn datatype(node: &DataType, depth: usize, with_types: bool, out: &mut String) {
        line(node.location, depth, node, node.ctype, with_types, out);
    }

    fn expr(node: &Expr, depth: usize, with_types: bool, out: &mut String) {
        line(node.location, depth, &node.expr, node.ctype, with_types, out);
        let next = depth + 1;
        match &node.expr {
            ExprType::Literal(_)
            | ExprType::Var(_)
            | ExprType::ArraySize(_)
            | ExprType::IncDec(..)
            | ExprType::Read(_) => {}
            ExprType::ArrayLookup(_, index) => expr(index, next, with_types, out),
            ExprType::FuncCall(_, args) => {
                for arg in args {
                    expr(arg, next, with_types, out);
                }
            }
            ExprType::Unary(_, operand) => expr(operand, next, with_types, out),
            ExprType::Binary(_, left, right) => {
                expr(left, next, with_types, out);
                expr(right, next, with_types, out);
            }
            ExprType::VarAssign(_, _, value) => expr(value, next, with_types, out),
            ExprType::ArrayAssign(_, _, index, value) => {
                expr(index, next, with_types, out);
                expr(value, next, with_types, out);
            }
            ExprType::NewArray(dt, size) => {
                datatype(dt, next, with_types, out);
                expr(size, next, with_types, out);
            }
        }
    }
}
