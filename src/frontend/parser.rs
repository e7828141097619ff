use std::error::Error;
use std::fs::OpenOptions;
use std::io::prelude::*;

use pest::iterators::Pair;
use pest::Parser;

use crate::ast::*;

#[derive(Parser)]
#[grammar = "frontend/grammar.pest"]
pub struct MParser;

/**
 * Reads the contents of a source file. Mirrors the error shape the CLI needs:
 * any failure to open or read the file is reported as `Cannot open <path> file`.
 */
pub fn read_source(path: &str) -> Result<String, Box<dyn Error>> {
    let mut file = OpenOptions::new().read(true).open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

pub fn parse_program(source: &str) -> Result<Vec<Stmt>, Box<pest::error::Error<Rule>>> {
    let mut pairs = MParser::parse(Rule::program, source).map_err(Box::new)?;
    let program = pairs.next().expect("program rule always produces one pair");
    Ok(build_program(program))
}

fn line_of(pair: &Pair<Rule>) -> Line {
    Some(pair.as_span().start_pos().line_col().0 as u32)
}

fn comp_op_from_str(s: &str) -> BinOp {
    match s {
        "==" => BinOp::Eq,
        "!=" => BinOp::Ne,
        "<=" => BinOp::Le,
        ">=" => BinOp::Ge,
        "<" => BinOp::Lt,
        ">" => BinOp::Gt,
        other => panic!("{} is not a valid comparison operator", other),
    }
}

fn add_op_from_str(s: &str) -> BinOp {
    match s {
        "+" => BinOp::Add,
        "-" => BinOp::Sub,
        ".+" => BinOp::EAdd,
        ".-" => BinOp::ESub,
        other => panic!("{} is not a valid additive operator", other),
    }
}

fn mul_op_from_str(s: &str) -> BinOp {
    match s {
        "*" => BinOp::Mul,
        "/" => BinOp::Div,
        ".*" => BinOp::EMul,
        "./" => BinOp::EDiv,
        other => panic!("{} is not a valid multiplicative operator", other),
    }
}

fn assign_op_from_str(s: &str) -> AssignOp {
    match s {
        "=" => AssignOp::Assign,
        "+=" => AssignOp::AddAssign,
        "-=" => AssignOp::SubAssign,
        "*=" => AssignOp::MulAssign,
        "/=" => AssignOp::DivAssign,
        other => panic!("{} is not a valid assignment operator", other),
    }
}

fn build_program(pair: Pair<Rule>) -> Vec<Stmt> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::instruction)
        .map(build_instruction)
        .collect()
}

fn build_instruction(pair: Pair<Rule>) -> Stmt {
    let inner = pair.into_inner().next().expect("instruction always wraps one alternative");
    match inner.as_rule() {
        Rule::loop_stmt => build_loop(inner),
        Rule::if_else => build_if_else(inner),
        Rule::controlflow => build_controlflow(inner),
        Rule::assignment => build_assignment(inner),
        Rule::codeblock => build_codeblock(inner),
        Rule::print_stmt => build_print(inner),
        other => panic!("{:?} is not a valid instruction", other),
    }
}

fn build_loop(pair: Pair<Rule>) -> Stmt {
    let inner = pair.into_inner().next().expect("loop_stmt always wraps one alternative");
    match inner.as_rule() {
        Rule::for_loop => build_for_loop(inner),
        Rule::while_loop => build_while_loop(inner),
        other => panic!("{:?} is not a valid loop", other),
    }
}

fn build_for_loop(pair: Pair<Rule>) -> Stmt {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let var = inner.next().unwrap().as_str().to_string();
    let range = build_range(inner.next().unwrap());
    let body = Box::new(build_instruction(inner.next().unwrap()));
    Stmt::ForLoop { var, range, body, line }
}

fn build_range(pair: Pair<Rule>) -> RangeExpr {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let start = Box::new(build_expr(inner.next().unwrap()));
    let end = Box::new(build_expr(inner.next().unwrap()));
    RangeExpr { start, end, line }
}

fn build_while_loop(pair: Pair<Rule>) -> Stmt {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let cond = build_expr(inner.next().unwrap());
    let body = Box::new(build_instruction(inner.next().unwrap()));
    Stmt::While { cond, body, line }
}

fn build_if_else(pair: Pair<Rule>) -> Stmt {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let cond = build_expr(inner.next().unwrap());
    let then_branch = Box::new(build_instruction(inner.next().unwrap()));
    let else_branch = inner.next().map(|p| Box::new(build_instruction(p)));
    Stmt::IfElse { cond, then_branch, else_branch, line }
}

fn build_controlflow(pair: Pair<Rule>) -> Stmt {
    let line = line_of(&pair);
    let inner = pair.into_inner().next().expect("controlflow always wraps one alternative");
    match inner.as_rule() {
        Rule::break_kw => Stmt::Controlflow { command: CfCommand::Break, ret_val: None, line },
        Rule::continue_kw => Stmt::Controlflow { command: CfCommand::Continue, ret_val: None, line },
        Rule::return_kw => {
            let ret_val = inner.into_inner().next().map(build_expr);
            Stmt::Controlflow { command: CfCommand::Return, ret_val, line }
        }
        other => panic!("{:?} is not a valid controlflow command", other),
    }
}

fn build_codeblock(pair: Pair<Rule>) -> Stmt {
    let line = line_of(&pair);
    let stmts = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::instruction)
        .map(build_instruction)
        .collect();
    Stmt::Scope { body: Box::new(Stmt::Instructions { stmts, line }), line }
}

fn build_print(pair: Pair<Rule>) -> Stmt {
    let line = line_of(&pair);
    let args = build_tuple(pair.into_inner().next().unwrap());
    Stmt::Print { args, line }
}

fn build_tuple(pair: Pair<Rule>) -> Tuple {
    let line = line_of(&pair);
    let args = pair.into_inner().map(build_expr).collect();
    Tuple { args, line }
}

fn build_assignment(pair: Pair<Rule>) -> Stmt {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let target = build_variable(inner.next().unwrap());
    let op = assign_op_from_str(inner.next().unwrap().as_str());
    let expr = build_expr(inner.next().unwrap());
    Stmt::Assignment { target, op, expr, line }
}

fn build_variable(pair: Pair<Rule>) -> Variable {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_string();
    let index = inner.next().map(build_index);
    Variable { name, index, line }
}

fn build_index(pair: Pair<Rule>) -> Index {
    let line = line_of(&pair);
    let elements = pair.into_inner().map(build_expr).collect();
    Index { elements, line }
}

fn build_expr(pair: Pair<Rule>) -> Expr {
    build_comparison(pair.into_inner().next().expect("expr always wraps comparison"))
}

fn build_comparison(pair: Pair<Rule>) -> Expr {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let left = build_additive(inner.next().unwrap());
    match inner.next() {
        None => left,
        Some(op_pair) => {
            let op = comp_op_from_str(op_pair.as_str());
            let right = build_additive(inner.next().unwrap());
            Expr::BinExpr { op, left: Box::new(left), right: Box::new(right), line }
        }
    }
}

fn build_additive(pair: Pair<Rule>) -> Expr {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let mut expr = build_multiplicative(inner.next().unwrap());
    while let Some(op_pair) = inner.next() {
        let op = add_op_from_str(op_pair.as_str());
        let right = build_multiplicative(inner.next().unwrap());
        expr = Expr::BinExpr { op, left: Box::new(expr), right: Box::new(right), line };
    }
    expr
}

fn build_multiplicative(pair: Pair<Rule>) -> Expr {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let mut expr = build_unary(inner.next().unwrap());
    while let Some(op_pair) = inner.next() {
        let op = mul_op_from_str(op_pair.as_str());
        let right = build_unary(inner.next().unwrap());
        expr = Expr::BinExpr { op, left: Box::new(expr), right: Box::new(right), line };
    }
    expr
}

fn build_unary(pair: Pair<Rule>) -> Expr {
    let line = line_of(&pair);
    let inner = pair.into_inner().next().expect("unary always wraps one alternative");
    match inner.as_rule() {
        Rule::unary => Expr::Negation { expr: Box::new(build_unary(inner)), line },
        Rule::postfix => build_postfix(inner),
        other => panic!("{:?} is not a valid unary operand", other),
    }
}

fn build_postfix(pair: Pair<Rule>) -> Expr {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let mut expr = build_primary(inner.next().unwrap());
    for mark in inner {
        debug_assert_eq!(mark.as_rule(), Rule::transpose_mark);
        expr = Expr::Transpose { expr: Box::new(expr), line };
    }
    expr
}

fn build_primary(pair: Pair<Rule>) -> Expr {
    let line = line_of(&pair);
    let inner = pair.into_inner().next().expect("primary always wraps one alternative");
    match inner.as_rule() {
        Rule::expr => build_expr(inner),
        Rule::function_call => build_function_call(inner),
        Rule::tensor => build_tensor(inner),
        Rule::float_lit => Expr::FloatNum { value: inner.as_str().parse().expect("grammar guarantees a valid float"), line },
        Rule::int_lit => Expr::IntNum { value: inner.as_str().parse().expect("grammar guarantees a valid int"), line },
        Rule::string_lit => Expr::StringLiteral { value: inner.as_str().to_string(), line },
        Rule::variable => Expr::Variable(build_variable(inner)),
        other => panic!("{:?} is not a valid primary expression", other),
    }
}

fn build_function_call(pair: Pair<Rule>) -> Expr {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let name = match inner.next().unwrap().as_str() {
        "zeros" => FuncName::Zeros,
        "ones" => FuncName::Ones,
        "eye" => FuncName::Eye,
        other => panic!("{} is not a known builtin function", other),
    };
    let args = build_tuple(inner.next().unwrap());
    Expr::Function { name, args, line }
}

fn build_tensor(pair: Pair<Rule>) -> Expr {
    let line = line_of(&pair);
    let rows = pair.into_inner().map(build_constant).collect();
    Expr::Tensor { rows, line }
}

fn build_constant(pair: Pair<Rule>) -> Expr {
    let line = line_of(&pair);
    let inner = pair.into_inner().next().expect("constant always wraps one alternative");
    match inner.as_rule() {
        Rule::tensor => build_tensor(inner),
        Rule::float_lit => Expr::FloatNum { value: inner.as_str().parse().expect("grammar guarantees a valid float"), line },
        Rule::int_lit => Expr::IntNum { value: inner.as_str().parse().expect("grammar guarantees a valid int"), line },
        Rule::string_lit => Expr::StringLiteral { value: inner.as_str().to_string(), line },
        other => panic!("{:?} is not a valid tensor element", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assignment_and_print() {
        let stmts = parse_program("x = 1 + 2;\nprint x;\n").unwrap();
        assert_eq!(stmts.len(), 2);
        assert!(matches!(stmts[0], Stmt::Assignment { .. }));
        assert!(matches!(stmts[1], Stmt::Print { .. }));
    }

    #[test]
    fn respects_multiplicative_over_additive_precedence() {
        let stmts = parse_program("x = 1 + 2 * 3;\n").unwrap();
        match &stmts[0] {
            Stmt::Assignment { expr: Expr::BinExpr { op: BinOp::Add, right, .. }, .. } => {
                assert!(matches!(**right, Expr::BinExpr { op: BinOp::Mul, .. }));
            }
            other => panic!("expected top-level add, got {:?}", other),
        }
    }

    #[test]
    fn parses_tensor_literal_and_transpose() {
        let stmts = parse_program("A = [1, 2, 3];\nB = A';\n").unwrap();
        assert!(matches!(stmts[0], Stmt::Assignment { expr: Expr::Tensor { .. }, .. }));
        assert!(matches!(stmts[1], Stmt::Assignment { expr: Expr::Transpose { .. }, .. }));
    }

    #[test]
    fn parses_indexed_variable() {
        let stmts = parse_program("x = A[1, 2];\n").unwrap();
        match &stmts[0] {
            Stmt::Assignment { expr: Expr::Variable(v), .. } => {
                assert_eq!(v.name, "A");
                assert_eq!(v.index.as_ref().unwrap().elements.len(), 2);
            }
            other => panic!("expected indexed variable, got {:?}", other),
        }
    }

    #[test]
    fn parses_for_while_and_controlflow() {
        let stmts = parse_program("for i = 0:10 { if (i == 5) { break; } }\nwhile (1) { continue; }\nreturn 0;\n").unwrap();
        assert!(matches!(stmts[0], Stmt::ForLoop { .. }));
        assert!(matches!(stmts[1], Stmt::While { .. }));
        assert!(matches!(stmts[2], Stmt::Controlflow { command: CfCommand::Return, .. }));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_program("x = ;").is_err());
    }
}
