/**
 * The tree-walking evaluator. Runs only once the checker has reported zero
 * errors. `Escape` is the explicit, non-exception control-flow mechanism for
 * `break`/`continue`/`return`; `return` always unwinds all the way to `run`,
 * since this language has no user-defined functions to stop at.
 */

use crate::ast::*;
use crate::errors::RuntimeError;
use crate::memory::MemoryStack;
use crate::tensor::{IndexValue, Tensor};
use crate::value::Value;

#[derive(Debug, Clone)]
pub enum Escape {
    Break,
    Continue,
    Return(Option<Value>),
}

#[derive(Debug)]
enum Flow {
    Error(RuntimeError),
    Escape(Escape),
}

impl From<RuntimeError> for Flow {
    fn from(err: RuntimeError) -> Flow {
        Flow::Error(err)
    }
}

type StmtResult = Result<(), Flow>;
type ExprResult = Result<Value, RuntimeError>;

pub struct Evaluator {
    memory: MemoryStack,
}

impl Evaluator {
    pub fn new() -> Evaluator {
        Evaluator { memory: MemoryStack::new() }
    }

    /** Runs a whole program, returning the process exit code. */
    pub fn run(stmts: &[Stmt]) -> Result<i32, RuntimeError> {
        let mut evaluator = Evaluator::new();
        for stmt in stmts {
            match evaluator.exec_stmt(stmt) {
                Ok(()) => {}
                Err(Flow::Error(e)) => return Err(e),
                Err(Flow::Escape(Escape::Return(value))) => return Ok(Evaluator::exit_code(value)),
                // Statically unreachable for a checked program: break/continue
                // outside a loop is rejected before evaluation ever starts.
                Err(Flow::Escape(Escape::Break)) | Err(Flow::Escape(Escape::Continue)) => {}
            }
        }
        Ok(0)
    }

    fn exit_code(value: Option<Value>) -> i32 {
        match value {
            None => 0,
            Some(Value::Int(0)) => 0,
            Some(Value::Int(v)) => v as i32,
            Some(other) => {
                println!("Returned value: {}", other);
                -1
            }
        }
    }

    fn numeric_binop(op: BinOp, l: f64, r: f64) -> f64 {
        match op {
            BinOp::Add | BinOp::EAdd => l + r,
            BinOp::Sub | BinOp::ESub => l - r,
            BinOp::Mul | BinOp::EMul => l * r,
            BinOp::Div | BinOp::EDiv => l / r,
            _ => unreachable!("comparison operators are handled separately"),
        }
    }

    fn compare(op: BinOp, l: f64, r: f64) -> i64 {
        let result = match op {
            BinOp::Eq => l == r,
            BinOp::Ne => l != r,
            BinOp::Lt => l < r,
            BinOp::Gt => l > r,
            BinOp::Le => l <= r,
            BinOp::Ge => l >= r,
            _ => unreachable!("arithmetic operators are handled separately"),
        };
        result as i64
    }

    fn apply_bin_op(op: BinOp, left: Value, right: Value, line: Line) -> ExprResult {
        if let (Value::Tensor(a), Value::Tensor(b)) = (&left, &right) {
            let result = a
                .elementwise(b, |x, y| Evaluator::numeric_binop(op, x, y))
                .map_err(|message| RuntimeError::NumericBackendFailure { message, line })?;
            return Ok(Value::Tensor(result));
        }

        if let (Value::Str(a), Value::Str(b)) = (&left, &right) {
            if matches!(op, BinOp::Add | BinOp::EAdd) {
                return Ok(Value::Str(format!("{}{}", a, b)));
            }
        }

        let lf = left.as_f64().ok_or_else(|| RuntimeError::NumericBackendFailure {
            message: format!("can't perform {} on a {}", op, left.type_name()),
            line,
        })?;
        let rf = right.as_f64().ok_or_else(|| RuntimeError::NumericBackendFailure {
            message: format!("can't perform {} on a {}", op, right.type_name()),
            line,
        })?;

        if matches!(op, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge) {
            return Ok(Value::Int(Evaluator::compare(op, lf, rf)));
        }

        let both_int = matches!(left, Value::Int(_)) && matches!(right, Value::Int(_));
        let result = Evaluator::numeric_binop(op, lf, rf);
        Ok(if both_int { Value::Int(result as i64) } else { Value::Float(result) })
    }

    fn eval_tuple(&mut self, tuple: &Tuple) -> Result<Vec<Value>, RuntimeError> {
        tuple.args.iter().map(|arg| self.eval_expr(arg)).collect()
    }

    fn eval_index(&mut self, index: &Index) -> Result<Vec<IndexValue>, RuntimeError> {
        index
            .elements
            .iter()
            .map(|elem| match self.eval_expr(elem)? {
                Value::Int(v) => Ok(IndexValue::Int(v)),
                _ => Err(RuntimeError::IndexKindInvalid { line: index.line }),
            })
            .collect()
    }

    fn eval_variable(&mut self, var: &Variable) -> ExprResult {
        let value = self
            .memory
            .get(&var.name)
            .cloned()
            .ok_or_else(|| RuntimeError::NameUnbound { name: var.name.clone(), line: var.line })?;

        let index = match &var.index {
            None => return Ok(value),
            Some(index) => index,
        };
        let index_values = self.eval_index(index)?;

        match value {
            Value::Tensor(t) => t
                .get(&index_values)
                .map_err(|_| RuntimeError::IndexOutOfBounds { line: var.line }),
            _ => Err(RuntimeError::IndexKindInvalid { line: var.line }),
        }
    }

    fn eval_expr(&mut self, expr: &Expr) -> ExprResult {
        match expr {
            Expr::IntNum { value, .. } => Ok(Value::Int(*value)),
            Expr::FloatNum { value, .. } => Ok(Value::Float(*value)),
            Expr::StringLiteral { value, .. } => Ok(Value::Str(value.clone())),
            Expr::Tensor { rows, line } => self.eval_tensor_literal(rows, *line),
            Expr::Variable(var) => self.eval_variable(var),
            Expr::BinExpr { op, left, right, line } => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                if matches!(op, BinOp::Div) && r.is_zero() {
                    return Err(RuntimeError::DivisionByZero { line: *line });
                }
                Evaluator::apply_bin_op(*op, l, r, *line)
            }
            Expr::Transpose { expr, line } => match self.eval_expr(expr)? {
                Value::Tensor(t) => Ok(Value::Tensor(t.transpose())),
                other => Err(RuntimeError::NumericBackendFailure {
                    message: format!("can't transpose a {}", other.type_name()),
                    line: *line,
                }),
            },
            Expr::Negation { expr, line } => match self.eval_expr(expr)? {
                Value::Int(v) => Ok(Value::Int(-v)),
                Value::Float(v) => Ok(Value::Float(-v)),
                Value::Tensor(t) => Ok(Value::Tensor(t.negate())),
                other => Err(RuntimeError::NumericBackendFailure {
                    message: format!("can't negate a {}", other.type_name()),
                    line: *line,
                }),
            },
            Expr::Function { name, args, line } => self.eval_function(*name, args, *line),
            Expr::Tuple(tuple) => {
                let values = self.eval_tuple(tuple)?;
                values.into_iter().next().ok_or(RuntimeError::NumericBackendFailure {
                    message: "empty tuple has no value".to_string(),
                    line: tuple.line,
                })
            }
        }
    }

    fn eval_tensor_literal(&mut self, rows: &[Expr], line: Line) -> ExprResult {
        let values = rows.iter().map(|r| self.eval_expr(r)).collect::<Result<Vec<_>, _>>()?;

        let all_scalar = values.iter().all(|v| matches!(v, Value::Int(_) | Value::Float(_)));
        if all_scalar {
            let is_int = values.iter().all(|v| matches!(v, Value::Int(_)));
            let data: Vec<f64> = values.iter().map(|v| v.as_f64().unwrap()).collect();
            return Ok(Value::Tensor(Tensor::from_vector(data, is_int)));
        }

        let mut rows_data = Vec::with_capacity(values.len());
        let mut is_int = true;
        for v in values {
            match v {
                Value::Tensor(t) if t.rank() == 1 => {
                    is_int &= t.element_type() == Type::Int;
                    rows_data.push((0..t.shape()[0])
                        .map(|i| t.get(&[IndexValue::Int(i as i64)]).unwrap().as_f64().unwrap())
                        .collect());
                }
                other => {
                    return Err(RuntimeError::NumericBackendFailure {
                        message: format!("tensor literal rows must be uniform, found a {}", other.type_name()),
                        line,
                    })
                }
            }
        }
        Tensor::from_rows(rows_data, is_int)
            .map(Value::Tensor)
            .map_err(|message| RuntimeError::NumericBackendFailure { message, line })
    }

    fn eval_function(&mut self, name: FuncName, args: &Tuple, line: Line) -> ExprResult {
        let values = self.eval_tuple(args)?;
        let dims: Result<Vec<usize>, RuntimeError> = values
            .iter()
            .map(|v| match v {
                Value::Int(n) if *n >= 0 => Ok(*n as usize),
                other => Err(RuntimeError::NumericBackendFailure {
                    message: format!("expected a non-negative int argument, got a {}", other.type_name()),
                    line,
                }),
            })
            .collect();
        let dims = dims?;

        let tensor = match name {
            FuncName::Zeros => Tensor::zeros(&dims),
            FuncName::Ones => Tensor::ones(&dims),
            FuncName::Eye => {
                let n = *dims.first().ok_or_else(|| RuntimeError::NumericBackendFailure {
                    message: "eye requires at least one argument".to_string(),
                    line,
                })?;
                Tensor::eye(n)
            }
        };
        Ok(Value::Tensor(tensor))
    }

    fn exec_assignment(&mut self, target: &Variable, op: AssignOp, expr: &Expr, line: Line) -> Result<(), RuntimeError> {
        let rhs = self.eval_expr(expr)?;

        match &target.index {
            None => {
                let value = match op.as_bin_op() {
                    None => rhs,
                    Some(bin_op) => {
                        let left = self
                            .memory
                            .get(&target.name)
                            .cloned()
                            .ok_or_else(|| RuntimeError::NameUnbound { name: target.name.clone(), line })?;
                        Evaluator::apply_bin_op(bin_op, left, rhs, line)?
                    }
                };
                self.memory.set(target.name.clone(), value);
            }
            Some(index) => {
                let index_values = self.eval_index(index)?;
                let current = self
                    .memory
                    .get(&target.name)
                    .cloned()
                    .ok_or_else(|| RuntimeError::NameUnbound { name: target.name.clone(), line })?;

                let mut tensor = match current {
                    Value::Tensor(t) => t,
                    _ => return Err(RuntimeError::IndexKindInvalid { line }),
                };

                let value = match op.as_bin_op() {
                    None => rhs,
                    Some(bin_op) => {
                        let old = tensor
                            .get(&index_values)
                            .map_err(|_| RuntimeError::IndexOutOfBounds { line })?;
                        Evaluator::apply_bin_op(bin_op, old, rhs, line)?
                    }
                };

                tensor
                    .set(&index_values, value)
                    .map_err(|_| RuntimeError::IndexOutOfBounds { line })?;
                self.memory.set(target.name.clone(), Value::Tensor(tensor));
            }
        }

        Ok(())
    }

    fn exec_loop_body(&mut self, body: &Stmt) -> Result<bool, Flow> {
        match self.exec_stmt(body) {
            Ok(()) => Ok(true),
            Err(Flow::Escape(Escape::Continue)) => Ok(true),
            Err(Flow::Escape(Escape::Break)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> StmtResult {
        match stmt {
            Stmt::Assignment { target, op, expr, line } => {
                self.exec_assignment(target, *op, expr, *line)?;
                Ok(())
            }
            Stmt::ForLoop { var, range, body, line } => {
                let start = self.eval_expr(&range.start)?;
                let end = self.eval_expr(&range.end)?;
                let (start, end) = match (start, end) {
                    (Value::Int(s), Value::Int(e)) => (s, e),
                    _ => {
                        return Err(Flow::Error(RuntimeError::NumericBackendFailure {
                            message: "range only supports int values".to_string(),
                            line: *line,
                        }))
                    }
                };

                self.memory.push("for");
                let mut result = Ok(());
                for i in start..end {
                    self.memory.set(var.clone(), Value::Int(i));
                    match self.exec_loop_body(body) {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => {
                            result = Err(e);
                            break;
                        }
                    }
                }
                self.memory.pop();
                result
            }
            Stmt::While { cond, body, .. } => {
                self.memory.push("while");
                let mut result = Ok(());
                loop {
                    let c = match self.eval_expr(cond) {
                        Ok(v) => v,
                        Err(e) => {
                            result = Err(Flow::Error(e));
                            break;
                        }
                    };
                    if matches!(c, Value::Int(0)) {
                        break;
                    }
                    match self.exec_loop_body(body) {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => {
                            result = Err(e);
                            break;
                        }
                    }
                }
                self.memory.pop();
                result
            }
            Stmt::IfElse { cond, then_branch, else_branch, .. } => {
                let c = self.eval_expr(cond)?;
                if !matches!(c, Value::Int(0)) {
                    self.memory.push("then");
                    let result = self.exec_stmt(then_branch);
                    self.memory.pop();
                    result
                } else if let Some(else_branch) = else_branch {
                    self.memory.push("else");
                    let result = self.exec_stmt(else_branch);
                    self.memory.pop();
                    result
                } else {
                    Ok(())
                }
            }
            Stmt::Print { args, .. } => {
                let values = self.eval_tuple(args)?;
                let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                println!("{}", rendered.join(" "));
                Ok(())
            }
            Stmt::Controlflow { command, ret_val, .. } => match command {
                CfCommand::Break => Err(Flow::Escape(Escape::Break)),
                CfCommand::Continue => Err(Flow::Escape(Escape::Continue)),
                CfCommand::Return => {
                    let value = match ret_val {
                        Some(expr) => Some(self.eval_expr(expr)?),
                        None => None,
                    };
                    Err(Flow::Escape(Escape::Return(value)))
                }
            },
            Stmt::Scope { body, .. } => {
                self.memory.push("scope");
                let result = self.exec_stmt(body);
                self.memory.pop();
                result
            }
            Stmt::Instructions { stmts, .. } => {
                for stmt in stmts {
                    self.exec_stmt(stmt)?;
                }
                Ok(())
            }
        }
    }
}

impl Default for Evaluator {
    fn default() -> Evaluator {
        Evaluator::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_lit(v: i64) -> Expr {
        Expr::IntNum { value: v, line: Some(1) }
    }

    fn var(name: &str) -> Variable {
        Variable { name: name.to_string(), index: None, line: Some(1) }
    }

    #[test]
    fn assignment_then_reference_reads_back_the_value() {
        let assign = Stmt::Assignment { target: var("x"), op: AssignOp::Assign, expr: int_lit(7), line: Some(1) };
        let ret = Stmt::Controlflow {
            command: CfCommand::Return,
            ret_val: Some(Expr::Variable(var("x"))),
            line: Some(2),
        };
        let code = Evaluator::run(&[assign, ret]).unwrap();
        assert_eq!(code, 7);
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let assign = Stmt::Assignment {
            target: var("x"),
            op: AssignOp::Assign,
            expr: Expr::BinExpr {
                op: BinOp::Div,
                left: Box::new(int_lit(1)),
                right: Box::new(int_lit(0)),
                line: Some(1),
            },
            line: Some(1),
        };
        let err = Evaluator::run(&[assign]).unwrap_err();
        assert!(matches!(err, RuntimeError::DivisionByZero { .. }));
    }

    #[test]
    fn break_stops_the_for_loop_early() {
        let body = Stmt::Instructions {
            stmts: vec![
                Stmt::Assignment { target: var("total"), op: AssignOp::AddAssign, expr: int_lit(1), line: Some(2) },
                Stmt::Controlflow { command: CfCommand::Break, ret_val: None, line: Some(3) },
            ],
            line: Some(2),
        };
        let program = vec![
            Stmt::Assignment { target: var("total"), op: AssignOp::Assign, expr: int_lit(0), line: Some(1) },
            Stmt::ForLoop {
                var: "i".to_string(),
                range: RangeExpr { start: Box::new(int_lit(0)), end: Box::new(int_lit(10)), line: Some(1) },
                body: Box::new(body),
                line: Some(1),
            },
            Stmt::Controlflow { command: CfCommand::Return, ret_val: Some(Expr::Variable(var("total"))), line: Some(4) },
        ];
        let code = Evaluator::run(&program).unwrap();
        assert_eq!(code, 1);
    }

    #[test]
    fn return_inside_a_loop_exits_the_whole_program() {
        let body = Stmt::Controlflow { command: CfCommand::Return, ret_val: Some(int_lit(42)), line: Some(2) };
        let program = vec![Stmt::ForLoop {
            var: "i".to_string(),
            range: RangeExpr { start: Box::new(int_lit(0)), end: Box::new(int_lit(10)), line: Some(1) },
            body: Box::new(body),
            line: Some(1),
        }];
        let code = Evaluator::run(&program).unwrap();
        assert_eq!(code, 42);
    }

    #[test]
    fn return_of_non_int_yields_exit_code_negative_one() {
        let ret = Stmt::Controlflow {
            command: CfCommand::Return,
            ret_val: Some(Expr::StringLiteral { value: "done".to_string(), line: Some(1) }),
            line: Some(1),
        };
        let code = Evaluator::run(&[ret]).unwrap();
        assert_eq!(code, -1);
    }
}
