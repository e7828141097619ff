/**
 * The static type/shape checker. One pass over the AST, populating a
 * `SymbolTable` and collecting `StaticError`s; analysis is best-effort, so a
 * plausible descriptor is always returned even after reporting an error, and
 * the walk never stops early.
 */

use crate::ast::*;
use crate::errors::StaticError;
use crate::symbol_table::{Descriptor, Dim, ShapeOrValue, SymbolTable};

pub struct Checker {
    table: SymbolTable,
    errors: Vec<StaticError>,
}

impl Checker {
    pub fn new() -> Checker {
        Checker {
            table: SymbolTable::new(),
            errors: Vec::new(),
        }
    }

    pub fn check_program(stmts: &[Stmt]) -> Vec<StaticError> {
        let mut checker = Checker::new();
        for stmt in stmts {
            checker.visit_stmt(stmt);
        }
        checker.errors
    }

    fn report(&mut self, err: StaticError) {
        self.errors.push(err);
    }

    fn op_type(op: BinOp, t1: Type, t2: Type) -> Option<Type> {
        use Type::*;
        match op {
            BinOp::Add | BinOp::EAdd => match (t1, t2) {
                (Int, Int) => Some(Int),
                (Int, Float) | (Float, Int) | (Float, Float) => Some(Float),
                (Str, Str) => Some(Str),
                _ => None,
            },
            BinOp::Sub | BinOp::ESub | BinOp::Mul | BinOp::EMul | BinOp::Div | BinOp::EDiv => {
                match (t1, t2) {
                    (Int, Int) => Some(Int),
                    (Int, Float) | (Float, Int) | (Float, Float) => Some(Float),
                    _ => None,
                }
            }
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                match (t1, t2) {
                    (Int, Int) | (Int, Float) | (Float, Int) | (Float, Float) => Some(Int),
                    _ => None,
                }
            }
        }
    }

    fn is_scalar_op(op: BinOp) -> bool {
        !op.is_elementwise()
    }

    fn type_name(ty: Type) -> &'static str {
        match ty {
            Type::Int => "int",
            Type::Float => "float",
            Type::Str => "str",
            Type::Unknown => "unknown",
        }
    }

    fn visit_bin_expr(&mut self, op: BinOp, left: &Expr, right: &Expr, line: Line) -> Descriptor {
        let d1 = self.visit_expr(left);
        let d2 = self.visit_expr(right);

        let is_tensor1 = d1.shape.is_tensor();
        let is_tensor2 = d2.shape.is_tensor();

        if is_tensor1 || is_tensor2 {
            if is_tensor1 && !is_tensor2 {
                self.report(StaticError::OpTypeMismatch {
                    message: "Can't add tensor to scalar".to_string(),
                    line,
                });
                return d1;
            }
            if is_tensor2 && !is_tensor1 {
                self.report(StaticError::OpTypeMismatch {
                    message: "Can't add scalar to tensor".to_string(),
                    line,
                });
                return d1;
            }

            let (dims1, dims2) = match (&d1.shape, &d2.shape) {
                (ShapeOrValue::Tensor(a), ShapeOrValue::Tensor(b)) => (a.clone(), b.clone()),
                _ => unreachable!(),
            };

            if dims1.len() != dims2.len() {
                self.report(StaticError::ShapeMismatch {
                    op: op.to_string(),
                    line,
                });
            } else {
                for (a, b) in dims1.iter().zip(dims2.iter()) {
                    if let (Dim::Known(x), Dim::Known(y)) = (a, b) {
                        if x != y {
                            self.report(StaticError::ShapeMismatch {
                                op: op.to_string(),
                                line,
                            });
                            break;
                        }
                    }
                }
            }

            if !op.is_elementwise() {
                self.report(StaticError::OpTypeMismatch {
                    message: format!("{} does not support tensor operations", op),
                    line,
                });
            } else if let Some(result_ty) = Checker::op_type(op, d1.ty, d2.ty) {
                return Descriptor::tensor(result_ty, dims1);
            } else {
                self.report(StaticError::OpTypeMismatch {
                    message: format!(
                        "Can't perform {} on ({}, {}), incompatible types",
                        op,
                        Checker::type_name(d1.ty),
                        Checker::type_name(d2.ty)
                    ),
                    line,
                });
            }
        } else {
            if !Checker::is_scalar_op(op) {
                self.report(StaticError::OpTypeMismatch {
                    message: format!("{} does not support scalar operations", op),
                    line,
                });
            } else if let Some(result_ty) = Checker::op_type(op, d1.ty, d2.ty) {
                return Descriptor { ty: result_ty, shape: d1.shape.clone() };
            } else {
                self.report(StaticError::OpTypeMismatch {
                    message: format!(
                        "Can't perform {} on ({}, {}), incompatible types",
                        op,
                        Checker::type_name(d1.ty),
                        Checker::type_name(d2.ty)
                    ),
                    line,
                });
            }
        }

        d1
    }

    /**
     * Validates an index tuple against a tensor's static dims: arity, each element's
     * type, and literal out-of-bounds. Returns `false` (and stops, reporting nothing
     * further) when the arity itself is invalid, since no per-element check means
     * anything once that's wrong.
     */
    fn validate_index(&mut self, name: &str, index: &Index, dims: &[Dim], line: Line) -> bool {
        if index.elements.len() > dims.len() {
            self.report(StaticError::BadIndex {
                name: name.to_string(),
                reason: format!("index is bigger than {} shape", name),
                line,
            });
            return false;
        }

        for (i, idx_expr) in index.elements.iter().enumerate() {
            let d = self.visit_expr(idx_expr);
            if d.ty != Type::Int {
                self.report(StaticError::BadIndex {
                    name: name.to_string(),
                    reason: "index should be integer number".to_string(),
                    line,
                });
            }
            if d.shape.is_tensor() {
                self.report(StaticError::BadIndex {
                    name: name.to_string(),
                    reason: "vector or matrix can't be used as index".to_string(),
                    line,
                });
            }
            if let (Expr::IntNum { value, .. }, Dim::Known(bound)) = (idx_expr, dims[i]) {
                if *value >= bound {
                    self.report(StaticError::BadIndex {
                        name: name.to_string(),
                        reason: format!("{} index out of {} shape", value, name),
                        line,
                    });
                }
            }
        }

        true
    }

    fn visit_variable(&mut self, var: &Variable) -> Descriptor {
        let base = match self.table.get(&var.name) {
            Some(d) => d.clone(),
            None => {
                self.report(StaticError::UndeclaredName {
                    name: var.name.clone(),
                    line: var.line,
                });
                return Descriptor::unknown();
            }
        };

        let index = match &var.index {
            None => return base,
            Some(index) => index,
        };

        let dims = match &base.shape {
            ShapeOrValue::Tensor(dims) => dims.clone(),
            ShapeOrValue::Scalar(_) => {
                self.report(StaticError::BadIndex {
                    name: var.name.clone(),
                    reason: "scalar value does not support indexing".to_string(),
                    line: var.line,
                });
                return base;
            }
        };

        if !self.validate_index(&var.name, index, &dims, var.line) {
            return base;
        }

        if index.elements.len() == dims.len() {
            Descriptor::scalar(base.ty)
        } else {
            Descriptor::tensor(base.ty, dims[index.elements.len()..].to_vec())
        }
    }

    fn visit_transpose(&mut self, expr: &Expr, line: Line) -> Descriptor {
        let d = self.visit_expr(expr);
        let dims = match &d.shape {
            ShapeOrValue::Tensor(dims) => dims.clone(),
            ShapeOrValue::Scalar(_) => {
                self.report(StaticError::OpTypeMismatch {
                    message: "can only transpose a tensor".to_string(),
                    line,
                });
                return d;
            }
        };

        let new_dims = if dims.len() == 1 {
            vec![Dim::Known(1), dims[0]]
        } else {
            vec![dims[1], dims[0]]
        };

        Descriptor::tensor(d.ty, new_dims)
    }

    fn visit_negation(&mut self, expr: &Expr, line: Line) -> Descriptor {
        let d = self.visit_expr(expr);
        if d.shape.is_tensor() {
            self.report(StaticError::OpTypeMismatch {
                message: "negation does not support tensors".to_string(),
                line,
            });
        }
        if d.ty != Type::Int && d.ty != Type::Float {
            self.report(StaticError::OpTypeMismatch {
                message: "negation does not support non-numeric values".to_string(),
                line,
            });
        }
        d
    }

    fn visit_tuple(&mut self, tuple: &Tuple) -> Vec<Descriptor> {
        tuple.args.iter().map(|e| self.visit_expr(e)).collect()
    }

    fn visit_function(&mut self, name: FuncName, args: &Tuple, line: Line) -> Descriptor {
        let descriptors = self.visit_tuple(args);

        let distinct_types: Vec<Type> = {
            let mut seen = Vec::new();
            for d in &descriptors {
                if !seen.contains(&d.ty) {
                    seen.push(d.ty);
                }
            }
            seen
        };
        if distinct_types.len() > 1 {
            self.report(StaticError::OpTypeMismatch {
                message: format!("expected int numbers or variables in arguments to {}", name.as_str()),
                line,
            });
        }

        let mut dims = Vec::new();
        for d in &descriptors {
            match &d.shape {
                ShapeOrValue::Tensor(_) => {
                    self.report(StaticError::OpTypeMismatch {
                        message: format!("expected int numbers or variables in arguments to {}, got tensor", name.as_str()),
                        line,
                    });
                    dims.push(Dim::Unknown);
                }
                ShapeOrValue::Scalar(value) => match value {
                    Some(v) => dims.push(Dim::Known(*v)),
                    None => dims.push(Dim::Unknown),
                },
            }
        }

        Descriptor::tensor(Type::Int, dims)
    }

    fn visit_tensor_literal(&mut self, rows: &[Expr], line: Line) -> Descriptor {
        let mut dtypes: Vec<Type> = Vec::new();
        let mut shapes: Vec<Vec<Dim>> = Vec::new();

        for row in rows {
            let d = self.visit_expr(row);
            let shape = match &d.shape {
                ShapeOrValue::Tensor(dims) => dims.clone(),
                ShapeOrValue::Scalar(_) => Vec::new(),
            };
            if !dtypes.contains(&d.ty) {
                dtypes.push(d.ty);
            }
            if !shapes.contains(&shape) {
                shapes.push(shape);
            }
        }

        if dtypes.contains(&Type::Int) && dtypes.contains(&Type::Float) {
            dtypes.retain(|t| *t != Type::Int);
        }

        if dtypes.len() > 1 {
            self.report(StaticError::HeterogeneousTensor { line });
        }
        if shapes.len() > 1 {
            self.report(StaticError::HeterogeneousTensor { line });
        }

        let elem_ty = dtypes.first().copied().unwrap_or(Type::Unknown);
        let elem_shape = shapes.first().cloned().unwrap_or_default();

        let mut dims = vec![Dim::Known(rows.len() as i64)];
        dims.extend(elem_shape);
        Descriptor::tensor(elem_ty, dims)
    }

    fn visit_expr(&mut self, expr: &Expr) -> Descriptor {
        match expr {
            Expr::IntNum { value, .. } => Descriptor::scalar_value(Type::Int, *value),
            Expr::FloatNum { .. } => Descriptor::scalar(Type::Float),
            Expr::StringLiteral { .. } => Descriptor::scalar(Type::Str),
            Expr::Tensor { rows, line } => self.visit_tensor_literal(rows, *line),
            Expr::Variable(var) => self.visit_variable(var),
            Expr::BinExpr { op, left, right, line } => self.visit_bin_expr(*op, left, right, *line),
            Expr::Transpose { expr, line } => self.visit_transpose(expr, *line),
            Expr::Negation { expr, line } => self.visit_negation(expr, *line),
            Expr::Function { name, args, line } => self.visit_function(*name, args, *line),
            Expr::Tuple(tuple) => {
                let descriptors = self.visit_tuple(tuple);
                descriptors.into_iter().next().unwrap_or_else(Descriptor::unknown)
            }
        }
    }

    fn visit_range(&mut self, range: &RangeExpr, line: Line) {
        let d1 = self.visit_expr(&range.start);
        let d2 = self.visit_expr(&range.end);
        if d1.ty != Type::Int || d2.ty != Type::Int {
            self.report(StaticError::BadRange {
                found: format!("({}, {})", Checker::type_name(d1.ty), Checker::type_name(d2.ty)),
                line,
            });
        }
        if d1.shape.is_tensor() || d2.shape.is_tensor() {
            self.report(StaticError::BadRange {
                found: "tensor".to_string(),
                line,
            });
        }
    }

    fn check_condition(&mut self, cond: &Expr, line: Line) {
        let d = self.visit_expr(cond);
        if d.ty != Type::Int {
            self.report(StaticError::BadCondition {
                found: Checker::type_name(d.ty).to_string(),
                line,
            });
        }
        if d.shape.is_tensor() {
            self.report(StaticError::BadCondition {
                found: "tensor".to_string(),
                line,
            });
        }
    }

    fn visit_assignment(&mut self, target: &Variable, op: AssignOp, expr: &Expr, line: Line) {
        if let Some(bin_op) = op.as_bin_op() {
            let equivalent = Expr::BinExpr {
                op: bin_op,
                left: Box::new(Expr::Variable(target.clone())),
                right: Box::new(expr.clone()),
                line,
            };
            self.visit_expr(&equivalent);
            return;
        }

        let d = self.visit_expr(expr);

        let index = match &target.index {
            None => {
                let shape = if d.shape.is_tensor() { d.shape } else { ShapeOrValue::Scalar(None) };
                self.table.put(target.name.clone(), Descriptor { ty: d.ty, shape });
                return;
            }
            Some(index) => index,
        };

        // Indexed assignment writes one element into an existing tensor; the
        // variable's own descriptor (type and shape) is unaffected.
        let base = match self.table.get(&target.name) {
            Some(b) => b.clone(),
            None => {
                self.report(StaticError::UndeclaredName {
                    name: target.name.clone(),
                    line: target.line,
                });
                return;
            }
        };

        let dims = match &base.shape {
            ShapeOrValue::Tensor(dims) => dims.clone(),
            ShapeOrValue::Scalar(_) => {
                self.report(StaticError::BadIndex {
                    name: target.name.clone(),
                    reason: "scalar value does not support indexing".to_string(),
                    line: target.line,
                });
                return;
            }
        };

        if !self.validate_index(&target.name, index, &dims, target.line) {
            return;
        }

        if d.shape.is_tensor() {
            self.report(StaticError::OpTypeMismatch {
                message: format!("can't assign a tensor into an indexed element of '{}'", target.name),
                line,
            });
            return;
        }

        let compatible = d.ty == base.ty || (base.ty == Type::Float && d.ty == Type::Int);
        if !compatible {
            self.report(StaticError::OpTypeMismatch {
                message: format!(
                    "can't assign {} into {} tensor '{}'",
                    Checker::type_name(d.ty),
                    Checker::type_name(base.ty),
                    target.name
                ),
                line,
            });
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assignment { target, op, expr, line } => {
                self.visit_assignment(target, *op, expr, *line);
            }
            Stmt::ForLoop { var, range, body, line } => {
                self.table.push("for");
                self.visit_range(range, *line);
                self.table.put(var.clone(), Descriptor::scalar(Type::Int));
                self.visit_stmt(body);
                self.table.pop();
            }
            Stmt::While { cond, body, line } => {
                self.table.push("while");
                self.check_condition(cond, *line);
                self.visit_stmt(body);
                self.table.pop();
            }
            Stmt::IfElse { cond, then_branch, else_branch, line } => {
                self.table.push("if");
                self.check_condition(cond, *line);
                self.visit_stmt(then_branch);
                self.table.pop();

                if let Some(else_branch) = else_branch {
                    self.table.push("else");
                    self.visit_stmt(else_branch);
                    self.table.pop();
                }
            }
            Stmt::Print { args, .. } => {
                self.visit_tuple(args);
            }
            Stmt::Controlflow { command, ret_val, line } => {
                if matches!(command, CfCommand::Break | CfCommand::Continue) && self.table.innermost_loop().is_none() {
                    let name = match command {
                        CfCommand::Break => "break",
                        CfCommand::Continue => "continue",
                        CfCommand::Return => unreachable!(),
                    };
                    self.report(StaticError::ControlFlowOutOfLoop {
                        command: name.to_string(),
                        line: *line,
                    });
                }
                if let Some(ret_val) = ret_val {
                    self.visit_expr(ret_val);
                }
            }
            Stmt::Scope { body, .. } => {
                self.table.push("block");
                self.visit_stmt(body);
                self.table.pop();
            }
            Stmt::Instructions { stmts, .. } => {
                for stmt in stmts {
                    self.visit_stmt(stmt);
                }
            }
        }
    }
}

impl Default for Checker {
    fn default() -> Checker {
        Checker::new()
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
    fn undeclared_name_is_reported() {
        let stmt = Stmt::Print {
            args: Tuple { args: vec![Expr::Variable(var("x"))], line: Some(1) },
            line: Some(1),
        };
        let errors = Checker::check_program(&[stmt]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], StaticError::UndeclaredName { .. }));
    }

    #[test]
    fn assignment_then_reference_is_clean() {
        let assign = Stmt::Assignment {
            target: var("x"),
            op: AssignOp::Assign,
            expr: int_lit(3),
            line: Some(1),
        };
        let print_stmt = Stmt::Print {
            args: Tuple { args: vec![Expr::Variable(var("x"))], line: Some(2) },
            line: Some(2),
        };
        let errors = Checker::check_program(&[assign, print_stmt]);
        assert!(errors.is_empty());
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let stmt = Stmt::Controlflow { command: CfCommand::Break, ret_val: None, line: Some(1) };
        let errors = Checker::check_program(&[stmt]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], StaticError::ControlFlowOutOfLoop { .. }));
    }

    #[test]
    fn break_inside_for_loop_is_accepted() {
        let body = Stmt::Instructions {
            stmts: vec![Stmt::Controlflow { command: CfCommand::Break, ret_val: None, line: Some(2) }],
            line: Some(2),
        };
        let for_loop = Stmt::ForLoop {
            var: "i".to_string(),
            range: RangeExpr { start: Box::new(int_lit(0)), end: Box::new(int_lit(10)), line: Some(1) },
            body: Box::new(body),
            line: Some(1),
        };
        let errors = Checker::check_program(&[for_loop]);
        assert!(errors.is_empty());
    }

    #[test]
    fn indexed_assignment_does_not_clobber_the_tensors_descriptor() {
        let zeros_call = Stmt::Assignment {
            target: var("A"),
            op: AssignOp::Assign,
            expr: Expr::Function {
                name: FuncName::Zeros,
                args: Tuple { args: vec![int_lit(3), int_lit(3)], line: Some(1) },
                line: Some(1),
            },
            line: Some(1),
        };
        let indexed_assign = Stmt::Assignment {
            target: Variable {
                name: "A".to_string(),
                index: Some(Index { elements: vec![int_lit(0), int_lit(0)], line: Some(2) }),
                line: Some(2),
            },
            op: AssignOp::Assign,
            expr: int_lit(1),
            line: Some(2),
        };
        let read_back = Stmt::Print {
            args: Tuple {
                args: vec![Expr::Variable(Variable {
                    name: "A".to_string(),
                    index: Some(Index { elements: vec![int_lit(0), int_lit(0)], line: Some(3) }),
                    line: Some(3),
                })],
                line: Some(3),
            },
            line: Some(3),
        };
        let errors = Checker::check_program(&[zeros_call, indexed_assign, read_back]);
        assert!(errors.is_empty(), "unexpected static errors: {:?}", errors);
    }

    #[test]
    fn tensor_scalar_mix_is_rejected() {
        let assign = Stmt::Assignment {
            target: var("a"),
            op: AssignOp::Assign,
            expr: Expr::Tensor { rows: vec![int_lit(1), int_lit(2)], line: Some(1) },
            line: Some(1),
        };
        let bad = Stmt::Assignment {
            target: var("b"),
            op: AssignOp::Assign,
            expr: Expr::BinExpr {
                op: BinOp::Add,
                left: Box::new(Expr::Variable(var("a"))),
                right: Box::new(int_lit(1)),
                line: Some(2),
            },
            line: Some(2),
        };
        let errors = Checker::check_program(&[assign, bad]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], StaticError::OpTypeMismatch { .. }));
    }
}
