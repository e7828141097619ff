/**
 * The abstract syntax tree produced by the parser in `frontend` and walked by
 * the checker (`semantics`) and the evaluator (`evaluator`).
 *
 * Every node carries an optional 1-based source line number, attached by the
 * parser wherever `pest` can locate one precisely. Nodes are immutable once
 * built; equality/identity between nodes carries no meaning, only structure.
 */

pub type Line = Option<u32>;

/**
 * A scalar/tensor base type as tracked by the static checker.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Type {
    Int,
    Float,
    Str,
    /** Returned when a name could not be resolved; lets the checker keep walking. */
    Unknown,
}

/**
 * Binary operators, split into the scalar set and the element-wise tensor set.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    EAdd,
    ESub,
    EMul,
    EDiv,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl BinOp {
    pub fn is_elementwise(self) -> bool {
        matches!(self, BinOp::EAdd | BinOp::ESub | BinOp::EMul | BinOp::EDiv)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::EAdd => ".+",
            BinOp::ESub => ".-",
            BinOp::EMul => ".*",
            BinOp::EDiv => "./",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
        }
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/**
 * Assignment operators; every compound form is checked and evaluated as
 * `target = target <op> expr` for the corresponding `BinOp`.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl AssignOp {
    /** The `BinOp` a compound assignment desugars to; `None` for plain `=`. */
    pub fn as_bin_op(self) -> Option<BinOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinOp::Add),
            AssignOp::SubAssign => Some(BinOp::Sub),
            AssignOp::MulAssign => Some(BinOp::Mul),
            AssignOp::DivAssign => Some(BinOp::Div),
        }
    }
}

/**
 * The built-in tensor constructors. No user-defined functions exist in this language.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FuncName {
    Zeros,
    Ones,
    Eye,
}

impl FuncName {
    pub fn from_ident(name: &str) -> Option<FuncName> {
        match name {
            "zeros" => Some(FuncName::Zeros),
            "ones" => Some(FuncName::Ones),
            "eye" => Some(FuncName::Eye),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FuncName::Zeros => "zeros",
            FuncName::Ones => "ones",
            FuncName::Eye => "eye",
        }
    }
}

/**
 * `break` / `continue` / `return` commands.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CfCommand {
    Break,
    Continue,
    Return,
}

/**
 * `Variable(name, index?)`. Used both as an expression and as an assignment target.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: String,
    pub index: Option<Index>,
    pub line: Line,
}

/**
 * The index wrapper: an ordered list of index sub-expressions, e.g. `[i, j]` in `A[i, j]`.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct Index {
    pub elements: Vec<Expr>,
    pub line: Line,
}

/**
 * `Tuple(args)`: an ordered argument list, used by `print` and builtin function calls.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct Tuple {
    pub args: Vec<Expr>,
    pub line: Line,
}

/**
 * `Range(start, end)`, the only iterable a `for` loop accepts.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct RangeExpr {
    pub start: Box<Expr>,
    pub end: Box<Expr>,
    pub line: Line,
}

/**
 * Every expression evaluates to exactly one value at runtime.
 */
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    IntNum {
        value: i64,
        line: Line,
    },
    FloatNum {
        value: f64,
        line: Line,
    },
    StringLiteral {
        value: String,
        line: Line,
    },
    /**
     * A tensor literal `[a, b, ...]`; rows may themselves be tensor literals,
     * giving rank-2 matrices. Must be rectangular (checked, not enforced here).
     */
    Tensor {
        rows: Vec<Expr>,
        line: Line,
    },
    Variable(Variable),
    BinExpr {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        line: Line,
    },
    Transpose {
        expr: Box<Expr>,
        line: Line,
    },
    Negation {
        expr: Box<Expr>,
        line: Line,
    },
    Function {
        name: FuncName,
        args: Tuple,
        line: Line,
    },
    Tuple(Tuple),
}

impl Expr {
    pub fn line(&self) -> Line {
        match self {
            Expr::IntNum { line, .. }
            | Expr::FloatNum { line, .. }
            | Expr::StringLiteral { line, .. }
            | Expr::Tensor { line, .. }
            | Expr::BinExpr { line, .. }
            | Expr::Transpose { line, .. }
            | Expr::Negation { line, .. }
            | Expr::Function { line, .. } => *line,
            Expr::Variable(v) => v.line,
            Expr::Tuple(t) => t.line,
        }
    }
}

/**
 * Statements. `Instructions` is the sequencing node produced for a list of
 * statements; `Scope` introduces a fresh lexical scope around a nested block.
 */
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Assignment {
        target: Variable,
        op: AssignOp,
        expr: Expr,
        line: Line,
    },
    ForLoop {
        var: String,
        range: RangeExpr,
        body: Box<Stmt>,
        line: Line,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        line: Line,
    },
    IfElse {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        line: Line,
    },
    Print {
        args: Tuple,
        line: Line,
    },
    Controlflow {
        command: CfCommand,
        ret_val: Option<Expr>,
        line: Line,
    },
    Scope {
        body: Box<Stmt>,
        line: Line,
    },
    Instructions {
        stmts: Vec<Stmt>,
        line: Line,
    },
}

impl Stmt {
    pub fn line(&self) -> Line {
        match self {
            Stmt::Assignment { line, .. }
            | Stmt::ForLoop { line, .. }
            | Stmt::While { line, .. }
            | Stmt::IfElse { line, .. }
            | Stmt::Print { line, .. }
            | Stmt::Controlflow { line, .. }
            | Stmt::Scope { line, .. }
            | Stmt::Instructions { line, .. } => *line,
        }
    }
}
