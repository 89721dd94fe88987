// AST (Abstract Syntax Tree) definitions for Mila programs

use std::fmt;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Storage types. Every scalar is a 64-bit signed integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Int,
    /// Inclusive index range `from..to`
    Array { from: i64, to: i64 },
}

impl Type {
    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    /// Number of storage cells: `to - from + 1` for arrays, 1 for scalars.
    ///
    /// A reversed range yields zero or a negative count; callers reject it.
    pub fn element_count(&self) -> i64 {
        match self {
            Type::Int => 1,
            Type::Array { from, to } => to.saturating_sub(*from).saturating_add(1),
        }
    }

    pub fn lower_bound(&self) -> i64 {
        match self {
            Type::Int => 0,
            Type::Array { from, .. } => *from,
        }
    }

    /// Offset added to a source index to get a zero-based cell index.
    pub fn base_offset(&self) -> i64 {
        self.lower_bound().wrapping_neg()
    }
}

/// Complete program: `program NAME; block.`
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub name: String,
    pub block: Block,
}

/// Declarations followed by a compound statement.
///
/// `decls` is never absent; an empty vector is the empty list.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub decls: Vec<Decl>,
    pub body: Stmt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    /// `None` only between parsing the identifier run and its `: type`.
    pub ty: Option<Type>,
    pub location: SourceLocation,
}

/// Formal parameter; always `integer`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub location: SourceLocation,
}

/// Procedure or function header plus optional body.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutineDecl {
    pub name: String,
    /// `None` when the header has no parenthesised list at all,
    /// `Some(vec![])` for an explicit `()`.
    pub params: Option<Vec<Param>>,
    /// `None` for a `forward` declaration.
    pub body: Option<Box<Block>>,
    pub location: SourceLocation,
}

impl RoutineDecl {
    pub fn parameters(&self) -> &[Param] {
        self.params.as_deref().unwrap_or(&[])
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.parameters().iter().map(|p| p.name.as_str()).collect()
    }

    pub fn is_forward(&self) -> bool {
        self.body.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Const {
        name: String,
        value: i64,
        location: SourceLocation,
    },
    Var(VarDecl),
    Procedure(RoutineDecl),
    Function(RoutineDecl),
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Const { name, .. } => name,
            Decl::Var(var) => &var.name,
            Decl::Procedure(routine) | Decl::Function(routine) => &routine.name,
        }
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            Decl::Const { location, .. } => *location,
            Decl::Var(var) => var.location,
            Decl::Procedure(routine) | Decl::Function(routine) => routine.location,
        }
    }

    /// Attach the type parsed after an identifier run. No-op for non-variables.
    pub fn add_type(&mut self, ty: &Type) {
        if let Decl::Var(var) = self {
            var.ty = Some(*ty);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// `to` steps by +1, `downto` by -1.
    pub fn step(self) -> i64 {
        match self {
            Direction::Up => 1,
            Direction::Down => -1,
        }
    }
}

/// Read access: `name` or `name[i]...`, produces a value.
#[derive(Debug, Clone, PartialEq)]
pub struct VarAccess {
    pub name: String,
    pub indices: Vec<Expr>,
    pub location: SourceLocation,
}

/// Write target: `name` or `name[i]...`, names a storage cell.
#[derive(Debug, Clone, PartialEq)]
pub struct VarTarget {
    pub name: String,
    pub indices: Vec<Expr>,
    pub location: SourceLocation,
}

impl VarTarget {
    pub fn new(name: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            indices: Vec::new(),
            location,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Compound(Vec<Stmt>),
    Assign {
        target: VarTarget,
        value: Expr,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        /// `Stmt::Null` when the `else` part is absent.
        else_branch: Box<Stmt>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    For {
        var: String,
        from: Expr,
        direction: Direction,
        to: Expr,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    Exit {
        location: SourceLocation,
    },
    Inc(VarTarget),
    Dec(VarTarget),
    Readln(VarTarget),
    Write(Expr),
    /// `Expr::Null` prints only the line break.
    Writeln(Expr),
    Break {
        location: SourceLocation,
    },
    ProcCall {
        name: String,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Relational
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    // Additive
    Add,
    Sub,
    Or,
    // Multiplicative
    Mul,
    Div,
    Mod,
    And,
    // Power (right-associative)
    Exp,
}

impl BinOp {
    pub fn name(self) -> &'static str {
        match self {
            BinOp::Eq => "eq",
            BinOp::Ne => "ne",
            BinOp::Lt => "lt",
            BinOp::Gt => "gt",
            BinOp::Le => "le",
            BinOp::Ge => "ge",
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Or => "or",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::Mod => "mod",
            BinOp::And => "and",
            BinOp::Exp => "exp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    Number(i64),
    Var(VarAccess),
    Call {
        name: String,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    /// Placeholder for an absent operand (`writeln` with no argument).
    Null,
}

impl fmt::Display for Expr {
    /// Prefix form, e.g. `add(a, mul(b, c))`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Binary {
                op, left, right, ..
            } => write!(f, "{}({}, {})", op.name(), left, right),
            Expr::Unary { op, operand, .. } => {
                let name = match op {
                    UnOp::Neg => "neg",
                    UnOp::Not => "not",
                };
                write!(f, "{}({})", name, operand)
            }
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Var(access) => {
                write!(f, "{}", access.name)?;
                for index in &access.indices {
                    write!(f, "[{}]", index)?;
                }
                Ok(())
            }
            Expr::Call { name, args, .. } => {
                write!(f, "call {}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Null => write!(f, "<null>"),
        }
    }
}
