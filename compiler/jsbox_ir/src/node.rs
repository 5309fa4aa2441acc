//! The tagged tree.
//!
//! One variant per opcode family, each with a fixed operand shape. Operators
//! that share evaluation plumbing (binary arithmetic, compound assignment,
//! member access, calls) carry an [`Opcode`] so the evaluator can dispatch
//! them through a single operator table.

use std::fmt;
use std::rc::Rc;

use crate::program::FunctionBody;
use crate::RegexLiteral;

/// Every operator the evaluator's operator table handles.
///
/// The tree builder never produces an opcode outside [`Opcode::ALL`], and a
/// standard operator table registers a handler for each entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Opcode {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    // Comparison
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    InstanceOf,
    // Unary
    Not,
    BitNot,
    Neg,
    Plus,
    Typeof,
    Void,
    Delete,
    // Update
    PreInc,
    PreDec,
    PostInc,
    PostDec,
    // Assignment
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    ExpAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    ShlAssign,
    ShrAssign,
    UShrAssign,
    // Member access and calls
    Prop,
    PropOptional,
    Call,
    CallOptional,
    New,
}

impl Opcode {
    /// Number of distinct opcodes.
    pub const COUNT: usize = Opcode::New as usize + 1;

    pub const ALL: [Opcode; Opcode::COUNT] = [
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Rem,
        Opcode::Exp,
        Opcode::BitAnd,
        Opcode::BitOr,
        Opcode::BitXor,
        Opcode::Shl,
        Opcode::Shr,
        Opcode::UShr,
        Opcode::Eq,
        Opcode::NotEq,
        Opcode::StrictEq,
        Opcode::StrictNotEq,
        Opcode::Lt,
        Opcode::LtEq,
        Opcode::Gt,
        Opcode::GtEq,
        Opcode::In,
        Opcode::InstanceOf,
        Opcode::Not,
        Opcode::BitNot,
        Opcode::Neg,
        Opcode::Plus,
        Opcode::Typeof,
        Opcode::Void,
        Opcode::Delete,
        Opcode::PreInc,
        Opcode::PreDec,
        Opcode::PostInc,
        Opcode::PostDec,
        Opcode::Assign,
        Opcode::AddAssign,
        Opcode::SubAssign,
        Opcode::MulAssign,
        Opcode::DivAssign,
        Opcode::RemAssign,
        Opcode::ExpAssign,
        Opcode::BitAndAssign,
        Opcode::BitOrAssign,
        Opcode::BitXorAssign,
        Opcode::ShlAssign,
        Opcode::ShrAssign,
        Opcode::UShrAssign,
        Opcode::Prop,
        Opcode::PropOptional,
        Opcode::Call,
        Opcode::CallOptional,
        Opcode::New,
    ];

    /// Dense index, usable as a table slot.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Source spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            Opcode::Add | Opcode::Plus => "+",
            Opcode::Sub | Opcode::Neg => "-",
            Opcode::Mul => "*",
            Opcode::Div => "/",
            Opcode::Rem => "%",
            Opcode::Exp => "**",
            Opcode::BitAnd => "&",
            Opcode::BitOr => "|",
            Opcode::BitXor => "^",
            Opcode::Shl => "<<",
            Opcode::Shr => ">>",
            Opcode::UShr => ">>>",
            Opcode::Eq => "==",
            Opcode::NotEq => "!=",
            Opcode::StrictEq => "===",
            Opcode::StrictNotEq => "!==",
            Opcode::Lt => "<",
            Opcode::LtEq => "<=",
            Opcode::Gt => ">",
            Opcode::GtEq => ">=",
            Opcode::In => "in",
            Opcode::InstanceOf => "instanceof",
            Opcode::Not => "!",
            Opcode::BitNot => "~",
            Opcode::Typeof => "typeof",
            Opcode::Void => "void",
            Opcode::Delete => "delete",
            Opcode::PreInc | Opcode::PostInc => "++",
            Opcode::PreDec | Opcode::PostDec => "--",
            Opcode::Assign => "=",
            Opcode::AddAssign => "+=",
            Opcode::SubAssign => "-=",
            Opcode::MulAssign => "*=",
            Opcode::DivAssign => "/=",
            Opcode::RemAssign => "%=",
            Opcode::ExpAssign => "**=",
            Opcode::BitAndAssign => "&=",
            Opcode::BitOrAssign => "|=",
            Opcode::BitXorAssign => "^=",
            Opcode::ShlAssign => "<<=",
            Opcode::ShrAssign => ">>=",
            Opcode::UShrAssign => ">>>=",
            Opcode::Prop => ".",
            Opcode::PropOptional => "?.",
            Opcode::Call => "()",
            Opcode::CallOptional => "?.()",
            Opcode::New => "new",
        }
    }

    /// Binary operator for a compound assignment (`+=` → `+`).
    pub fn compound_base(self) -> Option<Opcode> {
        Some(match self {
            Opcode::AddAssign => Opcode::Add,
            Opcode::SubAssign => Opcode::Sub,
            Opcode::MulAssign => Opcode::Mul,
            Opcode::DivAssign => Opcode::Div,
            Opcode::RemAssign => Opcode::Rem,
            Opcode::ExpAssign => Opcode::Exp,
            Opcode::BitAndAssign => Opcode::BitAnd,
            Opcode::BitOrAssign => Opcode::BitOr,
            Opcode::BitXorAssign => Opcode::BitXor,
            Opcode::ShlAssign => Opcode::Shl,
            Opcode::ShrAssign => Opcode::Shr,
            Opcode::UShrAssign => Opcode::UShr,
            _ => return None,
        })
    }

    /// Binary operator for a spelled operator token.
    pub fn binary(symbol: &str) -> Option<Opcode> {
        Some(match symbol {
            "+" => Opcode::Add,
            "-" => Opcode::Sub,
            "*" => Opcode::Mul,
            "/" => Opcode::Div,
            "%" => Opcode::Rem,
            "**" => Opcode::Exp,
            "&" => Opcode::BitAnd,
            "|" => Opcode::BitOr,
            "^" => Opcode::BitXor,
            "<<" => Opcode::Shl,
            ">>" => Opcode::Shr,
            ">>>" => Opcode::UShr,
            "==" => Opcode::Eq,
            "!=" => Opcode::NotEq,
            "===" => Opcode::StrictEq,
            "!==" => Opcode::StrictNotEq,
            "<" => Opcode::Lt,
            "<=" => Opcode::LtEq,
            ">" => Opcode::Gt,
            ">=" => Opcode::GtEq,
            "in" => Opcode::In,
            "instanceof" => Opcode::InstanceOf,
            _ => return None,
        })
    }

    /// Assignment operator for a spelled token (`=`, `+=`, ...).
    pub fn assignment(symbol: &str) -> Option<Opcode> {
        Some(match symbol {
            "=" => Opcode::Assign,
            "+=" => Opcode::AddAssign,
            "-=" => Opcode::SubAssign,
            "*=" => Opcode::MulAssign,
            "/=" => Opcode::DivAssign,
            "%=" => Opcode::RemAssign,
            "**=" => Opcode::ExpAssign,
            "&=" => Opcode::BitAndAssign,
            "|=" => Opcode::BitOrAssign,
            "^=" => Opcode::BitXorAssign,
            "<<=" => Opcode::ShlAssign,
            ">>=" => Opcode::ShrAssign,
            ">>>=" => Opcode::UShrAssign,
            _ => return None,
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `&&`, `||` and `??`, which evaluate their right side lazily.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

impl LogicalOp {
    pub fn from_symbol(symbol: &str) -> Option<LogicalOp> {
        match symbol {
            "&&" | "&&=" => Some(LogicalOp::And),
            "||" | "||=" => Some(LogicalOp::Or),
            "??" | "??=" => Some(LogicalOp::Nullish),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

impl DeclKind {
    pub fn from_keyword(word: &str) -> Option<DeclKind> {
        match word {
            "var" => Some(DeclKind::Var),
            "let" => Some(DeclKind::Let),
            "const" => Some(DeclKind::Const),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    Arrow,
    Expression,
    Declaration,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Rc<str>,
    /// `...name`, collecting the remaining arguments into an array.
    pub rest: bool,
}

/// A function or arrow literal.
#[derive(Debug, PartialEq)]
pub struct FunctionDef {
    pub name: Option<Rc<str>>,
    pub params: Vec<Param>,
    pub is_async: bool,
    pub kind: FunctionKind,
    pub body: FunctionBody,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ObjectKey {
    Static(Rc<str>),
    Computed(Node),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ObjectEntry {
    Property(ObjectKey, Node),
    Spread(Node),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoopAction {
    Break,
    Continue,
}

/// How a loop obtains its per-iteration values.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoopIteration {
    /// `for (;;)`, `while`, `do..while`.
    Counted,
    /// `for (x of iterable)`.
    ForOf,
    /// `for (k in object)`.
    ForIn,
}

/// The name bound to each value of a `for..of` / `for..in` loop.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopBinding {
    /// `None` when the loop assigns to an existing binding (`for (x of xs)`).
    pub kind: Option<DeclKind>,
    pub name: Rc<str>,
}

/// Canonical loop descriptor shared by every loop form.
///
/// Evaluation order: run `init` in a fresh loop scope, evaluate `iterable`
/// once (for `ForOf`/`ForIn`), then per iteration: check `condition` (before
/// the body when `check_first`, after it otherwise), bind the next value to
/// `binding` in a per-iteration scope, run `body`, run `step`.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopNode {
    pub label: Option<Rc<str>>,
    pub check_first: bool,
    pub iteration: LoopIteration,
    pub iterable: Option<Node>,
    pub init: Vec<Node>,
    pub step: Option<Node>,
    pub condition: Option<Node>,
    pub binding: Option<LoopBinding>,
    pub body: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`.
    pub test: Option<Node>,
    pub body: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchNode {
    pub label: Option<Rc<str>>,
    pub discriminant: Node,
    pub cases: Vec<SwitchCase>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TryNode {
    pub block: Vec<Node>,
    /// Catch binding; absent for `catch {}` and when there is no catch clause.
    pub param: Option<Rc<str>>,
    pub handler: Option<Vec<Node>>,
    pub finalizer: Option<Vec<Node>>,
}

/// A node of the tagged tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Literal(Literal),
    /// A string literal, already decoded from the constants table.
    Str(Rc<str>),
    Template {
        quasis: Rc<[Rc<str>]>,
        parts: Vec<Node>,
    },
    Regex(RegexLiteral),
    Ident(Rc<str>),
    This,
    Member {
        object: Box<Node>,
        property: Box<Node>,
        optional: bool,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
        optional: bool,
    },
    New {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    Array(Vec<Node>),
    Object(Vec<ObjectEntry>),
    Spread(Box<Node>),
    Unary {
        op: Opcode,
        operand: Box<Node>,
    },
    Update {
        op: Opcode,
        target: Box<Node>,
    },
    Binary {
        op: Opcode,
        left: Box<Node>,
        right: Box<Node>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Assign {
        op: Opcode,
        target: Box<Node>,
        value: Box<Node>,
    },
    LogicalAssign {
        op: LogicalOp,
        target: Box<Node>,
        value: Box<Node>,
    },
    Conditional {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
    },
    Sequence(Vec<Node>),
    Function(Rc<FunctionDef>),
    Declare {
        kind: DeclKind,
        name: Rc<str>,
        value: Option<Box<Node>>,
    },
    Return(Option<Box<Node>>),
    Throw(Box<Node>),
    If {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Option<Box<Node>>,
    },
    /// A braced block; opens a new lexical scope.
    Block(Vec<Node>),
    Loop(Box<LoopNode>),
    LoopAction {
        action: LoopAction,
        label: Option<Rc<str>>,
    },
    Switch(Box<SwitchNode>),
    Try(Box<TryNode>),
    Await(Box<Node>),
    Empty,
}

impl Node {
    /// The operator-table opcode this node dispatches through, if any.
    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            Node::Member { optional, .. } => Some(if *optional {
                Opcode::PropOptional
            } else {
                Opcode::Prop
            }),
            Node::Call { optional, .. } => Some(if *optional {
                Opcode::CallOptional
            } else {
                Opcode::Call
            }),
            Node::New { .. } => Some(Opcode::New),
            Node::Unary { op, .. }
            | Node::Update { op, .. }
            | Node::Binary { op, .. }
            | Node::Assign { op, .. } => Some(*op),
            _ => None,
        }
    }

    pub fn number(value: f64) -> Node {
        Node::Literal(Literal::Number(value))
    }

    pub fn ident(name: &str) -> Node {
        Node::Ident(name.into())
    }

    /// Whether this node can appear on the left of an assignment.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Node::Ident(_) | Node::Member { optional: false, .. })
    }
}

#[cfg(test)]
mod tests;
