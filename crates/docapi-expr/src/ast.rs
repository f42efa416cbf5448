//! Expression syntax tree.

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Identifier(String),
    /// `[a, ...b]`
    Array(Vec<Element>),
    /// `{k: v, ...m}`
    Object(Vec<Property>),
    /// `base.name`
    Member { base: Box<Expr>, name: String },
    /// `callee(args)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `left + right`
    Plus(Box<Expr>, Box<Expr>),
}

/// An array literal entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub expr: Expr,
    /// Written as `...expr`.
    pub spread: bool,
}

/// An object literal entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    KeyValue { key: String, value: Expr },
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Expr {
    /// Convenience constructor for `base.name`.
    pub fn member(base: Expr, name: impl Into<String>) -> Self {
        Expr::Member {
            base: Box::new(base),
            name: name.into(),
        }
    }

    /// Convenience constructor for `callee(args)`.
    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(value.into()))
    }
}
