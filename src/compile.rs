pub(crate) mod line;
pub(crate) mod tree;

mod parse;

pub use crate::compile::{
    line::{classify, Line},
    parse::Parser,
    tree::{Entry, NodeId, NodeKind},
};

use crate::log::Error;
use std::fmt::Display;

/// Compile every entry in the given source text.
///
/// Provides a shortcut to quickly compile entries without creating
/// an `Engine`.
///
/// # Errors
///
/// Returns an [`Error`] when compilation fails, which most likely means
/// the source contains invalid syntax.
///
/// # Examples
///
/// ```
/// use stencil::compile;
///
/// let entries = compile(None, "--- [getUser]\nSELECT * FROM user WHERE id = #id#");
/// assert!(entries.is_ok());
/// ```
pub fn compile(name: Option<&str>, source: &str) -> Result<Vec<Entry>, Error> {
    Parser::new(source).compile(name)
}

/// Block-opening directives recognized by the classifier.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Directive {
    /// Beginning of an `if` block, guarded by a comparison expression.
    If,
    /// Beginning of an `ifnotnil` block, guarded by variable presence.
    IfNotNil,
    /// Beginning of a `range` block, a loop over a sequence.
    Range,
    /// Beginning of a `set` block.
    Set,
    /// Beginning of a `where` block.
    Where,
}

impl Directive {
    /// Return the [`Terminator`] that closes a block of this kind.
    ///
    /// Both `if` and `ifnotnil` close with `endif`.
    pub fn terminator(&self) -> Terminator {
        match self {
            Directive::If | Directive::IfNotNil => Terminator::EndIf,
            Directive::Range => Terminator::EndRange,
            Directive::Set => Terminator::EndSet,
            Directive::Where => Terminator::EndWhere,
        }
    }
}

impl Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Directive::If => write!(f, "if"),
            Directive::IfNotNil => write!(f, "ifnotnil"),
            Directive::Range => write!(f, "range"),
            Directive::Set => write!(f, "set"),
            Directive::Where => write!(f, "where"),
        }
    }
}

/// Block terminators recognized by the classifier.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Terminator {
    /// End of an `if` or `ifnotnil` block.
    EndIf,
    /// End of a `range` block.
    EndRange,
    /// End of a `set` block.
    EndSet,
    /// End of a `where` block.
    EndWhere,
}

impl Display for Terminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Terminator::EndIf => write!(f, "endif"),
            Terminator::EndRange => write!(f, "endrange"),
            Terminator::EndSet => write!(f, "endset"),
            Terminator::EndWhere => write!(f, "endwhere"),
        }
    }
}

/// Comparison operators recognized in guard expressions.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Operator {
    /// ==
    Equal,
    /// !=
    NotEqual,
    /// <=
    LesserOrEqual,
    /// >=
    GreaterOrEqual,
    /// <
    Lesser,
    /// >
    Greater,
}

impl Operator {
    /// Search order for splitting a guard expression.
    ///
    /// Two-character operators come first so `<=` is never read as `<`.
    pub(crate) const SEARCH: [(&'static str, Operator); 6] = [
        ("==", Operator::Equal),
        ("!=", Operator::NotEqual),
        ("<=", Operator::LesserOrEqual),
        (">=", Operator::GreaterOrEqual),
        ("<", Operator::Lesser),
        (">", Operator::Greater),
    ];
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Equal => write!(f, "=="),
            Operator::NotEqual => write!(f, "!="),
            Operator::LesserOrEqual => write!(f, "<="),
            Operator::GreaterOrEqual => write!(f, ">="),
            Operator::Lesser => write!(f, "<"),
            Operator::Greater => write!(f, ">"),
        }
    }
}
