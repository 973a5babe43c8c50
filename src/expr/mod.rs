//! Symbolic equations over node voltages and component values.
//!
//! Equations are written as text (`(V(2)-V1-V(0))/(R1)`), parsed into an
//! [`Expr`] tree, have known symbols substituted, and are finally reduced
//! to a [`LinearForm`] for the linear solver.

mod lexer;
mod linear;
mod parser;

pub use lexer::{Lexer, Token, TokenKind};
pub use linear::LinearForm;
pub use parser::Parser;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use num_complex::Complex64;

use crate::circuit::NodeId;
use crate::error::Result;
use crate::netlist::format_complex;

/// A named quantity in an equation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    /// Voltage of a node, written `V(n)`
    NodeVoltage(NodeId),
    /// Value of a component, written by refdes
    Component(String),
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::NodeVoltage(node) => write!(f, "V({})", node),
            Symbol::Component(name) => write!(f, "{}", name),
        }
    }
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(Complex64),
    Symbol(Symbol),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse equation text.
    pub fn parse(input: &str) -> Result<Expr> {
        Parser::new(input)?.parse()
    }

    /// Every symbol mentioned.
    pub fn symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        match self {
            Expr::Number(_) => {}
            Expr::Symbol(s) => {
                out.insert(s.clone());
            }
            Expr::Neg(inner) => inner.collect_symbols(out),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
        }
    }

    /// Replace known symbols by their values, folding constant subtrees.
    pub fn substitute(&self, values: &BTreeMap<Symbol, Complex64>) -> Expr {
        match self {
            Expr::Number(_) => self.clone(),
            Expr::Symbol(s) => match values.get(s) {
                Some(v) => Expr::Number(*v),
                None => self.clone(),
            },
            Expr::Neg(inner) => match inner.substitute(values) {
                Expr::Number(v) => Expr::Number(-v),
                other => Expr::Neg(Box::new(other)),
            },
            Expr::Add(a, b) => fold(a.substitute(values), b.substitute(values), Expr::Add, |x, y| x + y),
            Expr::Sub(a, b) => fold(a.substitute(values), b.substitute(values), Expr::Sub, |x, y| x - y),
            Expr::Mul(a, b) => fold(a.substitute(values), b.substitute(values), Expr::Mul, |x, y| x * y),
            Expr::Div(a, b) => match (a.substitute(values), b.substitute(values)) {
                (Expr::Number(x), Expr::Number(y)) if y.norm() != 0.0 => Expr::Number(x / y),
                (x, y) => Expr::Div(Box::new(x), Box::new(y)),
            },
        }
    }

    /// Numeric value, when every symbol has one.
    pub fn evaluate(&self, values: &BTreeMap<Symbol, Complex64>) -> Option<Complex64> {
        match self.substitute(values) {
            Expr::Number(v) => Some(v),
            _ => None,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Neg(..) => 3,
            Expr::Number(..) | Expr::Symbol(..) => 4,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

fn fold(
    a: Expr,
    b: Expr,
    node: fn(Box<Expr>, Box<Expr>) -> Expr,
    op: fn(Complex64, Complex64) -> Complex64,
) -> Expr {
    match (a, b) {
        (Expr::Number(x), Expr::Number(y)) => Expr::Number(op(x, y)),
        (a, b) => node(Box::new(a), Box::new(b)),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(v) => write!(f, "{}", format_complex(*v)),
            Expr::Symbol(s) => write!(f, "{}", s),
            Expr::Neg(inner) => {
                write!(f, "-")?;
                inner.fmt_operand(f, 3)
            }
            Expr::Add(a, b) => {
                a.fmt_operand(f, 1)?;
                write!(f, "+")?;
                b.fmt_operand(f, 1)
            }
            Expr::Sub(a, b) => {
                a.fmt_operand(f, 1)?;
                write!(f, "-")?;
                b.fmt_operand(f, 2)
            }
            Expr::Mul(a, b) => {
                a.fmt_operand(f, 2)?;
                write!(f, "*")?;
                b.fmt_operand(f, 2)
            }
            Expr::Div(a, b) => {
                a.fmt_operand(f, 2)?;
                write!(f, "/")?;
                b.fmt_operand(f, 3)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn known(pairs: &[(Symbol, f64)]) -> BTreeMap<Symbol, Complex64> {
        pairs
            .iter()
            .map(|(s, v)| (s.clone(), Complex64::new(*v, 0.0)))
            .collect()
    }

    #[test]
    fn test_display_round_trips_structure() {
        let text = "(V(2)-V1-V(0))/(R1)+(V(2)-V(0))/(R2+R3)";
        let expr = Expr::parse(text).unwrap();
        assert_eq!(expr.to_string(), "(V(2)-V1-V(0))/R1+(V(2)-V(0))/(R2+R3)");
        assert_eq!(Expr::parse(&expr.to_string()).unwrap(), expr);
    }

    #[test]
    fn test_symbols() {
        let expr = Expr::parse("(V(1)+V1-V(2))/(R2+R3)").unwrap();
        let symbols = expr.symbols();
        assert_eq!(symbols.len(), 5);
        assert!(symbols.contains(&Symbol::NodeVoltage(NodeId(2))));
        assert!(symbols.contains(&Symbol::Component("V1".to_string())));
    }

    #[test]
    fn test_substitute_folds_constants() {
        let expr = Expr::parse("(V(2)-V1-V(0))/(R1)").unwrap();
        let values = known(&[
            (Symbol::Component("V1".into()), 10.0),
            (Symbol::Component("R1".into()), 2.0),
            (Symbol::NodeVoltage(NodeId(0)), 0.0),
        ]);
        let subbed = expr.substitute(&values);
        assert_eq!(subbed.to_string(), "(V(2)-10-0)/2");
        assert!(subbed.evaluate(&values).is_none());

        let mut all = values.clone();
        all.insert(Symbol::NodeVoltage(NodeId(2)), Complex64::new(5.0, 0.0));
        assert_abs_diff_eq!(expr.evaluate(&all).unwrap().re, -2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_numbers_keep_parentheses() {
        let expr = Expr::parse("V(1)-V2").unwrap();
        let subbed = expr.substitute(&known(&[(Symbol::Component("V2".into()), -3.0)]));
        assert_eq!(subbed.to_string(), "V(1)-(-3)");
        assert_eq!(Expr::parse(&subbed.to_string()).unwrap(), subbed);
    }
}
