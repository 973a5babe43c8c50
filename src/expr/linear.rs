//! Linear forms: `c0 + c1*x1 + c2*x2 + ...` over symbols.

use std::collections::BTreeMap;

use num_complex::Complex64;

use super::{Expr, Symbol};
use crate::error::{NodalError, Result};

/// An expression reduced to a constant plus one coefficient per symbol.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearForm {
    pub coeffs: BTreeMap<Symbol, Complex64>,
    pub constant: Complex64,
}

impl LinearForm {
    pub fn constant(value: Complex64) -> Self {
        Self {
            coeffs: BTreeMap::new(),
            constant: value,
        }
    }

    pub fn symbol(symbol: Symbol) -> Self {
        let mut coeffs = BTreeMap::new();
        coeffs.insert(symbol, Complex64::new(1.0, 0.0));
        Self {
            coeffs,
            constant: Complex64::new(0.0, 0.0),
        }
    }

    /// Whether no symbol has a non-zero coefficient.
    pub fn is_constant(&self) -> bool {
        self.coeffs.values().all(|c| c.norm() == 0.0)
    }

    pub fn coefficient(&self, symbol: &Symbol) -> Complex64 {
        self.coeffs.get(symbol).copied().unwrap_or_default()
    }

    fn add(mut self, other: LinearForm, factor: f64) -> Self {
        for (symbol, c) in other.coeffs {
            *self.coeffs.entry(symbol).or_default() += c * factor;
        }
        self.constant += other.constant * factor;
        self
    }

    fn scale(mut self, factor: Complex64) -> Self {
        for c in self.coeffs.values_mut() {
            *c *= factor;
        }
        self.constant *= factor;
        self
    }
}

impl Expr {
    /// Reduce to a [`LinearForm`] in every symbol the expression mentions.
    ///
    /// Products of two symbolic factors and symbolic denominators fail with
    /// [`NodalError::NonLinearEquation`].
    pub fn linearize(&self) -> Result<LinearForm> {
        match self {
            Expr::Number(v) => Ok(LinearForm::constant(*v)),
            Expr::Symbol(s) => Ok(LinearForm::symbol(s.clone())),
            Expr::Neg(inner) => Ok(inner.linearize()?.scale(Complex64::new(-1.0, 0.0))),
            Expr::Add(a, b) => Ok(a.linearize()?.add(b.linearize()?, 1.0)),
            Expr::Sub(a, b) => Ok(a.linearize()?.add(b.linearize()?, -1.0)),
            Expr::Mul(a, b) => {
                let (a, b) = (a.linearize()?, b.linearize()?);
                if a.is_constant() {
                    Ok(b.scale(a.constant))
                } else if b.is_constant() {
                    Ok(a.scale(b.constant))
                } else {
                    Err(self.non_linear())
                }
            }
            Expr::Div(a, b) => {
                let b = b.linearize()?;
                if !b.is_constant() {
                    return Err(self.non_linear());
                }
                if b.constant.norm() == 0.0 {
                    return Err(NodalError::degenerate(format!("division by zero in {}", self)));
                }
                Ok(a.linearize()?.scale(b.constant.inv()))
            }
        }
    }

    fn non_linear(&self) -> NodalError {
        NodalError::NonLinearEquation {
            equation: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::NodeId;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linearize_kcl_shape() {
        let expr = Expr::parse("(V(2)-10-0)/(2)+(V(2)-0)/(4)+(V(2)-0)/(4)").unwrap();
        let form = expr.linearize().unwrap();
        assert_abs_diff_eq!(form.coefficient(&Symbol::NodeVoltage(NodeId(2))).re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(form.constant.re, -5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_products_fold() {
        let form = Expr::parse("2*(V(1)-3)*0.5").unwrap().linearize().unwrap();
        assert_abs_diff_eq!(form.coefficient(&Symbol::NodeVoltage(NodeId(1))).re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(form.constant.re, -3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_non_linear_terms_rejected() {
        assert!(matches!(
            Expr::parse("V(1)*V(2)").unwrap().linearize(),
            Err(NodalError::NonLinearEquation { .. })
        ));
        assert!(matches!(
            Expr::parse("1/V(2)").unwrap().linearize(),
            Err(NodalError::NonLinearEquation { .. })
        ));
        assert!(matches!(
            Expr::parse("V(1)/(R1-R1)").unwrap().linearize(),
            Err(NodalError::DegenerateTopology { .. })
        ));
    }

    #[test]
    fn test_complex_coefficients() {
        let form = Expr::parse("V(1)/(3+4j)").unwrap().linearize().unwrap();
        let c = form.coefficient(&Symbol::NodeVoltage(NodeId(1)));
        assert_abs_diff_eq!(c.re, 0.12, epsilon = 1e-12);
        assert_abs_diff_eq!(c.im, -0.16, epsilon = 1e-12);
    }
}
