// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns a parsed map expression into the two things the renderer
//! needs: a dense table of coefficients, from which the degree in z
//! (and therefore the smoothing constant) is read, and a compiled
//! evaluator that the per-point loop can call millions of times.

use num::complex::Complex64;
use num::Zero;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::error::{ParseError, Result};
use crate::expression::{parse, Expr};

/// Exponents above this are refused; the expansion grows with the
/// square of the degree and nothing interesting lives up there.
pub const MAX_EXPONENT: u32 = 64;

/// The highest total degree `n + m` any term `z^n c^m` may reach once
/// the expression is multiplied out, however the powers are nested.
pub const MAX_DEGREE: u32 = 64;

/// A sparse polynomial in z and c, keyed by (degree in z, degree in c).
/// Exactly-zero coefficients are never stored.
#[derive(Clone, Debug, PartialEq)]
struct Terms(BTreeMap<(u32, u32), Complex64>);

impl Terms {
    fn constant(k: Complex64) -> Self {
        Terms::monomial(k, 0, 0)
    }

    fn monomial(k: Complex64, n: u32, m: u32) -> Self {
        let mut terms = BTreeMap::new();
        if !k.is_zero() {
            terms.insert((n, m), k);
        }
        Terms(terms)
    }

    /// The value of the polynomial if it has no z or c in it.
    fn as_constant(&self) -> Option<Complex64> {
        match self.0.len() {
            0 => Some(Complex64::zero()),
            1 => self.0.get(&(0, 0)).cloned(),
            _ => None,
        }
    }

    fn add(mut self, other: &Terms, sign: f64) -> Terms {
        for (&key, &k) in &other.0 {
            let sum = self.0.get(&key).cloned().unwrap_or_else(Complex64::zero) + k * sign;
            if sum.is_zero() {
                self.0.remove(&key);
            } else {
                self.0.insert(key, sum);
            }
        }
        self
    }

    /// Highest total degree `n + m` of any term.
    fn degree(&self) -> u32 {
        self.0.keys().map(|&(n, m)| n + m).max().unwrap_or(0)
    }

    fn mul(&self, other: &Terms) -> std::result::Result<Terms, String> {
        check_degree(self.degree().checked_add(other.degree()))?;
        let z_span = self.0.keys().map(|&(n, _)| n).max().unwrap_or(0)
            + other.0.keys().map(|&(n, _)| n).max().unwrap_or(0)
            + 1;
        let c_span = self.0.keys().map(|&(_, m)| m).max().unwrap_or(0)
            + other.0.keys().map(|&(_, m)| m).max().unwrap_or(0)
            + 1;
        let mut dense = vec![Complex64::zero(); (z_span * c_span) as usize];
        for (&(n1, m1), &k1) in &self.0 {
            for (&(n2, m2), &k2) in &other.0 {
                dense[((n1 + n2) * c_span + (m1 + m2)) as usize] += k1 * k2;
            }
        }
        Ok(Terms(
            dense
                .into_iter()
                .enumerate()
                .filter(|(_, k)| !k.is_zero())
                .map(|(i, k)| ((i as u32 / c_span, i as u32 % c_span), k))
                .collect(),
        ))
    }

    fn scale(self, k: Complex64) -> Terms {
        Terms(
            self.0
                .into_iter()
                .map(|(key, v)| (key, v * k))
                .filter(|(_, v)| !v.is_zero())
                .collect(),
        )
    }

    fn pow(&self, exponent: u32) -> std::result::Result<Terms, String> {
        check_degree(self.degree().checked_mul(exponent))?;
        let mut result = Terms::constant(Complex64::new(1.0, 0.0));
        let mut base = self.clone();
        let mut e = exponent;
        while e > 0 {
            if e & 1 == 1 {
                result = result.mul(&base)?;
            }
            e >>= 1;
            if e > 0 {
                base = base.mul(&base)?;
            }
        }
        Ok(result)
    }
}

/// Refuses expansions whose total degree in z and c would pass
/// `MAX_DEGREE`.  `None` stands for an overflowed degree.
fn check_degree(degree: Option<u32>) -> std::result::Result<(), String> {
    match degree {
        Some(d) if d <= MAX_DEGREE => Ok(()),
        Some(d) => Err(format!(
            "expanded polynomial has degree {} in z and c; the maximum is {}",
            d, MAX_DEGREE
        )),
        None => Err(format!(
            "expanded polynomial has a degree in z and c above the maximum of {}",
            MAX_DEGREE
        )),
    }
}

/// Reduces an exponent sub-tree to the small integer it must be.
fn integer_exponent(terms: &Terms) -> std::result::Result<u32, String> {
    let k = terms
        .as_constant()
        .ok_or_else(|| "exponent must be a constant".to_string())?;
    if k.im != 0.0 || k.re < 0.0 || k.re.fract() != 0.0 {
        return Err(format!(
            "exponent must be a non-negative integer, found {}",
            k
        ));
    }
    if k.re > f64::from(MAX_EXPONENT) {
        return Err(format!(
            "exponent {} is larger than the maximum of {}",
            k.re, MAX_EXPONENT
        ));
    }
    Ok(k.re as u32)
}

/// Reduces a divisor sub-tree to the nonzero constant it must be.
fn constant_divisor(terms: &Terms) -> std::result::Result<Complex64, String> {
    match terms.as_constant() {
        None => Err("division is only allowed by a constant".to_string()),
        Some(k) if k.is_zero() => Err("division by zero".to_string()),
        Some(k) => Ok(k),
    }
}

/// Expands a syntax tree into its sum of monomials.
fn expand(expr: &Expr) -> std::result::Result<Terms, String> {
    Ok(match expr {
        Expr::Const(k) => Terms::constant(*k),
        Expr::Z => Terms::monomial(Complex64::new(1.0, 0.0), 1, 0),
        Expr::C => Terms::monomial(Complex64::new(1.0, 0.0), 0, 1),
        Expr::Neg(inner) => expand(inner)?.scale(Complex64::new(-1.0, 0.0)),
        Expr::Add(lhs, rhs) => expand(lhs)?.add(&expand(rhs)?, 1.0),
        Expr::Sub(lhs, rhs) => expand(lhs)?.add(&expand(rhs)?, -1.0),
        Expr::Mul(lhs, rhs) => expand(lhs)?.mul(&expand(rhs)?)?,
        Expr::Div(lhs, rhs) => {
            let divisor = constant_divisor(&expand(rhs)?)?;
            expand(lhs)?.scale(Complex64::new(1.0, 0.0) / divisor)
        }
        Expr::Pow(base, exponent) => {
            let e = integer_exponent(&expand(exponent)?)?;
            expand(base)?.pow(e)?
        }
    })
}

/// The dense coefficient table of an expanded polynomial.  Entry
/// `(n, m)` is the coefficient of `z^n c^m`; terms that do not occur
/// are stored as explicit zeros.
#[derive(Clone, Debug, PartialEq)]
pub struct CoefficientTable {
    z_degree: usize,
    c_degree: usize,
    coefficients: Vec<Complex64>,
}

impl CoefficientTable {
    fn from_terms(terms: &Terms) -> CoefficientTable {
        let z_degree = terms.0.keys().map(|&(n, _)| n).max().unwrap_or(0) as usize;
        let c_degree = terms.0.keys().map(|&(_, m)| m).max().unwrap_or(0) as usize;
        let mut coefficients = vec![Complex64::zero(); (z_degree + 1) * (c_degree + 1)];
        for (&(n, m), &k) in &terms.0 {
            coefficients[(n as usize) * (c_degree + 1) + (m as usize)] = k;
        }
        CoefficientTable {
            z_degree,
            c_degree,
            coefficients,
        }
    }

    /// Degree of the polynomial in z.
    pub fn z_degree(&self) -> usize {
        self.z_degree
    }

    /// Highest power of c found in any of the z coefficients.
    pub fn c_degree(&self) -> usize {
        self.c_degree
    }

    /// `(z_degree + 1, c_degree + 1)`
    pub fn shape(&self) -> (usize, usize) {
        (self.z_degree + 1, self.c_degree + 1)
    }

    /// The coefficient of `z^n c^m`, or zero outside the table.
    pub fn get(&self, n: usize, m: usize) -> Complex64 {
        if n > self.z_degree || m > self.c_degree {
            return Complex64::zero();
        }
        self.coefficients[n * (self.c_degree + 1) + m]
    }

    /// Evaluates the expanded form directly, Horner-style in both
    /// variables.
    pub fn evaluate(&self, z: Complex64, c: Complex64) -> Complex64 {
        let mut acc = Complex64::zero();
        for n in (0..=self.z_degree).rev() {
            let row = &self.coefficients[n * (self.c_degree + 1)..(n + 1) * (self.c_degree + 1)];
            let coefficient = row
                .iter()
                .rev()
                .fold(Complex64::zero(), |inner, &k| inner * c + k);
            acc = acc * z + coefficient;
        }
        acc
    }
}

impl fmt::Display for CoefficientTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for n in (0..=self.z_degree).rev() {
            for m in (0..=self.c_degree).rev() {
                let k = self.get(n, m);
                if k.is_zero() {
                    continue;
                }
                if !first {
                    write!(f, " + ")?;
                }
                first = false;
                write!(f, "({})", k)?;
                match n {
                    0 => {}
                    1 => write!(f, "*z")?,
                    _ => write!(f, "*z**{}", n)?,
                }
                match m {
                    0 => {}
                    1 => write!(f, "*c")?,
                    _ => write!(f, "*c**{}", m)?,
                }
            }
        }
        if first {
            write!(f, "0")?;
        }
        Ok(())
    }
}

/// The compiled form of the map, callable as `kernel(z, c)`.
pub type Kernel = Box<dyn Fn(Complex64, Complex64) -> Complex64 + Send + Sync>;

/// Raises to a small non-negative integer power by squaring.
#[inline]
pub fn powu(base: Complex64, exponent: u32) -> Complex64 {
    let mut result = Complex64::new(1.0, 0.0);
    let mut base = base;
    let mut e = exponent;
    while e > 0 {
        if e & 1 == 1 {
            result = result * base;
        }
        e >>= 1;
        if e > 0 {
            base = base * base;
        }
    }
    result
}

/// A sub-tree after compilation: either folded to a number or a
/// closure of z and c.
enum Compiled {
    Constant(Complex64),
    Varying(Kernel),
}

impl Compiled {
    fn into_kernel(self) -> Kernel {
        match self {
            Compiled::Constant(k) => Box::new(move |_: Complex64, _: Complex64| k),
            Compiled::Varying(kernel) => kernel,
        }
    }
}

/// Combines two compiled operands with `op`, folding when both are
/// constant.  `op` is a plain arithmetic operator, so each closure
/// below inlines it.
fn binary<F>(lhs: Compiled, rhs: Compiled, op: F) -> Compiled
where
    F: Fn(Complex64, Complex64) -> Complex64 + Copy + Send + Sync + 'static,
{
    match (lhs, rhs) {
        (Compiled::Constant(a), Compiled::Constant(b)) => Compiled::Constant(op(a, b)),
        (Compiled::Constant(a), Compiled::Varying(r)) => {
            Compiled::Varying(Box::new(move |z: Complex64, c: Complex64| op(a, r(z, c))))
        }
        (Compiled::Varying(l), Compiled::Constant(b)) => {
            Compiled::Varying(Box::new(move |z: Complex64, c: Complex64| op(l(z, c), b)))
        }
        (Compiled::Varying(l), Compiled::Varying(r)) => Compiled::Varying(Box::new(
            move |z: Complex64, c: Complex64| op(l(z, c), r(z, c)),
        )),
    }
}

/// Builds a closure tree from the syntax tree in one bottom-up pass,
/// folding sub-trees free of z and c as it goes, so `z**2 + 3*I/2`
/// costs one squaring and one addition per call.  Exponents and
/// divisors are reduced the same way `expand` reduces them, which has
/// already accepted the tree.
fn compile_kernel(expr: &Expr) -> std::result::Result<Compiled, String> {
    Ok(match expr {
        Expr::Const(k) => Compiled::Constant(*k),
        Expr::Z => Compiled::Varying(Box::new(|z: Complex64, _: Complex64| z)),
        Expr::C => Compiled::Varying(Box::new(|_: Complex64, c: Complex64| c)),
        Expr::Neg(inner) => match compile_kernel(inner)? {
            Compiled::Constant(k) => Compiled::Constant(-k),
            Compiled::Varying(inner) => {
                Compiled::Varying(Box::new(move |z: Complex64, c: Complex64| -inner(z, c)))
            }
        },
        Expr::Add(lhs, rhs) => binary(compile_kernel(lhs)?, compile_kernel(rhs)?, |a, b| a + b),
        Expr::Sub(lhs, rhs) => binary(compile_kernel(lhs)?, compile_kernel(rhs)?, |a, b| a - b),
        Expr::Mul(lhs, rhs) => binary(compile_kernel(lhs)?, compile_kernel(rhs)?, |a, b| a * b),
        Expr::Div(lhs, rhs) => {
            let divisor = Compiled::Constant(constant_divisor(&expand(rhs)?)?);
            binary(compile_kernel(lhs)?, divisor, |a, b| a / b)
        }
        Expr::Pow(base, exponent) => {
            let e = integer_exponent(&expand(exponent)?)?;
            match (compile_kernel(base)?, e) {
                (Compiled::Constant(k), _) => Compiled::Constant(powu(k, e)),
                (Compiled::Varying(_), 0) => Compiled::Constant(Complex64::new(1.0, 0.0)),
                (Compiled::Varying(base), 1) => Compiled::Varying(base),
                (Compiled::Varying(base), 2) => {
                    Compiled::Varying(Box::new(move |z: Complex64, c: Complex64| {
                        let b = base(z, c);
                        b * b
                    }))
                }
                (Compiled::Varying(base), _) => Compiled::Varying(Box::new(
                    move |z: Complex64, c: Complex64| powu(base(z, c), e),
                )),
            }
        }
    })
}

/// A compiled map: its coefficient table and its evaluator.  Both are
/// immutable once built and shared read-only by every sampling
/// thread.
pub struct Polynomial {
    source: String,
    table: CoefficientTable,
    kernel: Kernel,
}

impl Polynomial {
    /// The expression this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The expanded coefficients.
    pub fn table(&self) -> &CoefficientTable {
        &self.table
    }

    /// Degree of the map in z; the base of the smoothing logarithm.
    pub fn z_degree(&self) -> usize {
        self.table.z_degree
    }

    /// Applies the map once.
    #[inline]
    pub fn eval(&self, z: Complex64, c: Complex64) -> Complex64 {
        (self.kernel)(z, c)
    }
}

impl fmt::Debug for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Polynomial")
            .field("source", &self.source)
            .field("table", &self.table)
            .finish()
    }
}

/// Compiles a map expression.  Fails if the expression is outside the
/// grammar, is not a polynomial, or does not depend on z.
pub fn compile(source: &str) -> Result<Polynomial> {
    let tree = parse(source)?;
    let terms = expand(&tree).map_err(ParseError::whole)?;
    let table = CoefficientTable::from_terms(&terms);
    if table.z_degree < 1 {
        return Err(ParseError::whole("expression does not depend on z").into());
    }
    let kernel = compile_kernel(&tree)
        .map_err(ParseError::whole)?
        .into_kernel();
    debug!(
        expression = source,
        z_degree = table.z_degree,
        c_degree = table.c_degree,
        "compiled map"
    );
    Ok(Polynomial {
        source: source.to_string(),
        table,
        kernel,
    })
}

/// The points at which `validate` exercises a freshly compiled map.
const PROBES: [(Complex64, Complex64); 2] = [
    (Complex64 { re: 1.0, im: 1.0 }, Complex64 { re: 0.2, im: -0.4 }),
    (Complex64 { re: -0.1, im: -2.0 }, Complex64 { re: -3.0, im: 4.0 }),
];

/// Compiles the expression and runs it at a couple of probe points,
/// the check an interactive caller makes before it offers to render.
pub fn validate(source: &str) -> Result<Polynomial> {
    let polynomial = compile(source)?;
    for &(z, c) in PROBES.iter() {
        let value = polynomial.eval(z, c);
        if !(value.re.is_finite() && value.im.is_finite()) {
            return Err(ParseError::whole(format!(
                "expression does not evaluate to a finite number at z={}, c={}",
                z, c
            ))
            .into());
        }
    }
    Ok(polynomial)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cx(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn classic_map_table() {
        let p = compile("z**2 + c").unwrap();
        let table = p.table();
        assert_eq!(table.z_degree(), 2);
        assert_eq!(table.c_degree(), 1);
        assert_eq!(table.shape(), (3, 2));
        for n in 0..3 {
            for m in 0..2 {
                let expected = match (n, m) {
                    (2, 0) | (0, 1) => cx(1.0, 0.0),
                    _ => cx(0.0, 0.0),
                };
                assert_eq!(table.get(n, m), expected, "entry ({}, {})", n, m);
            }
        }
    }

    #[test]
    fn expansion_distributes_and_combines() {
        // (z + c)^2 - c^2 = z^2 + 2zc
        let p = compile("(z + c)**2 - c*c").unwrap();
        let t = p.table();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t.get(2, 0), cx(1.0, 0.0));
        assert_eq!(t.get(1, 1), cx(2.0, 0.0));
        assert_eq!(t.get(0, 2), cx(0.0, 0.0));
    }

    #[test]
    fn c_degree_comes_from_any_z_coefficient() {
        let p = compile("z**3 + c**2*z - I*c").unwrap();
        let t = p.table();
        assert_eq!(t.shape(), (4, 3));
        assert_eq!(t.get(1, 2), cx(1.0, 0.0));
        assert_eq!(t.get(0, 1), cx(0.0, -1.0));
    }

    #[test]
    fn division_by_constants() {
        let p = compile("z**2/2 + c/(1+I)").unwrap();
        let t = p.table();
        assert_eq!(t.get(2, 0), cx(0.5, 0.0));
        assert_eq!(t.get(0, 1), cx(0.5, -0.5));
    }

    #[test]
    fn rejects_non_polynomials() {
        for bad in &[
            "sin(z)+c",
            "z**2 + 1/z",
            "z**c",
            "z**0.5 + c",
            "z**-1 + c",
            "z/0 + c",
            "c**2 + 1",
            "z - z + c",
            "z**65",
        ] {
            let err = compile(bad).unwrap_err();
            assert!(err.is_parse(), "{} should not compile", bad);
        }
    }

    #[test]
    fn integral_float_exponents_are_fine() {
        let p = compile("z**2.0 + c").unwrap();
        assert_eq!(p.z_degree(), 2);
    }

    #[test]
    fn kernel_agrees_with_table() {
        let sources = [
            "z**2 + c",
            "(z - I*c)**3 / 4 + 0.5j*z - c**2",
            "-z**5 + (2+3*I)*z*c + 1",
            "z^4 - 2*(z*c)^2 + c",
        ];
        let points = [
            (cx(0.3, -0.7), cx(-0.5, 0.25)),
            (cx(-1.1, 0.4), cx(0.0, 1.0)),
            (cx(2.0, 2.0), cx(-2.0, 0.1)),
        ];
        for source in &sources {
            let p = compile(source).unwrap();
            for &(z, c) in &points {
                let direct = p.eval(z, c);
                let expanded = p.table().evaluate(z, c);
                assert!(
                    (direct - expanded).norm() < 1e-9 * (1.0 + direct.norm()),
                    "{}: {} vs {}",
                    source,
                    direct,
                    expanded
                );
            }
        }
    }

    #[test]
    fn powu_matches_repeated_multiplication() {
        let b = cx(0.9, -0.3);
        let mut expected = cx(1.0, 0.0);
        for e in 0..10 {
            assert!((powu(b, e) - expected).norm() < 1e-12);
            expected = expected * b;
        }
    }

    #[test]
    fn table_displays_as_polynomial() {
        let p = compile("z**2 + c").unwrap();
        assert_eq!(format!("{}", p.table()), "(1+0i)*z**2 + (1+0i)*c");
    }

    #[test]
    fn validate_accepts_good_and_rejects_bad() {
        assert!(validate("z**2 + c").is_ok());
        assert!(validate("z**3 - 0.4*c + I").is_ok());
        assert!(validate("exp(z)").unwrap_err().is_parse());
    }

    #[test]
    fn nested_powers_are_capped_by_total_degree() {
        for bad in &[
            "((((((z**64)**64)**64)**64)**64)**64) + c",
            "((z + c + 1)**16)**8 + c",
            "z**64*c",
            "(z**8)**9 + c",
        ] {
            let err = compile(bad).unwrap_err();
            assert!(err.is_parse(), "{} should not compile", bad);
            assert!(format!("{}", err).contains("degree"), "{}: {}", bad, err);
        }
    }

    #[test]
    fn degree_up_to_the_cap_compiles() {
        let p = compile("z**64 + c").unwrap();
        assert_eq!(p.z_degree(), 64);
        let p = compile("(z + c + 1)**32 * (z - c)**32").unwrap();
        assert_eq!(p.table().shape(), (65, 65));
        assert_eq!(p.table().get(64, 0), cx(1.0, 0.0));
    }

    #[test]
    fn oversized_expressions_are_parse_errors() {
        let source = format!("{}c", "z+".repeat(20_000));
        assert!(compile(&source).unwrap_err().is_parse());
    }

    #[test]
    fn long_sums_fold_to_one_table() {
        let source = format!("{}c", "z+".repeat(200));
        let p = compile(&source).unwrap();
        assert_eq!(p.table().get(1, 0), cx(200.0, 0.0));
        assert_eq!(p.table().get(0, 1), cx(1.0, 0.0));
        let (z, c) = (cx(0.1, 0.2), cx(-0.3, 0.4));
        assert!((p.eval(z, c) - p.table().evaluate(z, c)).norm() < 1e-9);
    }

    #[test]
    fn constant_sub_trees_fold() {
        let p = compile("z**2 + (1 + I)**2 / (2*I) * c").unwrap();
        assert_eq!(p.table().get(0, 1), cx(1.0, 0.0));
        let (z, c) = (cx(0.5, -0.5), cx(0.25, 0.75));
        assert!((p.eval(z, c) - (z * z + c)).norm() < 1e-12);
    }
}

