//! Bracketed 1-D root finding.
//!
//! `newton_bisect` takes safeguarded Newton steps and falls back to bisection
//! whenever the Newton iterate leaves the current bracket or fails to shrink
//! it fast enough. `expand_bracket` grows a geometric bracket around a
//! positive starting point until the function changes sign. When the natural
//! starting point is itself outside the admissible region, `admissible_start`
//! walks a geometric ladder around it to find one that is not.

use crate::{CoreError, Real, ensure_finite};

/// Root search configuration.
#[derive(Clone, Copy, Debug)]
pub struct RootConfig {
    /// Maximum function evaluations after the initial one
    pub max_iterations: usize,
    /// Relative tolerance on the step / bracket width
    pub x_tol: Real,
    /// Absolute tolerance on |f|
    pub f_tol: Real,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            x_tol: 1e-12,
            f_tol: 0.0,
        }
    }
}

/// Interval with function values at both ends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bracket {
    pub lo: Real,
    pub hi: Real,
    pub f_lo: Real,
    pub f_hi: Real,
}

impl Bracket {
    /// True if the interval is known to contain a root.
    pub fn has_sign_change(&self) -> bool {
        self.f_lo == 0.0 || self.f_hi == 0.0 || (self.f_lo < 0.0) != (self.f_hi < 0.0)
    }
}

fn opposite_signs(a: Real, b: Real) -> bool {
    a == 0.0 || b == 0.0 || (a < 0.0) != (b < 0.0)
}

fn check_ladder(x0: Real, factor: Real) -> Result<(), CoreError> {
    if !(x0.is_finite() && x0 > 0.0) {
        return Err(CoreError::InvalidArg {
            what: "bracket start must be positive and finite",
        });
    }
    if !(factor.is_finite() && factor > 1.0) {
        return Err(CoreError::InvalidArg {
            what: "bracket growth factor must exceed 1",
        });
    }
    Ok(())
}

/// First point of `x0, x0/factor, x0*factor, x0/factor², ...` (clipped to
/// `limits`) where `f` returns a finite value.
///
/// Evaluation errors are treated as "outside the admissible region" and the
/// walk continues. Fails with `NoAdmissiblePoint` after `max_steps` rungs on
/// each side.
pub fn admissible_start<F, E>(
    mut f: F,
    x0: Real,
    factor: Real,
    limits: (Real, Real),
    max_steps: usize,
    what: &'static str,
) -> Result<Real, E>
where
    F: FnMut(Real) -> Result<Real, E>,
    E: From<CoreError>,
{
    check_ladder(x0, factor)?;
    let mut admissible = |x: Real| matches!(f(x), Ok(v) if v.is_finite());
    if admissible(x0) {
        return Ok(x0);
    }

    let (mut down, mut up) = (x0, x0);
    for _ in 0..max_steps {
        let x = (down / factor).max(limits.0);
        if x < down {
            down = x;
            if admissible(x) {
                return Ok(x);
            }
        }
        let x = (up * factor).min(limits.1);
        if x > up {
            up = x;
            if admissible(x) {
                return Ok(x);
            }
        }
    }

    Err(CoreError::NoAdmissiblePoint {
        what,
        lo: down,
        hi: up,
    }
    .into())
}

/// Grow `[x0 / factor^k, x0 * factor^k]` until `f` changes sign.
///
/// Intended for strictly positive unknowns. The bracket is clipped to
/// `limits`. An evaluation error or non-finite value marks the edge of the
/// admissible region: the bracket stops growing on that side. The returned
/// bracket is the tightest pair of consecutive samples that straddles the root.
pub fn expand_bracket<F, E>(
    mut f: F,
    x0: Real,
    factor: Real,
    limits: (Real, Real),
    max_expansions: usize,
    what: &'static str,
) -> Result<Bracket, E>
where
    F: FnMut(Real) -> Result<Real, E>,
    E: From<CoreError>,
{
    check_ladder(x0, factor)?;

    let f0 = ensure_finite(f(x0)?, what)?;
    if f0 == 0.0 {
        return Ok(Bracket {
            lo: x0,
            hi: x0,
            f_lo: f0,
            f_hi: f0,
        });
    }

    let (mut lo, mut f_lo) = (x0, f0);
    let (mut hi, mut f_hi) = (x0, f0);
    let mut grow_lo = true;
    let mut grow_hi = true;

    for _ in 0..max_expansions {
        if grow_lo {
            let x = (lo / factor).max(limits.0);
            if x >= lo {
                grow_lo = false;
            } else {
                match f(x) {
                    Ok(v) if v.is_finite() => {
                        if opposite_signs(v, f_lo) {
                            return Ok(Bracket {
                                lo: x,
                                hi: lo,
                                f_lo: v,
                                f_hi: f_lo,
                            });
                        }
                        lo = x;
                        f_lo = v;
                    }
                    _ => grow_lo = false,
                }
            }
        }

        if grow_hi {
            let x = (hi * factor).min(limits.1);
            if x <= hi {
                grow_hi = false;
            } else {
                match f(x) {
                    Ok(v) if v.is_finite() => {
                        if opposite_signs(v, f_hi) {
                            return Ok(Bracket {
                                lo: hi,
                                hi: x,
                                f_lo: f_hi,
                                f_hi: v,
                            });
                        }
                        hi = x;
                        f_hi = v;
                    }
                    _ => grow_hi = false,
                }
            }
        }

        if !grow_lo && !grow_hi {
            break;
        }
    }

    Err(CoreError::NotBracketed {
        what,
        lo,
        hi,
        f_lo,
        f_hi,
    }
    .into())
}

/// Safeguarded Newton/bisection root search inside `bracket`.
///
/// `f` returns the function value and, when available, its derivative.
/// Without a derivative every step is a bisection step. `x0` seeds the
/// search if it lies strictly inside the bracket.
pub fn newton_bisect<F, E>(
    mut f: F,
    bracket: Bracket,
    x0: Option<Real>,
    cfg: &RootConfig,
    what: &'static str,
) -> Result<Real, E>
where
    F: FnMut(Real) -> Result<(Real, Option<Real>), E>,
    E: From<CoreError>,
{
    let Bracket { lo, hi, f_lo, f_hi } = bracket;
    if f_lo == 0.0 {
        return Ok(lo);
    }
    if f_hi == 0.0 {
        return Ok(hi);
    }
    if !bracket.has_sign_change() {
        return Err(CoreError::NotBracketed {
            what,
            lo,
            hi,
            f_lo,
            f_hi,
        }
        .into());
    }

    // Orient so that f(xl) < 0 < f(xh)
    let (mut xl, mut xh) = if f_lo < 0.0 { (lo, hi) } else { (hi, lo) };
    let (a, b) = (lo.min(hi), lo.max(hi));
    let mut x = match x0 {
        Some(g) if g > a && g < b => g,
        _ => 0.5 * (lo + hi),
    };

    let mut dx_old = (hi - lo).abs();
    let mut dx = dx_old;
    let (mut fx, mut dfx) = f(x)?;

    for _ in 0..cfg.max_iterations {
        ensure_finite(fx, what)?;
        if fx == 0.0 || fx.abs() <= cfg.f_tol {
            return Ok(x);
        }

        if fx < 0.0 {
            xl = x;
        } else {
            xh = x;
        }

        let newton = dfx.filter(|d| d.is_finite() && *d != 0.0).and_then(|d| {
            let step = fx / d;
            let candidate = x - step;
            let inside = (candidate - xl) * (candidate - xh) < 0.0;
            let fast_enough = (2.0 * step).abs() < dx_old.abs();
            (inside && fast_enough).then_some((step, candidate))
        });

        dx_old = dx;
        let x_new = match newton {
            Some((step, candidate)) => {
                dx = step;
                candidate
            }
            None => {
                let mid = 0.5 * (xl + xh);
                dx = x - mid;
                mid
            }
        };

        let scale = x_new.abs().max(Real::MIN_POSITIVE);
        if dx.abs() <= cfg.x_tol * scale || (xh - xl).abs() <= cfg.x_tol * scale {
            return Ok(x_new);
        }

        x = x_new;
        (fx, dfx) = f(x)?;
    }

    Err(CoreError::NoConvergence {
        what,
        iterations: cfg.max_iterations,
        best: x,
    }
    .into())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn expanded_bracket_then_newton_recovers_root(target in 1e-3_f64..1e6_f64, start in 1e-2_f64..1e4_f64) {
            let g = |x: Real| -> Result<Real, CoreError> { Ok(x.ln() - target.ln()) };
            let bracket = expand_bracket(g, start, 3.0, (0.0, Real::INFINITY), 200, "x").unwrap();
            let f = |x: Real| -> Result<(Real, Option<Real>), CoreError> {
                Ok((x.ln() - target.ln(), Some(1.0 / x)))
            };
            let root = newton_bisect(f, bracket, Some(start), &RootConfig::default(), "x").unwrap();
            prop_assert!((root - target).abs() <= 1e-8 * target);
        }
    }
}
