//! Delay resolution
//!
//! A delay expression is bound against its scope and folded. Constants are
//! rescaled from the scope's time unit to the design precision; anything
//! else stays a runtime expression, or, when nets are requested, is turned
//! into a signal that carries the delay value.

use crate::error::{DelayError, Result};
use strand_netlist::{
    Bit, DelaySpec, DelayValue, Design, Diagnostics, ExprKind, Expression, ResolvedDelays,
    ScopeId,
};
use tracing::{debug, trace};

/// Rescale an integer delay from `scope`'s time unit to the design
/// precision. Finer precision multiplies by ten per step (saturating);
/// coarser precision truncates.
pub fn scale_to_precision(value: u64, design: &Design, scope: ScopeId) -> Result<u64> {
    let shift = design.scope(scope)?.time_unit - design.precision();
    let mut value = value;
    if shift >= 0 {
        for _ in 0..shift {
            value = value.saturating_mul(10);
        }
    } else {
        for _ in 0..shift.unsigned_abs() {
            value /= 10;
        }
    }
    Ok(value)
}

/// Convert a real delay to ticks: shift by the scope unit, round to the
/// nearest tick, never negative
pub fn real_to_ticks(value: f64, design: &Design, scope: ScopeId) -> Result<u64> {
    let shift = design.scope(scope)?.time_unit - design.precision();
    let scaled = value * 10f64.powi(shift);
    let rounded = if scaled >= 0.0 {
        (scaled + 0.5).floor()
    } else {
        (scaled - 0.5).ceil()
    };
    Ok(if rounded <= 0.0 || rounded.is_nan() {
        0
    } else if rounded >= u64::MAX as f64 {
        u64::MAX
    } else {
        rounded as u64
    })
}

/// Integer value of a constant with x/z bits read as zero, saturating at
/// `u64::MAX` when set bits lie beyond the 64th
fn constant_value(bits: &[Bit]) -> u64 {
    let mut value = 0u64;
    for (idx, bit) in bits.iter().enumerate() {
        if *bit == Bit::One {
            if idx >= 64 {
                return u64::MAX;
            }
            value |= 1 << idx;
        }
    }
    value
}

/// Bind and fold one delay expression
pub fn calculate_value(design: &Design, scope: ScopeId, expr: &Expression) -> Result<DelayValue> {
    let folded = expr.elaborate(design, scope)?.fold();
    let value = match &folded.kind {
        ExprKind::Real(r) => DelayValue::Ticks(real_to_ticks(*r, design, scope)?),
        ExprKind::Number(v) => {
            DelayValue::Ticks(scale_to_precision(constant_value(v.bits()), design, scope)?)
        }
        _ => DelayValue::Runtime(folded),
    };
    trace!("Delay {} resolved to {:?}", expr, value);
    Ok(value)
}

/// Turn a runtime delay into a net. Constants pass through, signal
/// references become the signal itself, other expressions are synthesized.
pub fn make_delay_net(design: &mut Design, scope: ScopeId, value: DelayValue) -> Result<DelayValue> {
    let expr = match value {
        DelayValue::Runtime(expr) => expr,
        other => return Ok(other),
    };
    if let ExprKind::Signal(id) = expr.kind {
        return Ok(DelayValue::Net(id));
    }
    match expr.synthesize(design, scope)? {
        Some(sig) => {
            debug!("Synthesized delay {} onto {}", expr, sig);
            Ok(DelayValue::Net(sig))
        }
        None => Err(DelayError::NotSynthesizable {
            expr: expr.to_string(),
            span: expr.span.clone(),
        }),
    }
}

/// Pick the decay when only rise and fall are given.
///
/// Two constants give their minimum. A runtime value has no order against
/// anything, so a constant side wins; with no constant side the rise
/// value is used.
fn min_delay(rise: Option<&DelayValue>, fall: Option<&DelayValue>) -> Option<DelayValue> {
    match (rise, fall) {
        (Some(DelayValue::Ticks(r)), Some(DelayValue::Ticks(f))) => {
            Some(DelayValue::Ticks((*r).min(*f)))
        }
        (Some(r @ DelayValue::Ticks(_)), Some(_)) => Some(r.clone()),
        (Some(_), Some(f @ DelayValue::Ticks(_))) => {
            debug!("Decay takes the constant fall delay over a runtime rise delay");
            Some(f.clone())
        }
        (Some(r), Some(_)) => {
            debug!("Both rise and fall delays are runtime values; decay takes rise");
            Some(r.clone())
        }
        (Some(v), None) | (None, Some(v)) => Some(v.clone()),
        (None, None) => None,
    }
}

/// Resolve a delay specification in `scope`.
///
/// Slots that cannot be turned into nets are reported to `diags` and come
/// back empty; every other error is fatal.
pub fn resolve(
    design: &mut Design,
    scope: ScopeId,
    spec: &DelaySpec,
    as_nets: bool,
    diags: &mut Diagnostics,
) -> Result<ResolvedDelays> {
    let Some(rise) = spec.rise() else {
        if spec.fall().is_some() || spec.decay().is_some() {
            return Err(DelayError::MissingSlot {
                slot: if spec.fall().is_some() { "fall" } else { "decay" },
                missing: "rise",
            });
        }
        return Ok(ResolvedDelays::none());
    };

    let mut slot = |design: &mut Design, expr: &Expression| -> Result<Option<DelayValue>> {
        let value = calculate_value(design, scope, expr)?;
        if !as_nets {
            return Ok(Some(value));
        }
        match make_delay_net(design, scope, value) {
            Ok(value) => Ok(Some(value)),
            Err(err) if !err.is_fatal() => {
                diags.error(Some(expr.span.clone()), err.to_string());
                Ok(None)
            }
            Err(err) => Err(err),
        }
    };

    let rise = slot(design, rise)?;
    let Some(fall) = spec.fall() else {
        if spec.decay().is_some() {
            return Err(DelayError::MissingSlot {
                slot: "decay",
                missing: "fall",
            });
        }
        return Ok(ResolvedDelays {
            fall: rise.clone(),
            decay: rise.clone(),
            rise,
        });
    };

    let fall = slot(design, fall)?;
    let decay = match spec.decay() {
        Some(decay) => slot(design, decay)?,
        None => min_delay(rise.as_ref(), fall.as_ref()),
    };
    Ok(ResolvedDelays { rise, fall, decay })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_netlist::{BinaryOp, Scope, ScopeKind, SignalDecl};

    fn design() -> (Design, ScopeId) {
        let mut design = Design::new("delays");
        let top = design
            .add_scope(None, Scope::new("top", ScopeKind::Module).with_timescale(-9, -12))
            .unwrap();
        (design, top)
    }

    fn spec(exprs: Vec<Expression>) -> DelaySpec {
        DelaySpec::from_exprs(exprs).unwrap()
    }

    #[test]
    fn test_rise_only_is_symmetric() {
        let (mut design, top) = design();
        let mut diags = Diagnostics::new();
        let out = resolve(&mut design, top, &spec(vec![Expression::integer(5)]), false, &mut diags)
            .unwrap();
        assert_eq!(out.rise, Some(DelayValue::Ticks(5000)));
        assert_eq!(out.fall, out.rise);
        assert_eq!(out.decay, out.rise);
    }

    #[test]
    fn test_empty_spec_has_no_delay() {
        let (mut design, top) = design();
        let out = resolve(&mut design, top, &DelaySpec::new(), true, &mut Diagnostics::new())
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_real_delays_round_and_clamp() {
        let (design, top) = design();
        assert_eq!(real_to_ticks(2.5, &design, top).unwrap(), 2500);
        assert_eq!(real_to_ticks(0.0012345, &design, top).unwrap(), 1);
        assert_eq!(real_to_ticks(-3.0, &design, top).unwrap(), 0);

        let neg = Expression::unary(strand_netlist::UnaryOp::Neg, Expression::real(1.0));
        assert_eq!(
            calculate_value(&design, top, &neg).unwrap(),
            DelayValue::Ticks(0)
        );
    }

    #[test]
    fn test_coarser_precision_truncates() {
        let (mut design, top) = design();
        design.set_precision(-6);
        assert_eq!(scale_to_precision(1999, &design, top).unwrap(), 1);
        design.set_precision(-30);
        assert_eq!(scale_to_precision(2, &design, top).unwrap(), u64::MAX);
    }

    #[test]
    fn test_decay_is_min_of_rise_and_fall() {
        let (mut design, top) = design();
        let out = resolve(
            &mut design,
            top,
            &spec(vec![Expression::integer(7), Expression::integer(3)]),
            false,
            &mut Diagnostics::new(),
        )
        .unwrap();
        assert_eq!(out.decay, Some(DelayValue::Ticks(3000)));
    }

    #[test]
    fn test_decay_prefers_constant_side() {
        let (mut design, top) = design();
        let d = design.add_signal(top, SignalDecl::new("d", 8)).unwrap();
        let out = resolve(
            &mut design,
            top,
            &spec(vec![Expression::ident("d"), Expression::integer(2)]),
            false,
            &mut Diagnostics::new(),
        )
        .unwrap();
        assert_eq!(out.rise, Some(DelayValue::Runtime(Expression::signal(d))));
        assert_eq!(out.decay, Some(DelayValue::Ticks(2000)));
    }

    #[test]
    fn test_parameters_fold_to_constants() {
        let (mut design, top) = design();
        design
            .set_parameter(
                top,
                "W",
                Expression::binary(BinaryOp::Add, Expression::integer(1), Expression::integer(2)),
            )
            .unwrap();
        assert_eq!(
            calculate_value(&design, top, &Expression::ident("W")).unwrap(),
            DelayValue::Ticks(3000)
        );
        assert!(calculate_value(&design, top, &Expression::ident("missing"))
            .unwrap_err()
            .is_fatal());
    }

    #[test]
    fn test_nets_from_signals_and_failures() {
        let (mut design, top) = design();
        let d = design.add_signal(top, SignalDecl::new("d", 4)).unwrap();
        let mut diags = Diagnostics::new();

        let out = resolve(&mut design, top, &spec(vec![Expression::ident("d")]), true, &mut diags)
            .unwrap();
        assert_eq!(out.rise, Some(DelayValue::Net(d)));

        let sum = Expression::binary(BinaryOp::Add, Expression::ident("d"), Expression::ident("d"));
        let out = resolve(
            &mut design,
            top,
            &spec(vec![sum, Expression::integer(4)]),
            true,
            &mut diags,
        )
        .unwrap();
        assert_eq!(out.rise, None);
        assert_eq!(out.fall, Some(DelayValue::Ticks(4000)));
        assert_eq!(out.decay, Some(DelayValue::Ticks(4000)));
        assert_eq!(diags.error_count(), 1);
        assert!(diags
            .iter()
            .any(|d| d.message.contains("is not suitable for delay expression")));
    }

    #[test]
    fn test_unsynthesizable_net_adds_no_hardware() {
        let (mut design, top) = design();
        design.add_signal(top, SignalDecl::new("d", 2)).unwrap();
        design.add_signal(top, SignalDecl::new("e", 1)).unwrap();
        let before = design.stats();

        let mismatched = Expression::binary(
            BinaryOp::BitAnd,
            Expression::unary(strand_netlist::UnaryOp::BitNot, Expression::ident("d")),
            Expression::ident("e"),
        );
        let mut diags = Diagnostics::new();
        let out = resolve(&mut design, top, &spec(vec![mismatched]), true, &mut diags).unwrap();

        assert!(out.is_none());
        assert_eq!(diags.len(), 1);
        assert_eq!(design.stats(), before);
        assert_eq!(design.nodes().count(), 0);
    }
}
