use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
///
/// Out-of-range values saturate and NaN maps to zero. Loaders should reject
/// such input first with [`checked_f64_to_fixed64`].
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    checked_f64_to_fixed64(v).unwrap_or_else(|| {
        if v.is_nan() {
            Fixed64::ZERO
        } else {
            Fixed64::saturating_from_num(v)
        }
    })
}

/// Exact-range conversion: `None` for NaN, infinities and values outside
/// the Q32.32 range.
#[inline]
pub fn checked_f64_to_fixed64(v: f64) -> Option<Fixed64> {
    if !v.is_finite() {
        return None;
    }
    Fixed64::checked_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Saturating `max(0, v)`.
#[inline]
pub fn non_negative(v: Fixed64) -> Fixed64 {
    if v < Fixed64::ZERO { Fixed64::ZERO } else { v }
}

/// Clamp `v` into `[lo, hi]`.
#[inline]
pub fn clamp(v: Fixed64, lo: Fixed64, hi: Fixed64) -> Fixed64 {
    if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}
