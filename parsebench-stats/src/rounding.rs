//! Decimal Rounding

/// Round `value` to `decimals` places, exact halves to even
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round_ties_even() / factor;
    if rounded == 0.0 { 0.0 } else { rounded }
}
