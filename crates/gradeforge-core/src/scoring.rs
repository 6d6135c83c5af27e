//! Integer scoring helpers shared by every handler.
//!
//! All ratios are rounded half-up in integer arithmetic, so `1/8` gives 13
//! and `1/3` gives 33. Nothing here goes through floating point.

/// Upper bound of every score.
pub const MAX_SCORE: u8 = 100;

/// `round_half_up(100 * numerator / denominator)`, or 0 when there is nothing
/// to divide by. Numerators above the denominator saturate at 100.
pub fn percent(numerator: u32, denominator: u32) -> u8 {
    if denominator == 0 {
        return 0;
    }
    let numerator = u64::from(numerator.min(denominator));
    let denominator = u64::from(denominator);
    let rounded = (200 * numerator + denominator) / (2 * denominator);
    // numerator <= denominator keeps this within 0..=100
    rounded as u8
}

/// Clamp an arbitrary handler output into `[0, 100]`.
pub fn clamp(points: i64) -> u8 {
    points.clamp(0, i64::from(MAX_SCORE)) as u8
}

/// Rescale a 0–100 score onto `max_score` points, rounding half-up.
pub fn scale_to(score: u8, max_score: u32) -> u32 {
    let score = u64::from(score.min(MAX_SCORE));
    let scaled = (2 * score * u64::from(max_score) + 100) / 200;
    scaled as u32
}
