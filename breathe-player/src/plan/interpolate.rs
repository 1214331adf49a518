//! Linear interpolation of durations across repetitions

/// Interpolate a duration between `start_ms` and `end_ms` for a repetition.
///
/// Repetition 1 yields `start_ms`, the last repetition yields `end_ms`, and
/// intermediate repetitions are spaced linearly. Integer division truncates,
/// so fractional milliseconds are dropped rather than rounded; summed
/// exercise lengths are therefore reproducible for given inputs.
///
/// With fewer than two repetitions there is nothing to interpolate and
/// `end_ms` is returned. Repetition indices outside `1..=total` are clamped.
/// The arithmetic is widened to `i128`, so any pair of `u64` endpoints is
/// handled without overflow.
///
/// # Examples
///
/// ```
/// use breathe_player::plan::interpolate;
///
/// assert_eq!(interpolate(4000, 8000, 1, 5), 4000);
/// assert_eq!(interpolate(4000, 8000, 3, 5), 6000);
/// assert_eq!(interpolate(4000, 8000, 5, 5), 8000);
/// assert_eq!(interpolate(1000, 9000, 1, 1), 9000);
/// ```
pub fn interpolate(start_ms: u64, end_ms: u64, repetition: u32, total: u32) -> u64 {
    if total < 2 {
        return end_ms;
    }

    let repetition = i128::from(repetition.clamp(1, total));
    let start = i128::from(start_ms);
    let end = i128::from(end_ms);
    let offset = (end - start) * (repetition - 1) / (i128::from(total) - 1);

    (start + offset).clamp(0, i128::from(u64::MAX)) as u64
}
