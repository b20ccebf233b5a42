//! Scoring engine: base points for correctness, a capped bonus for speed.

/// Compute the points earned for one submission.
///
/// Incorrect answers earn nothing. Correct answers earn the full base award
/// plus `floor((1 - time_taken/time_limit) * base * 0.5)`, clamped at zero:
/// speed only ever adds, and the bonus never exceeds half the base.
/// Submissions late within the grace window feed a `time_taken` beyond the
/// limit and naturally clamp to zero bonus.
pub fn score(
    is_correct: bool,
    time_taken_secs: f64,
    time_limit_secs: u32,
    base_points: i32,
) -> i32 {
    if !is_correct {
        return 0;
    }

    if time_limit_secs == 0 {
        return base_points;
    }

    let remaining_ratio = 1.0 - time_taken_secs / f64::from(time_limit_secs);
    let bonus = (remaining_ratio * f64::from(base_points) * 0.5).floor() as i64;

    base_points + bonus.max(0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incorrect_always_scores_zero() {
        assert_eq!(score(false, 0.0, 20, 1000), 0);
        assert_eq!(score(false, 10.0, 20, 1000), 0);
        assert_eq!(score(false, 999.0, 20, 1), 0);
    }

    #[test]
    fn instant_answer_earns_half_base_bonus() {
        assert_eq!(score(true, 0.0, 20, 1000), 1500);
        assert_eq!(score(true, 0.0, 30, 101), 151);
    }

    #[test]
    fn answer_at_the_limit_earns_base_only() {
        assert_eq!(score(true, 20.0, 20, 1000), 1000);
    }

    #[test]
    fn late_answer_in_grace_window_earns_base_only() {
        assert_eq!(score(true, 22.5, 20, 1000), 1000);
    }

    #[test]
    fn halfway_answer_earns_half_the_bonus() {
        assert_eq!(score(true, 10.0, 20, 1000), 1250);
    }

    #[test]
    fn bonus_is_floored() {
        // (1 - 7/20) * 333 * 0.5 = 108.225 -> 108
        assert_eq!(score(true, 7.0, 20, 333), 441);
    }

    #[test]
    fn zero_time_limit_skips_the_bonus() {
        assert_eq!(score(true, 0.0, 0, 500), 500);
    }
}
