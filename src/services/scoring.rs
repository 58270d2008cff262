//! Pure scoring policy mapping correctness and response latency to points.

/// Points granted for a correct answer before any speed bonus.
const BASE_POINTS: u32 = 100;
/// Maximum speed bonus.
const MAX_BONUS: u32 = 50;
/// Latency below which the full bonus applies, in milliseconds.
const FULL_BONUS_BELOW_MS: u64 = 5_000;
/// Latency from which no bonus applies, in milliseconds.
const NO_BONUS_FROM_MS: u64 = 10_000;

/// Compute the points awarded for an answer.
///
/// Incorrect answers score zero. Correct answers earn 100 base points plus a
/// speed bonus: the full 50 under 5s, a linearly decaying amount strictly
/// between 5s and 10s, and nothing from the boundaries outward. The latency is
/// clamped to non-negative first since it is client-reported.
///
/// Deterministic and side-effect free.
pub fn score(is_correct: bool, response_time_ms: i64) -> u32 {
    if !is_correct {
        return 0;
    }

    let elapsed = response_time_ms.max(0) as u64;

    let bonus = if elapsed < FULL_BONUS_BELOW_MS {
        MAX_BONUS
    } else if elapsed > FULL_BONUS_BELOW_MS && elapsed < NO_BONUS_FROM_MS {
        // floor(50 * (1 - (t - 5000) / 5000)), evaluated in integers.
        (MAX_BONUS as u64 * (NO_BONUS_FROM_MS - elapsed) / FULL_BONUS_BELOW_MS) as u32
    } else {
        0
    };

    BASE_POINTS + bonus
}
