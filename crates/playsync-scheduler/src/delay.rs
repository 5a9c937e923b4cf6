//! Delay primitive and jitter.
//!
//! Jitter spreads reruns of the same task (and of different tasks) across a
//! band around the nominal interval so they do not synchronize.

use std::time::Duration;

use rand::Rng;

/// Wait for at least `duration`.
///
/// Driven by the tokio timer: it keeps nothing alive on its own and follows
/// the paused test clock. It is never interrupted mid-flight; the scheduler
/// races it against its stop channel instead.
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Randomize `duration` uniformly within `[d * (1 - pct), d * (1 + pct)]`.
///
/// The result is rounded to whole milliseconds and never negative.
pub fn jitter(duration: Duration, pct: f64) -> Duration {
    jitter_with(&mut rand::thread_rng(), duration, pct)
}

/// [`jitter`] with a caller-supplied random source.
pub fn jitter_with<R: Rng + ?Sized>(rng: &mut R, duration: Duration, pct: f64) -> Duration {
    let ms = duration.as_millis() as f64;
    let factor = 1.0 - pct + rng.gen_range(0.0..1.0) * 2.0 * pct;
    let jittered = (ms * factor).round();

    if jittered.is_finite() && jittered > 0.0 {
        Duration::from_millis(jittered as u64)
    } else {
        Duration::ZERO
    }
}

/// Random start offset in `[0, max)`.
pub fn initial_delay(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
}
