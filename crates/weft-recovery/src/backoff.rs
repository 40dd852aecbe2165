//! Exponential backoff between retry attempts.

use std::time::Duration;

use rand::Rng;
use weft_config::ErrorRecoveryStrategy;

/// Upper bound of the random jitter, as a fraction of the computed delay.
pub const JITTER_RATIO: f64 = 0.1;

/// Delay schedule for the retry strategy.
///
/// The wait before attempt `n` (1-based) is
/// `min(initial * multiplier^(n-1) + jitter, max)`, with `jitter` drawn
/// uniformly from `[0, JITTER_RATIO * base)`. The first attempt runs
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
  pub initial_delay_ms: u64,
  pub multiplier: f64,
  pub max_delay_ms: u64,
}

impl BackoffPolicy {
  pub fn from_strategy(strategy: &ErrorRecoveryStrategy) -> Self {
    Self {
      initial_delay_ms: strategy.effective_retry_delay_ms(),
      multiplier: strategy.effective_backoff_multiplier(),
      max_delay_ms: strategy.effective_max_retry_delay_ms(),
    }
  }

  /// Delay before `attempt` without jitter, in milliseconds.
  pub fn base_delay_ms(&self, attempt: u32) -> f64 {
    if attempt <= 1 {
      return 0.0;
    }
    let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
    self.initial_delay_ms as f64 * self.multiplier.powi(exponent)
  }

  /// Delay before `attempt` with `jitter` in `[0, 1)` selecting a point in
  /// the jitter range. Rounded to whole milliseconds.
  pub fn delay_with_jitter(&self, attempt: u32, jitter: f64) -> Duration {
    let base = self.base_delay_ms(attempt);
    let jitter = jitter.clamp(0.0, 1.0) * JITTER_RATIO * base;
    let capped = (base + jitter).min(self.max_delay_ms as f64);
    Duration::from_millis(capped.round() as u64)
  }

  /// Delay before `attempt` with random jitter.
  pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(0.0..1.0);
    self.delay_with_jitter(attempt, jitter)
  }

  /// Delay before `attempt`, never shorter than the `previous` wait.
  ///
  /// Jitter alone could otherwise shrink a delay below its predecessor when
  /// the multiplier is close to one.
  pub fn next_delay(&self, attempt: u32, previous: Duration) -> Duration {
    self.delay_for_attempt(attempt).max(previous)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn policy(initial: u64, multiplier: f64, max: u64) -> BackoffPolicy {
    BackoffPolicy {
      initial_delay_ms: initial,
      multiplier,
      max_delay_ms: max,
    }
  }

  #[test]
  fn test_first_attempt_is_immediate() {
    let p = policy(1000, 2.0, 30_000);
    assert_eq!(p.delay_with_jitter(1, 0.9), Duration::ZERO);
    assert_eq!(p.delay_for_attempt(1), Duration::ZERO);
  }

  #[test]
  fn test_exponential_growth() {
    let p = policy(1000, 2.0, 30_000);
    assert_eq!(p.delay_with_jitter(2, 0.0), Duration::from_millis(2000));
    assert_eq!(p.delay_with_jitter(3, 0.0), Duration::from_millis(4000));
    assert_eq!(p.delay_with_jitter(4, 0.0), Duration::from_millis(8000));
    assert_eq!(p.delay_with_jitter(3, 0.5), Duration::from_millis(4200));
  }

  #[test]
  fn test_delay_is_capped() {
    let p = policy(1000, 3.0, 5000);
    for attempt in 1..20 {
      assert!(p.delay_with_jitter(attempt, 0.999) <= Duration::from_millis(5000));
      assert!(p.delay_for_attempt(attempt) <= Duration::from_millis(5000));
    }
    assert_eq!(p.delay_with_jitter(10, 0.0), Duration::from_millis(5000));
  }

  #[test]
  fn test_random_jitter_stays_in_range() {
    let p = policy(1000, 2.0, 30_000);
    for _ in 0..100 {
      let delay = p.delay_for_attempt(2);
      assert!(delay >= Duration::from_millis(2000));
      assert!(delay <= Duration::from_millis(2200));
    }
  }

  #[test]
  fn test_non_decreasing_schedule() {
    for multiplier in [1.01, 1.5, 2.0, 4.0] {
      let p = policy(100, multiplier, 10_000);
      let mut previous = Duration::ZERO;
      for attempt in 1..30 {
        let delay = p.next_delay(attempt, previous);
        assert!(delay >= previous, "multiplier {} attempt {}", multiplier, attempt);
        assert!(delay <= Duration::from_millis(10_000));
        previous = delay;
      }
    }
  }

  #[test]
  fn test_from_strategy_uses_effective_values() {
    let strategy = ErrorRecoveryStrategy::retry(5)
      .with_retry_delay_ms(250)
      .with_backoff_multiplier(1.5);
    let p = BackoffPolicy::from_strategy(&strategy);
    assert_eq!(p, policy(250, 1.5, 30_000));
  }
}
