//! Simulation clock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Monotonic simulated wall clock.
///
/// The clock only moves forward, in whole minutes.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use railcast::SimulationClock;
///
/// let start = Utc.with_ymd_and_hms(2023, 10, 27, 8, 0, 0).unwrap();
/// let mut clock = SimulationClock::new(start);
/// clock.advance(46).unwrap();
/// assert_eq!(clock.now(), Utc.with_ymd_and_hms(2023, 10, 27, 8, 46, 0).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationClock {
    now: DateTime<Utc>,
}

impl SimulationClock {
    /// Creates a clock at the given instant.
    #[must_use]
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self { now: start }
    }

    /// Current simulated time.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Advances the clock by `minutes` and returns the new time.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NonPositiveStep` if `minutes` is zero and
    /// `ValidationError::ClockOverflow` if the result is not representable.
    /// The clock is unchanged in both cases.
    pub fn advance(&mut self, minutes: u32) -> Result<DateTime<Utc>, ValidationError> {
        if minutes == 0 {
            return Err(ValidationError::NonPositiveStep { minutes });
        }
        self.now = self
            .now
            .checked_add_signed(Duration::minutes(i64::from(minutes)))
            .ok_or(ValidationError::ClockOverflow { minutes })?;
        Ok(self.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn advance_moves_forward_in_minutes() {
        let start = Utc.with_ymd_and_hms(2023, 10, 27, 8, 0, 0).unwrap();
        let mut clock = SimulationClock::new(start);
        assert_eq!(clock.advance(90).unwrap(), start + Duration::minutes(90));
        assert_eq!(clock.now(), start + Duration::minutes(90));
    }

    #[test]
    fn advance_rejects_zero() {
        let start = Utc.with_ymd_and_hms(2023, 10, 27, 8, 0, 0).unwrap();
        let mut clock = SimulationClock::new(start);
        assert_eq!(
            clock.advance(0),
            Err(ValidationError::NonPositiveStep { minutes: 0 })
        );
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn advance_past_time_range_fails_without_moving() {
        let start = Utc.with_ymd_and_hms(2023, 10, 27, 8, 0, 0).unwrap();
        let mut clock = SimulationClock::new(start);
        let mut last = start;
        let err = loop {
            match clock.advance(u32::MAX) {
                Ok(now) => {
                    assert!(now > last);
                    last = now;
                }
                Err(err) => break err,
            }
        };
        assert_eq!(err, ValidationError::ClockOverflow { minutes: u32::MAX });
        assert_eq!(clock.now(), last);
    }
}
