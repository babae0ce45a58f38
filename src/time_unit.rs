//! Time unit conversions used when scaling value objects for export.

/// A unit of time that rate and duration fields can be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    /// Nanoseconds.
    Nanoseconds,
    /// Microseconds.
    Microseconds,
    /// Milliseconds.
    Milliseconds,
    /// Seconds.
    Seconds,
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
    /// Days.
    Days,
}

impl TimeUnit {
    /// The number of nanoseconds in one unit of `self`.
    const fn nanos_per_unit(self) -> f64 {
        match self {
            TimeUnit::Nanoseconds => 1.0,
            TimeUnit::Microseconds => 1_000.0,
            TimeUnit::Milliseconds => 1_000_000.0,
            TimeUnit::Seconds => 1_000_000_000.0,
            TimeUnit::Minutes => 60.0 * 1_000_000_000.0,
            TimeUnit::Hours => 60.0 * 60.0 * 1_000_000_000.0,
            TimeUnit::Days => 24.0 * 60.0 * 60.0 * 1_000_000_000.0,
        }
    }

    /// Returns the factor to multiply a value expressed in `self` by to convert it to `target`.
    ///
    /// For a *duration* (bigger unit = fewer of them per fixed span), this is the ratio of
    /// nanoseconds-per-unit. For a *rate* expressed as "per `self`", converting to "per `target`"
    /// uses the reciprocal, since a rate of `1/s` is `60/min`, not `1/60 per min`; callers doing
    /// rate scaling should use [`TimeUnit::rate_scaling_factor_to`] instead.
    pub fn scaling_factor_to(self, target: TimeUnit) -> f64 {
        self.nanos_per_unit() / target.nanos_per_unit()
    }

    /// Returns the factor to multiply a rate expressed as "events per `self`" by to convert it to
    /// "events per `target`".
    pub fn rate_scaling_factor_to(self, target: TimeUnit) -> f64 {
        target.nanos_per_unit() / self.nanos_per_unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn adjacent_conversions() {
        assert_relative_eq!(TimeUnit::Milliseconds.scaling_factor_to(TimeUnit::Nanoseconds), 1_000_000.0);
        assert_relative_eq!(TimeUnit::Seconds.scaling_factor_to(TimeUnit::Milliseconds), 1_000.0);
        assert_relative_eq!(TimeUnit::Minutes.scaling_factor_to(TimeUnit::Seconds), 60.0);
        assert_relative_eq!(TimeUnit::Hours.scaling_factor_to(TimeUnit::Minutes), 60.0);
        assert_relative_eq!(TimeUnit::Days.scaling_factor_to(TimeUnit::Hours), 24.0);
    }

    #[test]
    fn composed_conversions() {
        assert_relative_eq!(TimeUnit::Days.scaling_factor_to(TimeUnit::Seconds), 86_400.0);
        assert_relative_eq!(TimeUnit::Seconds.scaling_factor_to(TimeUnit::Days), 1.0 / 86_400.0);
    }

    #[test]
    fn identity_conversion_is_one() {
        for unit in [
            TimeUnit::Nanoseconds,
            TimeUnit::Microseconds,
            TimeUnit::Milliseconds,
            TimeUnit::Seconds,
            TimeUnit::Minutes,
            TimeUnit::Hours,
            TimeUnit::Days,
        ] {
            assert_relative_eq!(unit.scaling_factor_to(unit), 1.0);
        }
    }

    #[test]
    fn rate_scaling_is_the_reciprocal_of_duration_scaling() {
        let per_second = 10.0;
        let per_minute = per_second * TimeUnit::Seconds.rate_scaling_factor_to(TimeUnit::Minutes);
        assert_relative_eq!(per_minute, 600.0);
    }
}
