//! The common currency every reservoir trades in: a value, an optional producer-supplied tag,
//! and a sampling weight.

/// A single observation held by a reservoir.
///
/// `user_value` is a free-form label a producer may attach to an observation (a request id, a
/// customer name, ...). It has no bearing on the sampling math; it is only ever surfaced back on
/// whichever sample turns out to be the snapshot's minimum or maximum, so that an exporter can
/// say "the slowest request in this window was `id-42`".
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedSample {
    /// The recorded value.
    pub value: i64,
    /// An optional free-form tag supplied by the producer.
    pub user_value: Option<String>,
    /// The sampling weight assigned to this observation (1.0 for unweighted reservoirs).
    pub weight: f64,
}

impl WeightedSample {
    /// Creates a sample with the given weight.
    pub fn new(value: i64, user_value: Option<String>, weight: f64) -> Self {
        Self { value, user_value, weight }
    }

    /// Creates a sample with weight 1.0, as used by the uniform and sliding-window reservoirs.
    pub fn unweighted(value: i64, user_value: Option<String>) -> Self {
        Self::new(value, user_value, 1.0)
    }
}
