/// A closed interval `[start, stop]`
///
/// A range whose `stop` is lower than its `start` is empty and contains
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    start: i64,
    stop: i64,
}

impl Range {
    #[must_use]
    pub const fn new(start: i64, stop: i64) -> Self {
        Self { start, stop }
    }

    /// The `length` cells starting at `start`
    #[must_use]
    pub const fn with_length(start: i64, length: i64) -> Self {
        Self::new(start, start + length - 1)
    }

    #[must_use]
    pub const fn contains(&self, n: i64) -> bool {
        self.start <= n && n <= self.stop
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stop < self.start
    }

    /// Checks if every value of `other` is also in this range
    #[must_use]
    pub const fn includes(&self, other: &Range) -> bool {
        other.is_empty() || (self.contains(other.start) && self.contains(other.stop))
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.stop)
    }
}
