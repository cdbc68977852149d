use std::fmt::Display;
use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    delegate: chrono::Duration,
}

impl Duration {
    pub(super) fn new(delegate: chrono::Duration) -> Self {
        Self { delegate }
    }

    pub fn zero() -> Self {
        Self::new(chrono::Duration::zero())
    }

    pub fn seconds(secs: i64) -> Self {
        Self::new(chrono::Duration::seconds(secs))
    }

    pub fn minutes(mins: i64) -> Self {
        Self::new(chrono::Duration::minutes(mins))
    }

    pub fn hours(hours: i64) -> Self {
        Self::new(chrono::Duration::hours(hours))
    }

    pub fn as_secs(&self) -> i64 {
        self.delegate.num_seconds()
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.delegate.num_milliseconds() as f64 / 1000.0
    }

    pub fn as_minutes(&self) -> i64 {
        self.delegate.num_minutes()
    }

    pub fn as_hours(&self) -> i64 {
        self.delegate.num_hours()
    }

    pub fn into_std(self) -> std::time::Duration {
        self.delegate.to_std().unwrap_or(std::time::Duration::ZERO)
    }

    pub(super) fn into_chrono(self) -> chrono::Duration {
        self.delegate
    }
}

impl Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} s", self.as_secs())
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.delegate + rhs.delegate)
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.delegate - rhs.delegate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_constructors() {
        assert_eq!(Duration::minutes(2).as_secs(), 120);
        assert_eq!(Duration::hours(1).as_minutes(), 60);
        assert_eq!(Duration::seconds(90).as_minutes(), 1);
    }

    #[test]
    fn test_into_std_negative_is_zero() {
        let negative = Duration::seconds(-5);
        assert_eq!(negative.into_std(), std::time::Duration::ZERO);
    }
}
