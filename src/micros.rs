use core::{
    ops::{Add, AddAssign, Mul, Sub},
    time::Duration,
};

/// Unsigned microseconds
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Micros(u64);

impl Micros {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Creates a new instance of microseconds
    #[inline]
    pub const fn new(microseconds: u64) -> Self {
        Self(microseconds)
    }

    /// Returns the microseconds as a u64
    #[inline]
    pub const fn us(&self) -> u64 {
        self.0
    }

    /// ms -> us
    #[inline]
    pub const fn from_ms(ms: u64) -> Self {
        Self(ms * 1_000)
    }

    /// Returns seconds
    #[inline]
    pub const fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000.
    }

    /// Converts into a [`Duration`]
    #[inline]
    pub const fn as_duration(&self) -> Duration {
        Duration::from_micros(self.0)
    }

    /// Returns no time if I am less than other.
    pub const fn saturating_sub(&self, other: Self) -> Micros {
        Micros(self.0.saturating_sub(other.0))
    }
}

impl From<Duration> for Micros {
    /// Sub-microsecond precision is truncated.
    fn from(value: Duration) -> Self {
        Self(value.as_micros().min(u64::MAX as u128) as u64)
    }
}

impl Add for Micros {
    type Output = Micros;
    fn add(self, rhs: Self) -> Self::Output {
        Micros(self.0 + rhs.0)
    }
}

impl AddAssign for Micros {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Micros {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Micros(self.0 - rhs.0)
    }
}

impl Mul<u64> for Micros {
    type Output = Micros;
    fn mul(self, rhs: u64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

#[test]
fn micros_duration_conversion() {
    use pretty_assertions::assert_eq;
    let micros = Micros::from(Duration::from_nanos(1_500_999));
    assert_eq!(micros, Micros::new(1_500));
    assert_eq!(micros.as_duration(), Duration::from_micros(1_500));
    assert_eq!(Micros::from_ms(3) - micros, Micros::new(1_500));
    assert_eq!(micros.saturating_sub(Micros::from_ms(2)), Micros::ZERO);
}
