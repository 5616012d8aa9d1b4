//! Fixed-point cents at 10⁻⁴ cent precision. The wire format
//! uses plain floats; everything internal to the pipeline uses this type so
//! rounding never accumulates across the budget ledger.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

const SCALE: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub fn from_cents_f64(cents: f64) -> Self {
        Cents((cents * SCALE as f64).round() as i64)
    }

    pub fn from_whole_cents(cents: i64) -> Self {
        Cents(cents * SCALE)
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    pub fn raw(self) -> i64 {
        self.0
    }

    pub fn from_raw(raw: i64) -> Self {
        Cents(raw)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.as_f64())
    }
}

impl Add for Cents {
    type Output = Cents;
    fn add(self, rhs: Self) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Cents {
    type Output = Cents;
    fn sub(self, rhs: Self) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Self {
        iter.fold(Cents::ZERO, Add::add)
    }
}
