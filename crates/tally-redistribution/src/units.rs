use std::ops::AddAssign;

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use tally_types::EntityRef;

use crate::{RedistributionError, Result};

/// Shards and points moved together by a redistribution phase.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Units {
    pub shards: BigInt,
    pub points: BigInt,
}

impl Units {
    pub fn new(shards: BigInt, points: BigInt) -> Self {
        Self { shards, points }
    }

    pub fn is_zero(&self) -> bool {
        self.shards.is_zero() && self.points.is_zero()
    }

    /// `self * weight / total`, truncated.
    pub fn pro_rata(&self, weight: &BigInt, total: &BigInt) -> Self {
        Self {
            shards: &self.shards * weight / total,
            points: &self.points * weight / total,
        }
    }
}

impl AddAssign<&Units> for Units {
    fn add_assign(&mut self, rhs: &Units) {
        self.shards += &rhs.shards;
        self.points += &rhs.points;
    }
}

/// Take `paid` out of the payer's balances, refusing to go negative.
pub(crate) fn debit(
    payer: EntityRef,
    shards: &mut BigInt,
    points: &mut BigInt,
    paid: &Units,
) -> Result<()> {
    *shards -= &paid.shards;
    *points -= &paid.points;

    for (lane, remainder) in [("shards", &*shards), ("points", &*points)] {
        if remainder.is_negative() {
            return Err(RedistributionError::NegativeRemainder {
                payer,
                lane,
                remainder: remainder.clone(),
            });
        }
    }
    Ok(())
}
