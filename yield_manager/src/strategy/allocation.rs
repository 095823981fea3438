//! Allocation math
//!
//! A strategy splits its funds over an ordered list of `(protocol, bps)`
//! entries whose basis points always add up to `BPS_DENOMINATOR`. The
//! functions here are pure: they decide how much goes where and leave the
//! protocol calls to the executable strategy.

use alloy_primitives::{Address, U256};

use crate::{
    code::RemainderPolicy,
    constants::{bps_denominator, BPS_DENOMINATOR},
    utils::error::{arithmetic_err, ManagerResult, Violation},
};

/// External protocol an allocation points at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProtocolRef {
    /// Lending market, ProtocolA
    Lending(Address),
    /// Share vault, ProtocolB
    Vault(Address),
}

impl ProtocolRef {
    pub fn address(&self) -> Address {
        match self {
            ProtocolRef::Lending(address) | ProtocolRef::Vault(address) => *address,
        }
    }
}

/// Share of the strategy's funds assigned to one protocol
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub protocol: ProtocolRef,
    pub bps: u16,
}

impl Allocation {
    pub fn new(protocol: ProtocolRef, bps: u16) -> Self {
        Self { protocol, bps }
    }
}

/// Amounts routed to each allocation and what is left over
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutePlan {
    /// One amount per allocation, in allocation order
    pub legs: Vec<U256>,
    /// Integer-division dust that stays idle
    pub remainder: U256,
}

/// Returns `floor(amount * bps / BPS_DENOMINATOR)`
pub fn bps_of(amount: U256, bps: u16) -> ManagerResult<U256> {
    amount
        .checked_mul(U256::from(bps))
        .map(|scaled| scaled / bps_denominator())
        .ok_or_else(|| arithmetic_err("Basis point multiplication overflowed."))
}

/// Returns Err unless `weights` add up to exactly `BPS_DENOMINATOR`
pub fn validate_weights(weights: &[u16]) -> ManagerResult<()> {
    let total: u32 = weights.iter().map(|weight| u32::from(*weight)).sum();
    if total != u32::from(BPS_DENOMINATOR) {
        return Err(Violation::SplitMismatch { total }.into());
    }
    Ok(())
}

/// Returns `allocations` with their basis points replaced by `weights`
pub fn reweight(allocations: &[Allocation], weights: &[u16]) -> ManagerResult<Vec<Allocation>> {
    if allocations.len() != weights.len() {
        return Err(Violation::AllocationLength {
            expected: allocations.len() as u32,
            found: weights.len() as u32,
        }
        .into());
    }
    validate_weights(weights)?;

    Ok(allocations
        .iter()
        .zip(weights)
        .map(|(allocation, weight)| Allocation::new(allocation.protocol, *weight))
        .collect())
}

/// Splits `amount` over `allocations`. Each leg is floored; the remainder is
/// handled according to `policy`.
pub fn plan_route(
    amount: U256,
    allocations: &[Allocation],
    policy: RemainderPolicy,
) -> ManagerResult<RoutePlan> {
    let legs = allocations
        .iter()
        .map(|allocation| bps_of(amount, allocation.bps))
        .collect::<ManagerResult<Vec<_>>>()?;
    let routed = legs.iter().fold(U256::ZERO, |total, leg| total + *leg);
    let mut plan = RoutePlan {
        legs,
        remainder: amount - routed,
    };

    if policy == RemainderPolicy::SweepToFirst {
        if let Some(first) = plan.legs.first_mut() {
            *first += plan.remainder;
            plan.remainder = U256::ZERO;
        }
    }

    Ok(plan)
}

/// Decides how much to pull from each allocation to cover `shortfall`.
///
/// The shortfall is first split proportionally to the allocations' basis
/// points, with the last allocation absorbing the rounding remainder. Each
/// pull is capped at the allocation's position and whatever could not be
/// covered is taken, in order, from allocations that still have funds. The
/// result covers `min(shortfall, sum(positions))`.
pub fn plan_shortfall(
    shortfall: U256,
    allocations: &[Allocation],
    positions: &[U256],
) -> ManagerResult<Vec<U256>> {
    if allocations.len() != positions.len() {
        return Err(Violation::AllocationLength {
            expected: allocations.len() as u32,
            found: positions.len() as u32,
        }
        .into());
    }

    let mut pulls = Vec::with_capacity(allocations.len());
    let mut requested = U256::ZERO;
    for (index, (allocation, position)) in allocations.iter().zip(positions).enumerate() {
        let wanted = if index + 1 == allocations.len() {
            shortfall - requested
        } else {
            bps_of(shortfall, allocation.bps)?
        };
        requested += wanted;
        pulls.push(wanted.min(*position));
    }

    let mut uncovered = shortfall - pulls.iter().fold(U256::ZERO, |total, pull| total + *pull);
    for (pull, position) in pulls.iter_mut().zip(positions) {
        if uncovered.is_zero() {
            break;
        }
        let extra = uncovered.min(*position - *pull);
        *pull += extra;
        uncovered -= extra;
    }

    Ok(pulls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ManagerError;
    use proptest::prelude::*;

    fn two_way(split_a: u16, split_b: u16) -> Vec<Allocation> {
        vec![
            Allocation::new(ProtocolRef::Lending(Address::repeat_byte(0x0a)), split_a),
            Allocation::new(ProtocolRef::Vault(Address::repeat_byte(0x0b)), split_b),
        ]
    }

    #[test]
    fn test_plan_route_exact_split() {
        let plan = plan_route(U256::from(1_000), &two_way(6_000, 4_000), RemainderPolicy::Idle)
            .unwrap();
        assert_eq!(plan.legs, vec![U256::from(600), U256::from(400)]);
        assert_eq!(plan.remainder, U256::ZERO);
    }

    #[test]
    fn test_plan_route_remainder_stays_idle() {
        let plan = plan_route(U256::from(999), &two_way(3_333, 6_667), RemainderPolicy::Idle)
            .unwrap();
        assert_eq!(plan.legs, vec![U256::from(332), U256::from(666)]);
        assert_eq!(plan.remainder, U256::from(1));
    }

    #[test]
    fn test_plan_route_remainder_swept_to_first() {
        let plan = plan_route(
            U256::from(999),
            &two_way(3_333, 6_667),
            RemainderPolicy::SweepToFirst,
        )
        .unwrap();
        assert_eq!(plan.legs, vec![U256::from(333), U256::from(666)]);
        assert_eq!(plan.remainder, U256::ZERO);
    }

    #[test]
    fn test_validate_weights() {
        assert!(validate_weights(&[6_000, 4_000]).is_ok());
        assert!(validate_weights(&[10_000, 0]).is_ok());
        assert_eq!(
            validate_weights(&[6_000, 4_001]),
            Err(ManagerError::InvariantViolation(Violation::SplitMismatch {
                total: 10_001
            }))
        );
        // u16 values that would overflow a u16 sum
        assert!(validate_weights(&[u16::MAX, u16::MAX]).is_err());
    }

    #[test]
    fn test_reweight_rejects_wrong_length() {
        assert_eq!(
            reweight(&two_way(5_000, 5_000), &[10_000]),
            Err(ManagerError::InvariantViolation(Violation::AllocationLength {
                expected: 2,
                found: 1
            }))
        );
        let reweighted = reweight(&two_way(5_000, 5_000), &[7_000, 3_000]).unwrap();
        assert_eq!(reweighted, two_way(7_000, 3_000));
    }

    #[test]
    fn test_plan_shortfall_proportional() {
        let pulls = plan_shortfall(
            U256::from(101),
            &two_way(6_000, 4_000),
            &[U256::from(600), U256::from(400)],
        )
        .unwrap();
        assert_eq!(pulls, vec![U256::from(60), U256::from(41)]);
    }

    #[test]
    fn test_plan_shortfall_spills_over_capped_leg() {
        let pulls = plan_shortfall(
            U256::from(500),
            &two_way(5_000, 5_000),
            &[U256::from(100), U256::from(900)],
        )
        .unwrap();
        assert_eq!(pulls, vec![U256::from(100), U256::from(400)]);
    }

    proptest! {
        #[test]
        fn test_plan_route_conserves_amount(
            amount in any::<u128>(),
            split_a in 0u16..=BPS_DENOMINATOR,
            sweep in any::<bool>(),
        ) {
            let allocations = two_way(split_a, BPS_DENOMINATOR - split_a);
            let policy = if sweep { RemainderPolicy::SweepToFirst } else { RemainderPolicy::Idle };
            let amount = U256::from(amount);

            let plan = plan_route(amount, &allocations, policy).unwrap();
            let routed = plan.legs.iter().fold(U256::ZERO, |total, leg| total + *leg);

            prop_assert_eq!(routed + plan.remainder, amount);
            prop_assert!(plan.remainder < U256::from(allocations.len()));
            if sweep {
                prop_assert_eq!(plan.remainder, U256::ZERO);
            }
        }

        #[test]
        fn test_plan_shortfall_is_bounded(
            shortfall in any::<u64>(),
            position_a in any::<u64>(),
            position_b in any::<u64>(),
            split_a in 0u16..=BPS_DENOMINATOR,
        ) {
            let allocations = two_way(split_a, BPS_DENOMINATOR - split_a);
            let positions = [U256::from(position_a), U256::from(position_b)];
            let shortfall = U256::from(shortfall);

            let pulls = plan_shortfall(shortfall, &allocations, &positions).unwrap();
            let pulled = pulls.iter().fold(U256::ZERO, |total, pull| total + *pull);

            prop_assert!(pulls[0] <= positions[0]);
            prop_assert!(pulls[1] <= positions[1]);
            prop_assert_eq!(pulled, shortfall.min(positions[0] + positions[1]));
        }
    }
}
