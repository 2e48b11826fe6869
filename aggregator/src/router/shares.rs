// Share splitting
// This file partitions a step's input across its venues by relative weight
//
// Numan Thabit 2025 Nov

use alloy_primitives::U256;

use crate::router::routes::FULL_SHARE;

/// Splits `total` across `weights`. Every entry but the last gets
/// `floor(remaining * w / remaining_weight_sum)`, or zero when the remaining
/// weights sum to zero; the last takes whatever is left, so the parts always
/// sum to `total`.
///
/// A weight of [`FULL_SHARE`] takes everything still remaining, leaving
/// nothing for the entries after it.
pub fn split_amount(total: U256, weights: &[u16]) -> Vec<U256> {
    let mut parts = Vec::with_capacity(weights.len());
    let mut remaining = total;
    let mut remaining_weight: u64 = weights.iter().map(|w| u64::from(*w)).sum();

    for (i, weight) in weights.iter().enumerate() {
        if i + 1 == weights.len() {
            parts.push(remaining);
            break;
        }
        let part = if *weight == FULL_SHARE {
            remaining
        } else {
            proportional(remaining, *weight, remaining_weight)
        };
        parts.push(part);
        remaining -= part;
        remaining_weight -= u64::from(*weight);
    }
    parts
}

// remaining * weight / sum without overflowing 256 bits
fn proportional(remaining: U256, weight: u16, sum: u64) -> U256 {
    if sum == 0 {
        return U256::ZERO;
    }
    let sum = U256::from(sum);
    let weight = U256::from(weight);
    (remaining / sum) * weight + (remaining % sum) * weight / sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    #[test]
    fn equal_weights_leave_remainder_on_last() {
        assert_eq!(split_amount(u(10), &[1, 1, 1]), vec![u(3), u(3), u(4)]);
    }

    #[test]
    fn single_venue_takes_everything_whatever_its_weight() {
        assert_eq!(split_amount(u(77), &[0]), vec![u(77)]);
        assert_eq!(split_amount(u(77), &[FULL_SHARE]), vec![u(77)]);
    }

    #[test]
    fn zero_weights_before_the_last_get_nothing() {
        assert_eq!(split_amount(u(50), &[0, 0, 0]), vec![u(0), u(0), u(50)]);
        assert_eq!(split_amount(u(50), &[0, 5]), vec![u(0), u(50)]);
    }

    #[test]
    fn weights_are_relative_to_what_remains() {
        // 100 * 1/4 = 25, then 75 * 1/3 = 25, last 50
        assert_eq!(
            split_amount(u(100), &[1, 1, 2]),
            vec![u(25), u(25), u(50)]
        );
    }

    #[test]
    fn huge_totals_do_not_overflow() {
        let parts = split_amount(U256::MAX, &[0x8000, 0x8000]);
        assert_eq!(parts[0] + parts[1], U256::MAX);
        assert_eq!(parts[0], U256::MAX / u(2));
    }

    #[test]
    fn full_share_consumes_everything_remaining() {
        assert_eq!(split_amount(u(100), &[FULL_SHARE, 0x8000]), vec![u(100), u(0)]);
        assert_eq!(
            split_amount(u(100), &[1, 1, FULL_SHARE, 7]),
            vec![u(0), u(0), u(100), u(0)]
        );
        // 100 * 0x8000 / 0x1FFFF = 25 first, then the full share takes the rest
        assert_eq!(
            split_amount(u(100), &[0x8000, FULL_SHARE, 0x8000]),
            vec![u(25), u(75), u(0)]
        );
    }

    #[test]
    fn empty_weights_yield_no_parts() {
        assert!(split_amount(u(5), &[]).is_empty());
    }

    proptest! {
        #[test]
        fn parts_always_sum_to_total(
            total in any::<[u8; 32]>(),
            weights in prop::collection::vec(any::<u16>(), 1..12),
        ) {
            let total = U256::from_be_bytes(total);
            let parts = split_amount(total, &weights);
            prop_assert_eq!(parts.len(), weights.len());
            let sum = parts.iter().fold(U256::ZERO, |acc, p| acc + *p);
            prop_assert_eq!(sum, total);
        }

        #[test]
        fn non_last_parts_never_exceed_their_proportion(
            total in 0u64..u64::MAX,
            weights in prop::collection::vec(1u16..FULL_SHARE, 2..8),
        ) {
            let parts = split_amount(U256::from(total), &weights);
            let sum: u128 = weights.iter().map(|w| u128::from(*w)).sum();
            let first = u128::from(total) * u128::from(weights[0]) / sum;
            prop_assert_eq!(parts[0], U256::from(first));
        }

        #[test]
        fn full_share_before_the_last_takes_the_rest(
            total in any::<u64>(),
            before in prop::collection::vec(1u16..FULL_SHARE, 0..4),
            after in prop::collection::vec(any::<u16>(), 1..4),
        ) {
            let mut weights = before.clone();
            weights.push(FULL_SHARE);
            weights.extend(&after);

            let parts = split_amount(U256::from(total), &weights);
            let earlier = parts[..before.len()].iter().fold(U256::ZERO, |acc, p| acc + *p);
            prop_assert_eq!(parts[before.len()], U256::from(total) - earlier);
            prop_assert!(parts[before.len() + 1..].iter().all(|p| p.is_zero()));
        }
    }
}
