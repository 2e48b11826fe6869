// Property tests for decoding and split execution
//
// Numan Thabit 2025 Nov

use alloy_primitives::U256;
use proptest::prelude::*;
use ultra_router::router::{decode_route, encode_route, RouteBuilder, VenueCall};
use ultra_router::testkit::*;

proptest! {
    #[test]
    fn decoding_arbitrary_bytes_never_panics_and_is_stable(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let first = decode_route(&bytes);
        let second = decode_route(&bytes);
        prop_assert_eq!(&first, &second);
        if let Ok(steps) = first {
            prop_assert_eq!(encode_route(&steps).unwrap(), bytes);
        }
    }

    #[test]
    fn split_over_exact_venues_delivers_the_whole_input(
        total in 1u64..1_000_000,
        weights in proptest::collection::vec(0u16..=u16::MAX, 1..6),
    ) {
        let mut world = World::new();
        world.fund_caller(token_a(), amount(total));

        let calls: Vec<VenueCall> = weights
            .iter()
            .enumerate()
            .map(|(i, weight)| {
                let venue = addr(0x30 + i as u8);
                world.ledger.set_balance(token_b(), venue, amount(total));
                VenueCall::new(*weight, ONE_TO_ONE_TAG, one_to_one_params(venue, token_b(), destination()))
            })
            .collect();

        let route = RouteBuilder::new().pull_from_caller(token_a(), calls).build().unwrap();
        let request = world.request(token_a(), amount(total), token_b(), amount(total), route);
        let result = world.process(&request).unwrap();

        prop_assert_eq!(result.amount_out, amount(total));
        prop_assert_eq!(world.balance(token_a(), caller()), U256::ZERO);
        prop_assert_eq!(result.report.spent, amount(total));
    }
}
