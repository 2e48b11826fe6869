// Callback authentication against misbehaving venues
//
// Numan Thabit 2025 Nov

use alloy_primitives::{Address, U256};
use ultra_router::router::{CallbackState, RouteBuilder, FULL_SHARE};
use ultra_router::testkit::*;
use ultra_router::{AssetLedger, RouteError};

fn rogue_request(world: &World, behavior: RogueBehavior) -> ultra_router::RouteRequest {
    let route = RouteBuilder::new()
        .pull_from_caller(
            token_a(),
            vec![clmm(FULL_SHARE, rogue_pool(behavior), true, destination())],
        )
        .build()
        .unwrap();
    world.request(token_a(), amount(1_000), token_c(), U256::ZERO, route)
}

fn assert_untouched(world: &World, behavior: RogueBehavior) {
    assert_eq!(world.balance(token_a(), caller()), amount(1_000));
    assert_eq!(world.balance(token_c(), destination()), U256::ZERO);
    assert_eq!(world.balance(token_c(), rogue_pool(behavior)), amount(1_000_000));
    assert_eq!(world.router.callback_state(), CallbackState::Idle);
    assert_eq!(world.ledger.depth(), 0);
}

#[test]
fn venue_that_never_calls_back_fails_the_route() {
    let mut world = World::new();
    world.fund_caller(token_a(), amount(1_000));
    let behavior = RogueBehavior::SkipCallback;

    let err = world.process(&rogue_request(&world, behavior)).unwrap_err();
    assert_eq!(
        err,
        RouteError::SwapCallbackNotExecuted {
            venue: rogue_pool(behavior)
        }
    );
    assert_untouched(&world, behavior);
}

#[test]
fn second_callback_from_the_same_venue_is_rejected() {
    let mut world = World::new();
    world.fund_caller(token_a(), amount(1_000));
    let behavior = RogueBehavior::DoubleCallback;

    let err = world.process(&rogue_request(&world, behavior)).unwrap_err();
    assert_eq!(
        err,
        RouteError::UnexpectedCallbackSender {
            caller: rogue_pool(behavior),
            expected: Address::ZERO,
        }
    );
    assert_untouched(&world, behavior);
}

#[test]
fn spoofed_sender_is_rejected() {
    let mut world = World::new();
    world.fund_caller(token_a(), amount(1_000));
    let behavior = RogueBehavior::SpoofSender(addr(0x66));

    let err = world.process(&rogue_request(&world, behavior)).unwrap_err();
    assert_eq!(
        err,
        RouteError::UnexpectedCallbackSender {
            caller: addr(0x66),
            expected: rogue_pool(behavior),
        }
    );
    assert_untouched(&world, behavior);
}

#[test]
fn venue_claiming_more_than_the_swap_size_is_refused() {
    let mut world = World::new();
    world.fund_caller(token_a(), amount(1_000));
    let behavior = RogueBehavior::Overclaim;

    let err = world.process(&rogue_request(&world, behavior)).unwrap_err();
    assert_eq!(err.kind(), "invalid_call_data");
    assert_untouched(&world, behavior);
}

#[test]
fn honest_route_succeeds_after_a_rogue_failure() {
    let mut world = World::new();
    world.fund_caller(token_a(), amount(2_000));

    let rogue = rogue_request(&world, RogueBehavior::SkipCallback);
    assert!(world.process(&rogue).is_err());

    let route = RouteBuilder::new()
        .pull_from_caller(token_a(), vec![clmm(FULL_SHARE, pool_ac(), true, destination())])
        .build()
        .unwrap();
    let honest = world.request(token_a(), amount(1_000), token_c(), amount(2_000), route);
    let result = world.process(&honest).unwrap();
    assert_eq!(result.amount_out, amount(2_000));
    assert_eq!(world.router.callback_state(), CallbackState::Idle);
}

#[test]
fn venue_cannot_redirect_payment_to_another_account() {
    let mut world = World::new();
    world.fund_caller(token_a(), amount(1_000));
    world.ledger.mint(token_a(), bystander(), amount(1_000)).unwrap();
    world
        .ledger
        .approve(token_a(), bystander(), engine(), U256::MAX);
    let behavior = RogueBehavior::ForgePayer(bystander());

    let result = world.process(&rogue_request(&world, behavior)).unwrap();

    assert_eq!(result.amount_out, amount(1_000));
    assert_eq!(world.balance(token_a(), bystander()), amount(1_000));
    assert_eq!(world.balance(token_a(), caller()), U256::ZERO);
    assert_eq!(world.balance(token_a(), rogue_pool(behavior)), amount(1_000));
    assert_eq!(world.router.callback_state(), CallbackState::Idle);
}
