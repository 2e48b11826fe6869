// End-to-end route execution through the bundled venues
//
// Numan Thabit 2025 Nov

use alloy_primitives::U256;
use ultra_router::config::{EngineConfig, ReservePolicy};
use ultra_router::router::{CallbackState, CommandCode, RouteBuilder, FULL_SHARE};
use ultra_router::testkit::{self, *};
use ultra_router::venues::WrapMode;
use ultra_router::{AssetLedger, NATIVE_ASSET};

#[test]
fn single_venue_pull_delivers_measured_output() {
    let mut world = World::new();
    world.fund_caller(token_a(), amount(1_000));

    let route = RouteBuilder::new()
        .pull_from_caller(token_a(), vec![cpmm(FULL_SHARE, pool_ab(), true, destination(), 0)])
        .build()
        .unwrap();
    let request = world.request(token_a(), amount(1_000), token_b(), U256::ZERO, route);
    let result = world.process(&request).unwrap();

    // 1000 * 1e6 / (1e6 + 1000)
    assert_eq!(result.amount_out, amount(999));
    assert_eq!(world.balance(token_a(), caller()), U256::ZERO);
    assert_eq!(world.balance(token_b(), destination()), amount(999));

    let fills = &result.report.steps[0].fills;
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].amount_in, amount(1_000));
    assert_eq!(fills[0].amount_out, amount(999));
    assert_eq!(world.router.callback_state(), CallbackState::Idle);

    assert_eq!(result.event.amount_in, amount(1_000));
    assert_eq!(result.event.asset_out, token_b());
    assert_eq!(result.event.destination, destination());
}

#[test]
fn split_across_heterogeneous_venues() {
    let mut world = World::new();
    world.fund_caller(token_a(), amount(1_000));
    let side_venue = testkit::addr(0x5E);
    world.ledger.set_balance(token_b(), side_venue, amount(10_000));

    let route = RouteBuilder::new()
        .pull_from_caller(
            token_a(),
            vec![
                cpmm(0x8000, pool_ab(), true, destination(), 0),
                ultra_router::router::VenueCall::new(
                    0x8000,
                    ONE_TO_ONE_TAG,
                    one_to_one_params(side_venue, token_b(), destination()),
                ),
            ],
        )
        .build()
        .unwrap();
    let request = world.request(token_a(), amount(1_000), token_b(), amount(999), route);
    let result = world.process(&request).unwrap();

    let fills = &result.report.steps[0].fills;
    assert_eq!(fills[0].amount_in, amount(500));
    assert_eq!(fills[1].amount_in, amount(500));
    // 500 * 1e6 / (1e6 + 500) = 499, plus 500 one-to-one
    assert_eq!(result.amount_out, amount(999));
    assert_eq!(world.balance(token_a(), side_venue), amount(500));
}

#[test]
fn two_hop_second_step_spends_exactly_what_the_first_delivered() {
    let mut world = World::new();
    world.fund_caller(token_a(), amount(1_000));

    let route = RouteBuilder::new()
        .pull_from_caller(token_a(), vec![cpmm(FULL_SHARE, pool_ab(), true, engine(), 0)])
        .use_single_venue(token_b(), cpmm(FULL_SHARE, pool_bc(), true, destination(), 0))
        .build()
        .unwrap();
    let request = world.request(token_a(), amount(1_000), token_c(), U256::ZERO, route);
    let result = world.process(&request).unwrap();

    let first = &result.report.steps[0];
    let second = &result.report.steps[1];
    assert_eq!(second.command, CommandCode::UseSingleVenueWithEngineBalance);
    assert_eq!(second.total_in, first.fills[0].amount_out);
    assert_eq!(second.total_in, amount(999));
    // 999 * 2e6 / (1e6 + 999)
    assert_eq!(result.amount_out, amount(1_996));
    assert_eq!(world.balance(token_b(), engine()), U256::ZERO);
}

#[test]
fn keep_one_unit_policy_leaves_residual_in_engine() {
    let config = EngineConfig::new(engine()).with_reserve_policy(ReservePolicy::KeepOneUnit);
    let mut world = World::with_config(config);
    world.fund_caller(token_a(), amount(1_000));

    let route = RouteBuilder::new()
        .pull_from_caller(token_a(), vec![cpmm(FULL_SHARE, pool_ab(), true, engine(), 0)])
        .use_engine_balance(token_b(), vec![cpmm(FULL_SHARE, pool_bc(), true, destination(), 0)])
        .build()
        .unwrap();
    let request = world.request(token_a(), amount(1_000), token_c(), U256::ZERO, route);
    let result = world.process(&request).unwrap();

    assert_eq!(result.report.steps[1].total_in, amount(998));
    assert_eq!(world.balance(token_b(), engine()), amount(1));
}

#[test]
fn callback_pool_collects_from_caller_mid_swap() {
    let mut world = World::new();
    world.fund_caller(token_a(), amount(1_000));

    let route = RouteBuilder::new()
        .pull_from_caller(token_a(), vec![clmm(FULL_SHARE, pool_ac(), true, destination())])
        .build()
        .unwrap();
    let request = world.request(token_a(), amount(1_000), token_c(), amount(2_000), route);
    let result = world.process(&request).unwrap();

    assert_eq!(result.amount_out, amount(2_000));
    assert_eq!(world.balance(token_a(), caller()), U256::ZERO);
    assert_eq!(world.balance(token_a(), pool_ac()), amount(1_001_000));
    assert_eq!(world.router.callback_state(), CallbackState::Idle);
}

#[test]
fn native_value_is_wrapped_then_swapped() {
    let mut world = World::new();
    world.fund_caller(NATIVE_ASSET, amount(1_000));

    let route = RouteBuilder::new()
        .distribute_native(vec![wrap(FULL_SHARE, WrapMode::Wrap, engine())])
        .use_single_venue(weth(), cpmm(FULL_SHARE, pool_wa(), true, destination(), 0))
        .build()
        .unwrap();
    let request = world.request(NATIVE_ASSET, amount(1_000), token_a(), amount(999), route);
    let result = world.process_with_value(&request, amount(1_000)).unwrap();

    assert_eq!(result.amount_out, amount(999));
    assert_eq!(world.balance(NATIVE_ASSET, caller()), U256::ZERO);
    assert_eq!(world.balance(NATIVE_ASSET, weth()), amount(1_000));
    assert_eq!(world.balance(weth(), engine()), U256::ZERO);
}

#[test]
fn permit_step_authorizes_the_pull() {
    let mut world = World::new();
    world.ledger.mint(token_a(), caller(), amount(1_000)).unwrap();
    world.ledger.set_time(100);
    let permit = world
        .ledger
        .sign_permit(token_a(), caller(), engine(), amount(1_000), amount(200));

    let route = RouteBuilder::new()
        .apply_permit(permit)
        .pull_from_caller(token_a(), vec![cpmm(FULL_SHARE, pool_ab(), true, destination(), 0)])
        .build()
        .unwrap();
    let request = world.request(token_a(), amount(1_000), token_b(), U256::ZERO, route);
    let result = world.process(&request).unwrap();

    assert_eq!(result.amount_out, amount(999));
    assert_eq!(world.ledger.allowance(token_a(), caller(), engine()), U256::ZERO);
    assert_eq!(world.ledger.nonce(token_a(), caller()), 1);
}

#[test]
fn pull_without_allowance_fails_with_ledger_error() {
    let mut world = World::new();
    world.ledger.mint(token_a(), caller(), amount(1_000)).unwrap();

    let route = RouteBuilder::new()
        .pull_from_caller(token_a(), vec![cpmm(FULL_SHARE, pool_ab(), true, destination(), 0)])
        .build()
        .unwrap();
    let request = world.request(token_a(), amount(1_000), token_b(), U256::ZERO, route);
    let err = world.process(&request).unwrap_err();

    assert_eq!(err.kind(), "ledger");
    assert_eq!(world.balance(token_a(), caller()), amount(1_000));
}
