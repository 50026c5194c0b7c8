//! End-to-end scenarios for the backtest engine.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use iv_spread::application::{run, BacktestEngine, BacktestError, StepOutcome};
use iv_spread::domain::{DataError, ExitReason, Observation, RiskAction, Side, Signal};
use iv_spread::strategy::{ConfigError, EngineConfig, SignalGenerator, StrategyVariant};

const BASE_IV: f64 = 0.20;

fn ts(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap() + Duration::minutes(minute)
}

fn obs(minute: i64, spread: f64) -> Observation {
    Observation::new(ts(minute), BASE_IV, BASE_IV + spread)
}

/// 200 bars alternating ±0.01 followed by one bar at -0.023 (z ≈ -2.26)
fn scenario_a_data() -> Vec<Observation> {
    let mut data: Vec<Observation> = (0..200)
        .map(|i| obs(i, if i % 2 == 0 { 0.01 } else { -0.01 }))
        .collect();
    data.push(obs(200, -0.023));
    data
}

/// Mean-reverting AR(1) spread with seeded noise
fn random_walk_data(n: i64, seed: u64) -> Vec<Observation> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut spread = 0.0;
    (0..n)
        .map(|i| {
            spread = 0.92 * spread + rng.gen_range(-0.01..0.01);
            let leg_a = 0.25 + rng.gen_range(-0.005..0.005);
            Observation::new(ts(i), leg_a, leg_a + spread)
        })
        .collect()
}

fn step_all(engine: &mut BacktestEngine, data: &[Observation]) -> Vec<StepOutcome> {
    data.iter().map(|o| engine.step(o).unwrap()).collect()
}

#[test]
fn window_not_ready_means_flat() {
    let mut engine = BacktestEngine::new(EngineConfig::default()).unwrap();
    let data = random_walk_data(250, 11);
    let outcomes = step_all(&mut engine, &data);

    for outcome in &outcomes[..199] {
        assert!(!outcome.ready);
        assert_eq!(outcome.z_score, 0.0);
        assert_eq!(outcome.signal, Signal::Flat);
        assert_eq!(outcome.action, RiskAction::Idle);
    }
    assert!(outcomes[199].ready);
}

#[test]
fn zero_variance_never_signals() {
    let data: Vec<Observation> = (0..400).map(|i| obs(i, 0.03)).collect();
    let mut engine = BacktestEngine::new(EngineConfig::default().with_lookback(50)).unwrap();
    for outcome in step_all(&mut engine, &data) {
        assert_eq!(outcome.z_score, 0.0);
        assert_eq!(outcome.signal, Signal::Flat);
    }
    let report = engine.finish().unwrap();
    assert!(report.trades.is_empty());
    assert_eq!(report.equity_curve.final_equity(), 0.0);
}

#[test]
fn kalman_converges_on_constant_spread() {
    let data: Vec<Observation> = (0..600)
        .map(|i| obs(i, if i == 0 { 0.0 } else { 0.05 }))
        .collect();
    let mut engine = BacktestEngine::new(EngineConfig::default()).unwrap();
    let outcomes = step_all(&mut engine, &data);

    let mut previous = outcomes[1].filtered_spread;
    for outcome in &outcomes[2..] {
        assert!(outcome.filtered_spread >= previous - 1e-15);
        assert!(outcome.filtered_spread <= outcome.spread + 1e-12);
        previous = outcome.filtered_spread;
    }
    assert!((previous - 0.05).abs() < 1e-4);
    assert!(engine.kalman().covariance().unwrap() >= 0.0);
}

#[test]
fn scenario_a_base_mode_opens_long() {
    let mut engine = BacktestEngine::new(EngineConfig::default()).unwrap();
    let outcomes = step_all(&mut engine, &scenario_a_data());

    let last = outcomes.last().unwrap();
    assert!(last.z_score < -2.0 && last.z_score > -2.5, "z {}", last.z_score);
    assert_eq!(last.signal, Signal::Long);
    assert_eq!(last.action, RiskAction::Opened(Side::Long));
    assert!(outcomes[..200].iter().all(|o| o.action == RiskAction::Idle));
}

#[test]
fn scenario_a_jump_off_a_flat_window() {
    // A flat window has no dispersion; the jump itself supplies it
    let mut data: Vec<Observation> = (0..200).map(|i| obs(i, 0.0)).collect();
    data.push(obs(200, -0.02));

    let mut engine = BacktestEngine::new(EngineConfig::default()).unwrap();
    let outcomes = step_all(&mut engine, &data);
    assert_eq!(outcomes[199].z_score, 0.0);
    assert_eq!(outcomes[200].action, RiskAction::Opened(Side::Long));
}

#[test]
fn scenario_b_timeout_after_holding_period() {
    let mut data = scenario_a_data();
    // Spread stays dislocated: no reversion, nowhere near the stop
    for minute in 201..=260 {
        data.push(obs(minute, -0.023));
    }

    let mut engine = BacktestEngine::new(EngineConfig::default()).unwrap();
    let outcomes = step_all(&mut engine, &data);

    for outcome in &outcomes[201..245] {
        assert_eq!(outcome.action, RiskAction::Held, "at {}", outcome.timestamp);
    }
    match &outcomes[245].action {
        RiskAction::Closed(trade) => {
            assert_eq!(trade.exit_reason, ExitReason::Timeout);
            assert_eq!(trade.entry_timestamp, ts(200));
            assert_eq!(trade.exit_timestamp, ts(245));
            assert_eq!(trade.holding_minutes(), 45);
        }
        other => panic!("expected timeout at t+45, got {:?}", other),
    }
}

#[test]
fn scenario_c_enhanced_requires_oscillator_confirmation() {
    let signals = SignalGenerator::from_config(&EngineConfig::default());
    assert_eq!(
        signals.classify(-2.6, Some(25.0), StrategyVariant::Enhanced),
        Signal::Flat
    );
    assert_eq!(
        signals.classify(-2.6, Some(45.0), StrategyVariant::Enhanced),
        Signal::Long
    );
    assert_eq!(signals.classify(-2.6, Some(25.0), StrategyVariant::Base), Signal::Long);
}

#[test]
fn scenario_d_open_position_closed_at_end_of_data() {
    let mut data = scenario_a_data();
    data.push(obs(201, -0.022));
    data.push(obs(202, -0.021));

    let report = run(EngineConfig::default(), &data).unwrap();
    assert_eq!(report.trades.len(), 1);

    let trade = &report.trades[0];
    assert_eq!(trade.direction, Side::Long);
    assert_eq!(trade.exit_reason, ExitReason::EndOfData);
    assert_eq!(trade.exit_timestamp, ts(202));
    assert_eq!(trade.exit_spread, data[202].spread());
    assert!((trade.pnl - (data[202].spread() - data[200].spread())).abs() < 1e-12);

    let last = report.equity_curve.points().last().unwrap();
    assert_eq!(last.unrealized_pnl, 0.0);
    assert!((last.equity - trade.pnl).abs() < 1e-12);
    assert_eq!(report.equity_curve.len(), data.len());
}

#[test]
fn at_most_one_position_and_every_entry_is_closed() {
    for seed in [1, 2, 3] {
        let data = random_walk_data(3000, seed);
        let config = EngineConfig::default().with_lookback(60);
        let mut engine = BacktestEngine::new(config).unwrap();
        let outcomes = step_all(&mut engine, &data);
        let opened = outcomes
            .iter()
            .filter(|o| matches!(o.action, RiskAction::Opened(_)))
            .count();

        let report = engine.finish().unwrap();
        assert_eq!(report.trades.len(), opened);
        assert!(opened > 0, "seed {} produced no trades", seed);

        for pair in report.trades.windows(2) {
            // No overlap and no re-entry on the closing bar
            assert!(pair[1].entry_timestamp > pair[0].exit_timestamp);
        }
        for trade in &report.trades {
            assert!(trade.exit_timestamp >= trade.entry_timestamp);
            let expected = trade.direction.sign() * (trade.exit_spread - trade.entry_spread) * trade.size;
            assert!((trade.pnl - expected).abs() < 1e-12);
        }

        let total: f64 = report.trades.iter().map(|t| t.pnl).sum();
        assert!((report.equity_curve.final_equity() - total).abs() < 1e-9);
        assert_eq!(report.summary.total_trades, report.trades.len());
        let exits: usize = ExitReason::ALL.iter().map(|r| report.summary.exit_count(*r)).sum();
        assert_eq!(exits, report.trades.len());
    }
}

/// Enhanced config whose filter tracks the spread closely enough to trade
fn responsive_enhanced(lookback: usize, entry_z: f64) -> EngineConfig {
    let mut config = EngineConfig::default()
        .with_lookback(lookback)
        .with_variant(StrategyVariant::Enhanced)
        .with_entry_z(entry_z);
    config.kalman.observation_variance = 1e-4;
    config
}

#[test]
fn identical_input_gives_identical_report() {
    let data = random_walk_data(3000, 42);

    let base = EngineConfig::default().with_lookback(60);
    let first = run(base.clone(), &data).unwrap();
    assert!(!first.trades.is_empty());
    assert_eq!(first, run(base, &data).unwrap());

    let enhanced = responsive_enhanced(60, 1.5);
    let first = run(enhanced.clone(), &data).unwrap();
    assert!(!first.trades.is_empty());
    assert_eq!(first, run(enhanced, &data).unwrap());
}

#[test]
fn enhanced_entries_respect_thresholds_and_confirmation() {
    let data = random_walk_data(4000, 7);
    let mut engine = BacktestEngine::new(responsive_enhanced(60, 1.5)).unwrap();

    let mut opened = 0;
    for outcome in step_all(&mut engine, &data) {
        match outcome.action {
            RiskAction::Opened(Side::Long) => {
                assert!(outcome.z_score <= -1.5);
                assert!(outcome.oscillator.unwrap() > 30.0);
                opened += 1;
            }
            RiskAction::Opened(Side::Short) => {
                assert!(outcome.z_score >= 1.5);
                assert!(outcome.oscillator.unwrap() < 70.0);
                opened += 1;
            }
            _ => {}
        }
    }
    assert!(opened > 0, "no enhanced entries");
}

#[test]
fn default_filter_smooths_away_small_dislocations() {
    // R = 1 against 0.01-scale spreads: the estimate lags and entries are rare
    let data = random_walk_data(4000, 7);
    let smooth = run(
        EngineConfig::default()
            .with_lookback(60)
            .with_variant(StrategyVariant::Enhanced)
            .with_entry_z(1.5),
        &data,
    )
    .unwrap();
    let responsive = run(responsive_enhanced(60, 1.5), &data).unwrap();
    assert!(smooth.trades.len() < responsive.trades.len());
}

#[test]
fn non_finite_iv_rejects_the_run() {
    let mut data = random_walk_data(300, 5);
    data[150].leg_b_iv = f64::INFINITY;

    match run(EngineConfig::default(), &data) {
        Err(BacktestError::Data(DataError::NonFiniteIv { index, timestamp, .. })) => {
            assert_eq!(index, 150);
            assert_eq!(timestamp, ts(150));
        }
        other => panic!("expected data error, got {:?}", other.map(|r| r.trades.len())),
    }
}

#[test]
fn negative_iv_rejects_the_run() {
    let mut data = random_walk_data(50, 5);
    data[10].leg_a_iv = -0.01;
    assert!(matches!(
        run(EngineConfig::default(), &data),
        Err(BacktestError::Data(DataError::NegativeIv { index: 10, .. }))
    ));
}

#[test]
fn duplicate_timestamp_rejects_the_run() {
    let mut data = random_walk_data(50, 5);
    data[20].timestamp = data[19].timestamp;
    assert!(matches!(
        run(EngineConfig::default(), &data),
        Err(BacktestError::Data(DataError::NonMonotonicTimestamp { index: 20, .. }))
    ));
}

#[test]
fn invalid_configuration_rejected_before_processing() {
    let data = random_walk_data(10, 1);

    let config = EngineConfig::default().with_exit_z(2.0);
    assert!(matches!(
        run(config, &data),
        Err(BacktestError::Config(ConfigError::ExitWiderThanEntry { .. }))
    ));

    let mut config = EngineConfig::default();
    config.oscillator.oversold = 70.0;
    assert!(matches!(
        run(config, &data),
        Err(BacktestError::Config(ConfigError::InvalidOscillatorBounds { .. }))
    ));

    assert!(matches!(
        run(EngineConfig::default().with_lookback(1), &data),
        Err(BacktestError::Config(ConfigError::InvalidLookback(1)))
    ));
}
