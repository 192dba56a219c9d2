//! Integration tests for queue ticks across windows, requests and collaborators.

mod common;

use appliance_scheduler::error::ScheduleError;
use appliance_scheduler::schedule::{Request, TimeframeInterval, TimeframeIntervalState};

use common::{at, bare_handler, hours, metered_handler};

#[test]
fn earliest_overlapping_window_wins_until_it_elapses() {
    let (mut handler, _clock, _meter) = metered_handler();
    let a = TimeframeInterval::new(hours(10, 12), Request::runtime(Some(600), 3600));
    let b = TimeframeInterval::new(hours(11, 13), Request::soc(Some(80), Some(1)));
    handler.add_timeframe_interval(at(9, 0), b, true).unwrap();
    handler.add_timeframe_interval(at(9, 0), a, true).unwrap();

    let active = handler.update_queue(at(11, 30), false).unwrap();
    assert_eq!(active.start, at(10, 0));
    assert_eq!(active.request.kind, "runtime");
    assert_eq!(active.request.min, Some(600));
    assert_eq!(active.request.max, 3600);

    let active = handler.update_queue(at(12, 0), false).unwrap();
    assert_eq!(active.start, at(11, 0));
    assert_eq!(active.request.kind, "soc");
    assert_eq!(handler.queue().len(), 1);
    assert_eq!(handler.retired_count(), 1);
}

#[test]
fn elapsed_window_leaves_the_queue() {
    let (mut handler, _clock) = bare_handler();
    handler
        .add_timeframe_interval(
            at(9, 0),
            TimeframeInterval::new(hours(10, 11), Request::runtime(None, 1800)),
            false,
        )
        .unwrap();

    assert!(handler.update_queue(at(10, 30), false).is_some());
    assert!(handler.update_queue(at(11, 0), false).is_none());
    assert!(handler.queue().is_empty());
    assert_eq!(handler.retired_count(), 1);
}

#[test]
fn overlap_rejection_leaves_queue_unchanged() {
    let (mut handler, _clock) = bare_handler();
    let first = TimeframeInterval::new(hours(10, 12), Request::runtime(None, 1800));
    handler
        .add_timeframe_interval(at(9, 0), first.clone(), false)
        .unwrap();

    let err = handler
        .add_timeframe_interval(
            at(9, 0),
            TimeframeInterval::new(hours(11, 13), Request::soc(None, None)),
            false,
        )
        .unwrap_err();

    assert!(matches!(err, ScheduleError::OverlapRejected { .. }));
    assert_eq!(handler.queue(), &[first][..]);
}

#[test]
fn adjacent_windows_do_not_overlap() {
    let (mut handler, _clock) = bare_handler();
    let rejected = handler.fill_queue(
        at(9, 0),
        [
            TimeframeInterval::new(hours(10, 11), Request::runtime(None, 1800)),
            TimeframeInterval::new(hours(11, 12), Request::runtime(None, 1800)),
        ],
        false,
    );
    assert!(rejected.is_empty());
    assert_eq!(handler.queue().len(), 2);
}

#[test]
fn soc_feed_is_ignored_until_window_is_active() {
    let (mut handler, _clock, _meter) = metered_handler();
    handler
        .add_timeframe_interval(
            at(9, 0),
            TimeframeInterval::new(hours(12, 14), Request::soc(Some(80), Some(1))),
            false,
        )
        .unwrap();

    assert!(handler.update_queue(at(11, 0), false).is_none());
    handler.on_ev_charger_soc_changed(at(11, 0), 50.0);

    // initial SoC still 0: 80 * 110 * 50_000 / 10_000
    let active = handler.update_queue(at(12, 0), false).unwrap();
    assert_eq!(active.request.max, 44_000);

    handler.on_ev_charger_soc_changed(at(12, 0), 50.0);
    let active = handler.update_queue(at(12, 0), true).unwrap();
    assert_eq!(active.request.max, 16_500);
}

#[test]
fn energy_is_cached_for_five_seconds_of_wall_time() {
    let (mut handler, clock, meter) = metered_handler();
    handler
        .add_timeframe_interval(
            at(9, 0),
            TimeframeInterval::new(hours(10, 14), Request::soc(Some(80), Some(1))),
            false,
        )
        .unwrap();

    assert_eq!(handler.update_queue(at(10, 0), false).map(|a| a.request.max), Some(44_000));

    meter.set_energy_kwh(2.0);
    clock.advance_millis(5_000);
    assert_eq!(handler.update_queue(at(10, 1), false).map(|a| a.request.max), Some(44_000));

    clock.advance_millis(1);
    assert_eq!(handler.update_queue(at(10, 2), false).map(|a| a.request.max), Some(42_000));
}

#[test]
fn forced_reevaluation_ignores_the_cache() {
    let (mut handler, _clock, meter) = metered_handler();
    handler
        .add_timeframe_interval(
            at(9, 0),
            TimeframeInterval::new(hours(10, 14), Request::soc(Some(80), Some(1))),
            false,
        )
        .unwrap();

    handler.update_queue(at(10, 0), false);
    meter.set_energy_kwh(4.0);
    assert_eq!(handler.update_queue(at(10, 0), true).map(|a| a.request.max), Some(40_000));
}

#[test]
fn satisfied_window_retires_and_next_takes_over() {
    let (mut handler, _clock, meter) = metered_handler();
    handler.fill_queue(
        at(9, 0),
        [
            TimeframeInterval::new(hours(10, 14), Request::soc(Some(80), Some(1))),
            TimeframeInterval::new(hours(12, 16), Request::runtime(None, 900)),
        ],
        true,
    );

    assert_eq!(handler.update_queue(at(12, 0), false).map(|a| a.request.kind), Some("soc"));

    meter.set_energy_kwh(44.0);
    let active = handler.update_queue(at(12, 0), true).unwrap();
    assert_eq!(active.request.kind, "runtime");
    assert_eq!(handler.retired_count(), 1);
}

#[test]
fn disabled_window_is_skipped_but_kept() {
    let (mut handler, _clock) = bare_handler();
    handler.fill_queue(
        at(9, 0),
        [
            TimeframeInterval::new(
                hours(10, 14),
                Request::runtime(None, 3600).with_enabled(false),
            ),
            TimeframeInterval::new(hours(11, 13), Request::runtime(None, 1200)),
        ],
        true,
    );

    let active = handler.update_queue(at(11, 0), false).unwrap();
    assert_eq!(active.start, at(11, 0));
    assert_eq!(handler.queue().len(), 2);
    assert_eq!(handler.queue()[0].state(), TimeframeIntervalState::Queued);
}

#[test]
fn unknown_vehicle_without_meter_uses_defaults() {
    let (mut handler, _clock) = bare_handler();
    handler
        .add_timeframe_interval(
            at(9, 0),
            TimeframeInterval::new(hours(10, 14), Request::soc(None, Some(7))),
            false,
        )
        .unwrap();

    let active = handler.update_queue(at(10, 0), false).unwrap();
    assert_eq!(active.request.min, Some(110_000));
    assert_eq!(active.request.max, 110_000);
    assert!(!active.request.optional_energy);
}

#[test]
fn removing_the_active_window_finishes_it() {
    let (mut handler, _clock) = bare_handler();
    handler
        .add_timeframe_interval(
            at(9, 0),
            TimeframeInterval::new(hours(10, 14), Request::runtime(None, 3600)),
            false,
        )
        .unwrap();
    handler.update_queue(at(10, 0), false);
    assert!(handler.active().is_some());

    let interval = *handler.queue()[0].interval();
    let mut window = handler.remove_timeframe_interval(&interval).unwrap();
    assert_eq!(window.state(), TimeframeIntervalState::Finished);
    assert!(handler.active().is_none());
    assert!(!window.transition(TimeframeIntervalState::Active));
}

#[test]
fn active_window_steps_back_when_disabled() {
    let (mut handler, _clock) = bare_handler();
    handler
        .add_timeframe_interval(
            at(9, 0),
            TimeframeInterval::new(hours(10, 14), Request::runtime(None, 3600)),
            false,
        )
        .unwrap();
    handler.update_queue(at(10, 0), false);
    assert!(handler.queue()[0].request().is_active());

    assert!(handler.set_enabled(&hours(10, 14), false));
    assert!(handler.update_queue(at(10, 5), false).is_none());
    assert_eq!(handler.queue()[0].state(), TimeframeIntervalState::Queued);
    assert!(!handler.queue()[0].request().is_active());
}

#[test]
fn metered_energy_counts_against_windows_not_yet_started() {
    // the meter is appliance-wide, so a later window sees energy its
    // predecessor drew unless the caller resets it between windows
    let (mut handler, _clock, meter) = metered_handler();
    handler.fill_queue(
        at(9, 0),
        [
            TimeframeInterval::new(hours(10, 12), Request::soc(Some(80), Some(1))),
            TimeframeInterval::new(hours(14, 16), Request::soc(Some(80), Some(1))),
        ],
        false,
    );
    assert!(handler.update_queue(at(10, 0), false).is_some());

    meter.set_energy_kwh(44.0);
    assert!(handler.update_queue(at(11, 0), true).is_none());
    assert_eq!(handler.retired_count(), 2);
    assert!(handler.queue().is_empty());

    meter.reset();
    handler
        .add_timeframe_interval(
            at(11, 0),
            TimeframeInterval::new(hours(14, 16), Request::soc(Some(80), Some(1))),
            false,
        )
        .unwrap();
    assert_eq!(handler.update_queue(at(14, 0), true).map(|a| a.request.max), Some(44_000));
}
