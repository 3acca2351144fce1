// tests/failure_recovery.rs

//! Action failures are recoverable: the action blocks, its outputs are
//! discarded, and the driver keeps pumping within the concurrency cap.

use std::error::Error;
use std::sync::Arc;

use anyhow::anyhow;
use tagforge::action::Action;
use tagforge::dashboard::TaskState;
use tagforge::tags::Tag;
use tagforge_test_utils::actions::{StubAction, StubFactory};
use tagforge_test_utils::fixtures::TestDriver;
use tagforge_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn mixed_factory() -> Arc<StubFactory> {
    Arc::new(StubFactory::new(vec![Tag::default_tag()], |_tag, file| {
        let name = file.canonical_name();
        if name.ends_with(".bad") {
            Some(Box::new(StubAction::new("explode", |ctx| {
                let junk = ctx.new_output("junk.o")?;
                junk.write(b"partial")?;
                Err(anyhow!("boom"))
            })) as Box<dyn Action>)
        } else if name.ends_with(".ok") {
            Some(Box::new(StubAction::new("build", |ctx| {
                ctx.passed()?;
                Ok(None)
            })) as Box<dyn Action>)
        } else {
            None
        }
    }))
}

#[test]
fn failure_blocks_the_action_and_discards_outputs() -> TestResult {
    init_tracing();

    let mut t = TestDriver::new(
        &[("src/a.bad", "x"), ("src/b.ok", "y"), ("src/c.ok", "z")],
        1,
    )?;
    t.driver.add_action_factory(mixed_factory());

    // Pump manually so the concurrency cap is observable at every step.
    t.driver.start()?;
    while let Ok(event) = t.events.try_recv() {
        t.driver.dispatch(event)?;
        assert!(t.driver.active_count() <= 1);
    }

    assert!(t.driver.is_idle());
    assert_eq!(t.dashboard.last_state_of("src/a.bad"), Some(TaskState::Blocked));
    assert!(t.dashboard.output_of("src/a.bad").contains("uncaught error"));
    assert_eq!(t.dashboard.last_state_of("src/b.ok"), Some(TaskState::Passed));
    assert_eq!(t.dashboard.last_state_of("src/c.ok"), Some(TaskState::Passed));

    // The failed action's declared output was never published.
    assert!(t
        .driver
        .providers_for(&Tag::from_file("tmp/junk.o"))
        .is_empty());
    assert_eq!(t.driver.provision_count(), 3); // the three sources
    assert_eq!(t.driver.completed_count(), 3);

    let summary = t.driver.summary();
    assert_eq!(summary.passed, 2);
    assert_eq!(summary.failed, 1);
    Ok(())
}

#[test]
fn explicit_failed_signal_blocks_the_action() -> TestResult {
    init_tracing();

    let mut t = TestDriver::new(&[("src/a.in", "x")], 2)?;
    t.driver.add_action_factory(Arc::new(StubFactory::new(
        vec![Tag::default_tag()],
        |_tag, _file| {
            Some(Box::new(StubAction::new("check", |ctx| {
                ctx.log("found a problem\n")?;
                ctx.failed()?;
                Ok(None)
            })) as Box<dyn Action>)
        },
    )));
    t.run_to_idle()?;

    assert_eq!(t.dashboard.last_state_of("src/a.in"), Some(TaskState::Blocked));
    assert_eq!(t.driver.summary().failed, 1);
    Ok(())
}

#[test]
fn failed_after_passed_is_a_misuse_that_fails_the_action() -> TestResult {
    init_tracing();

    let mut t = TestDriver::new(&[("src/a.in", "x")], 2)?;
    t.driver.add_action_factory(Arc::new(StubFactory::new(
        vec![Tag::default_tag()],
        |_tag, _file| {
            Some(Box::new(StubAction::new("confused", |ctx| {
                ctx.passed()?;
                ctx.failed()?;
                Ok(None)
            })) as Box<dyn Action>)
        },
    )));
    t.run_to_idle()?;

    assert_eq!(t.dashboard.last_state_of("src/a.in"), Some(TaskState::Blocked));
    assert!(t
        .dashboard
        .output_of("src/a.in")
        .contains("failed() after passed()"));
    Ok(())
}

#[test]
fn redundant_failed_calls_are_ignored() -> TestResult {
    init_tracing();

    let mut t = TestDriver::new(&[("src/a.in", "x")], 2)?;
    t.driver.add_action_factory(Arc::new(StubFactory::new(
        vec![Tag::default_tag()],
        |_tag, _file| {
            Some(Box::new(StubAction::new("fail-twice", |ctx| {
                ctx.failed()?;
                ctx.failed()?; // ignored
                ctx.passed()?; // ignored after failed()
                Ok(None)
            })) as Box<dyn Action>)
        },
    )));
    t.run_to_idle()?;

    assert_eq!(t.dashboard.last_state_of("src/a.in"), Some(TaskState::Blocked));
    assert_eq!(t.driver.summary().failed, 1);
    Ok(())
}

#[test]
fn unresolved_failures_report_failed_at_teardown() -> TestResult {
    init_tracing();

    let mut t = TestDriver::new(&[("src/a.bad", "x")], 1)?;
    t.driver.add_action_factory(mixed_factory());
    t.run_to_idle()?;

    let dashboard = t.dashboard.clone();
    assert_eq!(dashboard.last_state_of("src/a.bad"), Some(TaskState::Blocked));

    drop(t);
    assert_eq!(dashboard.last_state_of("src/a.bad"), Some(TaskState::Failed));
    Ok(())
}
