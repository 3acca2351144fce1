// tests/ephemeral_output.rs

//! Outputs deleted before the action finishes must not be published.

use std::error::Error;
use std::sync::Arc;

use tagforge::action::Action;
use tagforge::dashboard::TaskState;
use tagforge::tags::Tag;
use tagforge_test_utils::actions::{StubAction, StubFactory};
use tagforge_test_utils::fixtures::TestDriver;
use tagforge_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn deleted_scratch_output_is_filtered_out() -> TestResult {
    init_tracing();

    let mut t = TestDriver::new(&[("src/a.in", "alpha")], 2)?;
    t.driver.add_action_factory(Arc::new(StubFactory::new(
        vec![Tag::default_tag()],
        |_tag, _file| {
            Some(Box::new(StubAction::new("scratch", |ctx| {
                let out = ctx.new_output("scratch.x")?;
                out.write(b"temporary")?;
                out.remove()?;
                ctx.passed()?;
                Ok(None)
            })) as Box<dyn Action>)
        },
    )));
    t.run_to_idle()?;

    assert_eq!(t.dashboard.last_state_of("src/a.in"), Some(TaskState::Passed));
    // No dangling entries: the scratch file provides nothing.
    assert!(t
        .driver
        .providers_for(&Tag::from_file("tmp/scratch.x"))
        .is_empty());
    let default_providers: Vec<String> = t
        .driver
        .providers_for(&Tag::default_tag())
        .iter()
        .map(|f| f.canonical_name())
        .collect();
    assert_eq!(default_providers, vec!["src/a.in".to_string()]);
    // Only the scanned source remains in the arena.
    assert_eq!(t.driver.provision_count(), 1);
    Ok(())
}

#[test]
fn surviving_sibling_outputs_are_still_published() -> TestResult {
    init_tracing();

    let mut t = TestDriver::new(&[("src/a.in", "alpha")], 2)?;
    t.driver.add_action_factory(Arc::new(StubFactory::new(
        vec![Tag::default_tag()],
        |_tag, file| {
            if !file.canonical_name().ends_with(".in") {
                return None;
            }
            Some(Box::new(StubAction::new("scratch", |ctx| {
                let scratch = ctx.new_output("scratch.x")?;
                scratch.write(b"temporary")?;
                let kept = ctx.new_output("kept.o")?;
                kept.write(b"object")?;
                scratch.remove()?;
                ctx.passed()?;
                Ok(None)
            })) as Box<dyn Action>)
        },
    )));
    t.run_to_idle()?;

    assert!(t
        .driver
        .providers_for(&Tag::from_file("tmp/scratch.x"))
        .is_empty());
    assert_eq!(
        t.driver.providers_for(&Tag::from_file("tmp/kept.o")).len(),
        1
    );
    assert_eq!(t.driver.provision_count(), 2);
    Ok(())
}
