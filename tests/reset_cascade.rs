// tests/reset_cascade.rs

//! Reset propagation: revoking a provision resets its consumers, deletes the
//! actions it triggered, and leaves no stragglers in any table.

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tagforge::action::Action;
use tagforge::dashboard::TaskState;
use tagforge::fs::FileSystem;
use tagforge::tags::Tag;
use tagforge_test_utils::actions::{StubAction, StubFactory};
use tagforge_test_utils::fixtures::TestDriver;
use tagforge_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

/// Producer/consumer/triggered setup:
/// - "produce" (from a.src) emits p.out tagged `tag:p`
/// - "consume" (from b.src) looks `tag:p` up
/// - "celebrate" is triggered by `tag:p` itself
fn cascade_driver() -> Result<TestDriver, Box<dyn Error>> {
    let mut t = TestDriver::new(&[("src/a.src", "one"), ("src/b.src", "b")], 4)?;

    t.driver.add_action_factory(Arc::new(StubFactory::new(
        vec![Tag::default_tag()],
        |_tag, file| {
            let name = file.canonical_name();
            if name.ends_with("a.src") {
                Some(Box::new(StubAction::new("produce", |ctx| {
                    let src = ctx.source()?;
                    let out = ctx.new_output("p.out")?;
                    out.write(src.read_to_string()?.as_bytes())?;
                    ctx.provide(&out, vec![Tag::new("tag:p")])?;
                    ctx.passed()?;
                    Ok(None)
                })) as Box<dyn Action>)
            } else if name.ends_with("b.src") {
                Some(Box::new(StubAction::new("consume", |ctx| {
                    match ctx.find_provider(&Tag::new("tag:p"))? {
                        Some(p) => {
                            let _ = p.read_to_string()?;
                        }
                        None => ctx.log("no provider yet\n")?,
                    }
                    ctx.passed()?;
                    Ok(None)
                })) as Box<dyn Action>)
            } else {
                None
            }
        },
    )));

    t.driver.add_action_factory(Arc::new(StubFactory::new(
        vec![Tag::new("tag:p")],
        |_tag, _file| {
            Some(Box::new(StubAction::new("celebrate", |ctx| {
                ctx.passed()?;
                Ok(None)
            })) as Box<dyn Action>)
        },
    )));

    Ok(t)
}

#[test]
fn cascade_settles_with_one_provider_and_one_dependency_row() -> TestResult {
    init_tracing();
    let mut t = cascade_driver()?;
    t.run_to_idle()?;

    assert!(t.driver.is_idle());
    assert_eq!(t.driver.providers_for(&Tag::new("tag:p")).len(), 1);
    assert_eq!(t.dashboard.last_state_of("src/a.src"), Some(TaskState::Passed));
    assert_eq!(t.dashboard.last_state_of("src/b.src"), Some(TaskState::Passed));
    // The triggered action is labelled by the provision that spawned it.
    assert_eq!(t.dashboard.last_state_of("tmp/p.out"), Some(TaskState::Passed));

    let rows = t.driver.dependency_rows_for_tag(&Tag::new("tag:p"));
    assert_eq!(
        rows,
        vec![("src/b.src".to_string(), Some("tmp/p.out".to_string()))]
    );
    Ok(())
}

#[test]
fn changing_the_producer_source_resets_the_whole_cascade() -> TestResult {
    init_tracing();
    let mut t = cascade_driver()?;
    t.run_to_idle()?;

    let produce_runs = t.count_begun("src/a.src");
    let celebrate_runs = t.count_begun("tmp/p.out");

    t.mock.add_file("src/a.src", "two");
    t.source_changed("src/a.src")?;

    assert!(t.driver.is_idle());
    // The producer was rebuilt, the old provision revoked, the triggered
    // action deleted and re-created.
    assert_eq!(t.count_begun("src/a.src"), produce_runs + 1);
    assert_eq!(t.count_begun("tmp/p.out"), celebrate_runs + 1);
    // The consumer re-ran and settled on the fresh provision; exactly one
    // row, no stale ones.
    assert_eq!(t.driver.providers_for(&Tag::new("tag:p")).len(), 1);
    let rows = t.driver.dependency_rows_for_tag(&Tag::new("tag:p"));
    assert_eq!(
        rows,
        vec![("src/b.src".to_string(), Some("tmp/p.out".to_string()))]
    );
    assert!(t.dashboard.states_of("src/b.src").iter().filter(|s| **s == TaskState::Passed).count() >= 2);
    Ok(())
}

#[test]
fn unchanged_source_content_does_not_reset_anything() -> TestResult {
    init_tracing();
    let mut t = cascade_driver()?;
    t.run_to_idle()?;

    let produce_runs = t.count_begun("src/a.src");
    let consume_passes = t.dashboard.states_of("src/b.src").len();

    // Same bytes: the content hash matches, so the event is ignored.
    t.mock.add_file("src/a.src", "one");
    t.source_changed("src/a.src")?;

    assert_eq!(t.count_begun("src/a.src"), produce_runs);
    assert_eq!(t.dashboard.states_of("src/b.src").len(), consume_passes);
    Ok(())
}

#[test]
fn deleting_the_producer_source_revokes_without_replacement() -> TestResult {
    init_tracing();
    let mut t = cascade_driver()?;
    t.run_to_idle()?;

    t.mock.remove_file(Path::new("src/a.src"))?;
    t.source_changed("src/a.src")?;

    assert!(t.driver.is_idle());
    // No provider is left for the tag and no dangling table rows remain.
    assert!(t.driver.providers_for(&Tag::new("tag:p")).is_empty());
    let rows = t.driver.dependency_rows_for_tag(&Tag::new("tag:p"));
    assert_eq!(rows, vec![("src/b.src".to_string(), None)]);
    // Only b.src is still provisioned.
    assert_eq!(t.driver.provision_count(), 1);
    Ok(())
}

#[test]
fn new_preferred_provider_resets_the_consumer() -> TestResult {
    init_tracing();
    let mut t = TestDriver::new(&[("src/dir2/foo.h", "h2"), ("src/dir1/bar.c", "c")], 4)?;

    t.driver.add_action_factory(Arc::new(StubFactory::new(
        vec![Tag::default_tag()],
        |_tag, file| {
            let name = file.canonical_name();
            if name.ends_with(".h") {
                Some(Box::new(StubAction::new("scan-header", |ctx| {
                    let src = ctx.source()?;
                    ctx.provide(&src, vec![Tag::new("hdr:foo")])?;
                    ctx.passed()?;
                    Ok(None)
                })) as Box<dyn Action>)
            } else if name.ends_with(".c") {
                Some(Box::new(StubAction::new("compile", |ctx| {
                    ctx.find_provider(&Tag::new("hdr:foo"))?;
                    ctx.passed()?;
                    Ok(None)
                })) as Box<dyn Action>)
            } else {
                None
            }
        },
    )));
    t.run_to_idle()?;

    let rows = t.driver.dependency_rows_for_tag(&Tag::new("hdr:foo"));
    assert_eq!(
        rows,
        vec![("src/dir1/bar.c".to_string(), Some("src/dir2/foo.h".to_string()))]
    );

    // A new header appears that shares more of the consumer's path: the
    // consumer must be reset and re-resolve.
    t.mock.add_file("src/dir1/foo.h", "h1");
    t.source_changed("src/dir1/foo.h")?;

    assert!(t.driver.is_idle());
    let rows = t.driver.dependency_rows_for_tag(&Tag::new("hdr:foo"));
    assert_eq!(
        rows,
        vec![("src/dir1/bar.c".to_string(), Some("src/dir1/foo.h".to_string()))]
    );
    Ok(())
}

trait BegunCount {
    fn count_begun(&self, label: &str) -> usize;
}

impl BegunCount for TestDriver {
    fn count_begun(&self, label: &str) -> usize {
        self.dashboard
            .begun_labels()
            .iter()
            .filter(|l| *l == label)
            .count()
    }
}
