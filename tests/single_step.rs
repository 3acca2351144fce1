// tests/single_step.rs

//! One factory, one source, one output.

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

fn compile_factory() -> Arc<StubFactory> {
    Arc::new(StubFactory::new(vec![Tag::default_tag()], |_tag, file| {
        if !file.canonical_name().ends_with(".in") {
            return None;
        }
        Some(Box::new(StubAction::new("compile", |ctx| {
            let input = ctx.find_input("src/a.in")?.expect("scanned input is available");
            let text = input.read_to_string()?;
            let out = ctx.new_output("a.out")?;
            out.write(text.to_uppercase().as_bytes())?;
            ctx.passed()?;
            Ok(None)
        })) as Box<dyn Action>)
    }))
}

#[test]
fn single_step_build() -> TestResult {
    init_tracing();

    let mut t = TestDriver::new(&[("src/a.in", "alpha")], 2)?;
    t.driver.add_action_factory(compile_factory());
    t.run_to_idle()?;

    assert!(t.driver.is_idle());
    assert_eq!(t.dashboard.last_state_of("src/a.in"), Some(TaskState::Passed));

    // Both the source and the output now carry the default tag.
    let providers: Vec<String> = t
        .driver
        .providers_for(&Tag::default_tag())
        .iter()
        .map(|f| f.canonical_name())
        .collect();
    assert!(providers.contains(&"src/a.in".to_string()));
    assert!(providers.contains(&"tmp/a.out".to_string()));

    // Exactly one recorded lookup: the compile action consulted its input.
    let rows = t.driver.dependency_rows_for_tag(&Tag::from_file("src/a.in"));
    assert_eq!(
        rows,
        vec![("src/a.in".to_string(), Some("src/a.in".to_string()))]
    );

    // The output really went through the action.
    assert_eq!(t.mock.read_to_string(Path::new("tmp/a.out"))?, "ALPHA");
    Ok(())
}

#[test]
fn output_is_findable_by_other_actions() -> TestResult {
    init_tracing();

    let mut t = TestDriver::new(&[("src/a.in", "alpha")], 2)?;
    t.driver.add_action_factory(compile_factory());
    // Second factory links anything tagged as the compile output.
    t.driver
        .add_action_factory(Arc::new(StubFactory::new(
            vec![Tag::from_file("tmp/a.out")],
            |_tag, _file| {
                Some(Box::new(StubAction::new("link", |ctx| {
                    let obj = ctx.find_input("tmp/a.out")?.expect("output is published");
                    assert_eq!(obj.read_to_string()?, "ALPHA");
                    ctx.passed()?;
                    Ok(None)
                })) as Box<dyn Action>)
            },
        )));
    t.run_to_idle()?;

    assert_eq!(
        t.dashboard.last_state_of("tmp/a.out"),
        Some(TaskState::Passed)
    );
    let rows = t.driver.dependency_rows_for_tag(&Tag::from_file("tmp/a.out"));
    assert_eq!(
        rows,
        vec![("tmp/a.out".to_string(), Some("tmp/a.out".to_string()))]
    );
    Ok(())
}

#[test]
fn action_without_verdict_completes_as_done() -> TestResult {
    init_tracing();

    let mut t = TestDriver::new(&[("src/a.in", "alpha")], 2)?;
    t.driver
        .add_action_factory(Arc::new(StubFactory::new(
            vec![Tag::default_tag()],
            |_tag, _file| {
                Some(Box::new(StubAction::new("inspect", |ctx| {
                    ctx.log("looked at the file\n")?;
                    Ok(None)
                })) as Box<dyn Action>)
            },
        )));
    t.run_to_idle()?;

    assert_eq!(t.dashboard.last_state_of("src/a.in"), Some(TaskState::Done));
    assert_eq!(t.driver.summary().done, 1);
    assert_eq!(t.dashboard.output_of("src/a.in"), "looked at the file\n");
    Ok(())
}
