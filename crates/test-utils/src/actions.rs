// crates/test-utils/src/actions.rs

use tagforge::action::{Action, ActionFactory, RunningAction};
use tagforge::engine::BuildContext;
use tagforge::fs::BuildFile;
use tagforge::tags::Tag;

type StartFn =
    dyn FnMut(&mut BuildContext<'_>) -> anyhow::Result<Option<Box<dyn RunningAction>>>;

/// An action whose behaviour is a closure.
pub struct StubAction {
    verb: String,
    silent: bool,
    start: Box<StartFn>,
}

impl StubAction {
    pub fn new<F>(verb: &str, start: F) -> Self
    where
        F: FnMut(&mut BuildContext<'_>) -> anyhow::Result<Option<Box<dyn RunningAction>>>
            + 'static,
    {
        Self {
            verb: verb.to_string(),
            silent: false,
            start: Box::new(start),
        }
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

impl Action for StubAction {
    fn verb(&self) -> &str {
        &self.verb
    }

    fn is_silent(&self) -> bool {
        self.silent
    }

    fn start(
        &mut self,
        ctx: &mut BuildContext<'_>,
    ) -> anyhow::Result<Option<Box<dyn RunningAction>>> {
        (self.start)(ctx)
    }
}

type MakeFn = dyn Fn(&Tag, &BuildFile) -> Option<Box<dyn Action>>;

/// A factory whose trigger tags and construction logic are given inline.
pub struct StubFactory {
    triggers: Vec<Tag>,
    make: Box<MakeFn>,
}

impl StubFactory {
    pub fn new<F>(triggers: Vec<Tag>, make: F) -> Self
    where
        F: Fn(&Tag, &BuildFile) -> Option<Box<dyn Action>> + 'static,
    {
        Self {
            triggers,
            make: Box::new(make),
        }
    }
}

impl ActionFactory for StubFactory {
    fn trigger_tags(&self) -> Vec<Tag> {
        self.triggers.clone()
    }

    fn try_make_action(&self, tag: &Tag, file: &BuildFile) -> Option<Box<dyn Action>> {
        (self.make)(tag, file)
    }
}
