// src/engine/driver.rs

//! The orchestrator: owns the fact tables, the action arena, and the three
//! owning queues, and reacts to [`DriverEvent`]s.
//!
//! Every action driver is owned by exactly one of `pending_actions`,
//! `active_actions`, or `completed_actions` (membership is by id; the arena
//! holds the records). Moves between those three are the only legal
//! ownership transitions. Tables hold id copies only, so revoking a
//! provision is an arena removal plus table filtering.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info};

use crate::action::{Action, ActionFactory};
use crate::dashboard::{Dashboard, TaskState, Verbosity};
use crate::errors::{DriverError, Result};
use crate::fs::BuildFile;
use crate::tags::{
    ActionId, DependencyTable, Provision, ProvisionId, Tag, TagTable,
};

use super::action_driver::{ActionDriver, ActionState, BuildContext, Outcome};
use super::{prefer, ActionHandle, ActionSignal, DriverEvent};

/// Per-outcome counts over every action the driver knows about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub passed: usize,
    pub done: usize,
    pub failed: usize,
    pub pending: usize,
    pub running: usize,
}

pub struct Driver {
    dashboard: Box<dyn Dashboard>,
    src: BuildFile,
    tmp: BuildFile,
    max_concurrent_actions: usize,
    events: UnboundedSender<DriverEvent>,

    next_action_id: u64,
    next_provision_id: u64,
    actions: HashMap<ActionId, ActionDriver>,
    provisions: HashMap<ProvisionId, Provision>,

    tag_table: TagTable,
    dependency_table: DependencyTable,
    factories: Vec<Arc<dyn ActionFactory>>,
    triggers: HashMap<Tag, Vec<usize>>,
    actions_by_trigger: HashMap<ProvisionId, Vec<ActionId>>,

    pending_actions: VecDeque<ActionId>,
    active_actions: HashSet<ActionId>,
    completed_actions: HashSet<ActionId>,

    /// Provisions owned by the driver itself (scanned sources).
    root_provisions: Vec<ProvisionId>,
}

impl Driver {
    pub fn new(
        dashboard: Box<dyn Dashboard>,
        src: BuildFile,
        tmp: BuildFile,
        max_concurrent_actions: usize,
        events: UnboundedSender<DriverEvent>,
    ) -> Result<Self> {
        if max_concurrent_actions == 0 {
            return Err(DriverError::ConfigError(
                "max_concurrent_actions must be at least 1".to_string(),
            ));
        }
        if !tmp.exists() {
            tmp.create_directory()?;
        }
        Ok(Self {
            dashboard,
            src,
            tmp,
            max_concurrent_actions,
            events,
            next_action_id: 0,
            next_provision_id: 0,
            actions: HashMap::new(),
            provisions: HashMap::new(),
            tag_table: TagTable::new(),
            dependency_table: DependencyTable::new(),
            factories: Vec::new(),
            triggers: HashMap::new(),
            actions_by_trigger: HashMap::new(),
            pending_actions: VecDeque::new(),
            active_actions: HashSet::new(),
            completed_actions: HashSet::new(),
            root_provisions: Vec::new(),
        })
    }

    /// Register a factory's trigger tags. Only provisions registered after
    /// this point will fire it; use [`BuildContext::add_action_type`] from a
    /// running action to also rescan existing providers.
    pub fn add_action_factory(&mut self, factory: Arc<dyn ActionFactory>) {
        self.register_factory(factory);
    }

    pub(crate) fn register_factory(&mut self, factory: Arc<dyn ActionFactory>) -> usize {
        let idx = self.factories.len();
        for tag in factory.trigger_tags() {
            self.triggers.entry(tag).or_default().push(idx);
        }
        self.factories.push(factory);
        idx
    }

    /// Scan the source tree, publishing every file with the default tag, and
    /// start pumping the pending queue.
    pub fn start(&mut self) -> Result<()> {
        if !self.src.exists() {
            return Err(DriverError::ConfigError(format!(
                "source root {} does not exist",
                self.src.canonical_name()
            )));
        }
        self.scan_source_tree()?;
        self.start_some_actions();
        Ok(())
    }

    /// Handle one event. This is the single mutation point for all driver
    /// state; the event loop in [`super::runtime`] feeds it.
    pub fn dispatch(&mut self, event: DriverEvent) -> Result<()> {
        debug!(?event, "driver event");
        match event {
            DriverEvent::StartAction { action, epoch } => self.on_start_action(action, epoch),
            DriverEvent::ActionDone { action, epoch } => self.on_action_done(action, epoch),
            DriverEvent::Signal {
                action,
                epoch,
                signal,
            } => self.on_signal(action, epoch, signal),
            DriverEvent::SourceChanged { name } => {
                self.invalidate_source(&name)?;
                self.start_some_actions();
                Ok(())
            }
        }
    }

    // ---- scanning & provisioning -------------------------------------------------------

    fn scan_source_tree(&mut self) -> Result<()> {
        let mut queue = vec![self.src.clone()];
        while let Some(current) = queue.pop() {
            if current.is_directory() {
                queue.extend(current.list()?);
            } else {
                let pid = self.new_root_provision(current);
                self.register_provider(pid, vec![Tag::default_tag()])?;
            }
        }
        Ok(())
    }

    fn new_root_provision(&mut self, file: BuildFile) -> ProvisionId {
        let pid = self.alloc_provision(file);
        self.root_provisions.push(pid);
        pid
    }

    fn alloc_provision(&mut self, file: BuildFile) -> ProvisionId {
        let pid = ProvisionId(self.next_provision_id);
        self.next_provision_id += 1;
        self.provisions.insert(pid, Provision::new(file));
        pid
    }

    /// Publish a provision under `tags` (plus the exact-file tag for its
    /// canonical name). For each tag, dependents whose preferred provider
    /// changed are reset before triggers fire, so newly spawned actions
    /// observe a consistent view.
    pub(crate) fn register_provider(&mut self, pid: ProvisionId, tags: Vec<Tag>) -> Result<()> {
        let file = match self.provisions.get(&pid) {
            Some(p) => p.file.clone(),
            None => return Ok(()),
        };
        let hash = file.content_hash()?;
        if let Some(p) = self.provisions.get_mut(&pid) {
            p.content_hash = Some(hash);
        }

        let mut effective = tags;
        let file_tag = Tag::from_file(&file.canonical_name());
        if !effective.contains(&file_tag) {
            effective.push(file_tag);
        }

        for tag in effective {
            // The cascade below can revoke this very provision (its producer
            // may be reset when its own output becomes the preferred
            // provider of something it consumed earlier).
            if !self.provisions.contains_key(&pid) {
                break;
            }
            self.tag_table.add(tag.clone(), pid);
            self.reset_dependent_actions(&tag);
            self.fire_triggers(&tag, pid);
        }
        Ok(())
    }

    /// Reset every action whose recorded lookup of `tag` would resolve
    /// differently now.
    fn reset_dependent_actions(&mut self, tag: &Tag) {
        // Snapshot first: reset() rewrites the table being walked.
        let rows = self.dependency_table.rows_for_tag(tag);
        let mut to_reset = Vec::new();
        for row in rows {
            let preferred = self.choose_preferred_provider(row.action, tag);
            if preferred != row.provision {
                to_reset.push(row.action);
            }
        }
        for aid in to_reset {
            self.reset(aid);
        }
    }

    fn fire_triggers(&mut self, tag: &Tag, pid: ProvisionId) {
        let file = match self.provisions.get(&pid) {
            Some(p) => p.file.clone(),
            None => return,
        };
        let factory_idxs = self.triggers.get(tag).cloned().unwrap_or_default();
        for idx in factory_idxs {
            let factory = self.factories[idx].clone();
            if let Some(action) = factory.try_make_action(tag, &file) {
                self.queue_new_action(action, pid);
            }
        }
    }

    pub(crate) fn rescan_for_new_factory(&mut self, idx: usize) {
        let factory = self.factories[idx].clone();
        for tag in factory.trigger_tags() {
            let pids = self.tag_table.providers(&tag).to_vec();
            for pid in pids {
                let file = match self.provisions.get(&pid) {
                    Some(p) => p.file.clone(),
                    None => continue,
                };
                if let Some(action) = factory.try_make_action(&tag, &file) {
                    self.queue_new_action(action, pid);
                }
            }
        }
    }

    fn queue_new_action(&mut self, action: Box<dyn Action>, pid: ProvisionId) {
        let (file, hash) = match self.provisions.get(&pid) {
            Some(p) => (p.file.clone(), p.content_hash.clone().unwrap_or_default()),
            None => return,
        };
        let verbosity = if action.is_silent() {
            Verbosity::Silent
        } else {
            Verbosity::Normal
        };
        let task = self
            .dashboard
            .begin_task(action.verb(), &file.canonical_name(), verbosity);

        let id = ActionId(self.next_action_id);
        self.next_action_id += 1;
        debug!(action = ?id, src = %file.canonical_name(), "queueing triggered action");

        self.actions
            .insert(id, ActionDriver::new(action, file, hash, task));
        self.actions_by_trigger.entry(pid).or_default().push(id);
        // Front of the queue: run freshly triggered work next to the action
        // that produced its input.
        self.pending_actions.push_front(id);
    }

    // ---- pumping & the action lifecycle ------------------------------------------------

    pub(crate) fn start_some_actions(&mut self) {
        while self.active_actions.len() < self.max_concurrent_actions {
            let Some(aid) = self.pending_actions.pop_front() else {
                break;
            };
            self.active_actions.insert(aid);
            self.start_action(aid);
        }
    }

    fn start_action(&mut self, aid: ActionId) {
        let epoch = {
            let Some(ad) = self.actions.get_mut(&aid) else {
                error!(?aid, "pending queue referenced an unknown action");
                self.active_actions.remove(&aid);
                return;
            };
            debug_assert!(matches!(ad.state, ActionState::Pending));
            debug!(
                action = ?aid,
                src = %ad.src.canonical_name(),
                src_hash = %ad.src_hash,
                "starting action"
            );
            ad.state = ActionState::Running {
                outcome: None,
                op: None,
            };
            ad.task.set_state(TaskState::Running);
            ad.epoch
        };
        // The action itself runs from the event loop, never synchronously.
        let _ = self.events.send(DriverEvent::StartAction { action: aid, epoch });
    }

    fn on_start_action(&mut self, aid: ActionId, epoch: u64) -> Result<()> {
        let mut act = {
            let Some(ad) = self.actions.get_mut(&aid) else {
                return Ok(());
            };
            if ad.epoch != epoch || !ad.is_active() {
                return Ok(());
            }
            match ad.action.take() {
                Some(a) => a,
                None => {
                    error!(?aid, "action object missing at start");
                    return Ok(());
                }
            }
        };

        let (result, deferred) = {
            let mut ctx = BuildContext::new(self, aid);
            let result = act.start(&mut ctx);
            (result, ctx.took_handle())
        };

        if let Some(ad) = self.actions.get_mut(&aid) {
            ad.action = Some(act);
        }

        match result {
            Err(e) => {
                self.fail_uncaught(aid, &format!("uncaught error: {e:#}\n"))?;
                self.start_some_actions();
            }
            Ok(op) => {
                let conclude = {
                    let Some(ad) = self.actions.get_mut(&aid) else {
                        return Ok(());
                    };
                    match &mut ad.state {
                        ActionState::Running { outcome, op: slot } => {
                            *slot = op;
                            outcome.is_none() && slot.is_none() && !deferred
                        }
                        _ => false,
                    }
                };
                if conclude {
                    // Ran to completion with no verdict and no outstanding
                    // work: no more events.
                    self.finish_if_unsettled(aid);
                }
            }
        }
        Ok(())
    }

    fn on_action_done(&mut self, aid: ActionId, epoch: u64) -> Result<()> {
        {
            let Some(ad) = self.actions.get(&aid) else {
                return Ok(());
            };
            if ad.epoch != epoch || !ad.is_active() {
                return Ok(());
            }
            if ad.outcome().is_none() {
                error!(?aid, "done event for an action without a verdict");
                return Ok(());
            }
        }
        self.returned(aid)?;
        self.start_some_actions();
        Ok(())
    }

    fn on_signal(&mut self, aid: ActionId, epoch: u64, signal: ActionSignal) -> Result<()> {
        {
            let Some(ad) = self.actions.get(&aid) else {
                return Ok(());
            };
            if ad.epoch != epoch || !ad.is_active() {
                return Ok(());
            }
        }
        match signal {
            ActionSignal::Passed => {
                self.signal_passed(aid);
                Ok(())
            }
            ActionSignal::Failed { message } => {
                if let Some(msg) = message {
                    self.task_output(aid, &msg);
                }
                match self.signal_failed(aid) {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        // Misuse reported from deferred work; the action is
                        // failed the same way a thrown error would be.
                        self.fail_uncaught(aid, &format!("uncaught error: {e}\n"))?;
                        self.start_some_actions();
                        Ok(())
                    }
                }
            }
            ActionSignal::Finished => {
                self.finish_if_unsettled(aid);
                Ok(())
            }
            ActionSignal::Log(text) => {
                self.task_output(aid, &text);
                Ok(())
            }
        }
    }

    pub(crate) fn signal_passed(&mut self, aid: ActionId) {
        let enqueue = {
            let Some(ad) = self.actions.get_mut(&aid) else {
                return;
            };
            match &mut ad.state {
                ActionState::Running { outcome, .. } => match *outcome {
                    // Ignore passed() after failed().
                    Some(Outcome::Failed) => return,
                    Some(_) => {
                        // The done event is already queued; just replace the
                        // verdict it will see.
                        *outcome = Some(Outcome::Passed);
                        false
                    }
                    None => {
                        *outcome = Some(Outcome::Passed);
                        true
                    }
                },
                _ => return,
            }
        };
        if enqueue {
            self.enqueue_done(aid);
        }
    }

    pub(crate) fn signal_failed(&mut self, aid: ActionId) -> Result<()> {
        let enqueue = {
            let Some(ad) = self.actions.get_mut(&aid) else {
                return Ok(());
            };
            match &mut ad.state {
                ActionState::Running { outcome, .. } => match *outcome {
                    // Ignore redundant call to failed().
                    Some(Outcome::Failed) => return Ok(()),
                    Some(Outcome::Done) => return Err(DriverError::FailedAfterDone),
                    Some(Outcome::Passed) => return Err(DriverError::FailedAfterPassed),
                    None => {
                        *outcome = Some(Outcome::Failed);
                        true
                    }
                },
                _ => return Err(DriverError::ActionNotRunning),
            }
        };
        if enqueue {
            self.enqueue_done(aid);
        }
        Ok(())
    }

    fn finish_if_unsettled(&mut self, aid: ActionId) {
        let enqueue = {
            let Some(ad) = self.actions.get_mut(&aid) else {
                return;
            };
            match &mut ad.state {
                ActionState::Running { outcome: outcome @ None, .. } => {
                    *outcome = Some(Outcome::Done);
                    true
                }
                _ => false,
            }
        };
        if enqueue {
            self.enqueue_done(aid);
        }
    }

    /// Fail the action the way a thrown error does: the verdict becomes
    /// Failed regardless of anything signalled earlier, queued events are
    /// cancelled, and the end-of-run bookkeeping runs synchronously.
    fn fail_uncaught(&mut self, aid: ActionId, message: &str) -> Result<()> {
        {
            let Some(ad) = self.actions.get_mut(&aid) else {
                return Ok(());
            };
            if !ad.is_active() {
                return Ok(());
            }
            ad.task.add_output(message);
            ad.epoch += 1;
            if let ActionState::Running { outcome, .. } = &mut ad.state {
                *outcome = Some(Outcome::Failed);
            }
        }
        self.returned(aid)
    }

    fn enqueue_done(&self, aid: ActionId) {
        if let Some(ad) = self.actions.get(&aid) {
            let _ = self.events.send(DriverEvent::ActionDone {
                action: aid,
                epoch: ad.epoch,
            });
        }
    }

    /// End-of-run bookkeeping: cancel leftover work, move the action into
    /// the completed set, and either discard (failure) or publish (success)
    /// its provisions.
    fn returned(&mut self, aid: ActionId) -> Result<()> {
        let outcome = {
            let Some(ad) = self.actions.get_mut(&aid) else {
                error!(?aid, "returned() on an unknown action");
                return Ok(());
            };
            let outcome = match &ad.state {
                ActionState::Running {
                    outcome: Some(o), ..
                } => *o,
                _ => {
                    error!(?aid, "returned() on an action that has not finished");
                    return Ok(());
                }
            };
            // Dropping the running op cancels anything still in flight.
            ad.state = ActionState::Completed { outcome };
            outcome
        };

        self.active_actions.remove(&aid);
        self.completed_actions.insert(aid);

        if outcome == Outcome::Failed {
            // Failed, possibly due to missing dependencies. Nothing was
            // published, so dropping the provisions is pure arena cleanup.
            let (pids, _) = self.take_action_provisions(aid);
            for pid in pids {
                self.provisions.remove(&pid);
            }
            if let Some(ad) = self.actions.get_mut(&aid) {
                ad.outputs.clear();
                ad.task.set_state(TaskState::Blocked);
            }
        } else {
            self.set_task_state(
                aid,
                if outcome == Outcome::Passed {
                    TaskState::Passed
                } else {
                    TaskState::Done
                },
            );

            let (pids, mut provided) = self.take_action_provisions(aid);
            // Some actions create outputs and then delete them before
            // finishing; those provisions must not be published.
            let mut kept = Vec::new();
            for pid in pids {
                let alive = self
                    .provisions
                    .get(&pid)
                    .map(|p| p.file.exists())
                    .unwrap_or(false);
                if alive {
                    kept.push(pid);
                } else {
                    self.provisions.remove(&pid);
                    provided.remove(&pid);
                }
            }
            if let Some(ad) = self.actions.get_mut(&aid) {
                ad.provisions = kept.clone();
            }
            for pid in kept {
                // A registration earlier in this loop can cascade into a
                // reset of this very action, revoking the rest.
                if !self.provisions.contains_key(&pid) {
                    continue;
                }
                let tags = provided.remove(&pid).unwrap_or_default();
                self.register_provider(pid, tags)?;
            }
        }
        Ok(())
    }

    fn take_action_provisions(
        &mut self,
        aid: ActionId,
    ) -> (Vec<ProvisionId>, HashMap<ProvisionId, Vec<Tag>>) {
        match self.actions.get_mut(&aid) {
            Some(ad) => (
                std::mem::take(&mut ad.provisions),
                std::mem::take(&mut ad.provided_tags),
            ),
            None => (Vec::new(), HashMap::new()),
        }
    }

    // ---- reset propagation -------------------------------------------------------------

    /// Return an action to pending and invalidate everything it produced.
    ///
    /// The state flips to `Pending` before dependents are touched, so a
    /// cascade that loops back into this action is a no-op rather than a
    /// runaway recursion.
    pub(crate) fn reset(&mut self, aid: ActionId) {
        let pids = {
            let Some(ad) = self.actions.get_mut(&aid) else {
                error!(?aid, "reset of an unknown action");
                return;
            };
            if matches!(ad.state, ActionState::Pending) {
                return;
            }
            let was_running = ad.is_active();
            if was_running {
                ad.task.set_state(TaskState::Blocked);
            }
            // Dropping the running op is the cancellation signal; the epoch
            // bump cancels queued events.
            ad.state = ActionState::Pending;
            ad.epoch += 1;
            if was_running {
                if !self.active_actions.remove(&aid) {
                    panic!("running action missing from the active set");
                }
            } else if !self.completed_actions.remove(&aid) {
                panic!("action neither pending, running, nor completed");
            }
            ad.provided_tags.clear();
            ad.outputs.clear();
            std::mem::take(&mut ad.provisions)
        };

        // Back of the queue, before dependents are reset: an action that
        // resets often should neither crowd out fresh work nor run after
        // the actions that depend on it.
        self.pending_actions.push_back(aid);

        for pid in pids {
            self.revoke_provision(pid);
        }

        self.dependency_table.erase_action(aid);
    }

    /// Withdraw a provision from the universe of facts: reset its
    /// dependents, delete the actions it triggered, and erase it from every
    /// table and the arena.
    fn revoke_provision(&mut self, pid: ProvisionId) {
        // Snapshot: each reset below rewrites the dependency table.
        let dependents: Vec<ActionId> = self
            .dependency_table
            .rows_for_provision(pid)
            .into_iter()
            .map(|row| row.action)
            .collect();
        for dep in dependents {
            self.reset(dep);
        }

        // Everything spawned because of this provision must cease to exist.
        let spawned = self.actions_by_trigger.remove(&pid).unwrap_or_default();
        for bid in spawned {
            self.reset(bid);
            // The reset just pushed it onto the back of the pending queue.
            if let Some(pos) = self.pending_actions.iter().rposition(|&x| x == bid) {
                self.pending_actions.remove(pos);
            }
            self.actions.remove(&bid);
        }

        self.tag_table.erase_provision(pid);
        if self.dependency_table.erase_provision(pid) > 0 {
            error!("resetting dependents should have removed this provision from the dependency table");
        }
        self.provisions.remove(&pid);
        self.root_provisions.retain(|&p| p != pid);
    }

    /// React to a source file being added, modified, or deleted. A
    /// modification with an unchanged content hash is ignored.
    pub fn invalidate_source(&mut self, name: &str) -> Result<()> {
        let existing = self
            .root_provisions
            .iter()
            .filter_map(|&pid| self.provisions.get(&pid).map(|p| (pid, p)))
            .find(|(_, p)| p.file.canonical_name() == name)
            .map(|(pid, p)| (pid, p.file.clone(), p.content_hash.clone()));

        match existing {
            Some((pid, file, old_hash)) => {
                if file.exists() {
                    if let Ok(hash) = file.content_hash() {
                        if Some(&hash) == old_hash.as_ref() {
                            debug!(file = %name, "source unchanged; ignoring");
                            return Ok(());
                        }
                    }
                    info!(file = %name, "source changed; re-registering");
                    self.revoke_provision(pid);
                    let new_pid = self.new_root_provision(file);
                    self.register_provider(new_pid, vec![Tag::default_tag()])?;
                } else {
                    info!(file = %name, "source deleted; revoking");
                    self.revoke_provision(pid);
                }
            }
            None => {
                let file = self.src.with_path(name);
                if file.exists() && !file.is_directory() {
                    info!(file = %name, "source added; registering");
                    let pid = self.new_root_provision(file);
                    self.register_provider(pid, vec![Tag::default_tag()])?;
                } else {
                    debug!(file = %name, "source change for an unknown file; ignoring");
                }
            }
        }
        Ok(())
    }

    // ---- provider preference -----------------------------------------------------------

    pub(crate) fn choose_preferred_provider(
        &self,
        aid: ActionId,
        tag: &Tag,
    ) -> Option<ProvisionId> {
        let src_name = self.actions.get(&aid)?.src.canonical_name();
        let candidates: Vec<(ProvisionId, String)> = self
            .tag_table
            .providers(tag)
            .iter()
            .filter_map(|pid| {
                self.provisions
                    .get(pid)
                    .map(|p| (*pid, p.file.canonical_name()))
            })
            .collect();
        prefer::choose_preferred(&src_name, candidates.iter().map(|(_, n)| n.as_str()))
            .map(|i| candidates[i].0)
    }

    // ---- build-context plumbing --------------------------------------------------------

    pub(crate) fn action_is_active(&self, aid: ActionId) -> bool {
        self.actions.get(&aid).map(|a| a.is_active()).unwrap_or(false)
    }

    pub(crate) fn action_source(&self, aid: ActionId) -> Option<BuildFile> {
        self.actions.get(&aid).map(|a| a.src.clone())
    }

    pub(crate) fn find_provider_for(&mut self, aid: ActionId, tag: &Tag) -> Option<BuildFile> {
        let chosen = self.choose_preferred_provider(aid, tag);
        self.dependency_table.add(tag.clone(), aid, chosen);
        chosen.and_then(|pid| self.provisions.get(&pid).map(|p| p.file.clone()))
    }

    pub(crate) fn provide_for(&mut self, aid: ActionId, file: &BuildFile, tags: Vec<Tag>) {
        let existing = {
            let Some(ad) = self.actions.get(&aid) else {
                return;
            };
            ad.provisions.iter().copied().find(|pid| {
                self.provisions
                    .get(pid)
                    .map(|p| p.file == *file)
                    .unwrap_or(false)
            })
        };
        match existing {
            Some(pid) => {
                if let Some(ad) = self.actions.get_mut(&aid) {
                    ad.provided_tags.entry(pid).or_default().extend(tags);
                }
            }
            None => {
                let pid = self.alloc_provision(file.clone());
                if let Some(ad) = self.actions.get_mut(&aid) {
                    ad.provisions.push(pid);
                    ad.provided_tags.insert(pid, tags);
                }
            }
        }
    }

    pub(crate) fn record_output(&mut self, aid: ActionId, file: BuildFile) {
        if let Some(ad) = self.actions.get_mut(&aid) {
            ad.outputs.push(file);
        }
    }

    pub(crate) fn task_output(&mut self, aid: ActionId, text: &str) {
        if let Some(ad) = self.actions.get_mut(&aid) {
            ad.task.add_output(text);
        }
    }

    fn set_task_state(&mut self, aid: ActionId, state: TaskState) {
        if let Some(ad) = self.actions.get_mut(&aid) {
            ad.task.set_state(state);
        }
    }

    pub(crate) fn make_handle(&self, aid: ActionId) -> ActionHandle {
        let epoch = self.actions.get(&aid).map(|a| a.epoch).unwrap_or(0);
        ActionHandle::new(self.events.clone(), aid, epoch)
    }

    pub(crate) fn tmp(&self) -> &BuildFile {
        &self.tmp
    }

    // ---- inspection --------------------------------------------------------------------

    /// No actions waiting and none in flight.
    pub fn is_idle(&self) -> bool {
        self.pending_actions.is_empty() && self.active_actions.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending_actions.len()
    }

    pub fn active_count(&self) -> usize {
        self.active_actions.len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed_actions.len()
    }

    pub fn provision_count(&self) -> usize {
        self.provisions.len()
    }

    pub fn dependency_row_count(&self) -> usize {
        self.dependency_table.row_count()
    }

    /// Files currently providing `tag`, in registration order.
    pub fn providers_for(&self, tag: &Tag) -> Vec<BuildFile> {
        self.tag_table
            .providers(tag)
            .iter()
            .filter_map(|pid| self.provisions.get(pid).map(|p| p.file.clone()))
            .collect()
    }

    /// Recorded lookups of `tag` as (consumer source name, provider name).
    pub fn dependency_rows_for_tag(&self, tag: &Tag) -> Vec<(String, Option<String>)> {
        self.dependency_table
            .rows_for_tag(tag)
            .into_iter()
            .map(|row| {
                let consumer = self
                    .actions
                    .get(&row.action)
                    .map(|a| a.src.canonical_name())
                    .unwrap_or_default();
                let provider = row
                    .provision
                    .and_then(|pid| self.provisions.get(&pid))
                    .map(|p| p.file.canonical_name());
                (consumer, provider)
            })
            .collect()
    }

    pub fn summary(&self) -> BuildSummary {
        let mut summary = BuildSummary::default();
        for ad in self.actions.values() {
            match ad.state {
                ActionState::Pending => summary.pending += 1,
                ActionState::Running { .. } => summary.running += 1,
                ActionState::Completed { outcome } => match outcome {
                    Outcome::Passed => summary.passed += 1,
                    Outcome::Done => summary.done += 1,
                    Outcome::Failed => summary.failed += 1,
                },
            }
        }
        summary
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        // Terminal reporting: anything still blocked at teardown shows as
        // failed.
        for ad in self.actions.values_mut() {
            if matches!(
                ad.state,
                ActionState::Completed {
                    outcome: Outcome::Failed
                }
            ) {
                ad.task.set_state(TaskState::Failed);
            }
        }
    }
}
