//! Lifecycle hooks around builder stages
//!
//! Hooks take no arguments and return nothing but success or failure. Each
//! builder stage fires its `Before` hooks, performs its work, then fires its
//! `After` hooks. What happens when a hook fails is decided by the
//! [`HookFailurePolicy`].

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fmt;
use std::thread::{self, ThreadId};
use thiserror::Error;
use tracing::{debug, warn};

/// A builder stage that hooks can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Construct,
    AddNamespace,
    AddInherit,
    AddField,
    AddProperty,
    AddMethod,
    AddConstructor,
    CreateInstance,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Construct => "construct",
            Stage::AddNamespace => "add-namespace",
            Stage::AddInherit => "add-inherit",
            Stage::AddField => "add-field",
            Stage::AddProperty => "add-property",
            Stage::AddMethod => "add-method",
            Stage::AddConstructor => "add-constructor",
            Stage::CreateInstance => "create-instance",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Before,
    After,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Before => f.write_str("before"),
            Phase::After => f.write_str("after"),
        }
    }
}

fn hook_point(point: &Option<(Stage, Phase)>) -> String {
    match point {
        Some((stage, phase)) => format!("{} {}", phase, stage),
        None => "once".to_string(),
    }
}

/// Failure reported by a hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} hook failed: {message}", hook_point(.point))]
pub struct HookError {
    /// Where the hook was registered; `None` for the once-per-process hook
    pub point: Option<(Stage, Phase)>,
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            point: None,
            message: message.into(),
        }
    }

    fn at(mut self, point: Option<(Stage, Phase)>) -> Self {
        self.point = point;
        self
    }
}

/// What a failing hook does to the stage that fired it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookFailurePolicy {
    /// Abort the stage and return the error
    #[default]
    Propagate,
    /// Log and record the error, then continue
    Report,
}

/// A registered hook.
pub type Hook = Box<dyn Fn() -> Result<(), HookError> + Send + Sync>;

#[derive(Debug, Default)]
enum GateState {
    #[default]
    Open,
    Running(ThreadId),
    Closed,
}

/// Process-wide gate for the run-once hook. Closes only after the hook
/// succeeds, so a failed attempt is retried by the next builder.
///
/// Builders on other threads wait while the hook runs. A builder created
/// from inside the hook on the same thread gets an error instead.
#[derive(Debug, Default)]
pub struct OnceGate {
    state: Mutex<GateState>,
    finished: Condvar,
}

/// Leaves the running state when the hook returns or unwinds.
struct RunningHook<'a> {
    gate: &'a OnceGate,
    succeeded: bool,
}

impl Drop for RunningHook<'_> {
    fn drop(&mut self) {
        *self.gate.state.lock() = if self.succeeded {
            GateState::Closed
        } else {
            GateState::Open
        };
        self.gate.finished.notify_all();
    }
}

impl OnceGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.state.lock(), GateState::Closed)
    }

    /// Run `hook` if the gate is open. Returns whether it ran successfully.
    pub fn run(&self, hook: impl FnOnce() -> Result<(), HookError>) -> Result<bool, HookError> {
        let current = thread::current().id();
        let mut state = self.state.lock();
        loop {
            match *state {
                GateState::Closed => return Ok(false),
                GateState::Open => break,
                GateState::Running(owner) if owner == current => {
                    return Err(HookError::new("once hook re-entered while it is still running"));
                }
                GateState::Running(_) => self.finished.wait(&mut state),
            }
        }
        *state = GateState::Running(current);
        drop(state);

        let mut running = RunningHook {
            gate: self,
            succeeded: false,
        };
        hook()?;
        running.succeeded = true;
        Ok(true)
    }
}

/// Hooks registered on one builder.
#[derive(Default)]
pub struct LifecycleHooks {
    hooks: FxHashMap<(Stage, Phase), Vec<Hook>>,
    once: Option<Hook>,
    policy: HookFailurePolicy,
    reported: Vec<HookError>,
}

impl LifecycleHooks {
    pub fn new(policy: HookFailurePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> HookFailurePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: HookFailurePolicy) {
        self.policy = policy;
    }

    /// Register a hook. Hooks at the same point fire in registration order.
    pub fn on<F>(&mut self, stage: Stage, phase: Phase, hook: F) -> &mut Self
    where
        F: Fn() -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks.entry((stage, phase)).or_default().push(Box::new(hook));
        self
    }

    pub fn before<F>(&mut self, stage: Stage, hook: F) -> &mut Self
    where
        F: Fn() -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.on(stage, Phase::Before, hook)
    }

    pub fn after<F>(&mut self, stage: Stage, hook: F) -> &mut Self
    where
        F: Fn() -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.on(stage, Phase::After, hook)
    }

    /// Register the hook that runs once per process, before the first type
    /// model is constructed. Replaces any earlier once hook.
    pub fn once<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn() -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.once = Some(Box::new(hook));
        self
    }

    pub fn has_once(&self) -> bool {
        self.once.is_some()
    }

    pub fn count(&self, stage: Stage, phase: Phase) -> usize {
        self.hooks.get(&(stage, phase)).map_or(0, Vec::len)
    }

    /// Failures recorded under [`HookFailurePolicy::Report`].
    pub fn reported(&self) -> &[HookError] {
        &self.reported
    }

    /// Fire every hook registered at `(stage, phase)`.
    pub fn fire(&mut self, stage: Stage, phase: Phase) -> Result<(), HookError> {
        let Some(hooks) = self.hooks.get(&(stage, phase)) else {
            return Ok(());
        };
        debug!(%stage, %phase, count = hooks.len(), "firing hooks");

        let mut failures = Vec::new();
        for hook in hooks {
            if let Err(error) = hook() {
                let error = error.at(Some((stage, phase)));
                match self.policy {
                    HookFailurePolicy::Propagate => return Err(error),
                    HookFailurePolicy::Report => failures.push(error),
                }
            }
        }
        for error in failures {
            self.report(error);
        }
        Ok(())
    }

    /// Run the once hook through `gate` if one is registered.
    pub fn fire_once(&mut self, gate: &OnceGate) -> Result<(), HookError> {
        let Some(hook) = &self.once else {
            return Ok(());
        };
        match gate.run(hook) {
            Ok(ran) => {
                if ran {
                    debug!("once hook completed");
                }
                Ok(())
            }
            Err(error) => {
                let error = error.at(None);
                match self.policy {
                    HookFailurePolicy::Propagate => Err(error),
                    HookFailurePolicy::Report => {
                        self.report(error);
                        Ok(())
                    }
                }
            }
        }
    }

    fn report(&mut self, error: HookError) {
        warn!(%error, "hook failed; continuing");
        self.reported.push(error);
    }
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut points: Vec<String> = self
            .hooks
            .iter()
            .map(|((stage, phase), hooks)| format!("{} {} x{}", phase, stage, hooks.len()))
            .collect();
        points.sort();
        f.debug_struct("LifecycleHooks")
            .field("hooks", &points)
            .field("once", &self.once.is_some())
            .field("policy", &self.policy)
            .field("reported", &self.reported)
            .finish()
    }
}
