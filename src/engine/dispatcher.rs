//! Step dispatch
//!
//! Runs an expanded step list in order. The engine handles its own actions
//! (`setState`, waits, pauses, `runDemoById`); everything else goes to the
//! registered effectors. A failing effector never stops the run.
//!
//! `waitForInput` and `pause` suspend the run: the dispatcher hands back a
//! [`Suspension`] holding the remaining steps, which [`StepDispatcher::resume`]
//! picks up again.

use crate::effectors::{Effect, EffectorRegistry, Finished};
use crate::engine::Collaborators;
use crate::engine::variables::{
    VariableResolver, VariableSet, has_volatile_placeholders, record_script_output,
    record_state, substitute,
};
use crate::host::Notice;
use crate::step::{Action, Step};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Wait used by `waitForTimeout` steps without a timeout
pub const DEFAULT_WAIT_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Completed,
    /// Stopped at a `waitForInput` or `pause` step
    Suspended {
        at: usize,
        message: Option<String>,
    },
}

/// A step whose effect failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub index: usize,
    pub action: String,
    pub message: String,
}

/// What a run did
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunReport {
    pub file_path: String,
    pub demo_idx: usize,
    pub demo_title: String,
    pub status: RunStatus,
    pub executed: usize,
    pub skipped: usize,
    pub failures: Vec<StepFailure>,
    /// Demo ids requested by `runDemoById` steps, in order
    pub follow_ups: Vec<String>,
}

impl RunReport {
    pub fn new(file_path: impl Into<String>, demo_idx: usize, demo_title: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            demo_idx,
            demo_title: demo_title.into(),
            ..Self::default()
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self.status, RunStatus::Suspended { .. })
    }
}

/// Resume token of a suspended run
#[derive(Debug, Clone)]
pub struct Suspension {
    pub steps: Vec<Step>,
    pub next_index: usize,
    pub variables: VariableSet,
    pub report: RunReport,
}

/// Result of dispatching until the end or the next suspension point
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub report: RunReport,
    pub suspension: Option<Suspension>,
}

pub struct StepDispatcher<'a> {
    effectors: &'a mut EffectorRegistry,
    command_timeout: Duration,
}

impl<'a> StepDispatcher<'a> {
    pub fn new(effectors: &'a mut EffectorRegistry, command_timeout: Duration) -> Self {
        Self {
            effectors,
            command_timeout,
        }
    }

    pub fn run(
        &mut self,
        steps: Vec<Step>,
        variables: VariableSet,
        report: RunReport,
        collab: &mut Collaborators<'_>,
    ) -> Dispatched {
        self.run_from(
            Suspension {
                steps,
                next_index: 0,
                variables,
                report,
            },
            collab,
        )
    }

    /// Continue a suspended run after its suspension point
    pub fn resume(&mut self, suspension: Suspension, collab: &mut Collaborators<'_>) -> Dispatched {
        info!(
            "Resuming \"{}\" at step {}",
            suspension.report.demo_title, suspension.next_index
        );
        let mut suspension = suspension;
        suspension.report.status = RunStatus::Completed;
        self.run_from(suspension, collab)
    }

    fn run_from(&mut self, state: Suspension, collab: &mut Collaborators<'_>) -> Dispatched {
        let Suspension {
            steps,
            next_index,
            mut variables,
            mut report,
        } = state;

        for index in next_index..steps.len() {
            if steps[index].disabled {
                debug!("Step {} ({}) is disabled", index, steps[index].tag());
                report.skipped += 1;
                continue;
            }

            let step = match refresh(&steps[index], &mut variables, collab) {
                Ok(step) => step,
                Err(message) => {
                    fail(&mut report, collab, index, steps[index].tag(), message);
                    continue;
                }
            };

            let Some(action) = step.action() else {
                warn!("Skipping unrecognized step {} ({})", index, step.tag());
                collab
                    .observer
                    .notify(&Notice::warning(format!("Unknown action \"{}\" skipped", step.tag())));
                report.skipped += 1;
                continue;
            };

            match action {
                Action::WaitForInput { message } => {
                    report.executed += 1;
                    return suspend(steps, index, message.clone(), variables, report);
                }
                Action::Pause => {
                    report.executed += 1;
                    return suspend(steps, index, None, variables, report);
                }
                Action::SetState { state } => {
                    match record_state(&mut *collab.store, &state.key, &state.value) {
                        Ok(name) => {
                            debug!("{} = {}", name, state.value);
                            variables.insert(name, state.value.clone());
                            report.executed += 1;
                        }
                        Err(e) => fail(&mut report, collab, index, step.tag(), e.to_string()),
                    }
                }
                Action::WaitForTimeout { timeout } => {
                    let ms = timeout.unwrap_or(DEFAULT_WAIT_MS);
                    debug!("Waiting {}ms", ms);
                    std::thread::sleep(Duration::from_millis(ms));
                    report.executed += 1;
                }
                Action::RunDemoById { id } => {
                    debug!("Queued demo {} to run next", id);
                    report.follow_ups.push(id.clone());
                    report.executed += 1;
                }
                Action::Snippet { content_path, .. } => {
                    warn!("Nested snippet {} is not expanded, skipping", content_path);
                    report.skipped += 1;
                }
                other => self.apply(index, other, &mut variables, &mut report, collab),
            }
        }

        info!(
            "Finished \"{}\": {} executed, {} skipped, {} failed",
            report.demo_title,
            report.executed,
            report.skipped,
            report.failures.len()
        );
        Dispatched {
            report,
            suspension: None,
        }
    }

    fn apply(
        &mut self,
        index: usize,
        action: &Action,
        variables: &mut VariableSet,
        report: &mut RunReport,
        collab: &mut Collaborators<'_>,
    ) {
        let tag = action.tag();
        let Some(effector) = self.effectors.get_mut(action.kind()) else {
            warn!("No effector handles {}, skipping step {}", tag, index);
            report.skipped += 1;
            return;
        };

        let output = match effector.apply(action) {
            Ok(Effect::Done) => None,
            Ok(Effect::Output(text)) => Some(text),
            Ok(Effect::Pending(completion)) => match completion.wait(self.command_timeout) {
                Finished::Output(text) => Some(text),
                Finished::Failed(message) => {
                    fail(report, collab, index, tag, message);
                    return;
                }
                Finished::TimedOut => {
                    warn!(
                        "{} still running after {}ms, continuing",
                        tag,
                        self.command_timeout.as_millis()
                    );
                    None
                }
                Finished::Abandoned => {
                    warn!("{} ended without reporting back", tag);
                    None
                }
            },
            Err(e) => {
                fail(report, collab, index, tag, format!("{:#}", e));
                return;
            }
        };

        report.executed += 1;
        if let (Action::ExecuteScript { id, .. }, Some(text)) = (action, output) {
            match record_script_output(&mut *collab.store, id, &text) {
                Ok(name) => {
                    debug!("{} captured ({} bytes)", name, text.len());
                    variables.insert(name, text);
                }
                Err(e) => fail(report, collab, index, tag, e.to_string()),
            }
        }
    }
}

fn suspend(
    steps: Vec<Step>,
    index: usize,
    message: Option<String>,
    variables: VariableSet,
    report: RunReport,
) -> Dispatched {
    info!("Run suspended at step {}", index);
    let mut report = report;
    report.status = RunStatus::Suspended { at: index, message };
    Dispatched {
        report: report.clone(),
        suspension: Some(Suspension {
            steps,
            next_index: index + 1,
            variables,
            report,
        }),
    }
}

fn fail(
    report: &mut RunReport,
    collab: &mut Collaborators<'_>,
    index: usize,
    action: String,
    message: String,
) {
    error!("Step {} ({}) failed: {}", index, action, message);
    collab
        .observer
        .notify(&Notice::error(format!("{} failed: {}", action, message)));
    report.failures.push(StepFailure {
        index,
        action,
        message,
    });
}

/// The step to execute: re-substituted with a fresh variable set when it
/// still references values that earlier steps may have produced.
fn refresh(
    step: &Step,
    variables: &mut VariableSet,
    collab: &mut Collaborators<'_>,
) -> Result<Step, String> {
    let text = serde_json::to_string(step).map_err(|e| e.to_string())?;
    if !has_volatile_placeholders(&text) {
        return Ok(step.clone());
    }

    let mut fresh = VariableResolver::new(&*collab.store, collab.source, collab.clipboard).resolve();
    fresh.keep_input_from(variables);
    *variables = fresh;

    let substituted = substitute(&text, variables, true);
    debug!("Step re-resolved: {}", substituted);
    serde_json::from_str(&substituted)
        .map_err(|e| format!("step no longer parses after substitution: {}", e))
}
