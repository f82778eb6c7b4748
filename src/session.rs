//! Paced, cancellable script runs over a shared field.
//!
//! A [`Session`] owns one field. It can be shared between a thread that runs
//! scripts and threads that render or edit the field. At most one script runs
//! at a time; a second [`Session::run`] while one is active is rejected, not
//! queued. Between dispatches the field lock is released, so readers always
//! observe the field at a suspension point.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use crate::error::{ExecutionError, FieldError};
use crate::field::{Field, FieldState, FieldUpdate};
use crate::interpreter::{self, Interpreter, Observer, RunConfig, RunReport};

/// Lifecycle of a session's current or last run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Idle = 0,
    Running = 1,
    /// Last run reached the end of the script.
    Completed = 2,
    /// Last run was stopped through [`Session::cancel`].
    Cancelled = 3,
    /// Last run ended with an error.
    Failed = 4,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Cancelled,
            4 => Self::Failed,
            _ => Self::Idle,
        }
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

/// Cooperative stop signal shared between a run and its controllers.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop and wakes any pending [`sleep`](Self::sleep).
    pub fn cancel(&self) {
        *self.inner.cancelled.lock() = true;
        self.inner.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    pub fn reset(&self) {
        *self.inner.cancelled.lock() = false;
    }

    /// Waits for `duration` or until cancelled. Returns whether the token is cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            if self
                .inner
                .wake
                .wait_until(&mut cancelled, deadline)
                .timed_out()
            {
                break;
            }
        }
        *cancelled
    }
}

/// Leaves the Running state on drop, whichever way the run ends.
struct RunGuard<'a> {
    state: &'a AtomicU8,
    outcome: RunState,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.state.store(self.outcome as u8, Ordering::Release);
    }
}

/// A field plus the machinery to run scripts on it.
pub struct Session {
    field: Mutex<Field>,
    state: AtomicU8,
    cancel: CancelToken,
    interpreter: Interpreter,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Field::default(), RunConfig::default())
    }
}

impl Session {
    pub fn new(field: Field, config: RunConfig) -> Self {
        Self::with_interpreter(field, Interpreter::new(config))
    }

    pub fn with_interpreter(field: Field, interpreter: Interpreter) -> Self {
        Self {
            field: Mutex::new(field),
            state: AtomicU8::new(RunState::Idle as u8),
            cancel: CancelToken::new(),
            interpreter,
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// A handle that can stop the active run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Asks the active run to stop after its current dispatch.
    pub fn cancel(&self) {
        // Checked under the token lock so a run that is just starting cannot clear it.
        let mut cancelled = self.cancel.inner.cancelled.lock();
        if self.state().is_running() {
            *cancelled = true;
            self.cancel.inner.wake.notify_all();
        }
    }

    pub fn snapshot(&self) -> FieldState {
        self.field.lock().state()
    }

    /// Reads the field under its lock.
    pub fn with_field<R>(&self, f: impl FnOnce(&Field) -> R) -> R {
        f(&self.field.lock())
    }

    /// Applies a partial field update. Refused while a script is running.
    pub fn update(&self, update: FieldUpdate) -> Result<(), FieldError> {
        self.edit(|field| field.apply(update))
    }

    /// Resets walls, paint and robot. Refused while a script is running.
    pub fn reset(&self) -> Result<(), FieldError> {
        self.edit(|field| {
            field.reset();
            Ok(())
        })
    }

    /// Runs an arbitrary edit on the field. Refused while a script is running.
    pub fn edit<R>(
        &self,
        f: impl FnOnce(&mut Field) -> Result<R, FieldError>,
    ) -> Result<R, FieldError> {
        let mut field = self.field.lock();
        if self.state().is_running() {
            return Err(FieldError::Busy);
        }
        f(&mut field)
    }

    /// Parses and runs `source`, pausing after every tick.
    ///
    /// Returns [`ExecutionError::AlreadyRunning`] without touching the field if
    /// another run is active.
    pub fn run(
        &self,
        source: &str,
        observer: &mut dyn Observer,
    ) -> Result<RunReport, ExecutionError> {
        let mut guard = {
            let mut cancelled = self.cancel.inner.cancelled.lock();
            let guard = self.begin()?;
            *cancelled = false;
            guard
        };

        let result = self.drive(source, observer);
        guard.outcome = match &result {
            Ok(report) if report.cancelled => RunState::Cancelled,
            Ok(_) => RunState::Completed,
            Err(_) => RunState::Failed,
        };
        match &result {
            Ok(report) => tracing::debug!(
                ticks = report.ticks.len(),
                dispatched = report.dispatched,
                cancelled = report.cancelled,
                "run finished"
            ),
            Err(err) => tracing::debug!(kind = err.kind(), %err, "run failed"),
        }
        result
    }

    fn begin(&self) -> Result<RunGuard<'_>, ExecutionError> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if RunState::from_u8(current).is_running() {
                return Err(ExecutionError::AlreadyRunning);
            }
            match self.state.compare_exchange_weak(
                current,
                RunState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        Ok(RunGuard {
            state: &self.state,
            outcome: RunState::Failed,
        })
    }

    fn drive(
        &self,
        source: &str,
        observer: &mut dyn Observer,
    ) -> Result<RunReport, ExecutionError> {
        let program = self.interpreter.parse(source);
        let mut machine = self.interpreter.machine(&program);
        let delay = self.interpreter.config().delay();
        let mut report = RunReport {
            skipped: program.skipped.clone(),
            ..Default::default()
        };

        tracing::debug!(instructions = program.len(), "run started");
        loop {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let ticked = {
                let mut field = self.field.lock();
                interpreter::advance(&mut machine, &mut field, observer, &mut report)?
            };
            match ticked {
                None => break,
                Some(false) => {}
                Some(true) => {
                    if !delay.is_zero() && self.cancel.sleep(delay) {
                        report.cancelled = true;
                        break;
                    }
                }
            }
        }

        report.dispatched = machine.dispatched();
        Ok(report)
    }
}
