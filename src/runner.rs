use std::fmt::Display;

use tracing::error;

use crate::{Resource, State};

/// Runs a check and turns a failure into a proper plugin answer instead of a panic or a stack
/// trace, so the monitoring system always gets one line and a known exit code.
pub struct Runner<E> {
    on_error: Option<Box<dyn FnOnce(&E) -> State>>,
}

impl<E: Display> Runner<E> {
    pub fn new() -> Self {
        Self { on_error: None }
    }

    /// Chooses the state to report for an error. Defaults to [State::Critical].
    pub fn on_error(mut self, f: impl FnOnce(&E) -> State + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// This will run either the default `on_error` handler or the one specified by calling
    /// [Runner::on_error] and keep the resulting state with the error message.
    pub fn safe_run(self, f: impl FnOnce() -> Result<Resource, E>) -> RunnerResult {
        match f() {
            Ok(resource) => RunnerResult::Ok(resource),
            Err(err) => {
                let state = self
                    .on_error
                    .map(|f| f(&err))
                    .unwrap_or(State::Critical);

                let message = format!("{:#}", err);
                error!(%state, "check failed: {}", message);
                RunnerResult::Err(state, message)
            }
        }
    }
}

impl<E: Display> Default for Runner<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub enum RunnerResult {
    Ok(Resource),
    Err(State, String),
}

impl RunnerResult {
    pub fn state(&self) -> State {
        match self {
            RunnerResult::Ok(resource) => resource.state(),
            RunnerResult::Err(state, _) => *state,
        }
    }

    pub fn to_nagios_string(&self) -> String {
        match self {
            RunnerResult::Ok(resource) => resource.to_nagios_string(),
            RunnerResult::Err(state, msg) => format!("{}: {}", state, msg),
        }
    }

    pub fn print_and_exit(self) -> ! {
        println!("{}", self.to_nagios_string());
        std::process::exit(self.state().exit_code());
    }
}
