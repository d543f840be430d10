//! Bounded wait for the drawing library's ready signal.
//!
//! The host polls on a timer (`EditorConfig::ready_poll_interval_ms`) and
//! reports whether the library has finished initializing. After
//! `max_attempts` negative polls the gate fails permanently; it never
//! resets itself.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Waiting { attempt: u32 },
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    Timeout { attempts: u32 },
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::Timeout { attempts } => write!(
                f,
                "drawing library not ready after {attempts} attempts; editing disabled"
            ),
        }
    }
}

impl std::error::Error for InitError {}

#[derive(Debug)]
pub struct ReadyGate {
    max_attempts: u32,
    attempts: u32,
    outcome: Option<Result<(), InitError>>,
}

impl ReadyGate {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempts: 0,
            outcome: None,
        }
    }

    pub fn poll(&mut self, library_ready: bool) -> Result<ReadyState, InitError> {
        match self.outcome {
            Some(Ok(())) => return Ok(ReadyState::Ready),
            Some(Err(e)) => return Err(e),
            None => {}
        }
        if library_ready {
            log::debug!("drawing library ready after {} poll(s)", self.attempts + 1);
            self.outcome = Some(Ok(()));
            return Ok(ReadyState::Ready);
        }
        self.attempts += 1;
        if self.attempts >= self.max_attempts {
            let err = InitError::Timeout {
                attempts: self.attempts,
            };
            log::error!("{err}");
            self.outcome = Some(Err(err));
            return Err(err);
        }
        Ok(ReadyState::Waiting {
            attempt: self.attempts,
        })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.outcome, Some(Ok(())))
    }
}
