use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner};

#[derive(Clone)]
pub struct MockProcessRunner {
    expectations: Arc<Mutex<Vec<MockExpectation>>>,
    call_history: Arc<Mutex<Vec<ProcessCommand>>>,
}

struct MockExpectation {
    program: String,
    #[allow(clippy::type_complexity)]
    args_matcher: Option<Box<dyn Fn(&[String]) -> bool + Send + Sync>>,
    response: ProcessOutput,
    not_found: bool,
    io_failure: Option<std::io::ErrorKind>,
    delay: Duration,
    times_called: usize,
    expected_times: Option<usize>,
}

pub struct MockCommandConfig {
    runner: MockProcessRunner,
    expectation: MockExpectation,
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(Vec::new())),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn expect_command(&mut self, program: &str) -> MockCommandConfig {
        MockCommandConfig {
            runner: self.clone(),
            expectation: MockExpectation {
                program: program.to_string(),
                args_matcher: None,
                response: ProcessOutput {
                    status: ExitStatus::Success,
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                    duration: Duration::from_millis(10),
                    output_overflow: false,
                },
                not_found: false,
                io_failure: None,
                delay: Duration::ZERO,
                times_called: 0,
                expected_times: None,
            },
        }
    }

    pub fn verify_called(&self, program: &str, times: usize) -> bool {
        let history = self.call_history.lock().unwrap();
        let count = history.iter().filter(|cmd| cmd.program == program).count();
        count == times
    }

    pub fn get_call_history(&self) -> Vec<ProcessCommand> {
        self.call_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        self.call_history.lock().unwrap().push(command.clone());

        let (result, delay) = self.respond(&command);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

impl MockProcessRunner {
    fn respond(&self, command: &ProcessCommand) -> (Result<ProcessOutput, ProcessError>, Duration) {
        let mut expectations = self.expectations.lock().unwrap();

        for expectation in expectations.iter_mut() {
            if expectation.program != command.program {
                continue;
            }

            if let Some(ref args_matcher) = expectation.args_matcher {
                if !(args_matcher)(&command.args) {
                    continue;
                }
            }

            expectation.times_called += 1;
            let delay = expectation.delay;

            if let Some(expected) = expectation.expected_times {
                if expectation.times_called > expected {
                    let error = ProcessError::MockExpectationNotMet(format!(
                        "Command '{}' called {} times, expected {}",
                        command.program, expectation.times_called, expected
                    ));
                    return (Err(error), delay);
                }
            }

            if expectation.not_found {
                return (Err(ProcessError::CommandNotFound(command.program.clone())), delay);
            }

            if let Some(kind) = expectation.io_failure {
                let error = ProcessError::IoError {
                    command: command.command_line(),
                    source: std::io::Error::from(kind),
                };
                return (Err(error), delay);
            }

            return (Ok(expectation.response.clone()), delay);
        }

        let error = ProcessError::MockExpectationNotMet(format!(
            "No expectation found for command: {} {:?}",
            command.program, command.args
        ));
        (Err(error), Duration::ZERO)
    }
}

impl MockCommandConfig {
    pub fn with_args<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.expectation.args_matcher = Some(Box::new(matcher));
        self
    }

    /// Match on the first argument (`git merge`, `docker ps`)
    pub fn with_subcommand(self, subcommand: &'static str) -> Self {
        self.with_args(move |args| args.first().map(String::as_str) == Some(subcommand))
    }

    pub fn returns_stdout(mut self, stdout: &str) -> Self {
        self.expectation.response.stdout = stdout.as_bytes().to_vec();
        self
    }

    pub fn returns_stderr(mut self, stderr: &str) -> Self {
        self.expectation.response.stderr = stderr.as_bytes().to_vec();
        self
    }

    pub fn returns_exit_code(mut self, code: i32) -> Self {
        self.expectation.response.status = if code == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::Error(code)
        };
        self
    }

    pub fn returns_success(mut self) -> Self {
        self.expectation.response.status = ExitStatus::Success;
        self
    }

    /// Simulate a deadline expiry; the runner never hands back partial output
    pub fn returns_timeout(mut self, after: Duration) -> Self {
        self.expectation.response.status = ExitStatus::Timeout;
        self.expectation.response.stdout.clear();
        self.expectation.response.stderr.clear();
        self.expectation.response.duration = after;
        self
    }

    pub fn returns_signal(mut self, signal: i32) -> Self {
        self.expectation.response.status = ExitStatus::Signal(signal);
        self
    }

    pub fn returns_overflow(mut self) -> Self {
        self.expectation.response.output_overflow = true;
        self
    }

    pub fn returns_not_found(mut self) -> Self {
        self.expectation.not_found = true;
        self
    }

    /// Fail while collecting output, after the process started
    pub fn returns_io_error(mut self, kind: std::io::ErrorKind) -> Self {
        self.expectation.io_failure = Some(kind);
        self
    }

    /// Wait before answering, as a real process would
    pub fn after(mut self, delay: Duration) -> Self {
        self.expectation.delay = delay;
        self
    }

    pub fn times(mut self, n: usize) -> Self {
        self.expectation.expected_times = Some(n);
        self
    }

    pub fn finish(self) {
        self.runner
            .expectations
            .lock()
            .unwrap()
            .push(self.expectation);
    }
}

impl Default for MockProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}
