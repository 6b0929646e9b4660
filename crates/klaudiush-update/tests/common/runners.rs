//! Scripted command runner
//!
//! Responses are keyed by the full command line (`brew upgrade <formula>`).
//! Queued responses are consumed in order and the last one repeats.
//! Unscripted commands fail to spawn, like a missing program.

use async_trait::async_trait;
use klaudiush_update::{CommandOutput, CommandRunner, Result, UpdateError};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Mutex;

#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, VecDeque<CommandOutput>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `output` for `command_line`
    pub fn respond(self, command_line: &str, output: CommandOutput) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(command_line.to_string())
            .or_default()
            .push_back(output);
        self
    }

    /// Every command line run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, command_line: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.as_str() == command_line)
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let command_line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(command_line.clone());

        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(&command_line).filter(|q| !q.is_empty());

        match queue {
            Some(queue) if queue.len() > 1 => Ok(queue.pop_front().unwrap()),
            Some(queue) => Ok(queue[0].clone()),
            None => Err(UpdateError::CommandSpawn {
                command: program.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "not scripted"),
            }),
        }
    }
}

/// Successful command printing `stdout`
pub fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
        exit_code: Some(0),
    }
}

/// Successful command printing `stderr` only
pub fn ok_stderr(stderr: &str) -> CommandOutput {
    CommandOutput {
        stdout: String::new(),
        stderr: stderr.to_string(),
        exit_code: Some(0),
    }
}

/// Command exiting with `code`
pub fn failed(code: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        stdout: String::new(),
        stderr: stderr.to_string(),
        exit_code: Some(code),
    }
}

/// `which -a` output listing `paths`
pub fn which_output(paths: &[&std::path::Path]) -> CommandOutput {
    let stdout = paths
        .iter()
        .map(|p| format!("{}\n", p.display()))
        .collect::<String>();
    ok(&stdout)
}
