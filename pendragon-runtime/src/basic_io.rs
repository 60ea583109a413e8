/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! The basic I/O contract the CPU's `SYS` handler dispatches against (spec
//! §4.7). A concrete console implementation is out of scope here by design
//! (spec's Non-goals exclude terminal/host I/O plumbing); callers embedding
//! the core supply their own.

use crate::error::RuntimeResult;

pub trait BasicIo {
    fn print_string(&mut self, s: &str) -> RuntimeResult<()>;
    fn print_line(&mut self, s: &str) -> RuntimeResult<()>;
    fn read_line(&mut self) -> RuntimeResult<String>;
}

/// An in-memory `BasicIo` used by tests and embedders that don't need a
/// real terminal.
#[derive(Default)]
pub struct BufferedIo {
    pub output: String,
    pub input: std::collections::VecDeque<String>,
}

impl BufferedIo {
    pub fn new() -> Self {
        BufferedIo::default()
    }

    pub fn with_input<I: IntoIterator<Item = String>>(lines: I) -> Self {
        BufferedIo { output: String::new(), input: lines.into_iter().collect() }
    }
}

impl BasicIo for BufferedIo {
    fn print_string(&mut self, s: &str) -> RuntimeResult<()> {
        self.output.push_str(s);
        Ok(())
    }

    fn print_line(&mut self, s: &str) -> RuntimeResult<()> {
        self.output.push_str(s);
        self.output.push('\n');
        Ok(())
    }

    fn read_line(&mut self) -> RuntimeResult<String> {
        Ok(self.input.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_io_records_output() {
        let mut io = BufferedIo::new();
        io.print_string("hello, ").unwrap();
        io.print_line("world!").unwrap();
        assert_eq!(io.output, "hello, world!\n");
    }

    #[test]
    fn buffered_io_replays_input() {
        let mut io = BufferedIo::with_input(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(io.read_line().unwrap(), "first");
        assert_eq!(io.read_line().unwrap(), "second");
        assert_eq!(io.read_line().unwrap(), "");
    }
}
