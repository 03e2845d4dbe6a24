/// Interpreter switches. Both are off by default; the CLI turns them on with
/// `--trace` and `--print-code`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Log every dispatched instruction and the stack beneath it.
    pub trace_execution: bool,
    /// Log the disassembly of each successfully compiled chunk.
    pub print_code: bool,
}

impl Config {
    pub fn with_trace_execution(mut self, on: bool) -> Self {
        self.trace_execution = on;
        self
    }

    pub fn with_print_code(mut self, on: bool) -> Self {
        self.print_code = on;
        self
    }
}
