use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

use keto::diagnostic::{Diagnostic, ansi::AnsiRenderer, json};
use keto::{Config, InterpretError, InterpretResult, Value, Vm, compile_with, disassembler};

const EXIT_COMPILE_ERROR: i32 = 65;
const EXIT_RUNTIME_ERROR: i32 = 70;
const EXIT_IO_ERROR: i32 = 74;

#[derive(Parser, Debug)]
#[command(name = "keto", version)]
#[command(about = "Compile and run Keto expressions")]
struct Args {
    /// Script to run. Starts a REPL when omitted.
    path: Option<PathBuf>,

    /// Evaluate an inline expression
    #[arg(short = 'e', long = "eval", conflicts_with = "path", allow_hyphen_values = true)]
    eval: Option<String>,

    /// Log every executed instruction with the stack
    #[arg(long)]
    trace: bool,

    /// Log the disassembly of every successfully compiled chunk
    #[arg(long = "print-code")]
    print_code: bool,

    /// Print the disassembly to stderr before running
    #[arg(long)]
    disassemble: bool,

    /// Emit results and diagnostics as JSON
    #[arg(long)]
    json: bool,

    /// Disable ANSI colour in diagnostics
    #[arg(long = "no-color")]
    no_color: bool,
}

impl Args {
    fn config(&self) -> Config {
        Config::default()
            .with_trace_execution(self.trace)
            .with_print_code(self.print_code)
    }
}

// ── Logging ──────────────────────────────────────────────────────────

fn init_logging(args: &Args) {
    let default = if args.trace {
        "warn,keto=trace"
    } else if args.print_code {
        "warn,keto=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env("KETO_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!args.no_color && io::stderr().is_terminal())
        .with_writer(io::stderr)
        .init();
}

// ── Output ───────────────────────────────────────────────────────────

enum Output {
    Ansi(AnsiRenderer),
    Json,
}

impl Output {
    fn new(args: &Args) -> Self {
        if args.json {
            Output::Json
        } else {
            let use_color = !args.no_color && io::stderr().is_terminal();
            Output::Ansi(AnsiRenderer { use_color })
        }
    }

    fn report(&self, error: &InterpretError, source: &str) {
        for d in Diagnostic::from_interpret_error(error) {
            let d = d.with_source(source);
            match self {
                Output::Ansi(renderer) => eprint!("{}", renderer.render(&d)),
                Output::Json => eprintln!("{}", json::render(&d)),
            }
        }
    }

    fn value(&self, value: Value) {
        match self {
            Output::Ansi(_) => println!("{}", value),
            // Non-finite numbers serialize as null.
            Output::Json => match serde_json::to_string(&value) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("Serialization error: {}", e),
            },
        }
    }
}

// ── Driver ───────────────────────────────────────────────────────────

struct Session {
    vm: Vm,
    output: Output,
    disassemble: bool,
}

impl Session {
    /// Compiles and runs one piece of source, reporting any error.
    fn run_source(&mut self, source: &str) -> InterpretResult {
        let outcome = self.execute(source);
        match &outcome {
            Ok(value) => self.output.value(*value),
            Err(e) => self.output.report(e, source),
        }
        InterpretResult::from(&outcome)
    }

    fn execute(&mut self, source: &str) -> Result<Value, InterpretError> {
        let mut chunk = keto::Chunk::new();
        compile_with(source, &mut chunk, self.vm.config())?;
        if self.disassemble {
            eprint!("{}", disassembler::disassemble_chunk(&chunk, "code"));
        }
        Ok(self.vm.run(&chunk)?)
    }

    fn repl(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut line = String::new();
        loop {
            write!(stdout, "> ")?;
            stdout.flush()?;

            line.clear();
            if stdin.lock().read_line(&mut line)? == 0 {
                println!();
                return Ok(());
            }
            let source = line.trim_end_matches(['\n', '\r']);
            if source.is_empty() {
                println!();
                return Ok(());
            }
            self.run_source(source);
        }
    }
}

fn exit_code(result: InterpretResult) -> i32 {
    match result {
        InterpretResult::Ok => 0,
        InterpretResult::CompileError => EXIT_COMPILE_ERROR,
        InterpretResult::RuntimeError => EXIT_RUNTIME_ERROR,
    }
}

fn main() {
    let args = Args::parse();
    init_logging(&args);

    let mut session = Session {
        vm: Vm::with_config(args.config()),
        output: Output::new(&args),
        disassemble: args.disassemble,
    };

    if let Some(source) = &args.eval {
        process::exit(exit_code(session.run_source(source)));
    }

    if let Some(path) = &args.path {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Could not read file \"{}\": {}", path.display(), e);
                process::exit(EXIT_IO_ERROR);
            }
        };
        debug!(path = %path.display(), bytes = source.len(), "running file");
        process::exit(exit_code(session.run_source(&source)));
    }

    if let Err(e) = session.repl() {
        eprintln!("Error reading input: {}", e);
        process::exit(EXIT_IO_ERROR);
    }
}
