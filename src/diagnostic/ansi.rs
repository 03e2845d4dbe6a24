use super::{Diagnostic, Phase, Severity, line_text};

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn bold(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold_red(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1;31m{s}\x1b[0m") } else { s.to_string() }
    }

    fn cyan(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[36m{s}\x1b[0m") } else { s.to_string() }
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        // "error: message" / "runtime error: message"
        let label = match (d.severity, d.phase) {
            (Severity::Error, Phase::Compile) => Severity::Error.as_str().to_string(),
            (Severity::Error, Phase::Runtime) => format!("runtime {}", Severity::Error.as_str()),
        };
        out.push_str(&format!("{}: {}\n", self.bold_red(&label), self.bold(&d.message)));

        let Some(line) = d.line else {
            return out;
        };

        // "  --> line 3, at '+'"
        let place = match (&d.location, d.phase) {
            (Some(location), _) => format!("line {line}, {location}"),
            (None, Phase::Runtime) => format!("line {line}, in script"),
            (None, Phase::Compile) => format!("line {line}"),
        };
        out.push_str(&format!("  {} {}\n", self.cyan("-->"), place));

        if let Some(text) = d.source.as_deref().and_then(|s| line_text(s, line)) {
            let gutter = line.to_string().len();
            let pipe = self.cyan("|");
            let pad = " ".repeat(gutter);
            let line_num = self.cyan(&format!("{line:>gutter$}"));
            out.push_str(&format!("{pad} {pipe}\n"));
            out.push_str(&format!("{line_num} {pipe} {text}\n"));
            out.push_str(&format!("{pad} {pipe}\n"));
        }

        out
    }
}
