//! Output format selector
//!
//! A small trait so each command writes through one of two formatters
//! instead of branching on `--json` at every print site.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {message}");
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {message}");
    }
    fn info(&self, message: &str) {
        println!("  {message}");
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", serde_json::json!({"success": true, "message": message}));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"success": false, "error": message}));
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }
}

#[must_use]
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}
