use appnix_core::{to_json_response, CommandGroup, CommandInfo, CommandStatus, ExecutionOutcome};
use atty::Stream;
use color_eyre::Result;
use serde_json::Value;

use crate::style::Style;

#[derive(Clone, Copy, Debug)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
    pub no_color: bool,
}

pub fn emit_output(
    opts: &OutputOptions,
    info: CommandInfo,
    outcome: &ExecutionOutcome,
) -> Result<i32> {
    let code = outcome.exit_code();

    if opts.json {
        let payload = to_json_response(info, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    let style = Style::new(opts.no_color, atty::is(Stream::Stdout));
    match outcome.status {
        CommandStatus::Ok if opts.quiet => {}
        CommandStatus::Ok => {
            if info.group == CommandGroup::List {
                println!("{}", outcome.message);
            } else {
                let message = format_status_message(info, &outcome.message);
                println!("{}", style.status(outcome.status, &message));
                if let Some(hint) = hint_from_details(&outcome.details) {
                    println!("{}", style.info(&format!("Tip: {hint}")));
                }
            }
        }
        CommandStatus::UserError | CommandStatus::Failure => {
            let message = format_status_message(info, &outcome.message);
            eprintln!("{}", style.status(outcome.status, &message));
            let why = collect_why_bullets(&outcome.details, &outcome.message);
            if !why.is_empty() {
                eprintln!();
                eprintln!("{}", style.heading("Why:"));
                for reason in why {
                    eprintln!("  • {reason}");
                }
            }
            if let Some(hint) = hint_from_details(&outcome.details) {
                eprintln!();
                eprintln!("{}", style.heading("Fix:"));
                eprintln!("{}", style.fix_bullet(&format!("  • {hint}")));
            }
        }
    }
    Ok(code)
}

fn format_status_message(info: CommandInfo, message: &str) -> String {
    format!("appnix {}: {message}", info.name)
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}

/// Causes beneath the headline, skipping anything that merely repeats it.
fn collect_why_bullets(details: &Value, headline: &str) -> Vec<String> {
    let mut bullets = Vec::new();
    if let Some(issues) = details.get("issues").and_then(Value::as_array) {
        for issue in issues.iter().filter_map(Value::as_str) {
            if issue != headline {
                push_unique(&mut bullets, issue);
            }
        }
    }
    if let Some(found) = details.get("found").and_then(Value::as_array) {
        for path in found.iter().filter_map(Value::as_str) {
            push_unique(&mut bullets, format!("found {path}"));
        }
    }
    bullets
}

fn push_unique(vec: &mut Vec<String>, text: impl Into<String>) {
    let entry = text.into();
    if entry.trim().is_empty() {
        return;
    }
    if !vec.iter().any(|existing| existing == &entry) {
        vec.push(entry);
    }
}
