use tripsplit_application::ScriptError;

/// Formats a script failure, quoting the offending source line when known.
pub fn format_script_error(error: &ScriptError, source: &str) -> String {
    let Some(line) = error.line() else {
        return error.to_string();
    };

    match line
        .checked_sub(1)
        .and_then(|idx| source.lines().nth(idx))
    {
        Some(text) => format!("{error}\n  {line} | {}", text.trim_end()),
        None => error.to_string(),
    }
}
