//! Command line parsing.

use tools::DispatchError;

pub const USAGE: &str = "Usage: research-agent [--json] \"<query>\"";

/// What the command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Ask { query: String, json: bool },
}

/// Parse arguments (without the program name).
///
/// A blank query is rejected here so nothing is loaded or contacted
/// for a request that cannot run.
pub fn parse_args<I>(args: I) -> Result<Command, DispatchError>
where
    I: IntoIterator<Item = String>,
{
    let mut json = false;
    let mut words = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--json" => json = true,
            "-h" | "--help" => return Ok(Command::Help),
            _ => words.push(arg),
        }
    }

    let query = words.join(" ");
    if query.trim().is_empty() {
        return Err(DispatchError::EmptyQuery);
    }
    Ok(Command::Ask { query, json })
}
