//! Command-line argument parsing.
//!
//! Usage:
//!   ircscript [-d] [-f[<file>]] [-A<dir>] [-n<nick>] [-C<chan>] [-c<line>]
//!
//! Without `-c`, every line read from stdin is expanded and printed.

use std::path::PathBuf;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Script file specification.
    pub script: ScriptSource,
    /// Single line to expand (`-c<line>`).
    pub line: Option<String>,
    /// Session nick override (`-n<nick>`).
    pub nick: Option<String>,
    /// Session channel override (`-C<chan>`).
    pub channel: Option<String>,
    /// Application directory override (`-A<dir>`).
    pub app_dir: Option<PathBuf>,
    /// Debug logging (`-d`).
    pub debug: bool,
}

/// How to choose the script file.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum ScriptSource {
    /// Search `~/.ircscriptrc` then `./.ircscriptrc` (default).
    #[default]
    Search,
    /// `-f` with no file argument: load nothing.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(&raw[1..])
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();
        if !arg.starts_with('-') || arg == "-" {
            return Err(format!("unexpected argument: {arg}"));
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            let c = chars[j];
            match c {
                'd' => args.debug = true,

                // -f[<file>]: a separate word is taken only if it is not a flag
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.script = ScriptSource::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else if i + 1 < argv.len() && !argv[i + 1].starts_with('-') {
                        i += 1;
                        args.script = ScriptSource::Explicit(PathBuf::from(&argv[i]));
                    } else {
                        args.script = ScriptSource::Skip;
                    }
                }

                'c' | 'n' | 'C' | 'A' => {
                    let value = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err(format!("-{c} requires an argument"));
                    };
                    match c {
                        'c' => args.line = Some(value),
                        'n' => args.nick = Some(value),
                        'C' => args.channel = Some(value),
                        _ => args.app_dir = Some(PathBuf::from(value)),
                    }
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    Ok(args)
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Search for the user script file in the standard locations.
/// Returns the first path that exists, or `None`.
pub fn find_user_script() -> Option<PathBuf> {
    let home = std::env::var("HOME").unwrap_or_default();
    [format!("{home}/.ircscriptrc"), "./.ircscriptrc".to_owned()]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
