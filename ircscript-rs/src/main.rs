use std::io::BufRead;

use ircscript::cli::{self, ScriptSource};
use ircscript::config::ScriptFile;
use ircscript::external::StdioPrompt;
use ircscript::script::EngineOptions;

fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("ircscript: {e}");
            eprintln!(
                "Usage: ircscript [-d] [-f[<file>]] [-A<dir>] [-n<nick>] [-C<chan>] [-c<line>]"
            );
            std::process::exit(1);
        }
    };

    // ── Logging: -d raises the default filter, RUST_LOG still wins ───────────
    let default_filter = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    // ── Load the script file ──────────────────────────────────────────────────
    let path = match args.script {
        ScriptSource::Skip => None,
        ScriptSource::Explicit(path) => Some(path),
        ScriptSource::Search => cli::find_user_script(),
    };
    let mut file = ScriptFile::new();
    if let Some(path) = path {
        match ScriptFile::load_file(&path) {
            Ok((loaded, errors)) => {
                for e in errors {
                    eprintln!("ircscript: {}: {e}", path.display());
                }
                file = loaded;
            }
            Err(e) => eprintln!("ircscript: warning: {}: {e}", path.display()),
        }
    }

    // ── Session overrides ─────────────────────────────────────────────────────
    if let Some(nick) = args.nick {
        file.context.me = nick;
    }
    if let Some(chan) = args.channel {
        file.context.channel = chan.clone();
        file.context.active_window = chan;
    }
    let mut options = EngineOptions::default();
    if let Some(dir) = args.app_dir {
        options.app_dir = dir;
    }
    let (engine, ctx) = file.into_engine(options);

    // ── Expand ────────────────────────────────────────────────────────────────
    if let Some(line) = args.line {
        // stdin is free for $input prompts in this mode
        let engine = engine.with_prompter(StdioPrompt);
        println!("{}", engine.parse(&ctx, &line));
        return;
    }
    for line in std::io::stdin().lock().lines() {
        match line {
            Ok(line) => println!("{}", engine.parse(&ctx, &line)),
            Err(e) => {
                eprintln!("ircscript: {e}");
                std::process::exit(1);
            }
        }
    }
}
