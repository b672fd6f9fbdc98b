//! The identifier expansion engine.
//!
//! [`Engine::parse`] rewrites one line of script text in three passes:
//!
//! 1. every outermost `$name(...)` call is evaluated inside-out through an
//!    [`EvaluationStack`] and spliced back in at its own position;
//! 2. `$+` markers are collapsed;
//! 3. remaining bare `$name` tokens are resolved.
//!
//! Identifier lookup order is: session context (bare tokens only), then
//! user aliases, then builtins.  Anything left over expands to nothing.
//!
//! Aliases and argument segments re-enter the pipeline through a
//! [`Scope`], which carries the current depth.  Going past
//! [`EngineOptions::max_depth`] aborts the whole line with
//! [`ExpandError::RecursionLimit`].

use std::path::PathBuf;

use directories::ProjectDirs;
use thiserror::Error;

use super::args::Segment;
use super::builtins::call_builtin;
use super::context::EvaluationContext;
use super::expr::{ArithmeticEvaluator, ConditionEvaluator, ExprEvaluator};
use super::scan::{concat_segments, find_bare_tokens, find_calls, CallMatch};
use super::stack::EvaluationStack;
use super::value::format_number;
use crate::alias::{AliasStore, AliasTable};
use crate::external::{DiskFiles, HashTables, IniFiles, MemoryTables, NoPrompt, Prompter, TextFiles};
use crate::ial::{AddressList, Ial};

pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("identifier recursion deeper than {limit} levels")]
    RecursionLimit { limit: usize },
}

// ── Options ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum nesting of alias calls and argument re-expansion.
    pub max_depth: usize,
    /// Root for `$appdir` and relative `$read` / `$readini` paths.
    pub app_dir: PathBuf,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions { max_depth: DEFAULT_MAX_DEPTH, app_dir: default_app_dir() }
    }
}

/// Per-user data directory, or `.` when the platform has none.
pub fn default_app_dir() -> PathBuf {
    ProjectDirs::from("", "", "fusionirc")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Expansion engine with its collaborators.
///
/// Every collaborator has an in-process default; embedders swap them with
/// the `with_*` builders.
pub struct Engine {
    options: EngineOptions,
    aliases: Box<dyn AliasStore>,
    conditions: Box<dyn ConditionEvaluator>,
    arithmetic: Box<dyn ArithmeticEvaluator>,
    text_files: Box<dyn TextFiles>,
    ini_files: Box<dyn IniFiles>,
    hash_tables: Box<dyn HashTables>,
    address_list: Box<dyn AddressList>,
    prompter: Box<dyn Prompter>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            options: EngineOptions::default(),
            aliases: Box::new(AliasTable::new()),
            conditions: Box::new(ExprEvaluator),
            arithmetic: Box::new(ExprEvaluator),
            text_files: Box::new(DiskFiles),
            ini_files: Box::new(DiskFiles),
            hash_tables: Box::new(MemoryTables::new()),
            address_list: Box::new(Ial::new()),
            prompter: Box::new(NoPrompt),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    pub fn with_app_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.app_dir = dir.into();
        self
    }

    pub fn with_aliases(mut self, aliases: impl AliasStore + 'static) -> Self {
        self.aliases = Box::new(aliases);
        self
    }

    pub fn with_conditions(mut self, eval: impl ConditionEvaluator + 'static) -> Self {
        self.conditions = Box::new(eval);
        self
    }

    pub fn with_arithmetic(mut self, eval: impl ArithmeticEvaluator + 'static) -> Self {
        self.arithmetic = Box::new(eval);
        self
    }

    pub fn with_text_files(mut self, files: impl TextFiles + 'static) -> Self {
        self.text_files = Box::new(files);
        self
    }

    pub fn with_ini_files(mut self, files: impl IniFiles + 'static) -> Self {
        self.ini_files = Box::new(files);
        self
    }

    pub fn with_hash_tables(mut self, tables: impl HashTables + 'static) -> Self {
        self.hash_tables = Box::new(tables);
        self
    }

    pub fn with_address_list(mut self, ial: impl AddressList + 'static) -> Self {
        self.address_list = Box::new(ial);
        self
    }

    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Box::new(prompter);
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn aliases(&self) -> &dyn AliasStore {
        self.aliases.as_ref()
    }

    pub fn conditions(&self) -> &dyn ConditionEvaluator {
        self.conditions.as_ref()
    }

    pub fn arithmetic(&self) -> &dyn ArithmeticEvaluator {
        self.arithmetic.as_ref()
    }

    pub fn text_files(&self) -> &dyn TextFiles {
        self.text_files.as_ref()
    }

    pub fn ini_files(&self) -> &dyn IniFiles {
        self.ini_files.as_ref()
    }

    pub fn hash_tables(&self) -> &dyn HashTables {
        self.hash_tables.as_ref()
    }

    pub fn address_list(&self) -> &dyn AddressList {
        self.address_list.as_ref()
    }

    pub fn prompter(&self) -> &dyn Prompter {
        self.prompter.as_ref()
    }

    /// Top-level scope for one line.
    pub fn scope<'e>(&'e self, ctx: &'e EvaluationContext) -> Scope<'e> {
        Scope { engine: self, ctx, depth: 0 }
    }

    /// Expand `line`.  Never fails: a recursion overflow yields `""`.
    pub fn parse(&self, ctx: &EvaluationContext, line: &str) -> String {
        match self.try_parse(ctx, line) {
            Ok(out) => out,
            Err(e) => {
                log::warn!("{e} while expanding {line:?}");
                String::new()
            }
        }
    }

    pub fn try_parse(&self, ctx: &EvaluationContext, line: &str) -> Result<String, ExpandError> {
        self.scope(ctx).expand(line)
    }
}

// ── Scope ─────────────────────────────────────────────────────────────────────

/// One level of expansion: the engine, the session snapshot and how deep
/// we are.
#[derive(Clone, Copy)]
pub struct Scope<'e> {
    engine: &'e Engine,
    ctx: &'e EvaluationContext,
    depth: usize,
}

impl<'e> Scope<'e> {
    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    pub fn context(&self) -> &'e EvaluationContext {
        self.ctx
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The scope one level down, or `RecursionLimit` past the maximum.
    pub fn nested(&self) -> Result<Scope<'e>, ExpandError> {
        let limit = self.engine.options.max_depth;
        if self.depth >= limit {
            return Err(ExpandError::RecursionLimit { limit });
        }
        Ok(Scope { depth: self.depth + 1, ..*self })
    }

    /// Run the full pipeline over `line` at this depth.
    pub fn expand(&self, line: &str) -> Result<String, ExpandError> {
        if !line.contains('$') {
            return Ok(line.to_owned());
        }

        let mut resolved = String::with_capacity(line.len());
        let mut last = 0;
        for call in find_calls(line) {
            resolved.push_str(&line[last..call.start]);
            resolved.push_str(&self.resolve_call(call)?);
            last = call.end;
        }
        resolved.push_str(&line[last..]);

        // Bare tokens are found per `$+` piece, so `$me $+ bot` joins the
        // value of `$me` rather than forming `$mebot`.
        let mut out = String::with_capacity(resolved.len());
        for piece in concat_segments(&resolved) {
            let mut last = 0;
            for span in find_bare_tokens(piece) {
                out.push_str(&piece[last..span.start]);
                out.push_str(&self.resolve_bare(&piece[span.start + 1..span.end])?);
                last = span.end;
            }
            out.push_str(&piece[last..]);
        }
        Ok(out)
    }

    fn resolve_call(&self, call: CallMatch<'_>) -> Result<String, ExpandError> {
        EvaluationStack::build(call).evaluate(|frame, segments| {
            let args = segments
                .into_iter()
                .map(|seg| self.resolve_segment(seg))
                .collect::<Result<Vec<_>, _>>()?;
            self.invoke(frame.name, &args)
        })
    }

    fn resolve_segment(&self, segment: Segment<'_>) -> Result<String, ExpandError> {
        match segment {
            Segment::Raw(text) if text.contains('$') => self.nested()?.expand(text),
            Segment::Raw(text) => Ok(text.to_owned()),
            Segment::Resolved(value) => Ok(value),
        }
    }

    /// A bare `$name`: context first, then alias or builtin with no args.
    fn resolve_bare(&self, name: &str) -> Result<String, ExpandError> {
        if let Some(value) = self.context_value(name) {
            return Ok(value);
        }
        self.invoke(name, &[])
    }

    /// Alias, then builtin, then nothing.
    fn invoke(&self, name: &str, args: &[String]) -> Result<String, ExpandError> {
        if let Some(alias) = self.engine.aliases.lookup(name) {
            log::debug!("${name}: alias with {} arg(s)", args.len());
            return alias.parse(&self.nested()?, args);
        }
        match call_builtin(&name.to_ascii_uppercase(), args, self) {
            Some(value) => Ok(value),
            None => {
                log::debug!("${name}: unknown identifier");
                Ok(String::new())
            }
        }
    }

    fn context_value(&self, name: &str) -> Option<String> {
        let ctx = self.ctx;
        let value = match name.to_ascii_uppercase().as_str() {
            "ME" => ctx.me.clone(),
            "CHAN" => ctx.channel.clone(),
            "NICK" => ctx.nick.clone(),
            "ADDRESS" => ctx.address.clone(),
            "APPDIR" => self.engine.options.app_dir.display().to_string(),
            "ACTIVE" => ctx.active_window.clone(),
            "CID" => ctx.connection_id.to_string(),
            "SERVER" => ctx.server.clone(),
            "NETWORK" => ctx.network.clone(),
            "TICKS" => ticks().to_string(),
            "PI" => format_number(std::f64::consts::PI),
            "NULL" => "\0".to_owned(),
            _ => return None,
        };
        Some(value)
    }
}

/// Milliseconds on the monotonic clock.
fn ticks() -> u64 {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    if unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) } != 0 {
        return 0;
    }
    ts.tv_sec as u64 * 1000 + ts.tv_nsec as u64 / 1_000_000
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::Script;

    fn ctx() -> EvaluationContext {
        EvaluationContext {
            me: "fusion".into(),
            channel: "#rust".into(),
            nick: "alice".into(),
            address: "alice@example.org".into(),
            active_window: "#rust".into(),
            connection_id: 2,
            server: "irc.example.org".into(),
            network: "ExampleNet".into(),
        }
    }

    fn with_aliases(defs: &[(&str, &str)]) -> Engine {
        let mut table = AliasTable::new();
        for (name, body) in defs {
            table.define(name, Script::from_body(body));
        }
        Engine::new().with_aliases(table)
    }

    #[test]
    fn text_without_dollar_is_untouched() {
        let e = Engine::new();
        assert_eq!(e.parse(&ctx(), "hello, (world)"), "hello, (world)");
    }

    #[test]
    fn context_fast_path() {
        let e = Engine::new().with_app_dir("/opt/fusion");
        let c = ctx();
        assert_eq!(e.parse(&c, "$me on $chan from $nick"), "fusion on #rust from alice");
        assert_eq!(e.parse(&c, "$address $active $cid"), "alice@example.org #rust 2");
        assert_eq!(e.parse(&c, "$server/$network"), "irc.example.org/ExampleNet");
        assert_eq!(e.parse(&c, "$appdir"), "/opt/fusion");
        assert_eq!(e.parse(&c, "$NULL"), "\0");
        assert_eq!(e.parse(&c, "$pi"), "3.14159265358979");
        assert!(e.parse(&c, "$ticks").parse::<u64>().is_ok());
    }

    #[test]
    fn context_beats_alias_for_bare_tokens() {
        let e = with_aliases(&[("nick", "shadowed")]);
        assert_eq!(e.parse(&ctx(), "$nick"), "alice");
        // With parentheses the context is never consulted.
        assert_eq!(e.parse(&ctx(), "$nick()"), "shadowed");
    }

    #[test]
    fn alias_shadows_builtin() {
        let e = with_aliases(&[("upper", "/return no")]);
        assert_eq!(e.parse(&ctx(), "$upper(abc)"), "no");
    }

    #[test]
    fn alias_receives_arguments() {
        let e = with_aliases(&[("greet", "hi $1 on $2")]);
        assert_eq!(e.parse(&ctx(), "$greet(bob,$chan)"), "hi bob on #rust");
    }

    #[test]
    fn nested_call_feeds_parent() {
        let e = Engine::new();
        assert_eq!(e.parse(&ctx(), "$upper($left($nick,3))"), "ALI");
    }

    #[test]
    fn inner_result_with_comma_is_one_argument() {
        let e = with_aliases(&[("pair", "/return a,b"), ("count", "/return $0")]);
        assert_eq!(e.parse(&ctx(), "$count($pair)"), "1");
        assert_eq!(e.parse(&ctx(), "$count($pair())"), "1");
    }

    #[test]
    fn calls_replaced_by_position() {
        let e = Engine::new();
        let out = e.parse(&ctx(), "$rand(0,1000000) $rand(0,1000000) $rand(0,1000000)");
        let parts: Vec<&str> = out.split(' ').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.parse::<i64>().is_ok()));
    }

    #[test]
    fn unbalanced_call_stays_literal() {
        let e = Engine::new();
        assert_eq!(e.parse(&ctx(), "$left(hello"), "$left(hello");
        assert_eq!(e.parse(&ctx(), "x $upper(a) $left(b"), "x A $left(b");
    }

    #[test]
    fn self_recursion_fails_closed() {
        let e = with_aliases(&[("loop", "$loop")]).with_max_depth(8);
        assert_eq!(
            e.try_parse(&ctx(), "before $loop after"),
            Err(ExpandError::RecursionLimit { limit: 8 })
        );
        assert_eq!(e.parse(&ctx(), "before $loop after"), "");
    }

    #[test]
    fn depth_limit_allows_shallow_nesting() {
        let e = with_aliases(&[("a", "$b"), ("b", "$c"), ("c", "deep")]).with_max_depth(3);
        assert_eq!(e.parse(&ctx(), "$a"), "deep");
        let e = with_aliases(&[("a", "$b"), ("b", "$c"), ("c", "deep")]).with_max_depth(2);
        assert!(e.try_parse(&ctx(), "$a").is_err());
    }

    #[test]
    fn nested_scope_tracks_depth() {
        let e = Engine::new().with_max_depth(1);
        let c = ctx();
        let top = e.scope(&c);
        let one = top.nested().unwrap();
        assert_eq!(one.depth(), 1);
        assert!(one.nested().is_err());
    }
}
