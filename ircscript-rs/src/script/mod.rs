//! The `$identifier` expansion language.
//!
//! Script lines such as `/msg $chan $upper($left($nick,3))` are rewritten
//! into plain text before they are sent or displayed:
//!
//! - Balanced `$name(args)` calls, nested to any depth
//! - `$+` to glue pieces together without whitespace
//! - Bare `$name` tokens for session values (`$me`, `$chan`, `$nick`, …)
//! - User aliases, looked up before the ~30 builtin functions
//!
//! # Quick start
//!
//! ```rust
//! use ircscript::script::{Engine, EvaluationContext};
//!
//! let engine = Engine::new();
//! let mut ctx = EvaluationContext::new();
//! ctx.nick = "alice".into();
//! assert_eq!(engine.parse(&ctx, "hi $upper($left($nick,3)) $+ !"), "hi ALI!");
//! ```

pub mod args;
pub mod builtins;
pub mod context;
pub mod engine;
pub mod expr;
pub mod scan;
pub mod stack;
pub mod timefmt;
pub mod tokens;
pub mod value;

// Re-exports for convenience.
pub use context::EvaluationContext;
pub use engine::{Engine, EngineOptions, ExpandError, Scope};
pub use expr::{ArithmeticEvaluator, ConditionEvaluator, ExprEvaluator};
pub use value::Value;
