//! Inside-out evaluation of directly nested calls.
//!
//! `$upper($left($nick,3))` is decomposed by repeatedly asking whether the
//! current argument text is itself exactly one call.  Each hit is pushed
//! onto an [`EvaluationStack`]; the walk stops at the first argument text
//! that is not a whole call (`$nick,3` above).  Popping then evaluates the
//! innermost call first and hands each result to its parent as that
//! parent's single argument.

use super::args::{split_args, Segment};
use super::scan::{whole_call, CallMatch};

/// A call waiting on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierCall<'a> {
    pub name: &'a str,
    pub raw_args: &'a str,
}

/// LIFO of calls, outermost at the bottom.
///
/// Invariant: the top entry's `raw_args` is never itself a whole call.
#[derive(Debug)]
pub struct EvaluationStack<'a> {
    frames: Vec<IdentifierCall<'a>>,
}

impl<'a> EvaluationStack<'a> {
    pub fn build(call: CallMatch<'a>) -> Self {
        let mut frames = vec![IdentifierCall { name: call.name, raw_args: call.args }];
        let mut args = call.args;
        while let Some(inner) = whole_call(args) {
            frames.push(IdentifierCall { name: inner.name, raw_args: inner.args });
            args = inner.args;
        }
        log::trace!("evaluation stack: {frames:?}");
        EvaluationStack { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn innermost(&self) -> Option<&IdentifierCall<'a>> {
        self.frames.last()
    }

    /// Pop every frame, innermost first, feeding each result upward.
    ///
    /// The innermost call receives its own raw arguments split on
    /// top-level commas; every other call receives exactly one
    /// [`Segment::Resolved`] holding its child's result.
    pub fn evaluate<E, F>(mut self, mut resolve: F) -> Result<String, E>
    where
        F: FnMut(&IdentifierCall<'a>, Vec<Segment<'a>>) -> Result<String, E>,
    {
        let mut accumulated: Option<String> = None;
        while let Some(frame) = self.frames.pop() {
            let args = match accumulated.take() {
                None => split_args(frame.raw_args),
                Some(value) => vec![Segment::Resolved(value)],
            };
            accumulated = Some(resolve(&frame, args)?);
        }
        Ok(accumulated.unwrap_or_default())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::scan::find_calls;
    use std::convert::Infallible;

    fn stack_for(line: &str) -> EvaluationStack<'_> {
        EvaluationStack::build(find_calls(line)[0])
    }

    #[test]
    fn single_level() {
        let stack = stack_for("$left(hello,3)");
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.innermost().map(|c| c.raw_args), Some("hello,3"));
    }

    #[test]
    fn walks_to_innermost() {
        let stack = stack_for("$upper($lower($left(Hello,3)))");
        assert_eq!(stack.len(), 3);
        assert_eq!(
            stack.innermost(),
            Some(&IdentifierCall { name: "left", raw_args: "Hello,3" })
        );
    }

    #[test]
    fn stops_at_partial_call() {
        // `$upper(x),3` begins with a call but does not end with it.
        let stack = stack_for("$left($upper(x),3)");
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.innermost().map(|c| c.raw_args), Some("$upper(x),3"));
    }

    #[test]
    fn evaluates_inside_out() {
        let stack = stack_for("$outer($inner(a,b))");
        let mut seen = Vec::new();
        let out = stack
            .evaluate(|call, args| {
                seen.push((call.name.to_owned(), args.clone()));
                Ok::<_, Infallible>(format!("{}[{}]", call.name, args.len()))
            })
            .unwrap();
        assert_eq!(out, "outer[1]");
        assert_eq!(seen[0].0, "inner");
        assert_eq!(seen[0].1, vec![Segment::Raw("a"), Segment::Raw("b")]);
        assert_eq!(seen[1].1, vec![Segment::Resolved("inner[2]".into())]);
    }
}
