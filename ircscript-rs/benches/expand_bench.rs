use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ircscript::alias::{AliasTable, Script};
use ircscript::script::{Engine, EvaluationContext};

fn make_ctx() -> EvaluationContext {
    let mut ctx = EvaluationContext::new();
    ctx.me = "fusion".into();
    ctx.nick = "alice".into();
    ctx.channel = "#rust".into();
    ctx
}

/// `$upper($lower(...$left($nick,3)...))`, `depth` calls deep.
fn nested_line(depth: usize) -> String {
    let mut line = "$left($nick,3)".to_owned();
    for i in 0..depth {
        let f = if i % 2 == 0 { "upper" } else { "lower" };
        line = format!("${f}({line})");
    }
    line
}

fn bench_expand(c: &mut Criterion) {
    let ctx = make_ctx();
    let mut aliases = AliasTable::new();
    aliases.define("greet", Script::from_body("/return hi $1 $+ !"));
    let engine = Engine::new().with_aliases(aliases);

    let plain = "The quick brown fox jumps over the lazy dog. ".repeat(20);
    let flat = "<$nick> $upper($left($chan,3)) $gettok(a.b.c,2,46) $+ $me ".repeat(10);
    let shallow = nested_line(4);
    let deep = nested_line(32);

    let mut g = c.benchmark_group("expand");
    g.bench_function("plain", |b| b.iter(|| engine.parse(&ctx, black_box(&plain))));
    g.bench_function("flat", |b| b.iter(|| engine.parse(&ctx, black_box(&flat))));
    g.bench_function("nested_4", |b| b.iter(|| engine.parse(&ctx, black_box(&shallow))));
    g.bench_function("nested_32", |b| b.iter(|| engine.parse(&ctx, black_box(&deep))));
    g.bench_function("alias", |b| {
        b.iter(|| engine.parse(&ctx, black_box("$greet($nick) $greet(bob)")))
    });
    g.finish();
}

criterion_group!(benches, bench_expand);
criterion_main!(benches);
