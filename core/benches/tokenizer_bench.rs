use criterion::{criterion_group, criterion_main, Criterion};
use quarry_core::tokenizer::{tokenize, tokenize_html};

static PAGE: &str = r#"<html>
<head>
  <title>World news roundup</title>
  <style>article { font-family: serif; } .ad { display: none; }</style>
  <script>window.analytics = { pageviews: 12345, session: "abc" };</script>
</head>
<body>
  <article>
    <h1>Markets rally as shipping lanes reopen</h1>
    <p>Global freight volumes recovered sharply this quarter, with container
    traffic through the main corridors returning to pre-disruption levels.
    Analysts cautioned that energy prices remain volatile and that the
    recovery is uneven across regions.</p>
    <p>Port authorities reported record throughput on Tuesday, crediting
    improved scheduling and a return of seasonal demand. Retailers expect
    inventories to normalize before the holidays.</p>
  </article>
</body>
</html>"#;

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize_text", |b| b.iter(|| tokenize(PAGE)));
    c.bench_function("tokenize_html", |b| b.iter(|| tokenize_html(PAGE)));
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
