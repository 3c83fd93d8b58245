use criterion::*;

fn bench_select_parser(c: &mut Criterion) {
    let query = "SELECT event, properties.$browser AS browser, count() AS total \
                 FROM events \
                 WHERE timestamp > now() - INTERVAL 7 DAY \
                 GROUP BY event, browser \
                 ORDER BY total DESC \
                 LIMIT 100";

    c.bench_function("select_parser", move |b| {
        b.iter(|| black_box(hogql_parser::parse_select(query, true)))
    });
}

fn bench_expr_parser(c: &mut Criterion) {
    let expr = "arrayMap(x -> x.1 + 1, splitByChar(',', properties.ids))";

    c.bench_function("expr_parser", move |b| {
        b.iter(|| black_box(hogql_parser::parse_expr(expr, true)))
    });
}

fn bench_program_parser(c: &mut Criterion) {
    let program = include_str!("testdata/program.hogql");

    c.bench_function("program_parser", move |b| {
        b.iter(|| black_box(hogql_parser::parse_program(program, true)))
    });
}

criterion_group!(benches, bench_select_parser, bench_expr_parser, bench_program_parser);
criterion_main!(benches);
