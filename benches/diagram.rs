use chipview::config::{Config, RoutingConfig};
use chipview::diagram::{Diagram, Direction};
use chipview::model::Design;
use chipview::render::render_svg;
use chipview::session::Session;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

/// A root with `children` leaf blocks chained output to input, each with
/// `ports` inputs and outputs.
fn chained_design_source(children: usize, ports: usize) -> String {
    let port_list = |prefix: &str| {
        (0..ports)
            .map(|i| format!("{{\"name\": \"{prefix}{i}\", \"type\": \"data\"}}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let leaf = |i: usize| {
        format!(
            "{{\"id\": \"u{i}\", \"type\": \"leaf\", \"ports\": {{\"input\": [{}], \"output\": [{}]}}}}",
            port_list("in"),
            port_list("out")
        )
    };
    let mut connections = Vec::new();
    for i in 0..children.saturating_sub(1) {
        for p in 0..ports {
            connections.push(format!(
                "{{\"start\": {{\"block\": \"u{i}\", \"port\": \"out{p}\"}}, \"end\": {{\"block\": \"u{}\", \"port\": \"in{p}\"}}}}",
                i + 1
            ));
        }
    }
    format!(
        "{{\"id\": \"top\", \"type\": \"soc\", \"children\": [{}], \"connections\": [{}]}}",
        (0..children).map(leaf).collect::<Vec<_>>().join(", "),
        connections.join(", ")
    )
}

fn fixture(name: &str) -> &'static str {
    match name {
        "soc_small" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/soc_small.json"
        )),
        "nested" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/nested.json"
        )),
        _ => panic!("unknown fixture"),
    }
}

fn sources() -> Vec<(String, String)> {
    let mut out = vec![
        ("soc_small".to_string(), fixture("soc_small").to_string()),
        ("nested".to_string(), fixture("nested").to_string()),
    ];
    for (children, ports) in [(4, 4), (8, 8), (16, 12)] {
        out.push((
            format!("chain_{children}x{ports}"),
            chained_design_source(children, ports),
        ));
    }
    out
}

fn shown_config() -> Config {
    let mut config = Config::default();
    config.layout.fast_text_metrics = true;
    config.view.show_types = vec!["data".to_string(), "clock".to_string()];
    config
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, source) in sources() {
        group.bench_with_input(BenchmarkId::from_parameter(&name), &source, |b, data| {
            b.iter(|| {
                let design = Design::from_json(black_box(data)).expect("parse failed");
                black_box(design.root.children.len());
            });
        });
    }
    group.finish();
}

fn bench_layout_route(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_route");
    let routing = RoutingConfig::default();
    for (name, source) in sources() {
        let mut session = Session::new(shown_config());
        session
            .load(Design::from_json(&source).expect("parse failed"))
            .expect("load failed");
        let diagram: Diagram = session.diagram().clone();
        group.bench_with_input(BenchmarkId::from_parameter(&name), &diagram, |b, base| {
            b.iter(|| {
                let mut diagram = base.clone();
                diagram.layout();
                diagram.route(&routing);
                black_box(diagram.revision());
            });
        });
    }
    group.finish();
}

fn bench_grid_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_search");
    let routing = RoutingConfig::default();
    for count in [8usize, 32, 64] {
        let mut diagram = Diagram::new();
        let top = diagram.add_root("top", "top", true);
        let mut previous = None;
        for i in 0..count {
            let block = diagram.add_subblock(top, format!("u{i}"), format!("u{i}"), true);
            let input = diagram.add_port(block, "in", "in", Direction::Input);
            let output = diagram.add_port(block, "out", "out", Direction::Output);
            if let Some(prev) = previous {
                let net = diagram.connect(top, prev, input).expect("connect failed");
                diagram.set_visible(net, true);
            }
            previous = Some(output);
        }
        group.bench_with_input(BenchmarkId::from_parameter(count), &diagram, |b, base| {
            b.iter(|| {
                let mut diagram = base.clone();
                diagram.route(&routing);
                black_box(diagram.revision());
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    for (name, source) in sources() {
        group.bench_with_input(BenchmarkId::from_parameter(&name), &source, |b, data| {
            b.iter(|| {
                let mut session = Session::new(shown_config());
                let scene = session
                    .load(Design::from_json(black_box(data)).expect("parse failed"))
                    .expect("load failed");
                let svg = render_svg(&scene);
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_parse, bench_layout_route, bench_grid_search, bench_end_to_end
);
criterion_main!(benches);
