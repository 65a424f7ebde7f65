use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cvu_cascade::{DefinitionStore, Situation, ViewResolver};
use cvu_core::Domain;

const DEFAULTS: &str = r#"
*[] {
    defaultRenderer: "list"
}

[renderer = list] {
    spacing: 10
    edgeInset: [5, 10]
}

Note[] {
    query: "Note"
    title: "All Notes"
    [renderer = list] {
        ItemCell { rendererNames: ["list"] }
    }
}
"#;

const USER: &str = r#"
Note[] {
    title: "My Notes"
    [renderer = list] {
        spacing: 4
    }
}
"#;

fn resolver() -> ViewResolver {
    let mut store = DefinitionStore::new();
    store.add_source(Domain::Defaults, DEFAULTS).expect("defaults");
    store.add_source(Domain::User, USER).expect("user");
    ViewResolver::new(store)
}

fn bench_resolve(c: &mut Criterion) {
    let uncached = resolver();
    let mut cached = resolver();
    let situation = Situation::list("Note");
    c.bench_function("cvu/resolve_uncached", |b| {
        b.iter(|| {
            let view = uncached.resolve_uncached(black_box(&situation)).expect("resolve");
            black_box(view.properties.len());
        });
    });

    c.bench_function("cvu/resolve_cached", |b| {
        b.iter(|| {
            let view = cached.resolve("main", black_box(&situation)).expect("resolve");
            black_box(view.properties.len());
        });
    });
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
