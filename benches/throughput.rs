use criterion::{criterion_group, criterion_main, Criterion};
use opsrouter::router::HandlerTable;
use opsrouter::runtime_config::RuntimeConfig;
use opsrouter::{Dispatcher, HttpMethod, OperationConfig, RawRequest};
use std::convert::Infallible;
use std::hint::black_box;
use std::time::Duration;

fn verb_zoo() -> HandlerTable<&'static str> {
    // Slow-route warnings would dominate the measurement.
    let mut table = HandlerTable::with_slow_route_threshold(Duration::from_secs(1));
    let routes = [
        (HttpMethod::Get, "/", "root_handler"),
        (HttpMethod::Get, "/animals", "get_animals"),
        (HttpMethod::Post, "/animals", "create_animal"),
        (HttpMethod::Get, "/zoo/animals/{id}", "get_animal"),
        (HttpMethod::Put, "/zoo/animals/{id}", "update_animal"),
        (HttpMethod::Patch, "/zoo/animals/{id}", "patch_animal"),
        (HttpMethod::Delete, "/zoo/animals/{id}", "delete_animal"),
        (HttpMethod::Get, "/zoo/animals/{id}/toys/{toy_id}", "animal_toy"),
        (
            HttpMethod::Get,
            "/zoo/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}",
            "habitat_section",
        ),
        (
            HttpMethod::Post,
            "/inventory/{warehouse_id}/feeds/{feed_id}/items/{item_id}/batches/{batch_id}",
            "post_item_batch",
        ),
        (
            HttpMethod::Get,
            "/complex/{a}/{b}/{c}/{d}/{e}/{f}/{g}/{h}/{i}",
            "complex_many_params",
        ),
        (HttpMethod::Get, "/files/{path+}", "get_file"),
        (HttpMethod::Head, "/health", "health_check"),
    ];
    for (method, pattern, handler) in routes {
        table
            .register(method, pattern, handler)
            .expect("valid pattern");
    }
    table
}

fn bench_route_throughput(c: &mut Criterion) {
    let table = verb_zoo();
    c.bench_function("route_match", |b| {
        let test_paths = [
            (HttpMethod::Get, "/Animals"),
            (HttpMethod::Get, "/zoo/animals/123"),
            (HttpMethod::Get, "/zoo/animals/123/toys/456"),
            (HttpMethod::Get, "/zoo/cats/animals/123/habitats/88/sections/5"),
            (HttpMethod::Post, "/inventory/1/feeds/2/items/3/batches/4"),
            (HttpMethod::Get, "/complex/1/2/3/4/5/6/7/8/9"),
            (HttpMethod::Get, "/files/a/b/c/d.txt"),
        ];
        b.iter(|| {
            for (method, path) in &test_paths {
                let res = table.resolve(path, method);
                black_box(&res);
            }
        });
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let config = RuntimeConfig {
        slow_route_threshold: Duration::from_secs(1),
        ..RuntimeConfig::default()
    };
    let mut dispatcher = Dispatcher::with_config((), config);
    dispatcher
        .register_sync(
            "/echo/{id}",
            HttpMethod::Post,
            |input: serde_json::Value, _ctx: &()| Ok::<_, Infallible>(input),
            OperationConfig::new().input_sources(
                opsrouter::input::InputSources::PATH
                    | opsrouter::input::InputSources::QUERY
                    | opsrouter::input::InputSources::BODY,
            ),
        )
        .expect("valid pattern");

    let request = RawRequest::new(HttpMethod::Post, "/echo/42?verbose=true")
        .with_json(&serde_json::json!({ "name": "rex", "age": 3 }));
    c.bench_function("dispatch_path_query_body", |b| {
        b.iter(|| black_box(dispatcher.dispatch(&request)));
    });
}

criterion_group!(benches, bench_route_throughput, bench_dispatch);
criterion_main!(benches);
