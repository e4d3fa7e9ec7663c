use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use cuproute::coerce::FieldType;
use cuproute::dependency::builtin;
use cuproute::prelude::*;
use cuproute::router::{MethodFilter, Router};
use http::Method;

fn noop(name: &str) -> Handler {
    Handler::new(|_| Ok(())).named(name)
}

fn zoo_router() -> Router {
    let mut router = Router::new();
    let routes: [(Method, &str, Handler); 7] = [
        (Method::GET, "/", noop("root_handler")),
        (Method::GET, "/zoo/animals", noop("get_animals")),
        (Method::POST, "/zoo/animals", noop("create_animal")),
        (
            Method::GET,
            "/zoo/animals/{id}",
            noop("get_animal").param("id", FieldType::Integer),
        ),
        (
            Method::GET,
            "/zoo/animals/{id}/toys/{toy_id}",
            noop("animal_toy")
                .param("id", FieldType::Integer)
                .param("toy_id", FieldType::Integer),
        ),
        (
            Method::GET,
            "/zoo/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}",
            noop("habitat_section")
                .untyped_param("category")
                .param("id", FieldType::Integer)
                .param("habitat_id", FieldType::Integer)
                .param("section_id", FieldType::Integer),
        ),
        (
            Method::POST,
            "/inventory/{warehouse_id}/feeds/{feed_id}/items/{item_id}/batches/{batch_id}",
            noop("post_item_batch")
                .untyped_param("warehouse_id")
                .untyped_param("feed_id")
                .untyped_param("item_id")
                .untyped_param("batch_id"),
        ),
    ];
    for (method, path, handler) in routes {
        router
            .add_route(&[MethodFilter::from(method)], path, handler)
            .expect("valid route");
    }
    router
}

fn bench_route_throughput(c: &mut Criterion) {
    let router = zoo_router();
    c.bench_function("route_match", |b| {
        let test_paths = [
            ("GET", "/zoo/animals/123"),
            ("GET", "/zoo/animals/123/toys/456"),
            ("GET", "/zoo/cats/animals/123/habitats/88/sections/5"),
            ("POST", "/inventory/1/feeds/2/items/3/batches/4"),
        ];
        b.iter(|| {
            for (method, path) in test_paths.iter() {
                let res = router.handle_route(method, path);
                black_box(&res);
            }
        })
    });
}

fn bench_serve(c: &mut Criterion) {
    let mut app = App::new();
    app.get(
        "/zoo/animals/{id}",
        Handler::new(|args| {
            let id: i64 = args.param("id")?;
            let verbose: ParamValue = args.take("verbose")?;
            Ok(serde_json::json!({ "id": id, "verbose": verbose.as_bool() }))
        })
        .param("id", FieldType::Integer)
        .inject_as(
            "verbose",
            FieldType::optional(FieldType::Boolean),
            builtin::query(),
        ),
    )
    .expect("valid route");

    c.bench_function("serve_json", |b| {
        b.iter(|| {
            let response = app.serve(Request::from_target("GET", "/zoo/animals/42?verbose=true"));
            black_box(response);
        })
    });
}

criterion_group!(benches, bench_route_throughput, bench_serve);
criterion_main!(benches);
