use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http::{HeaderMap, HeaderValue, Method};
use seller_gateway::config::RouteConfig;
use seller_gateway::rate_limit::{KeyResolver, RateLimitKey, SellerKeyResolver};
use seller_gateway::router::Router;

fn seller_headers(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("X-Seller-Id", HeaderValue::from_str(value).unwrap());
    headers.insert("Content-Type", HeaderValue::from_static("application/json"));
    headers.insert("Accept", HeaderValue::from_static("*/*"));
    headers
}

fn benchmark_key_resolution(c: &mut Criterion) {
    let resolver = SellerKeyResolver::default();
    let mut group = c.benchmark_group("key_resolution");

    for (name, value) in [
        ("plain", "42"),
        ("padded", "   42   "),
        ("long", "seller-0123456789abcdef0123456789abcdef"),
        ("blank", "    "),
    ] {
        let headers = seller_headers(value);
        group.bench_with_input(BenchmarkId::from_parameter(name), &headers, |b, headers| {
            b.iter(|| black_box(resolver.resolve(black_box(headers))))
        });
    }

    let missing = HeaderMap::new();
    group.bench_function("missing", |b| {
        b.iter(|| black_box(resolver.resolve(black_box(&missing))))
    });

    group.finish();
}

fn benchmark_hash_slot(c: &mut Criterion) {
    let key = RateLimitKey::for_seller("seller-0123456789");

    c.bench_function("hash_slot", |b| b.iter(|| black_box(black_box(&key).hash_slot())));
}

fn benchmark_router_match(c: &mut Criterion) {
    let routes = ["/api/orders", "/api/orders/:id", "/api/catalog/*rest"]
        .iter()
        .map(|path| RouteConfig {
            path: path.to_string(),
            backend: "http://localhost:3000".to_string(),
            methods: vec![],
            strip_prefix: false,
            description: "".to_string(),
            fallback: true,
        })
        .collect();

    let router = Router::new(routes).expect("Failed to create router");

    c.bench_function("router_param_match", |b| {
        b.iter(|| black_box(router.match_route(black_box("/api/orders/123"), &Method::GET)))
    });
}

criterion_group!(
    benches,
    benchmark_key_resolution,
    benchmark_hash_slot,
    benchmark_router_match
);
criterion_main!(benches);
