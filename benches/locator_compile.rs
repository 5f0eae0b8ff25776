//! Locator compilation benchmarks.
//!
//! Measures compiling each locator family to its wire form, and the
//! relative rewrite used for element-scoped lookups.
//!
//! Run with: cargo bench --bench locator_compile
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use webdriver_wire::{By, RoleOptions, TextOptions};

// ============================================================================
// Inputs
// ============================================================================

fn locators() -> Vec<(&'static str, By)> {
    vec![
        ("css", By::css("form#login > input[type=email]")),
        ("id", By::id("submit")),
        ("test_id", By::test_id("checkout-button")),
        ("text", By::text("Sign in")),
        ("partial_text", By::partial_text("Welcome back")),
        (
            "text_insensitive",
            By::text_with("ADD TO CART", TextOptions::default().case_sensitive(false)),
        ),
        ("role_named", By::role_named("button", "Place order")),
        (
            "role_options",
            By::role_with(
                "heading",
                RoleOptions {
                    name: Some("Orders".to_string()),
                    ..RoleOptions::default()
                },
            ),
        ),
        ("label", By::label("Email address")),
        ("placeholder", By::placeholder("Search…")),
        ("quoted_text", By::text(r#"He said "it's fine""#)),
    ]
}

// ============================================================================
// Benchmark: Compile
// ============================================================================

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for (name, by) in locators() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &by, |b, by| {
            b.iter(|| black_box(by).compile());
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Relative Rewrite
// ============================================================================

fn bench_relative(c: &mut Criterion) {
    let mut group = c.benchmark_group("relative");

    for (name, by) in locators() {
        let locator = by.compile();
        group.bench_with_input(BenchmarkId::from_parameter(name), &locator, |b, locator| {
            b.iter(|| black_box(locator).relative());
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Wire JSON
// ============================================================================

fn bench_to_json(c: &mut Criterion) {
    let locator = By::role_named("button", "Place order").compile();

    c.bench_function("to_json", |b| {
        b.iter(|| black_box(&locator).to_json());
    });
}

criterion_group!(benches, bench_compile, bench_relative, bench_to_json);
criterion_main!(benches);
