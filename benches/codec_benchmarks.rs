// ABOUTME: Benchmark suite for TPDU encoding, text segmentation and status report decoding
// ABOUTME: Measures the work the dispatcher does per send before anything reaches the radio

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use gsm_sms::codec::pack_septets;
use gsm_sms::datatypes::{GsmAddress, SmsStatusReport, gsm_alphabet};
use gsm_sms::segment::{SubmitTemplate, divide_message, text_submits};
use gsm_sms::Encodable;
use std::time::Duration;

const STATUS_REPORT: [u8; 25] = [
    0x00, 0x06, 0x2A, 0x0A, 0x81, 0x56, 0x10, 0x00, 0x02, 0x00, 0x21, 0x01, 0x31, 0x21, 0x43,
    0x65, 0x8A, 0x21, 0x01, 0x31, 0x21, 0x53, 0x65, 0x8A, 0x00,
];

fn template() -> SubmitTemplate {
    SubmitTemplate {
        destination: GsmAddress::parse("+16501002000").unwrap(),
        status_report_request: true,
        validity: None,
    }
}

fn sample_texts() -> Vec<(&'static str, String)> {
    vec![
        ("gsm7_short", "Hello World".to_string()),
        ("gsm7_long", "The quick brown fox jumps over the lazy dog. ".repeat(10)),
        ("gsm7_escapes", "{[price]} ~ 10€ | ".repeat(20)),
        ("ucs2", "Привет, как дела? ".repeat(8)),
    ]
}

fn bench_divide_message(c: &mut Criterion) {
    let mut group = c.benchmark_group("divide_message");
    group.measurement_time(Duration::from_secs(10));

    for (name, text) in sample_texts() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &text, |b, text| {
            b.iter(|| divide_message(black_box(text)))
        });
    }

    group.finish();
}

fn bench_encode_submits(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_submits");
    group.measurement_time(Duration::from_secs(10));
    let template = template();

    for (name, text) in sample_texts() {
        let parts = divide_message(&text);
        group.bench_with_input(BenchmarkId::from_parameter(name), &parts, |b, parts| {
            b.iter(|| {
                text_submits(&template, black_box(parts), 7)
                    .unwrap()
                    .iter()
                    .map(|submit| submit.to_bytes().unwrap())
                    .collect::<Vec<_>>()
            })
        });
    }

    group.finish();
}

fn bench_pack_septets(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack_septets");

    for size in [10usize, 80, 160] {
        let text = "a".repeat(size);
        let septets = gsm_alphabet::encode(&text).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &septets, |b, septets| {
            b.iter(|| pack_septets(black_box(septets), 0))
        });
    }

    group.finish();
}

fn bench_status_report_decode(c: &mut Criterion) {
    c.bench_function("status_report_decode", |b| {
        b.iter(|| SmsStatusReport::decode_from_modem(black_box(&STATUS_REPORT)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_divide_message,
    bench_encode_submits,
    bench_pack_septets,
    bench_status_report_decode
);
criterion_main!(benches);
