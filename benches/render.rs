use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use coref_demo_rs::{ClusterPayload, Resolution, SubmissionRequest, manual_mentions};

fn synthetic_payload(mentions: usize, cluster_size: usize) -> Vec<u8> {
    let payload = ClusterPayload {
        mentions: (0..mentions).map(|idx| format!("mention número {idx}")).collect(),
        clusters: (0..mentions)
            .collect::<Vec<_>>()
            .chunks(cluster_size)
            .map(|chunk| chunk.to_vec())
            .collect(),
    };
    serde_json::to_vec(&payload).expect("serializable payload")
}

fn bench_parse_and_render(c: &mut Criterion) {
    const CASES: &[(usize, usize)] = &[(20, 3), (200, 5), (2_000, 8)];
    for &(mentions, cluster_size) in CASES {
        let body = synthetic_payload(mentions, cluster_size);
        c.bench_with_input(
            BenchmarkId::new("parse_and_render", mentions),
            &body,
            |b, body| {
                b.iter(|| {
                    let resolution = Resolution::from_json(body).expect("valid payload");
                    black_box(resolution.render());
                });
            },
        );
    }
}

fn bench_form_encoding(c: &mut Criterion) {
    let document = "Segundo [fontes aeroportuárias], [os membros da [tripulação]] eram russos & co = 100%. "
        .repeat(50);
    let request = SubmissionRequest::new(document, 0, true);
    c.bench_function("form::encode", |b| {
        b.iter(|| black_box(request.encode_form()));
    });
    let body = request.encode_form();
    c.bench_function("form::decode", |b| {
        b.iter(|| black_box(SubmissionRequest::decode_form(&body).expect("decodable body")));
    });
}

fn bench_manual_mentions(c: &mut Criterion) {
    let text = "[Brasil] buscará [el pase a [su] primera final de la [Copa_Davis]] ante [los vigentes campeones]. "
        .repeat(40);
    c.bench_function("annotation::manual_mentions", |b| {
        b.iter(|| black_box(manual_mentions(&text).expect("balanced markup")));
    });
}

criterion_group!(
    benches,
    bench_parse_and_render,
    bench_form_encoding,
    bench_manual_mentions
);
criterion_main!(benches);
