use criterion::{Criterion, criterion_group, criterion_main};
use media_geotagger::features::gps::{GeoCoordinate, encode_coordinate};
use media_geotagger::{GeocodeCache, GeocodingClient, GeocodingConfig, OfflineBackend};
use std::hint::black_box;
use tokio::runtime::Runtime;

fn bench(c: &mut Criterion) {
    let paris = GeoCoordinate::new(48.8566, 2.3522).unwrap();

    c.bench_function("gps::encode_decode", |b| {
        b.iter(|| {
            let (latitude, longitude) = encode_coordinate(black_box(paris));
            (latitude.to_decimal(), longitude.to_decimal())
        });
    });

    let rt = Runtime::new().unwrap();
    let client = GeocodingClient::new(
        OfflineBackend::new(),
        GeocodeCache::new(),
        &GeocodingConfig::default(),
    );
    rt.block_on(async { client.resolve(paris).await.unwrap() });

    c.bench_function("geocoding_client.resolve (cache hit)", |b| {
        b.iter(|| {
            rt.block_on(async {
                let _ = client.resolve(black_box(paris)).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench);
criterion_main!(benches);
