use std::time::Duration;

use detect_async::{DetectConfig, Detector};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<(), detect_async::ConfigError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let detector = Detector::new(DetectConfig::from_env()?);
    let n = 42;
    let timer = std::time::Instant::now();
    let res = detector
        .detect_infallible(
            0..=1000,
            |&i, _| async move {
                tokio::time::sleep(Duration::from_micros(10)).await;
                i == n
            },
            None,
        )
        .await;

    assert_eq!(res, Some(n));
    println!(
        "done {}μs (concurrency {})",
        timer.elapsed().as_micros(),
        detector.config().effective_default()
    );
    Ok(())
}
