use std::time::Duration;

use detect_async::{CapturePolicy, DetectConfig, Detector, detect_infallible};
use smol::Timer;

#[test]
fn runs_on_smol() {
    smol::block_on(async {
        let n = 42;
        let found = detect_infallible(
            0..=100,
            |&i, _| async move {
                Timer::after(Duration::from_micros(50)).await;
                i == n
            },
            Some(8),
        )
        .await;

        assert_eq!(found, Some(n));
    })
}

#[test]
fn failure_propagates_on_smol() {
    smol::block_on(async {
        let detector = Detector::new(
            DetectConfig::default()
                .with_default_concurrency(4)
                .with_capture(CapturePolicy::FirstWins),
        );
        let result = detector
            .detect(
                ["ok", "ok", "bad", "ok"],
                |&s, _| async move {
                    Timer::after(Duration::from_millis(1)).await;
                    if s == "bad" { Err(s.len()) } else { Ok(false) }
                },
                None,
            )
            .await;

        assert_eq!(result, Err(3));
    })
}
