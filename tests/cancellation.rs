use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::timeout;

use typist::engine::Typist;
use typist::options::{DelayRange, Options};

fn slow_options(renders: &Arc<Mutex<Vec<String>>>) -> Options {
    let sink = renders.clone();
    Options {
        callback: Some(Arc::new(move |rendered: &str| {
            sink.lock().unwrap().push(rendered.to_string());
        })),
        per_letter_delay: Some(DelayRange::new(10_000, 10_000)),
        erase_delay: Some(DelayRange::new(10_000, 10_000)),
        error_multiplier: Some(0.0),
        ..Default::default()
    }
}

async fn wait_for_first_render(renders: &Arc<Mutex<Vec<String>>>) {
    for _ in 0..200 {
        if !renders.lock().unwrap().is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("engine never rendered");
}

#[tokio::test]
async fn reset_mid_delay_resolves_the_run_without_finishing() {
    let renders = Arc::new(Mutex::new(Vec::new()));
    let mut typist = Typist::with_rng(slow_options(&renders), StdRng::seed_from_u64(1));
    typist.type_text("abcdefgh");

    let handle = typist.handle();
    let task = tokio::spawn(async move {
        typist.run().await.unwrap();
        typist
    });

    wait_for_first_render(&renders).await;
    handle.reset();

    let typist = timeout(Duration::from_secs(2), task)
        .await
        .expect("run did not resolve after reset")
        .unwrap();

    assert!(handle.is_reset());
    assert!(renders.lock().unwrap().len() < 8);
    assert!(typist.text().len() < 8);
}

#[tokio::test]
async fn reset_before_any_rendering_silently_abandons_the_queue() {
    let renders = Arc::new(Mutex::new(Vec::new()));
    let mut typist = Typist::with_rng(slow_options(&renders), StdRng::seed_from_u64(1));
    typist.wait(60_000).type_text("never");

    let handle = typist.handle();
    let task = tokio::spawn(async move { typist.run().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.reset();

    let result = timeout(Duration::from_secs(2), task)
        .await
        .expect("run did not resolve after reset")
        .unwrap();

    assert!(result.is_ok());
    assert!(renders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn fast_forward_cuts_the_pending_wait_short() {
    let renders = Arc::new(Mutex::new(Vec::new()));
    let mut options = slow_options(&renders);
    options.per_letter_delay = Some(DelayRange::new(10_000, 10_000));

    let mut typist = Typist::with_rng(options, StdRng::seed_from_u64(1));
    typist.wait(600_000).type_text("hi");

    let handle = typist.handle();
    let task = tokio::spawn(async move {
        typist.run().await.unwrap();
        typist
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.fast_forward(true);

    let typist = timeout(Duration::from_secs(5), task)
        .await
        .expect("fast-forwarded run did not finish")
        .unwrap();

    assert_eq!(typist.text(), "hi");
    assert_eq!(renders.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn fast_forward_enabled_upfront_skips_waits_entirely() {
    let renders = Arc::new(Mutex::new(Vec::new()));
    let mut typist = Typist::with_rng(slow_options(&renders), StdRng::seed_from_u64(1));
    typist.wait(600_000).type_text("ok").wait(600_000);
    typist.fast_forward(true);

    timeout(Duration::from_secs(5), typist.run())
        .await
        .expect("run did not finish with fast-forward on")
        .unwrap();

    assert_eq!(typist.text(), "ok");
}

#[tokio::test(start_paused = true)]
async fn delays_advance_the_clock_by_the_configured_amount() {
    let renders = Arc::new(Mutex::new(Vec::new()));
    let mut options = slow_options(&renders);
    options.per_letter_delay = Some(DelayRange::new(100, 100));

    let mut typist = Typist::with_rng(options, StdRng::seed_from_u64(1));
    typist.type_text("abcde").wait(1_000);

    let start = tokio::time::Instant::now();
    typist.run().await.unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(1_500));
    assert!(elapsed < Duration::from_millis(1_700));
}

#[tokio::test]
async fn run_after_reset_starts_from_a_clean_cursor() {
    let renders = Arc::new(Mutex::new(Vec::new()));
    let mut options = slow_options(&renders);
    options.per_letter_delay = Some(DelayRange::new(0, 0));
    options.erase_delay = Some(DelayRange::new(0, 0));

    let mut typist = Typist::with_rng(options, StdRng::seed_from_u64(1));
    typist.type_text("ab");
    typist.run().await.unwrap();
    assert_eq!(typist.text(), "ab");

    typist.reset(true);
    typist.type_text("cd");
    typist.run().await.unwrap();

    assert_eq!(typist.text(), "cd");
}
