use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use typist::engine::Typist;
use typist::keyboard::KeyboardLayout;
use typist::options::{DelayRange, Options};

fn recording_options(multiplier: f64) -> (Options, Arc<Mutex<Vec<String>>>) {
    let renders = Arc::new(Mutex::new(Vec::new()));
    let sink = renders.clone();

    let options = Options {
        callback: Some(Arc::new(move |rendered: &str| {
            sink.lock().unwrap().push(rendered.to_string());
        })),
        per_letter_delay: Some(DelayRange::new(0, 0)),
        erase_delay: Some(DelayRange::new(0, 0)),
        error_multiplier: Some(multiplier),
        ..Default::default()
    };

    (options, renders)
}

// With a huge multiplier every probability check past the first clean letter
// fires, so injection chains until the look-ahead runs out of sentence and
// the rendering sequence is fully determined by the instruction list.
#[tokio::test]
async fn forced_mistakes_still_converge_to_the_intended_text() {
    let (options, renders) = recording_options(1e9);
    let mut typist = Typist::with_rng(options, StdRng::seed_from_u64(3));

    typist.type_text("ab");
    typist.run().await.unwrap();

    assert_eq!(typist.text(), "ab");

    // a | a+wrong(b) | a (unwind) | ab
    let renders = renders.lock().unwrap();
    assert_eq!(renders.len(), 4);
    assert_eq!(renders[0], "a");
    assert_eq!(renders[1].len(), 2);
    assert_eq!(renders[2], "a");
    assert_eq!(renders[3], "ab");
    assert_ne!(renders[1], "ab");
}

#[tokio::test]
async fn forced_mistakes_chain_until_lookahead_runs_out() {
    let (options, renders) = recording_options(1e9);
    let mut typist = Typist::with_rng(options, StdRng::seed_from_u64(3));

    typist.type_text("abc");
    typist.run().await.unwrap();

    assert_eq!(typist.text(), "abc");
    // a | +wrong | +wrong | unwind | unwind | ab | +wrong | unwind | abc
    assert_eq!(renders.lock().unwrap().len(), 9);
}

#[tokio::test]
async fn zero_multiplier_disables_injection() {
    let (options, renders) = recording_options(0.0);
    let mut typist = Typist::with_rng(options, StdRng::seed_from_u64(3));

    typist.type_text("hello world");
    typist.run().await.unwrap();

    assert_eq!(typist.text(), "hello world");
    assert_eq!(renders.lock().unwrap().len(), "hello world".len());
}

#[tokio::test]
async fn no_special_char_errors_skips_punctuation() {
    let (mut options, renders) = recording_options(1e9);
    options.no_special_char_errors = Some(true);

    let mut typist = Typist::with_rng(options, StdRng::seed_from_u64(3));
    typist.type_text("a--");
    typist.run().await.unwrap();

    assert_eq!(typist.text(), "a--");
    // The look-ahead always lands on '-': no injection anywhere.
    assert_eq!(renders.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn unknown_locale_never_injects() {
    let (mut options, renders) = recording_options(1e9);
    options.locale = Some("xx".to_string());

    let mut typist = Typist::with_rng(options, StdRng::seed_from_u64(3));
    typist.type_text("abc");
    typist.run().await.unwrap();

    assert_eq!(typist.text(), "abc");
    assert_eq!(renders.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn registered_layouts_supply_the_wrong_neighbors() {
    let (mut options, renders) = recording_options(1e9);
    options.locale = Some("toy".to_string());

    let mut typist = Typist::with_rng(options, StdRng::seed_from_u64(3));
    typist.add_keyboard("toy", KeyboardLayout::from_rows(&["xy"]));
    typist.type_text("xx");
    typist.run().await.unwrap();

    assert_eq!(typist.text(), "xx");

    // The injected wrong letter can only be the other key on the toy layout.
    let renders = renders.lock().unwrap();
    assert!(renders.iter().any(|r| r.contains('y')));
}

#[tokio::test]
async fn characters_missing_from_the_layout_never_inject() {
    let (mut options, renders) = recording_options(1e9);
    options.locale = Some("toy".to_string());

    let mut typist = Typist::with_rng(options, StdRng::seed_from_u64(3));
    typist.add_keyboard("toy", KeyboardLayout::from_rows(&["xy"]));
    typist.type_text("zz");
    typist.run().await.unwrap();

    assert_eq!(typist.text(), "zz");
    assert_eq!(renders.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn seeded_runs_reproduce_the_same_render_stream() {
    let mut streams = Vec::new();

    for _ in 0..2 {
        let (options, renders) = recording_options(5.0);
        let mut typist = Typist::with_rng(options, StdRng::seed_from_u64(99));
        typist.type_text("the quick brown fox");
        typist.run().await.unwrap();

        assert_eq!(typist.text(), "the quick brown fox");
        streams.push(renders.lock().unwrap().clone());
    }

    assert_eq!(streams[0], streams[1]);
}
