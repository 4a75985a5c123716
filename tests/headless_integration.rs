use std::sync::{mpsc, Arc};
use std::time::Duration;

use crossterm::event::KeyCode;
use rand::{rngs::StdRng, SeedableRng};

use levelcheck::content::ContentBanks;
use levelcheck::placement::{PlacementTest, TestConfig};
use levelcheck::profile::MemoryProfileStore;
use levelcheck::runtime::{AppEvent, Runner, TestEventSource};
use levelcheck::session::{Session, View};
use levelcheck::stats::StatsDb;
use levelcheck::VocabEstimates;

fn session(seed: u64) -> Session {
    let banks = Arc::new(ContentBanks::embedded().unwrap());
    let test = PlacementTest::new(banks, TestConfig::default(), VocabEstimates::default())
        .with_rng(StdRng::seed_from_u64(seed));
    Session::new(
        test,
        "Omar",
        Box::new(MemoryProfileStore::new()),
        Some(StatsDb::open_in_memory().unwrap()),
    )
}

// Headless run through Runner/TestEventSource without a TTY: the learner
// always presses Enter, so the first option is picked every time.
#[test]
fn headless_enter_only_flow_finishes() {
    let mut session = session(11);
    session.begin();

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(5));

    for _ in 0..500u32 {
        if session.view() == &View::Finished {
            break;
        }
        tx.send(AppEvent::key(KeyCode::Enter)).unwrap();
        match runner.step() {
            AppEvent::Key(key) if key.code == KeyCode::Enter => session.confirm(),
            _ => {}
        }
    }

    assert_eq!(session.view(), &View::Finished);
    let result = session.result().expect("finished test has a result");
    let db = session.stats_db().unwrap();
    assert_eq!(db.answers().unwrap().len() as u32, result.totals().total);
    assert_eq!(db.test_count().unwrap(), 1);
}

#[test]
fn headless_idle_runner_only_ticks() {
    let mut session = session(12);
    session.begin();
    let before = session.question().cloned();

    let (_tx, rx) = mpsc::channel::<AppEvent>();
    let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(2));
    for _ in 0..5 {
        assert_eq!(runner.step(), AppEvent::Tick);
    }
    assert_eq!(session.question().cloned(), before);
    assert_eq!(session.view(), &View::Question);
}

#[test]
fn headless_digit_keys_answer_directly() {
    let mut session = session(13);
    session.begin();

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(5));
    tx.send(AppEvent::key(KeyCode::Char('2'))).unwrap();

    if let AppEvent::Key(key) = runner.step() {
        if let KeyCode::Char(c @ '1'..='9') = key.code {
            assert!(session.select(c as usize - '1' as usize));
            session.confirm();
        }
    }
    assert!(matches!(session.view(), View::Feedback(_)));
    assert_eq!(session.selected(), 1);
}
