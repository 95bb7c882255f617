//! Full study sessions against a real FIFO reader.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Sender};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use study::display_mode::NoopRateSetter;
use study::fifo::FifoSink;
use study::trial_log::TrialLog;
use study::{ConditionLists, DisplayMessage, Schedule, Session, StudyRunner};

fn small_lists() -> ConditionLists {
    ConditionLists {
        framerates: vec![60, 240],
        markers: vec!["qr".to_string()],
        scenarios: vec!["text_w".to_string()],
    }
}

/// Reads messages like the display process and answers every rating prompt.
fn spawn_display(
    fifo: PathBuf,
    keys: Sender<char>,
    rating: char,
) -> thread::JoinHandle<Vec<DisplayMessage>> {
    thread::spawn(move || {
        let mut received = Vec::new();
        loop {
            let mut raw = String::new();
            File::open(&fifo)
                .unwrap()
                .read_to_string(&mut raw)
                .unwrap();
            let message = DisplayMessage::parse(&raw).unwrap();
            let finished = message.is_finished();
            let prompt = message.timeout;
            received.push(message);

            if finished {
                return received;
            }
            if prompt {
                keys.send(rating).unwrap();
            }
        }
    })
}

#[test]
fn test_session_over_fifo() {
    let dir = tempfile::tempdir().unwrap();
    let fifo = dir.path().join("studyfifo");
    let log_path = dir.path().join("logfiles").join("log.csv");

    let sink = FifoSink::new(&fifo);
    sink.ensure_fifo().unwrap();

    let (tx, rx) = unbounded();
    let display = spawn_display(fifo, tx.clone(), '2');

    let mut runner = StudyRunner::new(
        "P42",
        sink,
        NoopRateSetter,
        TrialLog::open(&log_path).unwrap(),
        Duration::from_millis(30),
        Duration::ZERO,
    );
    let schedule = Schedule::new(small_lists(), 1, ChaCha8Rng::seed_from_u64(11));
    let mut session = Session::new(schedule);

    tx.send('5').unwrap();
    let summary = runner.run(&mut session, &rx).unwrap();
    let messages = display.join().unwrap();

    assert!(summary.completed);
    assert_eq!(summary.ratings, 2);

    let timeouts: Vec<bool> = messages.iter().map(|m| m.timeout).collect();
    assert_eq!(timeouts, vec![false, true, false, true, false]);
    assert!(messages[4].is_finished());
    assert_eq!(messages[4].framerate, messages[2].framerate);

    let mut rates: Vec<u32> = vec![messages[0].framerate, messages[2].framerate];
    rates.sort();
    assert_eq!(rates, vec![60, 240]);

    let records = TrialLog::read_all(&log_path).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.id == "P42" && r.rating == 2));
    assert_eq!(records[0].framerate, messages[0].framerate);
    assert_eq!(records[1].task, "text_w");
}

#[test]
fn test_second_session_appends_to_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("log.csv");
    let lists = ConditionLists {
        framerates: vec![120],
        ..small_lists()
    };

    for (participant, seed) in [("A", 1u64), ("B", 2u64)] {
        let mut runner = StudyRunner::new(
            participant,
            // No reader: messages are dropped with a warning
            FifoSink::new(dir.path().join("missing_fifo")),
            NoopRateSetter,
            TrialLog::open(&log_path).unwrap(),
            Duration::from_millis(10),
            Duration::ZERO,
        );
        let mut session = Session::new(Schedule::new(
            lists.clone(),
            1,
            ChaCha8Rng::seed_from_u64(seed),
        ));

        let (tx, rx) = unbounded();
        tx.send('5').unwrap();
        let rater = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            tx.send('5').unwrap();
        });
        let summary = runner.run(&mut session, &rx).unwrap();
        rater.join().unwrap();
        assert!(summary.completed);
    }

    let content = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(content.matches("id,timestamp").count(), 1);

    let ids: Vec<String> = TrialLog::read_all(&log_path)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["A", "B"]);
}
