use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::event::Event;

/// Single-consumer dispatch loop over the event bus.
///
/// Dequeues one event at a time and hands it to the processor. When no event
/// arrives within the tick interval the processor is woken with `None`, so
/// time-driven hooks run even on a quiet bus. All processing happens on one
/// thread; the state machines behind the processor need no locking.
pub struct TopicWorker {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl TopicWorker {
    pub fn start<F>(events: Receiver<Event>, tick: Duration, mut processor: F) -> Self
    where
        F: FnMut(Option<Event>) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let handle = thread::spawn(move || loop {
            if stop_flag.load(Ordering::Relaxed) {
                break;
            }
            match events.recv_timeout(tick) {
                Ok(event) => processor(Some(event)),
                Err(RecvTimeoutError::Timeout) => processor(None),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        Self {
            handle: Some(handle),
            stop,
        }
    }

    /// Signal the loop to stop and wait for it to finish.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Instant;

    use super::*;
    use crate::event::Payload;

    #[test]
    fn test_delivers_events_and_idle_ticks() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let worker = TopicWorker::start(rx, Duration::from_millis(5), move |event| {
            sink.lock().unwrap().push(event.map(|e| e.topic));
        });

        tx.send(Event::new("a", Payload::Utterance { text: "x".into() }))
            .unwrap();
        tx.send(Event::new("b", Payload::Utterance { text: "y".into() }))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(1);
        loop {
            {
                let seen = seen.lock().unwrap();
                let events: Vec<String> = seen.iter().flatten().cloned().collect();
                if events.len() == 2 && seen.iter().any(|e| e.is_none()) {
                    assert_eq!(events, vec!["a".to_string(), "b".to_string()]);
                    break;
                }
            }
            assert!(Instant::now() < deadline, "worker did not process events");
            thread::sleep(Duration::from_millis(5));
        }

        worker.stop();
    }

    #[test]
    fn test_stops_when_sender_disconnects() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let worker = TopicWorker::start(rx, Duration::from_millis(5), |_| {});
        drop(tx);
        // the loop ends on disconnect; stop() only joins
        worker.stop();
    }
}
