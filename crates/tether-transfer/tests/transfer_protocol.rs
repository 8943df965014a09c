//! Callback ordering, termination and failure of the transfer loop.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use tether_transfer::{
    InMemoryUploadHandler, SharedListener, TransferContext, TransferError, TransferOutcome,
    TransferProgressHandlers, TransferProgressListener, transfer_with_buffer,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Start,
    Progress(u64, Option<u64>),
    Complete(u64),
    Terminate(u64),
    Error(String),
}

#[derive(Default)]
struct Recorder {
    interval: u64,
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn every(interval: u64) -> Arc<Self> {
        Arc::new(Self {
            interval,
            events: Mutex::new(Vec::new()),
        })
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl TransferProgressListener for Recorder {
    fn on_start(&self, _ctx: &TransferContext) {
        self.push(Event::Start);
    }

    fn on_progress(&self, _ctx: &TransferContext, transferred: u64, total: Option<u64>) {
        self.push(Event::Progress(transferred, total));
    }

    fn on_complete(&self, _ctx: &TransferContext, transferred: u64) {
        self.push(Event::Complete(transferred));
    }

    fn on_terminate(&self, _ctx: &TransferContext, transferred: u64) {
        self.push(Event::Terminate(transferred));
    }

    fn on_error(&self, _ctx: &TransferContext, error: &io::Error) {
        self.push(Event::Error(error.to_string()));
    }

    fn progress_report_interval(&self) -> u64 {
        self.interval
    }
}

fn listeners(recorder: &Arc<Recorder>) -> Vec<SharedListener> {
    vec![Arc::clone(recorder) as SharedListener]
}

fn is_terminal(event: &Event) -> bool {
    matches!(event, Event::Complete(_) | Event::Terminate(_) | Event::Error(_))
}

/// Raises the flag once `after` bytes have been read.
struct Tripwire<'a> {
    data: &'a [u8],
    read: usize,
    after: usize,
    flag: &'a AtomicBool,
}

impl Read for Tripwire<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.data.read(buf)?;
        self.read += n;
        if self.read >= self.after {
            self.flag.store(true, Ordering::Release);
        }
        Ok(n)
    }
}

struct BrokenPipe {
    accepted: usize,
    limit: usize,
}

impl Write for BrokenPipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.accepted >= self.limit {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"));
        }
        let n = buf.len().min(self.limit - self.accepted);
        self.accepted += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn completed_transfer_reports_start_progress_complete() {
    let recorder = Recorder::every(100);
    let data = vec![1u8; 250];
    let mut out = Vec::new();
    let ctx = TransferContext::download().with_content_length(250);
    let outcome = transfer_with_buffer(
        &mut data.as_slice(),
        &mut out,
        &ctx,
        &listeners(&recorder),
        &AtomicBool::new(false),
        50,
    )
    .unwrap();

    assert_eq!(outcome, TransferOutcome::Completed { bytes: 250 });
    assert_eq!(
        recorder.events(),
        vec![
            Event::Start,
            Event::Progress(100, Some(250)),
            Event::Progress(200, Some(250)),
            Event::Complete(250),
        ]
    );
    assert_eq!(out, data);
}

#[test]
fn termination_mid_transfer_stops_after_the_current_chunk() {
    let recorder = Recorder::every(0);
    let data = vec![9u8; 1000];
    let flag = AtomicBool::new(false);
    let mut reader = Tripwire {
        data: &data,
        read: 0,
        after: 300,
        flag: &flag,
    };
    let mut out = Vec::new();
    let outcome = transfer_with_buffer(
        &mut reader,
        &mut out,
        &TransferContext::upload(),
        &listeners(&recorder),
        &flag,
        100,
    )
    .unwrap();

    assert_eq!(outcome, TransferOutcome::Terminated { bytes: 300 });
    assert_eq!(out.len(), 300);
    assert_eq!(recorder.events(), vec![Event::Start, Event::Terminate(300)]);
}

#[test]
fn write_failure_reports_error_once() {
    let recorder = Recorder::every(0);
    let data = vec![0u8; 500];
    let mut sink = BrokenPipe {
        accepted: 0,
        limit: 120,
    };
    let err = transfer_with_buffer(
        &mut data.as_slice(),
        &mut sink,
        &TransferContext::download(),
        &listeners(&recorder),
        &AtomicBool::new(false),
        100,
    )
    .unwrap_err();

    assert_eq!(err.transferred(), 100);
    assert!(matches!(
        err,
        TransferError::Io { ref source, .. } if source.kind() == io::ErrorKind::BrokenPipe
    ));
    assert_eq!(
        recorder.events(),
        vec![Event::Start, Event::Error("client went away".to_string())]
    );
}

#[test]
fn in_memory_upload_skips_callback_when_terminated() {
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let completed = Arc::new(Mutex::new(None));
    let done = Arc::clone(&completed);
    let handler = InMemoryUploadHandler::new(move |_, _| *counter.lock().unwrap() += 1)
        .with_progress(
            TransferProgressHandlers::new()
                .when_complete(move |ok| *done.lock().unwrap() = Some(ok)),
        );

    let outcome = handler
        .handle(&mut &b"abc"[..], &TransferContext::upload(), &AtomicBool::new(true))
        .unwrap();
    assert!(!outcome.is_completed());
    assert_eq!(*calls.lock().unwrap(), 0);
    assert_eq!(*completed.lock().unwrap(), None);

    handler
        .handle(&mut &b"abc"[..], &TransferContext::upload(), &AtomicBool::new(false))
        .unwrap();
    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(*completed.lock().unwrap(), Some(true));
}

proptest! {
    #[test]
    fn exactly_one_terminal_callback_after_start(
        len in 0usize..4096,
        buffer in 1usize..512,
        interval in 0u64..1024,
        stop_after in prop::option::of(0usize..4096),
    ) {
        let recorder = Recorder::every(interval);
        let data = vec![3u8; len];
        let flag = AtomicBool::new(false);
        let mut reader = Tripwire {
            data: &data,
            read: 0,
            after: stop_after.unwrap_or(usize::MAX),
            flag: &flag,
        };
        let mut out = Vec::new();
        let outcome = transfer_with_buffer(
            &mut reader,
            &mut out,
            &TransferContext::upload(),
            &listeners(&recorder),
            &flag,
            buffer,
        )
        .unwrap();

        let events = recorder.events();
        prop_assert_eq!(events.first(), Some(&Event::Start));
        prop_assert_eq!(events.iter().filter(|e| **e == Event::Start).count(), 1);
        prop_assert_eq!(events.iter().filter(|e| is_terminal(e)).count(), 1);
        prop_assert!(is_terminal(events.last().unwrap()));
        prop_assert_eq!(out.len() as u64, outcome.bytes());

        let mut last = 0;
        for event in &events {
            if let Event::Progress(transferred, _) = event {
                prop_assert!(interval > 0);
                prop_assert!(*transferred >= last + interval);
                last = *transferred;
            }
        }
    }
}
