//! Scripted [`Transport`] for integration tests.
//!
//! Each `open()` pops the next scripted outcome. Sessions are fed through an mpsc sender held by the
//! test; dropping the sender ends the session. When the script runs out, `open()` never returns, so
//! the supervisor idles until it is cancelled.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use relay_core::{
    InboundEvent, OutboundEvent, RelayError, Result, Session, SessionSink, Transport,
};
use tokio::sync::mpsc;

/// Sink that records sends; can be switched to fail every send or to never finish closing.
#[derive(Default)]
pub struct MockSink {
    pub sent: Mutex<Vec<OutboundEvent>>,
    pub closed: AtomicBool,
    pub fail_sends: bool,
    pub hang_on_close: bool,
}

impl MockSink {
    pub fn sent(&self) -> Vec<OutboundEvent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionSink for MockSink {
    async fn send(&self, event: &OutboundEvent) -> Result<()> {
        if self.fail_sends {
            return Err(RelayError::Transport("socket write failed".to_string()));
        }
        self.sent.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if self.hang_on_close {
            futures::future::pending::<()>().await;
        }
        Ok(())
    }
}

/// Test-side controls for one scripted session.
pub struct SessionControl {
    pub events: mpsc::UnboundedSender<InboundEvent>,
    pub sink: Arc<MockSink>,
}

pub fn scripted_session(sink: MockSink) -> (Session, SessionControl) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = Arc::new(sink);
    let events = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (event, rx))
    })
    .boxed();
    let session = Session {
        events,
        sink: sink.clone(),
    };
    (session, SessionControl { events: tx, sink })
}

pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Session>>>,
    pub opens: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<Session>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self) -> Result<Session> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(outcome) => outcome,
            None => futures::future::pending().await,
        }
    }
}

pub fn text_event(text: &str) -> InboundEvent {
    InboundEvent::Other(text.to_string())
}
