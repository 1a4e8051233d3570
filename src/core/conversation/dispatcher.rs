//! Ordered synthesis dispatcher.
//!
//! Fragments are synthesized by a fixed pool of workers. Results may finish in
//! any order; a single releaser task holds them in a [`ReorderBuffer`] and
//! forwards only the contiguous prefix that is ready, so the client always
//! hears sentence `n` before sentence `n + 1`.
//!
//! ```text
//! submit() ──► work queue ──► worker 1..N ──► results ──► releaser ──► sink
//!                              (synthesize)               (reorder)
//! ```
//!
//! Every submitted fragment yields exactly one frame: audio, or an error
//! marker when synthesis failed, timed out, panicked or never reported.

use std::any::Any;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::FutureExt;
use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::chunker::Fragment;
use super::error::ConversationError;
use super::frames::{OutboundFrame, SynthesizedAudio};
use crate::core::tts::{BaseTTS, TTSError};

/// Holds out-of-order items until every smaller sequence number has been released.
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    next: u64,
    pending: BinaryHeap<Reverse<Slot<T>>>,
}

#[derive(Debug)]
struct Slot<T> {
    sequence: u64,
    item: T,
}

impl<T> PartialEq for Slot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl<T> Eq for Slot<T> {}

impl<T> PartialOrd for Slot<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Slot<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sequence.cmp(&other.sequence)
    }
}

impl<T> Default for ReorderBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReorderBuffer<T> {
    pub fn new() -> Self {
        Self {
            next: 0,
            pending: BinaryHeap::new(),
        }
    }

    /// Insert a finished item and return everything now releasable, in order.
    pub fn push(&mut self, sequence: u64, item: T) -> Vec<T> {
        if sequence < self.next {
            warn!(sequence, "Ignoring duplicate fragment result");
            return Vec::new();
        }
        self.pending.push(Reverse(Slot { sequence, item }));

        let mut ready = Vec::new();
        while self
            .pending
            .peek()
            .is_some_and(|Reverse(slot)| slot.sequence == self.next)
        {
            if let Some(Reverse(slot)) = self.pending.pop() {
                ready.push(slot.item);
                self.next += 1;
            }
        }
        ready
    }

    /// Sequence number the buffer is waiting for.
    pub fn next_sequence(&self) -> u64 {
        self.next
    }

    /// Items still held back behind a gap.
    pub fn held(&self) -> usize {
        self.pending.len()
    }
}

/// Outcome of [`SynthesisDispatcher::drain`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub submitted: u64,
    pub emitted: u64,
    pub failed: u64,
}

type SynthesisResult = (Fragment, Result<Bytes, TTSError>);

/// Bounded-concurrency, order-preserving synthesis for one turn.
///
/// Released frames go to `sink`; the sink item type only needs to be
/// constructible from an [`OutboundFrame`].
pub struct SynthesisDispatcher {
    work_tx: Option<mpsc::UnboundedSender<Fragment>>,
    workers: JoinSet<()>,
    releaser: Option<JoinHandle<DrainReport>>,
    cancel: CancellationToken,
    submitted: Arc<AtomicU64>,
}

impl SynthesisDispatcher {
    pub fn new<T>(
        synthesizer: Arc<dyn BaseTTS>,
        concurrency: usize,
        call_timeout: Duration,
        sink: mpsc::Sender<T>,
        cancel: CancellationToken,
    ) -> Self
    where
        T: From<OutboundFrame> + Send + 'static,
    {
        let (work_tx, work_rx) = mpsc::unbounded_channel::<Fragment>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<SynthesisResult>();
        let work_rx = Arc::new(Mutex::new(work_rx));

        let mut workers = JoinSet::new();
        for worker_id in 0..concurrency.max(1) {
            workers.spawn(synthesis_worker(
                worker_id,
                synthesizer.clone(),
                call_timeout,
                work_rx.clone(),
                result_tx.clone(),
                cancel.clone(),
            ));
        }
        drop(result_tx);

        let submitted = Arc::new(AtomicU64::new(0));
        let releaser = tokio::spawn(release_in_order(
            result_rx,
            sink,
            submitted.clone(),
            cancel.clone(),
        ));

        Self {
            work_tx: Some(work_tx),
            workers,
            releaser: Some(releaser),
            cancel,
            submitted,
        }
    }

    /// Queue a fragment. Never blocks the caller.
    pub fn submit(&mut self, fragment: Fragment) {
        if let Some(tx) = &self.work_tx
            && tx.send(fragment).is_ok()
        {
            self.submitted.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Close the queue and wait until every submitted fragment has been
    /// synthesized and released. Returns immediately when nothing was queued.
    pub async fn drain(mut self) -> DrainReport {
        self.work_tx.take();

        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Synthesis worker ended abnormally");
            }
        }

        let mut report = match self.releaser.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                warn!(error = %e, "Synthesis releaser ended abnormally");
                DrainReport::default()
            }),
            None => DrainReport::default(),
        };
        report.submitted = self.submitted();
        report
    }
}

impl Drop for SynthesisDispatcher {
    fn drop(&mut self) {
        // Workers are aborted by the JoinSet; the releaser needs an explicit stop.
        self.cancel.cancel();
        if let Some(handle) = self.releaser.take() {
            handle.abort();
        }
    }
}

async fn synthesis_worker(
    worker_id: usize,
    synthesizer: Arc<dyn BaseTTS>,
    call_timeout: Duration,
    work_rx: Arc<Mutex<mpsc::UnboundedReceiver<Fragment>>>,
    result_tx: mpsc::UnboundedSender<SynthesisResult>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            fragment = async { work_rx.lock().await.recv().await } => fragment,
        };
        let Some(fragment) = next else { break };

        debug!(
            worker_id,
            sequence = fragment.sequence(),
            chars = fragment.text().len(),
            "Synthesizing fragment"
        );

        let call = AssertUnwindSafe(synthesizer.synthesize(fragment.text())).catch_unwind();
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = tokio::time::timeout(call_timeout, call) => match result {
                Ok(Ok(result)) => result,
                Ok(Err(panic)) => {
                    let message = panic_message(panic.as_ref());
                    error!(worker_id, sequence = fragment.sequence(), message = %message, "Synthesizer panicked");
                    Err(TTSError::ProviderError(format!("synthesizer panicked: {message}")))
                }
                Err(_) => Err(TTSError::Timeout(call_timeout)),
            },
        };

        if result_tx.send((fragment, result)).is_err() {
            break;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn into_frame(fragment: Fragment, result: Result<Bytes, TTSError>) -> OutboundFrame {
    match result {
        Ok(audio) => OutboundFrame::Audio(SynthesizedAudio {
            sequence: fragment.sequence(),
            text: fragment.text().to_string(),
            audio,
        }),
        Err(source) => {
            warn!(sequence = fragment.sequence(), error = %source, "Fragment synthesis failed");
            OutboundFrame::Error(ConversationError::Synthesis {
                sequence: fragment.sequence(),
                source,
            })
        }
    }
}

/// Forward one released frame, counting it. Returns false once the sink is gone.
async fn release<T>(sink: &mpsc::Sender<T>, frame: OutboundFrame, report: &mut DrainReport) -> bool
where
    T: From<OutboundFrame> + Send + 'static,
{
    match &frame {
        OutboundFrame::Audio(audio) => {
            report.emitted += 1;
            debug!(sequence = audio.sequence, bytes = audio.audio.len(), "Releasing audio");
        }
        _ => report.failed += 1,
    }
    if sink.send(T::from(frame)).await.is_err() {
        debug!("Frame sink closed, stopping release");
        return false;
    }
    true
}

async fn release_in_order<T>(
    mut results: mpsc::UnboundedReceiver<SynthesisResult>,
    sink: mpsc::Sender<T>,
    submitted: Arc<AtomicU64>,
    cancel: CancellationToken,
) -> DrainReport
where
    T: From<OutboundFrame> + Send + 'static,
{
    let mut buffer = ReorderBuffer::new();
    let mut report = DrainReport::default();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            result = results.recv() => result,
        };
        let Some((fragment, result)) = next else { break };

        let sequence = fragment.sequence();
        for frame in buffer.push(sequence, into_frame(fragment, result)) {
            if !release(&sink, frame, &mut report).await {
                return report;
            }
        }
    }

    if cancel.is_cancelled() {
        if buffer.held() > 0 {
            debug!(
                held = buffer.held(),
                waiting_for = buffer.next_sequence(),
                "Discarding unreleased synthesis results"
            );
        }
        return report;
    }

    // Every worker is gone; a sequence with no result gets a marker so the
    // results held behind it still go out.
    let total = submitted.load(Ordering::SeqCst);
    while buffer.next_sequence() < total {
        let sequence = buffer.next_sequence();
        warn!(sequence, "No synthesis result for fragment");
        let marker = OutboundFrame::Error(ConversationError::Synthesis {
            sequence,
            source: TTSError::ProviderError("synthesis result lost".to_string()),
        });
        for frame in buffer.push(sequence, marker) {
            if !release(&sink, frame, &mut report).await {
                return report;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Synthesizer with per-text delays and optional failures.
    struct ScriptedTTS {
        delays: HashMap<String, Duration>,
        fail: Vec<String>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedTTS {
        fn new(delays: HashMap<String, Duration>, fail: Vec<String>) -> Arc<Self> {
            Arc::new(Self {
                delays,
                fail,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl BaseTTS for ScriptedTTS {
        async fn synthesize(&self, text: &str) -> Result<Bytes, TTSError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let delay = self.delays.get(text).copied().unwrap_or_default();
            tokio::time::sleep(delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            if self.fail.iter().any(|f| f == text) {
                return Err(TTSError::ProviderError(format!("cannot say {text}")));
            }
            Ok(Bytes::from(text.as_bytes().to_vec()))
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    async fn collect(mut rx: mpsc::Receiver<OutboundFrame>) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_reorder_buffer_releases_contiguous_prefix() {
        let mut buffer = ReorderBuffer::new();
        assert!(buffer.push(2, "c").is_empty());
        assert!(buffer.push(1, "b").is_empty());
        assert_eq!(buffer.held(), 2);
        assert_eq!(buffer.push(0, "a"), vec!["a", "b", "c"]);
        assert_eq!(buffer.push(4, "e"), Vec::<&str>::new());
        assert_eq!(buffer.push(3, "d"), vec!["d", "e"]);
        assert_eq!(buffer.next_sequence(), 5);
        assert!(buffer.push(1, "dup").is_empty());
    }

    #[tokio::test]
    async fn test_drain_with_nothing_submitted_returns() {
        let (tx, rx) = mpsc::channel::<OutboundFrame>(4);
        let tts = ScriptedTTS::new(HashMap::new(), Vec::new());
        let dispatcher =
            SynthesisDispatcher::new(tts, 3, Duration::from_secs(1), tx, CancellationToken::new());

        let report = tokio::time::timeout(Duration::from_secs(1), dispatcher.drain())
            .await
            .expect("drain must not block");
        assert_eq!(report, DrainReport::default());
        assert!(collect(rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_randomized_completion_keeps_order() {
        let mut rng = StdRng::seed_from_u64(7);
        for round in 0..10 {
            let texts: Vec<String> = (0..12).map(|i| format!("r{round} s{i}.")).collect();
            let delays = texts
                .iter()
                .map(|t| (t.clone(), Duration::from_millis(rng.random_range(0..25))))
                .collect();
            let tts = ScriptedTTS::new(delays, Vec::new());
            let (tx, rx) = mpsc::channel::<OutboundFrame>(32);
            let mut dispatcher = SynthesisDispatcher::new(
                tts.clone(),
                4,
                Duration::from_secs(5),
                tx,
                CancellationToken::new(),
            );
            for (i, text) in texts.iter().enumerate() {
                dispatcher.submit(Fragment::new(i as u64, text.clone()));
            }
            let report = dispatcher.drain().await;
            assert_eq!(report.emitted, 12);
            assert!(tts.peak.load(Ordering::SeqCst) <= 4);

            let sequences: Vec<u64> = collect(rx)
                .await
                .into_iter()
                .map(|frame| match frame {
                    OutboundFrame::Audio(audio) => audio.sequence,
                    other => panic!("unexpected frame {other:?}"),
                })
                .collect();
            assert_eq!(sequences, (0..12).collect::<Vec<u64>>());
        }
    }

    #[tokio::test]
    async fn test_default_concurrency_is_sequential() {
        let delays = (0..4)
            .map(|i| (format!("s{i}"), Duration::from_millis(5)))
            .collect();
        let tts = ScriptedTTS::new(delays, Vec::new());
        let (tx, rx) = mpsc::channel::<OutboundFrame>(8);
        let mut dispatcher =
            SynthesisDispatcher::new(tts.clone(), 1, Duration::from_secs(1), tx, CancellationToken::new());
        for i in 0..4 {
            dispatcher.submit(Fragment::new(i, format!("s{i}")));
        }
        dispatcher.drain().await;
        assert_eq!(tts.peak.load(Ordering::SeqCst), 1);
        assert_eq!(collect(rx).await.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_fragment_is_reported_in_place() {
        let delays = HashMap::from([("one.".to_string(), Duration::from_millis(30))]);
        let tts = ScriptedTTS::new(delays, vec!["two.".to_string()]);
        let (tx, rx) = mpsc::channel::<OutboundFrame>(8);
        let mut dispatcher =
            SynthesisDispatcher::new(tts, 3, Duration::from_secs(1), tx, CancellationToken::new());
        for (i, text) in ["one.", "two.", "three."].into_iter().enumerate() {
            dispatcher.submit(Fragment::new(i as u64, text));
        }
        let report = dispatcher.drain().await;
        assert_eq!(
            report,
            DrainReport {
                submitted: 3,
                emitted: 2,
                failed: 1
            }
        );

        let frames = collect(rx).await;
        assert_eq!(frames.len(), 3);
        assert!(matches!(&frames[0], OutboundFrame::Audio(a) if a.text == "one."));
        assert!(matches!(
            &frames[1],
            OutboundFrame::Error(ConversationError::Synthesis { sequence: 1, .. })
        ));
        assert!(matches!(&frames[2], OutboundFrame::Audio(a) if a.sequence == 2));
    }

    /// Synthesizer that panics on one text.
    struct PanickingTTS(&'static str);

    #[async_trait]
    impl BaseTTS for PanickingTTS {
        async fn synthesize(&self, text: &str) -> Result<Bytes, TTSError> {
            if text == self.0 {
                panic!("synthesizer blew up on {text}");
            }
            Ok(Bytes::from(text.as_bytes().to_vec()))
        }

        fn provider_name(&self) -> &'static str {
            "panicking"
        }
    }

    #[tokio::test]
    async fn test_panicking_synthesis_becomes_error_marker() {
        for concurrency in [1, 3] {
            let (tx, rx) = mpsc::channel::<OutboundFrame>(8);
            let mut dispatcher = SynthesisDispatcher::new(
                Arc::new(PanickingTTS("two.")),
                concurrency,
                Duration::from_secs(1),
                tx,
                CancellationToken::new(),
            );
            for (i, text) in ["one.", "two.", "three."].into_iter().enumerate() {
                dispatcher.submit(Fragment::new(i as u64, text));
            }
            let report = dispatcher.drain().await;
            assert_eq!(
                report,
                DrainReport {
                    submitted: 3,
                    emitted: 2,
                    failed: 1
                }
            );

            let frames = collect(rx).await;
            assert_eq!(frames.len(), 3, "concurrency {concurrency}");
            assert!(matches!(&frames[0], OutboundFrame::Audio(a) if a.text == "one."));
            assert!(matches!(
                &frames[1],
                OutboundFrame::Error(ConversationError::Synthesis {
                    sequence: 1,
                    source: TTSError::ProviderError(_),
                })
            ));
            assert!(matches!(&frames[2], OutboundFrame::Audio(a) if a.text == "three."));
        }
    }

    #[tokio::test]
    async fn test_missing_result_is_marked_at_drain() {
        let (result_tx, result_rx) = mpsc::unbounded_channel::<SynthesisResult>();
        let (sink, rx) = mpsc::channel::<OutboundFrame>(8);
        let submitted = Arc::new(AtomicU64::new(3));

        // Sequence 1 never reports back
        result_tx
            .send((Fragment::new(2, "c."), Ok(Bytes::from_static(b"c"))))
            .unwrap();
        result_tx
            .send((Fragment::new(0, "a."), Ok(Bytes::from_static(b"a"))))
            .unwrap();
        drop(result_tx);

        let report =
            release_in_order(result_rx, sink, submitted, CancellationToken::new()).await;
        assert_eq!(report.emitted, 2);
        assert_eq!(report.failed, 1);

        let frames = collect(rx).await;
        assert_eq!(frames.len(), 3);
        assert!(matches!(&frames[0], OutboundFrame::Audio(a) if a.sequence == 0));
        assert!(matches!(
            &frames[1],
            OutboundFrame::Error(ConversationError::Synthesis { sequence: 1, .. })
        ));
        assert!(matches!(&frames[2], OutboundFrame::Audio(a) if a.sequence == 2));
    }

    #[tokio::test]
    async fn test_slow_synthesis_times_out() {
        let delays = HashMap::from([("slow.".to_string(), Duration::from_secs(5))]);
        let tts = ScriptedTTS::new(delays, Vec::new());
        let (tx, rx) = mpsc::channel::<OutboundFrame>(8);
        let mut dispatcher = SynthesisDispatcher::new(
            tts,
            1,
            Duration::from_millis(20),
            tx,
            CancellationToken::new(),
        );
        dispatcher.submit(Fragment::new(0, "slow."));
        dispatcher.drain().await;

        let frames = collect(rx).await;
        assert!(matches!(
            &frames[..],
            [OutboundFrame::Error(ConversationError::Synthesis {
                source: TTSError::Timeout(_),
                ..
            })]
        ));
    }

    #[tokio::test]
    async fn test_cancel_stops_outstanding_work() {
        let delays = HashMap::from([("long.".to_string(), Duration::from_secs(30))]);
        let tts = ScriptedTTS::new(delays, Vec::new());
        let (tx, rx) = mpsc::channel::<OutboundFrame>(8);
        let cancel = CancellationToken::new();
        let mut dispatcher =
            SynthesisDispatcher::new(tts.clone(), 2, Duration::from_secs(60), tx, cancel.clone());
        dispatcher.submit(Fragment::new(0, "long."));
        dispatcher.submit(Fragment::new(1, "long."));
        tokio::time::sleep(Duration::from_millis(20)).await;

        cancel.cancel();
        let report = tokio::time::timeout(Duration::from_secs(1), dispatcher.drain())
            .await
            .expect("cancelled drain must finish promptly");
        assert_eq!(report.emitted, 0);
        assert!(collect(rx).await.is_empty());
    }
}
