// src/session.rs - Async recognition session: classification worker and transcript consumer
use crate::classifier::{LabelTable, SignClassifier};
use crate::config::RecognizerConfig;
use crate::error::SessionError;
use crate::landmarks::PoseObservation;
use crate::mailbox::LatestMailbox;
use crate::pipeline::{ClassificationRequest, ControlEvent, FrameIngestor, IngestOutcome};
use crate::stabilizer::{PredictionStabilizer, StabilizerDecision, TranscriptEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Classifier availability as seen by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerStatus {
    Ready,
    /// Terminal until [`RecognitionSession::reinitialize`] is called.
    Unavailable(String),
}

#[derive(Debug)]
enum SessionEvent {
    Control(ControlEvent),
    Prediction {
        sequence: u64,
        epoch: u64,
        timestamp_ms: u64,
        consistency_threshold: usize,
        label: String,
    },
    Reset {
        epoch: u64,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub dispatched: u64,
    pub superseded: u64,
}

type SharedClassifier = Arc<RwLock<Arc<dyn SignClassifier>>>;

/// The caller drives ingestion synchronously through [`RecognitionSession::ingest`].
/// A worker task drains the one-slot mailbox and runs the classifier on the
/// blocking pool. A consumer task exclusively owns the stabilizer; control
/// events and classifier results reach it over one ordered channel.
pub struct RecognitionSession {
    ingestor: FrameIngestor,
    mailbox: Arc<LatestMailbox<ClassificationRequest>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    classifier: SharedClassifier,
    available: Arc<AtomicBool>,
    status: Arc<watch::Sender<RecognizerStatus>>,
    transcript: watch::Receiver<String>,
    worker: JoinHandle<()>,
    consumer: JoinHandle<PredictionStabilizer>,
    frames: u64,
}

impl RecognitionSession {
    /// Spawn the worker and consumer tasks. Must be called inside a Tokio runtime.
    pub fn start(
        config: &RecognizerConfig,
        labels: LabelTable,
        classifier: Arc<dyn SignClassifier>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TranscriptEvent>), SessionError> {
        let ingestor = FrameIngestor::new(config)?;

        let mailbox = Arc::new(LatestMailbox::new());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(RecognizerStatus::Ready);
        let status = Arc::new(status_tx);
        let (transcript_tx, transcript_rx) = watch::channel(String::new());
        let classifier: SharedClassifier = Arc::new(RwLock::new(classifier));
        let available = Arc::new(AtomicBool::new(true));

        let worker = tokio::spawn(classification_worker(
            Arc::clone(&mailbox),
            Arc::clone(&classifier),
            Arc::new(labels),
            Arc::clone(&available),
            Arc::clone(&status),
            events_tx.clone(),
        ));
        let consumer = tokio::spawn(transcript_consumer(
            events_rx,
            PredictionStabilizer::new(config.post_spacing_window_ms),
            transcript_tx,
            output_tx,
        ));

        tracing::info!(
            sequence_length = config.sequence_length,
            features_per_frame = config.features_per_frame,
            "Recognition session started"
        );

        Ok((
            Self {
                ingestor,
                mailbox,
                events: events_tx,
                classifier,
                available,
                status,
                transcript: transcript_rx,
                worker,
                consumer,
                frames: 0,
            },
            output_rx,
        ))
    }

    /// Process one pose callback. Never blocks on classification.
    pub fn ingest(&mut self, observation: &PoseObservation) -> Result<IngestOutcome, SessionError> {
        self.frames += 1;
        let mut outcome = self.ingestor.ingest(observation);

        if let Some(control) = outcome.control {
            self.events
                .send(SessionEvent::Control(control))
                .map_err(|_| SessionError::Closed)?;
        }

        if let Some(request) = outcome.request.clone() {
            if !self.available.load(Ordering::Acquire) {
                outcome.diagnostics.dispatched = false;
            } else {
                match self.mailbox.post(request) {
                    Ok(Some(stale)) => {
                        tracing::debug!(sequence = stale.sequence, "Classifier busy, superseded pending window");
                    }
                    Ok(None) => {}
                    Err(_) => return Err(SessionError::Closed),
                }
            }
        }

        Ok(outcome)
    }

    pub fn status(&self) -> RecognizerStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<RecognizerStatus> {
        self.status.subscribe()
    }

    pub fn transcript(&self) -> String {
        self.transcript.borrow().clone()
    }

    pub fn subscribe_transcript(&self) -> watch::Receiver<String> {
        self.transcript.clone()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames: self.frames,
            dispatched: self.mailbox.posted(),
            superseded: self.mailbox.superseded(),
        }
    }

    /// Current ingestion state, for overlays and diagnostics.
    pub fn ingestor(&self) -> &FrameIngestor {
        &self.ingestor
    }

    /// Clear all gesture and transcript state (e.g. the user navigated away).
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.ingestor.reset();
        self.mailbox.try_take();
        self.events
            .send(SessionEvent::Reset {
                epoch: self.ingestor.epoch(),
            })
            .map_err(|_| SessionError::Closed)
    }

    /// Swap in a working classifier after a failure and resume dispatching.
    pub fn reinitialize(&mut self, classifier: Arc<dyn SignClassifier>) {
        *self
            .classifier
            .write()
            .unwrap_or_else(PoisonError::into_inner) = classifier;
        self.available.store(true, Ordering::Release);
        self.status.send_replace(RecognizerStatus::Ready);
        tracing::info!("Classifier reinitialized");
    }

    /// Stop consuming, wait for both tasks and return the final transcript.
    pub async fn shutdown(self) -> Result<String, SessionError> {
        let Self {
            mailbox,
            events,
            worker,
            consumer,
            ..
        } = self;

        mailbox.close();
        worker.await?;
        drop(events);
        let stabilizer = consumer.await?;

        let transcript = stabilizer.transcript().as_str().to_string();
        tracing::info!(transcript = %transcript, "Recognition session finished");
        Ok(transcript)
    }
}

async fn classification_worker(
    mailbox: Arc<LatestMailbox<ClassificationRequest>>,
    classifier: SharedClassifier,
    labels: Arc<LabelTable>,
    available: Arc<AtomicBool>,
    status: Arc<watch::Sender<RecognizerStatus>>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    while let Some(request) = mailbox.recv().await {
        if !available.load(Ordering::Acquire) {
            tracing::debug!(sequence = request.sequence, "Classifier unavailable, dropping window");
            continue;
        }

        let model = Arc::clone(&*classifier.read().unwrap_or_else(PoisonError::into_inner));
        let window = request.window.clone();
        let scores = match tokio::task::spawn_blocking(move || model.classify(&window)).await {
            Ok(Ok(scores)) => scores,
            Ok(Err(err)) => {
                mark_unavailable(&available, &status, err.to_string());
                continue;
            }
            Err(err) => {
                mark_unavailable(&available, &status, format!("classifier task failed: {err}"));
                continue;
            }
        };

        let Some(label) = labels.resolve(&scores) else {
            tracing::warn!(
                sequence = request.sequence,
                scores = scores.len(),
                labels = labels.len(),
                "Arg-max outside label table, ignoring result"
            );
            continue;
        };

        let event = SessionEvent::Prediction {
            sequence: request.sequence,
            epoch: request.epoch,
            timestamp_ms: request.timestamp_ms,
            consistency_threshold: request.params.consistency_threshold,
            label: label.to_string(),
        };
        if events.send(event).is_err() {
            break;
        }
    }
    tracing::debug!("Classification worker stopped");
}

fn mark_unavailable(
    available: &AtomicBool,
    status: &watch::Sender<RecognizerStatus>,
    reason: String,
) {
    available.store(false, Ordering::Release);
    tracing::warn!(%reason, "Classifier failed, dispatching suspended");
    status.send_replace(RecognizerStatus::Unavailable(reason));
}

async fn transcript_consumer(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    mut stabilizer: PredictionStabilizer,
    transcript: watch::Sender<String>,
    output: mpsc::UnboundedSender<TranscriptEvent>,
) -> PredictionStabilizer {
    let mut last_sequence: Option<u64> = None;
    let mut epoch = 0u64;

    while let Some(event) = events.recv().await {
        let emitted = match event {
            SessionEvent::Control(ControlEvent::Boundary {
                timestamp_ms,
                epoch: event_epoch,
            }) => {
                epoch = epoch.max(event_epoch);
                stabilizer
                    .apply_boundary(timestamp_ms)
                    .then_some(TranscriptEvent::Boundary)
            }
            SessionEvent::Control(ControlEvent::GestureChanged {
                epoch: event_epoch, ..
            }) => {
                epoch = epoch.max(event_epoch);
                stabilizer.on_gesture_change();
                None
            }
            SessionEvent::Reset { epoch: event_epoch } => {
                epoch = epoch.max(event_epoch);
                stabilizer.reset();
                Some(TranscriptEvent::SessionReset)
            }
            SessionEvent::Prediction {
                sequence,
                epoch: result_epoch,
                timestamp_ms,
                consistency_threshold,
                label,
            } => {
                if last_sequence.is_some_and(|last| sequence <= last) {
                    tracing::warn!(sequence, "Out-of-order classifier result discarded");
                    continue;
                }
                last_sequence = Some(sequence);

                if result_epoch < epoch {
                    tracing::debug!(sequence, result_epoch, epoch, "Result from a superseded segment discarded");
                    continue;
                }

                match stabilizer.apply(&label, timestamp_ms, consistency_threshold) {
                    StabilizerDecision::Committed(symbol) => Some(TranscriptEvent::Symbol(symbol)),
                    _ => None,
                }
            }
        };

        if let Some(event) = emitted {
            transcript.send_replace(stabilizer.transcript().as_str().to_string());
            // The consumer of the stream may have gone away; the transcript watch still updates.
            let _ = output.send(event);
        }
    }

    stabilizer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SequenceWindow;
    use crate::error::{ClassifierError, ClassifierResult};
    use crate::landmarks::{HandLandmarks, LANDMARKS_PER_HAND};
    use nalgebra::Vector3;

    struct Fixed(usize);

    impl SignClassifier for Fixed {
        fn classify(&self, _window: &SequenceWindow) -> ClassifierResult<Vec<f32>> {
            let mut scores = vec![0.0; 26];
            scores[self.0] = 1.0;
            Ok(scores)
        }
    }

    struct Broken;

    impl SignClassifier for Broken {
        fn classify(&self, _window: &SequenceWindow) -> ClassifierResult<Vec<f32>> {
            Err(ClassifierError::Inference("model crashed".into()))
        }
    }

    fn held_hand(timestamp_ms: u64) -> PoseObservation {
        let hand = HandLandmarks::new(
            (0..LANDMARKS_PER_HAND)
                .map(|i| Vector3::new(0.4, 0.2 + i as f32 * 0.02, 0.0))
                .collect(),
        );
        PoseObservation::new(timestamp_ms, vec![hand])
    }

    fn prediction(sequence: u64, epoch: u64, label: &str) -> SessionEvent {
        SessionEvent::Prediction {
            sequence,
            epoch,
            timestamp_ms: sequence * 100,
            consistency_threshold: 1,
            label: label.to_string(),
        }
    }

    async fn run_consumer(events: Vec<SessionEvent>) -> (String, Vec<TranscriptEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (transcript_tx, _transcript_rx) = watch::channel(String::new());
        let (output_tx, mut output_rx) = mpsc::unbounded_channel();
        for event in events {
            events_tx.send(event).unwrap();
        }
        drop(events_tx);

        let stabilizer = transcript_consumer(
            events_rx,
            PredictionStabilizer::new(100),
            transcript_tx,
            output_tx,
        )
        .await;

        let mut emitted = Vec::new();
        while let Ok(event) = output_rx.try_recv() {
            emitted.push(event);
        }
        (stabilizer.transcript().as_str().to_string(), emitted)
    }

    #[tokio::test]
    async fn test_result_from_before_gesture_change_is_discarded() {
        let (transcript, emitted) = run_consumer(vec![
            prediction(0, 0, "A"),
            SessionEvent::Control(ControlEvent::GestureChanged { timestamp_ms: 50, epoch: 1 }),
            prediction(1, 0, "B"),
            prediction(2, 1, "C"),
        ])
        .await;

        assert_eq!(transcript, "AC");
        assert_eq!(
            emitted,
            vec![TranscriptEvent::Symbol("A".into()), TranscriptEvent::Symbol("C".into())]
        );
    }

    #[tokio::test]
    async fn test_result_from_before_boundary_is_discarded() {
        let (transcript, emitted) = run_consumer(vec![
            prediction(0, 0, "A"),
            SessionEvent::Control(ControlEvent::Boundary { timestamp_ms: 150, epoch: 1 }),
            prediction(1, 0, "B"),
        ])
        .await;

        assert_eq!(transcript, "A ");
        assert_eq!(
            emitted,
            vec![TranscriptEvent::Symbol("A".into()), TranscriptEvent::Boundary]
        );
    }

    #[tokio::test]
    async fn test_repeated_or_older_sequence_is_discarded() {
        let (transcript, _) = run_consumer(vec![
            prediction(3, 0, "A"),
            prediction(3, 0, "B"),
            prediction(2, 0, "C"),
            prediction(4, 0, "D"),
        ])
        .await;

        assert_eq!(transcript, "AD");
    }

    #[tokio::test]
    async fn test_failing_classifier_marks_unavailable() {
        let config = RecognizerConfig::default();
        let (mut session, _events) =
            RecognitionSession::start(&config, LabelTable::default(), Arc::new(Broken)).unwrap();
        let mut status = session.subscribe_status();

        for i in 0..30u64 {
            session.ingest(&held_hand(i * 33)).unwrap();
        }

        tokio::time::timeout(std::time::Duration::from_secs(2), status.changed())
            .await
            .expect("status should change")
            .unwrap();
        assert!(matches!(session.status(), RecognizerStatus::Unavailable(_)));

        // Ingestion keeps running but nothing more is dispatched.
        let dispatched = session.stats().dispatched;
        for i in 30..80u64 {
            let outcome = session.ingest(&held_hand(i * 33)).unwrap();
            assert!(!outcome.diagnostics.dispatched);
        }
        assert_eq!(session.stats().dispatched, dispatched);

        session.reinitialize(Arc::new(Fixed(0)));
        assert_eq!(session.status(), RecognizerStatus::Ready);
        assert_eq!(session.shutdown().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_commits_after_consistent_results() {
        let config = RecognizerConfig::default();
        let (mut session, mut events) =
            RecognitionSession::start(&config, LabelTable::default(), Arc::new(Fixed(1))).unwrap();

        for i in 0..60u64 {
            session.ingest(&held_hand(i * 33)).unwrap();
            tokio::task::yield_now().await;
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        let first = tokio::time::timeout(std::time::Duration::from_secs(2), events.recv())
            .await
            .expect("a symbol should be committed");
        assert_eq!(first, Some(TranscriptEvent::Symbol("B".into())));
        assert_eq!(session.shutdown().await.unwrap(), "B");
    }
}
