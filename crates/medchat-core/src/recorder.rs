//! Two-state microphone toggle.
//!
//! `Idle -> Recording` acquires the device; `Recording -> Idle` always
//! releases it, whether the capture is kept, too short, or fails.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::time::Instant;

use crate::error::{ChatError, Result};
use crate::upload::FileUpload;

/// Recordings shorter than this are rejected without stopping to flush
pub const MIN_RECORDING_DURATION: Duration = Duration::from_millis(1000);

/// Payloads smaller than this are treated as empty
pub const MIN_AUDIO_BYTES: usize = 100;

/// Platform audio input. Opening may fail when access is denied or no device
/// exists.
#[async_trait]
pub trait Microphone: Send {
    async fn open(&mut self) -> Result<Box<dyn CaptureSession>>;
}

/// A live capture holding the input device
#[async_trait]
pub trait CaptureSession: Send {
    /// Stop capturing, release the device, and flush the accumulated chunks
    /// into a single payload ready for upload.
    async fn finish(self: Box<Self>) -> Result<FileUpload>;

    /// Release the device and drop whatever was captured
    fn discard(self: Box<Self>);
}

pub enum RecordingState {
    Idle,
    Recording {
        started_at: Instant,
        session: Box<dyn CaptureSession>,
    },
}

/// What stopping a recording produced
#[derive(Debug)]
pub enum StopOutcome {
    /// Stopped before `MIN_RECORDING_DURATION`
    TooShort,
    /// Flushed payload under `MIN_AUDIO_BYTES`
    Empty,
    Captured(FileUpload),
    Failed(ChatError),
}

pub struct Recorder<M> {
    microphone: M,
    state: RecordingState,
}

impl<M: Microphone> Recorder<M> {
    pub fn new(microphone: M) -> Self {
        Self {
            microphone,
            state: RecordingState::Idle,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecordingState::Recording { .. })
    }

    /// `Idle -> Recording`. On error the state stays `Idle`.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_recording() {
            return Ok(());
        }

        let session = self.microphone.open().await?;
        info!("Recording started");
        self.state = RecordingState::Recording {
            started_at: Instant::now(),
            session,
        };
        Ok(())
    }

    /// `Recording -> Idle`. Calling this while idle reports `Empty`.
    pub async fn stop(&mut self) -> StopOutcome {
        let RecordingState::Recording { started_at, session } =
            std::mem::replace(&mut self.state, RecordingState::Idle)
        else {
            return StopOutcome::Empty;
        };

        let elapsed = started_at.elapsed();
        if elapsed < MIN_RECORDING_DURATION {
            debug!("Recording too short ({} ms), discarding", elapsed.as_millis());
            session.discard();
            return StopOutcome::TooShort;
        }

        match session.finish().await {
            Ok(clip) if clip.bytes.len() < MIN_AUDIO_BYTES => {
                warn!("Recording produced only {} bytes, discarding", clip.bytes.len());
                StopOutcome::Empty
            }
            Ok(clip) => {
                info!("Recording stopped after {} ms ({} bytes)", elapsed.as_millis(), clip.bytes.len());
                StopOutcome::Captured(clip)
            }
            Err(e) => StopOutcome::Failed(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts opens and releases so tests can check the device is never leaked
    #[derive(Clone, Default)]
    pub(crate) struct FakeMicrophone {
        pub denied: bool,
        pub payload_len: usize,
        pub opened: Arc<AtomicUsize>,
        pub released: Arc<AtomicUsize>,
    }

    impl FakeMicrophone {
        pub fn with_payload(payload_len: usize) -> Self {
            Self {
                payload_len,
                ..Self::default()
            }
        }

        pub fn denied() -> Self {
            Self {
                denied: true,
                ..Self::default()
            }
        }

        pub fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }

        pub fn released(&self) -> usize {
            self.released.load(Ordering::SeqCst)
        }
    }

    struct FakeSession {
        payload_len: usize,
        released: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Microphone for FakeMicrophone {
        async fn open(&mut self) -> Result<Box<dyn CaptureSession>> {
            if self.denied {
                return Err(ChatError::Microphone("permission denied".to_string()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                payload_len: self.payload_len,
                released: Arc::clone(&self.released),
            }))
        }
    }

    #[async_trait]
    impl CaptureSession for FakeSession {
        async fn finish(self: Box<Self>) -> Result<FileUpload> {
            self.released.fetch_add(1, Ordering::SeqCst);
            Ok(FileUpload::new("recording.wav", "audio/wav", vec![0; self.payload_len]))
        }

        fn discard(self: Box<Self>) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_recording_is_discarded() {
        let mic = FakeMicrophone::with_payload(4096);
        let mut recorder = Recorder::new(mic.clone());

        recorder.start().await.unwrap();
        assert!(recorder.is_recording());
        tokio::time::advance(Duration::from_millis(400)).await;

        assert!(matches!(recorder.stop().await, StopOutcome::TooShort));
        assert!(!recorder.is_recording());
        assert_eq!(mic.released(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_recording_is_captured() {
        let mic = FakeMicrophone::with_payload(4096);
        let mut recorder = Recorder::new(mic.clone());

        recorder.start().await.unwrap();
        tokio::time::advance(Duration::from_millis(1500)).await;

        match recorder.stop().await {
            StopOutcome::Captured(clip) => {
                assert_eq!(clip.bytes.len(), 4096);
                assert_eq!(clip.mime_type, "audio/wav");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(mic.released(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tiny_payload_is_empty() {
        let mic = FakeMicrophone::with_payload(MIN_AUDIO_BYTES - 1);
        let mut recorder = Recorder::new(mic.clone());

        recorder.start().await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(matches!(recorder.stop().await, StopOutcome::Empty));
        assert_eq!(mic.released(), 1);
    }

    #[tokio::test]
    async fn test_denied_microphone_stays_idle() {
        let mut recorder = Recorder::new(FakeMicrophone::denied());

        assert!(recorder.start().await.is_err());
        assert!(!recorder.is_recording());
    }

    #[tokio::test]
    async fn test_start_while_recording_keeps_session() {
        let mic = FakeMicrophone::with_payload(4096);
        let mut recorder = Recorder::new(mic.clone());

        recorder.start().await.unwrap();
        recorder.start().await.unwrap();
        assert_eq!(mic.opened(), 1);
    }
}
