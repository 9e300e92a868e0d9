//! Default input device capture through cpal.
//!
//! `cpal::Stream` cannot leave the thread that built it, so each capture owns
//! a dedicated thread that holds the stream until told to stop. Dropping the
//! stream is what releases the device.

use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use log::{debug, info, warn};
use medchat_core::error::{ChatError, Result};
use medchat_core::{CaptureSession, FileUpload, Microphone};
use tokio::sync::oneshot;

use crate::wav;

pub const RECORDING_FILENAME: &str = "recording.wav";

type Chunks = Arc<Mutex<Vec<Vec<i16>>>>;

#[derive(Debug, Default)]
pub struct CpalMicrophone;

#[async_trait]
impl Microphone for CpalMicrophone {
    async fn open(&mut self) -> Result<Box<dyn CaptureSession>> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("medchat-capture".to_string())
            .spawn(move || capture_thread(ready_tx, stop_rx))?;

        match ready_rx.await {
            Ok(Ok(sample_rate)) => Ok(Box::new(CpalSession {
                stop: Some(stop_tx),
                handle: Some(handle),
                sample_rate,
            })),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ChatError::Microphone("capture thread exited".to_string())),
        }
    }
}

struct CpalSession {
    stop: Option<std_mpsc::Sender<()>>,
    handle: Option<JoinHandle<Vec<Vec<i16>>>>,
    sample_rate: u32,
}

impl CpalSession {
    fn signal_stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

#[async_trait]
impl CaptureSession for CpalSession {
    async fn finish(mut self: Box<Self>) -> Result<FileUpload> {
        self.signal_stop();
        let handle = self
            .handle
            .take()
            .ok_or_else(|| ChatError::Microphone("capture already finished".to_string()))?;

        let chunks = tokio::task::spawn_blocking(move || handle.join())
            .await
            .map_err(|e| ChatError::Microphone(e.to_string()))?
            .map_err(|_| ChatError::Microphone("capture thread panicked".to_string()))?;

        let samples = chunks.concat();
        info!("Flushed {} chunks ({} samples at {} Hz)", chunks.len(), samples.len(), self.sample_rate);

        Ok(FileUpload::new(
            RECORDING_FILENAME,
            "audio/wav",
            wav::encode_pcm16(&samples, self.sample_rate),
        ))
    }

    fn discard(mut self: Box<Self>) {
        self.signal_stop();
    }
}

impl Drop for CpalSession {
    fn drop(&mut self) {
        // Covers discard and abandoned sessions (e.g. quitting mid-recording)
        self.signal_stop();
    }
}

/// Owns the input stream from open until stop; returns the captured chunks
fn capture_thread(ready: oneshot::Sender<Result<u32>>, stop: std_mpsc::Receiver<()>) -> Vec<Vec<i16>> {
    let chunks: Chunks = Arc::new(Mutex::new(Vec::new()));

    let stream = match build_stream(Arc::clone(&chunks)) {
        Ok((stream, sample_rate)) => {
            if ready.send(Ok(sample_rate)).is_err() {
                return Vec::new();
            }
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return Vec::new();
        }
    };

    // Either an explicit stop or the session being dropped ends the capture
    let _ = stop.recv();
    drop(stream);
    debug!("Microphone released");

    let mut guard = match chunks.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    std::mem::take(&mut *guard)
}

fn build_stream(chunks: Chunks) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| ChatError::Microphone("no input device available".to_string()))?;
    let supported = device.default_input_config().map_err(mic_err)?;

    let channels = supported.channels();
    let sample_rate = supported.sample_rate().0;
    let config: cpal::StreamConfig = supported.config();
    info!(
        "Opening input '{}' ({} ch, {} Hz, {:?})",
        device.name().unwrap_or_default(),
        channels,
        sample_rate,
        supported.sample_format()
    );

    let err_fn = |e: cpal::StreamError| warn!("Audio stream error: {}", e);

    let stream = match supported.sample_format() {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let pcm: Vec<i16> = data.iter().map(|&s| wav::f32_to_i16(s)).collect();
                push_chunk(&chunks, &pcm, channels);
            },
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                push_chunk(&chunks, data, channels);
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                let pcm: Vec<i16> = data.iter().map(|&s| wav::u16_to_i16(s)).collect();
                push_chunk(&chunks, &pcm, channels);
            },
            err_fn,
            None,
        ),
        other => {
            return Err(ChatError::Microphone(format!("unsupported sample format {:?}", other)));
        }
    }
    .map_err(mic_err)?;

    stream.play().map_err(mic_err)?;
    Ok((stream, sample_rate))
}

fn push_chunk(chunks: &Mutex<Vec<Vec<i16>>>, interleaved: &[i16], channels: u16) {
    if let Ok(mut guard) = chunks.lock() {
        guard.push(wav::downmix(interleaved, channels));
    }
}

fn mic_err(e: impl std::fmt::Display) -> ChatError {
    ChatError::Microphone(e.to_string())
}
