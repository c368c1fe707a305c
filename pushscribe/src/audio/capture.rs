use crate::audio::device::find_device_by_id;
use crate::audio::error::{AudioError, AudioResult};
use crate::audio::format::{AudioFormat, FrameChunker};
use crate::audio::source::{AudioSource, FrameSink};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig, SupportedStreamConfig};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Microphone source backed by cpal
///
/// `cpal::Stream` is not `Send`, so every open spawns a dedicated thread that
/// owns the stream until `close` signals it. Device buffers are down-mixed
/// and cut into fixed-size frames before they reach the sink.
pub struct CpalSource {
    /// Optional device ID. None uses the default input device.
    device_id: Option<String>,
    /// Running capture thread (None when closed)
    worker: Option<CaptureWorker>,
}

struct CaptureWorker {
    stop_tx: mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

impl CpalSource {
    /// Create a new source
    ///
    /// # Arguments
    /// * `device_id` - Optional device ID. If None, uses the default input device.
    ///
    /// # Example
    /// ```no_run
    /// use pushscribe::audio::{AudioFormat, AudioSource, CpalSource};
    /// use std::sync::Arc;
    ///
    /// let mut source = CpalSource::new(None);
    /// source
    ///     .open(AudioFormat::default(), Arc::new(|frame| {
    ///         println!("{} samples", frame.sample_count());
    ///     }))
    ///     .unwrap();
    /// source.close();
    /// ```
    pub fn new(device_id: Option<&str>) -> Self {
        Self {
            device_id: device_id.map(str::to_string),
            worker: None,
        }
    }

    /// Configured device ID
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }
}

impl AudioSource for CpalSource {
    fn open(&mut self, format: AudioFormat, sink: FrameSink) -> AudioResult<()> {
        if self.worker.is_some() {
            warn!("Audio capture already started");
            return Ok(());
        }

        info!("Starting audio capture");

        let device_id = self.device_id.clone();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<AudioResult<()>>(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("pushscribe-audio".to_string())
            .spawn(move || {
                let stream = match build_stream(device_id.as_deref(), format, sink) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Hold the stream until close() or the source is dropped
                let _ = stop_rx.recv();
                drop(stream);
                debug!("Audio stream dropped");
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(CaptureWorker { stop_tx, thread });
                info!("Audio capture started successfully");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(AudioError::StreamBuildFailed(
                    "capture thread exited before the stream started".to_string(),
                ))
            }
        }
    }

    fn close(&mut self) {
        if let Some(worker) = self.worker.take() {
            info!("Stopping audio capture");
            let _ = worker.stop_tx.send(());
            if worker.thread.join().is_err() {
                error!("Audio capture thread panicked");
            }
            debug!("Audio capture stopped");
        }
    }

    fn is_open(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_stream(device_id: Option<&str>, format: AudioFormat, sink: FrameSink) -> AudioResult<Stream> {
    let host = cpal::default_host();
    let device = if let Some(id) = device_id {
        find_device_by_id(&host, id)?
    } else {
        host.default_input_device()
            .ok_or(AudioError::DeviceNotFound)?
    };

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    info!("Using audio input device: {}", device_name);

    let supported = pick_config(&device, format.sample_rate)?;
    let device_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let sample_format = supported.sample_format();
    info!(
        "Device config: {} Hz, {} channels, {:?}",
        device_rate, channels, sample_format
    );

    let config = StreamConfig {
        channels,
        sample_rate: SampleRate(device_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let mut chunker = FrameChunker::with_resampler(
        format.frame_samples,
        channels,
        device_rate,
        format.sample_rate,
    )?;
    if chunker.is_resampling() {
        info!(
            "Resampling capture {} Hz -> {} Hz",
            device_rate, format.sample_rate
        );
    }
    let on_error = move |err: cpal::StreamError| {
        error!("Audio stream error: {}", err);
    };

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                chunker.push_i16(data, |frame| sink(frame));
            },
            on_error,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                chunker.push_f32(data, |frame| sink(frame));
            },
            on_error,
            None,
        ),
        other => {
            return Err(AudioError::UnsupportedFormat(format!(
                "sample format {:?}",
                other
            )));
        }
    }
    .map_err(map_build_error)?;

    stream
        .play()
        .map_err(|e| AudioError::StreamError(e.to_string()))?;

    Ok(stream)
}

fn is_usable(format: SampleFormat) -> bool {
    matches!(format, SampleFormat::I16 | SampleFormat::F32)
}

/// Pick the device config to open
///
/// A config that runs at `sample_rate` wins, preferring i16 and fewer
/// channels. Otherwise the device's default input config is used and the
/// chunker resamples; failing that, the best usable range at its highest rate.
fn pick_config(device: &Device, sample_rate: u32) -> AudioResult<SupportedStreamConfig> {
    let rate = SampleRate(sample_rate);

    let mut candidates: Vec<_> = device
        .supported_input_configs()?
        .filter(|range| is_usable(range.sample_format()))
        .collect();

    candidates.sort_by_key(|range| {
        let format_rank = if range.sample_format() == SampleFormat::I16 { 0 } else { 1 };
        (format_rank, range.channels())
    });

    if let Some(range) = candidates
        .iter()
        .find(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
    {
        return Ok(range.clone().with_sample_rate(rate));
    }

    match device.default_input_config() {
        Ok(config) if is_usable(config.sample_format()) => {
            debug!(
                "No {} Hz config, using default {} Hz",
                sample_rate,
                config.sample_rate().0
            );
            return Ok(config);
        }
        Ok(config) => debug!(
            "Default input config uses unsupported sample format {:?}",
            config.sample_format()
        ),
        Err(e) => debug!("No default input config: {}", e),
    }

    candidates
        .into_iter()
        .next()
        .map(|range| range.with_max_sample_rate())
        .ok_or_else(|| {
            AudioError::UnsupportedFormat("device offers no i16 or f32 input config".to_string())
        })
}

fn map_build_error(err: cpal::BuildStreamError) -> AudioError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            AudioError::DeviceBusy("device is no longer available".to_string())
        }
        cpal::BuildStreamError::StreamConfigNotSupported => {
            AudioError::UnsupportedFormat("stream configuration not supported".to_string())
        }
        other => AudioError::StreamBuildFailed(other.to_string()),
    }
}
