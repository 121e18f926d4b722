use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};

use crate::frame_bus::Frame;

/// Live audio capture producing fixed-size mono 16-bit frames.
///
/// Opens the default input device, preferring the requested sample rate and
/// resampling from the device rate when it isn't supported. Each instance
/// drives one stream; the pipeline opens one for the frame bus and one for
/// the keyword spotter's private stream.
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    target_rate: u32,
    stream: Option<Stream>,
}

impl AudioCapture {
    pub fn new(target_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .context("No input device available")?;

        println!("Using audio input device: {}", device.name()?);

        let default_config = device
            .default_input_config()
            .context("Failed to get default input config")?;

        let mut config: StreamConfig = default_config.clone().into();

        // Prefer capturing at the target rate directly
        let supported_configs = device
            .supported_input_configs()
            .context("Failed to query supported input configs")?;
        let mut found_target = false;
        for supported in supported_configs {
            if supported.min_sample_rate().0 <= target_rate
                && supported.max_sample_rate().0 >= target_rate
            {
                found_target = true;
                config.sample_rate = cpal::SampleRate(target_rate);
                break;
            }
        }

        if !found_target {
            println!(
                "Warning: {}Hz not supported, capturing at {}Hz and resampling",
                target_rate, config.sample_rate.0
            );
        }

        println!(
            "Audio config: {} channels, {} Hz",
            config.channels, config.sample_rate.0
        );

        Ok(AudioCapture {
            device,
            config,
            target_rate,
            stream: None,
        })
    }

    /// Start capturing, invoking `on_frame` with each complete frame of
    /// `frame_samples` samples at the target rate. The callback runs on the
    /// audio thread and must return quickly; handing frames to a bounded
    /// `try_send` publisher satisfies that.
    pub fn start<F>(&mut self, frame_samples: usize, mut on_frame: F) -> Result<()>
    where
        F: FnMut(Frame) + Send + 'static,
    {
        if self.stream.is_some() {
            return Ok(()); // Already capturing
        }

        let channels = self.config.channels as usize;
        let device_rate = self.config.sample_rate.0;
        let target_rate = self.target_rate;

        // Re-blocking buffer: device blocks rarely align with frame boundaries
        let mut pending: Vec<i16> = Vec::with_capacity(frame_samples * 2);

        let err_fn = |err| eprintln!("🔴 Audio stream error: {}", err);

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Downmix to mono
                    let mono: Vec<f32> = if channels == 1 {
                        data.to_vec()
                    } else {
                        data.chunks(channels)
                            .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
                            .collect()
                    };

                    let resampled = if device_rate != target_rate {
                        Self::resample(&mono, device_rate, target_rate)
                    } else {
                        mono
                    };

                    pending.extend(
                        resampled
                            .iter()
                            .map(|&x| (x.clamp(-1.0, 1.0) * 32767.0) as i16),
                    );

                    while pending.len() >= frame_samples {
                        let rest = pending.split_off(frame_samples);
                        let frame = std::mem::replace(&mut pending, rest);
                        on_frame(Frame::new(frame));
                    }
                },
                err_fn,
                None,
            )
            .context(
                "Failed to build input stream.\n\n\
                This is likely a microphone permissions issue.\n\
                Please grant microphone access to your terminal and restart the app",
            )?;

        stream.play().context("Failed to start audio stream")?;

        self.stream = Some(stream);

        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    // Simple linear interpolation resampling
    fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
        if from_rate == to_rate || input.is_empty() {
            return input.to_vec();
        }

        let ratio = from_rate as f64 / to_rate as f64;
        let output_len = (input.len() as f64 / ratio) as usize;
        let mut output = Vec::with_capacity(output_len);

        for i in 0..output_len {
            let src_idx = i as f64 * ratio;
            let src_idx_floor = src_idx.floor() as usize;
            let src_idx_ceil = (src_idx_floor + 1).min(input.len() - 1);
            let frac = src_idx - src_idx_floor as f64;

            let sample = input[src_idx_floor] * (1.0 - frac) as f32
                + input[src_idx_ceil] * frac as f32;

            output.push(sample);
        }

        output
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
