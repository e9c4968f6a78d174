//! Output through `cpal`: the device pulls blocks from the synth's renderer.

use std::marker::PhantomData;

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    FromSample, Sample, SizedSample,
};
use tracing::{info, warn};

use crate::{
    error::{Result, SynthError},
    settings::{keys, Settings},
    synth::{Shared, Synth},
    MAX_BLOCK_SIZE,
};

pub const DEFAULT_PERIOD_SIZE: i32 = 512;

/// Device parameters resolved from [`Settings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// cpal host name, or `"default"`.
    pub driver: String,
    /// Output device name, or `"default"`.
    pub device: String,
    pub period_size: u32,
}

impl DriverConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let driver = settings.str_or(keys::AUDIO_DRIVER, "default")?.to_owned();
        let device = settings.str_or(keys::AUDIO_DEVICE, "default")?.to_owned();
        let period_size = settings.int_or(keys::PERIOD_SIZE, DEFAULT_PERIOD_SIZE)?;

        if !(16..=8192).contains(&period_size) {
            return Err(SynthError::InvalidConfiguration(format!(
                "period size {period_size} outside 16..=8192"
            )));
        }

        Ok(Self {
            driver,
            device,
            period_size: period_size as u32,
        })
    }
}

/// A running output stream feeding from a [`Synth`].
///
/// The borrow ties the driver to its synth: the synth cannot be dropped while
/// the device callback may still call into it.
pub struct AudioDriver<'s> {
    stream: cpal::Stream,
    config: DriverConfig,
    device_name: String,
    _synth: PhantomData<&'s Synth>,
}

impl<'s> AudioDriver<'s> {
    pub fn new(settings: &Settings, synth: &'s Synth) -> Result<Self> {
        let config = DriverConfig::from_settings(settings)?;

        let host = open_host(&config.driver)?;
        let device = open_device(&host, &config.device)?;
        let device_name = device.name().unwrap_or_else(|_| config.device.clone());

        let supported = device.default_output_config().map_err(unavailable)?;
        let channels = supported.channels();
        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(synth.config().sample_rate as u32),
            buffer_size: cpal::BufferSize::Fixed(config.period_size),
        };

        let stream = match supported.sample_format() {
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, synth),
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, synth),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, synth),
            other => Err(SynthError::DeviceUnavailable(format!(
                "unsupported sample format {other:?}"
            ))),
        }?;

        stream.play().map_err(unavailable)?;

        info!(
            host = host.id().name(),
            device = %device_name,
            channels,
            sample_rate = stream_config.sample_rate.0,
            period = config.period_size,
            "audio stream started"
        );

        Ok(Self {
            stream,
            config,
            device_name,
            _synth: PhantomData,
        })
    }

    /// Names accepted by the `audio.driver` setting on this platform.
    pub fn available_hosts() -> Vec<&'static str> {
        cpal::available_hosts().into_iter().map(|id| id.name()).collect()
    }

    pub fn pause(&self) -> Result<()> {
        self.stream.pause().map_err(unavailable)
    }

    pub fn play(&self) -> Result<()> {
        self.stream.play().map_err(unavailable)
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

fn unavailable(err: impl std::fmt::Display) -> SynthError {
    SynthError::DeviceUnavailable(err.to_string())
}

fn open_host(name: &str) -> Result<cpal::Host> {
    if name == "default" {
        return Ok(cpal::default_host());
    }
    let id = cpal::available_hosts()
        .into_iter()
        .find(|id| id.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| SynthError::DeviceUnavailable(format!("no audio host named `{name}`")))?;
    cpal::host_from_id(id).map_err(unavailable)
}

fn open_device(host: &cpal::Host, name: &str) -> Result<cpal::Device> {
    if name == "default" {
        return host
            .default_output_device()
            .ok_or_else(|| SynthError::DeviceUnavailable("no default output device".into()));
    }
    host.output_devices()
        .map_err(unavailable)?
        .find(|d| d.name().is_ok_and(|n| n == name))
        .ok_or_else(|| SynthError::DeviceUnavailable(format!("no output device named `{name}`")))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    synth: &Synth,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<i16> + Send + 'static,
{
    let channels = config.channels as usize;

    let try_build = |cfg: &cpal::StreamConfig| {
        let shared = synth.shared();
        let mut block = vec![0i16; MAX_BLOCK_SIZE * 2];
        device.build_output_stream(
            cfg,
            move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
                fill(&shared, &mut block, data, channels);
            },
            |err| warn!(%err, "audio stream error"),
            None,
        )
    };

    if let Ok(stream) = try_build(config) {
        return Ok(stream);
    }

    warn!(buffer_size = ?config.buffer_size, "fixed period rejected, using device default");
    let mut fallback = config.clone();
    fallback.buffer_size = cpal::BufferSize::Default;
    try_build(&fallback).map_err(unavailable)
}

fn fill<T>(shared: &Shared, block: &mut [i16], data: &mut [T], channels: usize)
where
    T: SizedSample + FromSample<i16>,
{
    if channels == 0 {
        return;
    }

    for chunk in data.chunks_mut(MAX_BLOCK_SIZE * channels) {
        let frames = chunk.len() / channels;
        let block = &mut block[..frames * 2];
        shared.write_interleaved(block);

        for (frame, lr) in chunk.chunks_exact_mut(channels).zip(block.chunks_exact(2)) {
            if channels == 1 {
                let mono = ((lr[0] as i32 + lr[1] as i32) / 2) as i16;
                frame[0] = T::from_sample(mono);
                continue;
            }
            frame[0] = T::from_sample(lr[0]);
            frame[1] = T::from_sample(lr[1]);
            for extra in &mut frame[2..] {
                *extra = T::EQUILIBRIUM;
            }
        }
    }
}
