//! Stream construction and the read-only stream registry.
//!
//! A `Stream` is an immutable value built once from already-extracted sample
//! data (container reading and audio extraction happen upstream). Channel
//! selection is resolved at construction time into a concrete index, so
//! downstream code never branches on how the caller named the channel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier for a stream within a synchronization run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    /// Create a new stream id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StreamId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Errors raised while constructing streams or the registry.
///
/// These are fatal for the stream being constructed and are raised before the
/// stream enters the registry.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Sample rate must be positive and finite.
    #[error("invalid sample rate {rate} Hz for stream '{id}': must be positive and finite")]
    InvalidSampleRate { id: StreamId, rate: f64 },

    /// Pulse and data channels must have the same length.
    #[error(
        "data channel length {data_len} does not match pulse channel length {pulse_len} in stream '{id}'"
    )]
    ChannelLengthMismatch {
        id: StreamId,
        pulse_len: usize,
        data_len: usize,
    },

    /// A multi-channel buffer was empty.
    #[error("stream '{id}' has no channels")]
    NoChannels { id: StreamId },

    /// Channel index selector out of range.
    #[error("channel index {index} out of range for stream '{id}' with {count} channels")]
    ChannelIndexOutOfRange {
        id: StreamId,
        index: usize,
        count: usize,
    },

    /// Channel name selector did not match any channel.
    #[error("no channel named '{name}' in stream '{id}'")]
    UnknownChannelName { id: StreamId, name: String },

    /// Selection by name requires channel names.
    #[error("stream '{id}' has no channel names, cannot select channel '{name}' by name")]
    ChannelNamesUnavailable { id: StreamId, name: String },

    /// Registry ids must be unique.
    #[error("duplicate stream id '{id}' in registry")]
    DuplicateId { id: StreamId },
}

/// Which channel of a multi-channel buffer carries the sync pulse sequence.
///
/// Resolved exactly once at `Stream` construction into a concrete index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelSelector {
    /// Select by positional index.
    ByIndex(usize),
    /// Select by channel name (requires names to be supplied).
    ByName(String),
}

impl ChannelSelector {
    /// Resolve the selector against a channel set.
    fn resolve(
        &self,
        id: &StreamId,
        channel_count: usize,
        names: Option<&[String]>,
    ) -> Result<usize, StreamError> {
        match self {
            ChannelSelector::ByIndex(index) => {
                if *index >= channel_count {
                    return Err(StreamError::ChannelIndexOutOfRange {
                        id: id.clone(),
                        index: *index,
                        count: channel_count,
                    });
                }
                Ok(*index)
            }
            ChannelSelector::ByName(name) => {
                let names = names.ok_or_else(|| StreamError::ChannelNamesUnavailable {
                    id: id.clone(),
                    name: name.clone(),
                })?;
                names
                    .iter()
                    .position(|n| n == name)
                    .ok_or_else(|| StreamError::UnknownChannelName {
                        id: id.clone(),
                        name: name.clone(),
                    })
            }
        }
    }
}

/// An immutable, independently-clocked recording.
///
/// Holds the pulse channel used for synchronization and optionally the payload
/// channel recorded alongside it. Read-only after construction.
#[derive(Debug, Clone)]
pub struct Stream {
    id: StreamId,
    sample_rate_hz: f64,
    pulse_samples: Vec<f64>,
    data_samples: Option<Vec<f64>>,
}

impl Stream {
    /// Create a stream from a single pulse channel.
    pub fn new(
        id: impl Into<StreamId>,
        sample_rate_hz: f64,
        pulse_samples: Vec<f64>,
    ) -> Result<Self, StreamError> {
        Self::build(id.into(), sample_rate_hz, pulse_samples, None)
    }

    /// Create a stream from a pulse channel plus a same-length payload channel.
    pub fn with_data(
        id: impl Into<StreamId>,
        sample_rate_hz: f64,
        pulse_samples: Vec<f64>,
        data_samples: Vec<f64>,
    ) -> Result<Self, StreamError> {
        Self::build(id.into(), sample_rate_hz, pulse_samples, Some(data_samples))
    }

    /// Create a stream from a multi-channel buffer, resolving the pulse
    /// channel via the selector.
    ///
    /// For a two-channel buffer (the stereo camera-audio case) the non-pulse
    /// channel becomes the payload channel; with any other channel count the
    /// payload is left unset.
    pub fn from_channels(
        id: impl Into<StreamId>,
        sample_rate_hz: f64,
        mut channels: Vec<Vec<f64>>,
        names: Option<Vec<String>>,
        pulse_channel: ChannelSelector,
    ) -> Result<Self, StreamError> {
        let id = id.into();

        if channels.is_empty() {
            return Err(StreamError::NoChannels { id });
        }

        let pulse_index = pulse_channel.resolve(&id, channels.len(), names.as_deref())?;

        let data_samples = if channels.len() == 2 {
            Some(channels.swap_remove(1 - pulse_index))
        } else {
            None
        };
        // After a swap_remove of the other channel, the pulse channel is the
        // remaining element in the two-channel case.
        let pulse_samples = if channels.len() == 1 {
            channels.pop().unwrap_or_default()
        } else {
            channels.swap_remove(pulse_index)
        };

        Self::build(id, sample_rate_hz, pulse_samples, data_samples)
    }

    fn build(
        id: StreamId,
        sample_rate_hz: f64,
        pulse_samples: Vec<f64>,
        data_samples: Option<Vec<f64>>,
    ) -> Result<Self, StreamError> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(StreamError::InvalidSampleRate {
                id,
                rate: sample_rate_hz,
            });
        }

        if let Some(data) = &data_samples {
            if data.len() != pulse_samples.len() {
                return Err(StreamError::ChannelLengthMismatch {
                    id,
                    pulse_len: pulse_samples.len(),
                    data_len: data.len(),
                });
            }
        }

        Ok(Self {
            id,
            sample_rate_hz,
            pulse_samples,
            data_samples,
        })
    }

    /// Get the stream id.
    pub fn id(&self) -> &StreamId {
        &self.id
    }

    /// Get the sample rate in Hz.
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    /// Get the pulse channel samples.
    pub fn pulse_samples(&self) -> &[f64] {
        &self.pulse_samples
    }

    /// Get the payload channel samples, if present.
    pub fn data_samples(&self) -> Option<&[f64]> {
        self.data_samples.as_deref()
    }

    /// Duration of the stream in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.pulse_samples.len() as f64 / self.sample_rate_hz
    }
}

/// The reference stream plus an ordered collection of secondary streams.
///
/// Populated once at construction and treated as read-only input to the
/// synchronization pipeline, so every run is reproducible from its inputs.
#[derive(Debug, Clone)]
pub struct StreamRegistry {
    reference: Stream,
    secondaries: Vec<Stream>,
}

impl StreamRegistry {
    /// Create a registry from the reference stream and ordered secondaries.
    ///
    /// Rejects duplicate stream ids (including a secondary reusing the
    /// reference id).
    pub fn new(reference: Stream, secondaries: Vec<Stream>) -> Result<Self, StreamError> {
        let mut seen = std::collections::HashSet::new();
        seen.insert(reference.id().clone());
        for stream in &secondaries {
            if !seen.insert(stream.id().clone()) {
                return Err(StreamError::DuplicateId {
                    id: stream.id().clone(),
                });
            }
        }

        Ok(Self {
            reference,
            secondaries,
        })
    }

    /// Get the reference stream.
    pub fn reference(&self) -> &Stream {
        &self.reference
    }

    /// Get the secondary streams in caller-supplied order.
    pub fn secondaries(&self) -> &[Stream] {
        &self.secondaries
    }

    /// Number of secondary streams.
    pub fn secondary_count(&self) -> usize {
        self.secondaries.len()
    }
}
