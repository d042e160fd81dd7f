use embedded_hal::i2c::ErrorKind;
use thiserror::Error;

use crate::board::AdcChannel;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    #[error("{0} channel is not available")]
    ChannelUnavailable(AdcChannel),
    #[error("{channel} read failed: {message}")]
    ReadFailed {
        channel: AdcChannel,
        message: String,
    },
    #[error("button input read failed: {0}")]
    Button(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DisplayError {
    #[error("display bus write failed: {0}")]
    Bus(ErrorKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("network association timed out after {0} ms")]
    Timeout(u64),
    #[error("network association failed: {0}")]
    Connect(String),
    #[error("publish to `{topic}` failed: {message}")]
    Publish { topic: String, message: String },
    #[error("telemetry encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("retained memory is not available")]
    Unavailable,
    #[error("retained memory read failed: {0}")]
    Read(String),
    #[error("retained memory write failed: {0}")]
    Write(String),
}
