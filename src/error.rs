//! Error taxonomy shared by every control-thread operation.
//!
//! The render path never returns errors; everything else reports one of
//! these through [`Result`].

use std::path::PathBuf;

use thiserror::Error;

use crate::{bank::BankId, settings::SettingKind};

pub type Result<T> = std::result::Result<T, SynthError>;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A recognized setting was given a value of the wrong type.
    #[error("setting `{name}` expects a {expected} value")]
    InvalidSettingType { name: String, expected: SettingKind },

    #[error("note key {0} is outside 0..=127")]
    InvalidKey(u8),

    #[error("channel {channel} is outside 0..{count}")]
    InvalidChannel { channel: usize, count: usize },

    #[error("velocity {0} is outside 1..=127")]
    InvalidVelocity(u8),

    #[error("failed to load instrument bank {path:?}: {reason}")]
    LoadError { path: PathBuf, reason: String },

    #[error("no instrument bank with id {0}")]
    UnknownBank(BankId),

    #[error("instrument bank {0} is still in use")]
    BankInUse(BankId),

    #[error("cannot load more than {0} instrument banks")]
    OutOfBanks(usize),

    #[error("bank {bank_id} has no preset {bank_number}:{program}")]
    NoSuchPreset {
        bank_id: BankId,
        bank_number: u16,
        program: u8,
    },

    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),
}

impl SynthError {
    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::LoadError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
