use std::path::Path;

use crate::{
    bank::InstrumentBank,
    error::{Result, SynthError},
};

/// Turns a file into an [`InstrumentBank`].
///
/// Loading runs on the control thread before the engine lock is taken, so an
/// implementation may take as long as it needs.
pub trait BankLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<InstrumentBank>;
}

impl<F> BankLoader for F
where
    F: Fn(&Path) -> Result<InstrumentBank> + Send + Sync,
{
    fn load(&self, path: &Path) -> Result<InstrumentBank> {
        self(path)
    }
}

/// Loader used when the crate is built without any file format support.
#[derive(Debug, Default)]
pub struct NoFormatLoader;

impl BankLoader for NoFormatLoader {
    fn load(&self, path: &Path) -> Result<InstrumentBank> {
        Err(SynthError::load(path, "no soundfont format support compiled in"))
    }
}

/// The loader a synth gets when none is supplied.
pub fn default_loader() -> Box<dyn BankLoader> {
    #[cfg(feature = "sf2")]
    {
        Box::new(super::sf2::Sf2Loader)
    }
    #[cfg(not(feature = "sf2"))]
    {
        Box::new(NoFormatLoader)
    }
}
