//! fontsynth - play a soundfont from the terminal
//!
//! Run with: cargo run -- <file.sf2> [preset-index]

mod app;
mod keymap;
mod ui;

use std::path::PathBuf;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use fontsynth::{AudioDriver, MonoNotes, Settings, Synth};
use tracing_subscriber::EnvFilter;

use app::App;

struct Args {
    soundfont: PathBuf,
    preset: usize,
}

impl Args {
    fn parse() -> EyreResult<Self> {
        let mut args = std::env::args().skip(1);
        let soundfont = args
            .next()
            .map(PathBuf::from)
            .ok_or_else(|| eyre!("usage: fontsynth <file.sf2> [preset-index]"))?;
        let preset = match args.next() {
            Some(index) => index
                .parse()
                .wrap_err_with(|| format!("preset index `{index}` is not a number"))?,
            None => 0,
        };
        Ok(Self { soundfont, preset })
    }
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let args = Args::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::new();
    let synth = Synth::new(&settings).wrap_err("failed to create synth")?;

    let notes = MonoNotes::new(0, 100);
    let bank_id = notes
        .set_font(&synth, &args.soundfont, args.preset)
        .wrap_err_with(|| format!("failed to load {}", args.soundfont.display()))?;

    let driver = AudioDriver::new(&settings, &synth).wrap_err("failed to open audio output")?;
    let mut app = App::new(&synth, &driver, notes, bank_id, args.preset)?;

    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();

    result
}
