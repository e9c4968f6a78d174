//! Interactive state: the sounding note, octave and preset selection.

use std::time::Duration;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;

use fontsynth::{AudioDriver, BankId, MonoNotes, PresetInfo, Synth};

use crate::{keymap, ui};

pub struct App<'a> {
    synth: &'a Synth,
    driver: &'a AudioDriver<'a>,
    notes: MonoNotes,
    bank_id: BankId,
    /// Playable presets, in file order
    pub presets: Vec<PresetInfo>,
    pub selected: usize,
    pub octave: u8,
    pub paused: bool,
    pub status: String,
    should_quit: bool,
}

impl<'a> App<'a> {
    pub fn new(
        synth: &'a Synth,
        driver: &'a AudioDriver<'a>,
        notes: MonoNotes,
        bank_id: BankId,
        selected: usize,
    ) -> EyreResult<Self> {
        let presets = synth
            .bank(bank_id)?
            .playable_presets()
            .map(|p| p.info())
            .collect();

        Ok(Self {
            synth,
            driver,
            notes,
            bank_id,
            presets,
            selected,
            octave: 4,
            paused: false,
            status: format!("output: {}", driver.device_name()),
            should_quit: false,
        })
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            terminal.draw(|frame| ui::render(frame, self))?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code)?;
                    }
                }
            }
        }

        self.notes.release(self.synth)?;
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode) -> EyreResult<()> {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(' ') => self.notes.release(self.synth)?,
            KeyCode::Char(c @ '0'..='8') => {
                self.octave = c as u8 - b'0';
            }
            KeyCode::Char(c) => {
                if let Some(key) = keymap::key_for(c, self.octave) {
                    self.notes.switch(self.synth, key)?;
                }
            }
            KeyCode::Up => self.select(self.selected.saturating_sub(1))?,
            KeyCode::Down => self.select(self.selected + 1)?,
            KeyCode::Tab => self.toggle_pause()?,
            _ => {}
        }
        Ok(())
    }

    fn select(&mut self, index: usize) -> EyreResult<()> {
        let Some(preset) = self.presets.get(index) else {
            return Ok(());
        };
        self.notes.release(self.synth)?;
        self.synth
            .program_select(
                self.notes.channel(),
                self.bank_id,
                preset.bank_number,
                preset.program,
            )
            .wrap_err("program select failed")?;
        self.selected = index;
        self.status = format!("preset {:03}:{:03} {}", preset.bank_number, preset.program, preset.name);
        Ok(())
    }

    fn toggle_pause(&mut self) -> EyreResult<()> {
        if self.paused {
            self.driver.play()?;
        } else {
            self.driver.pause()?;
        }
        self.paused = !self.paused;
        Ok(())
    }

    pub fn current_note(&self) -> Option<String> {
        self.notes.current().map(keymap::note_name)
    }

    pub fn active_voices(&self) -> usize {
        self.synth.active_voice_count()
    }

    pub fn polyphony(&self) -> usize {
        self.synth.config().polyphony
    }

    pub fn sample_rate(&self) -> f32 {
        self.synth.config().sample_rate
    }
}
