//! Fractional sample playback over a shared 16-bit sample pool.

use std::{ops::Range, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Sample Playback
===============

A voice plays a recorded sample at a different pitch by reading it at a
different RATE. Reading every sample (rate 1.0) reproduces the recording;
rate 2.0 skips every other sample and sounds an octave higher; rate 0.5
reads each sample twice and sounds an octave lower.

Vocabulary
----------

  cursor      The read position in the sample pool, as a fractional index.
              Advanced by `rate` every output frame.

  span        Where this sample lives in the pool: [start, end).

  loop        An optional sub-range [loop_start, loop_end). Once the cursor
              passes loop_end it jumps back by the loop length, so a short
              recording can sustain indefinitely.

  frac        The fractional part of the cursor. The value between two stored
              samples has to be estimated (interpolated).


Interpolation
-------------

  None     Take the sample at floor(cursor). Cheapest; aliases audibly when
           pitched far from the root key.

  Linear   s0 + (s1 - s0) × frac. One multiply, good default.

  Cubic    4-point Catmull-Rom through s[-1], s0, s1, s2. Smoother high end
           for heavily transposed samples.

Neighbours past loop_end are fetched from the loop start, so interpolation
across the loop seam stays continuous. Neighbours past the span's end read
as silence.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    None,
    #[default]
    Linear,
    Cubic,
}

impl FromStr for Interpolation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Interpolation::None),
            "linear" => Ok(Interpolation::Linear),
            "cubic" => Ok(Interpolation::Cubic),
            other => Err(format!("unknown interpolation `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleCursor {
    position: f64,
    start: usize,
    end: usize,
    loop_start: usize,
    loop_end: usize,
    looping: bool,
    finished: bool,
}

impl SampleCursor {
    /// Cursor at `span.start`. A loop range that is empty or leaves the span
    /// is ignored.
    pub fn new(span: Range<usize>, loop_range: Option<Range<usize>>) -> Self {
        let (loop_start, loop_end, looping) = match loop_range {
            Some(l) if l.start < l.end && l.start >= span.start && l.end <= span.end => {
                (l.start, l.end, true)
            }
            _ => (span.start, span.end, false),
        };

        Self {
            position: span.start as f64,
            start: span.start,
            end: span.end,
            loop_start,
            loop_end,
            looping,
            finished: span.start >= span.end,
        }
    }

    /// A cursor that has nothing to play.
    pub fn idle() -> Self {
        Self::new(0..0, None)
    }

    /// Let the sample run past the loop to its end (loop-until-release).
    pub fn stop_looping(&mut self) {
        self.looping = false;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Interpolated value at the cursor, scaled to -1.0..1.0.
    #[inline]
    pub fn read(&self, data: &[i16], method: Interpolation) -> f32 {
        if self.finished {
            return 0.0;
        }

        let index = self.position as usize;
        let frac = (self.position - index as f64) as f32;

        match method {
            Interpolation::None => self.fetch(data, index),
            Interpolation::Linear => {
                let s0 = self.fetch(data, index);
                let s1 = self.fetch(data, index + 1);
                s0 + (s1 - s0) * frac
            }
            Interpolation::Cubic => {
                let sm1 = self.fetch(data, index.saturating_sub(1).max(self.start));
                let s0 = self.fetch(data, index);
                let s1 = self.fetch(data, index + 1);
                let s2 = self.fetch(data, index + 2);
                catmull_rom(sm1, s0, s1, s2, frac)
            }
        }
    }

    /// Move forward by `step` source samples.
    #[inline]
    pub fn advance(&mut self, step: f64) {
        if self.finished {
            return;
        }

        self.position += step;

        if self.looping {
            let loop_end = self.loop_end as f64;
            if self.position >= loop_end {
                let loop_start = self.loop_start as f64;
                let len = loop_end - loop_start;
                self.position = loop_start + (self.position - loop_start) % len;
            }
        } else if self.position >= self.end as f64 {
            self.finished = true;
        }
    }

    #[inline]
    fn fetch(&self, data: &[i16], index: usize) -> f32 {
        let mut index = index;
        if self.looping && index >= self.loop_end {
            index = self.loop_start + (index - self.loop_end) % (self.loop_end - self.loop_start);
        }
        if index >= self.end {
            return 0.0;
        }
        data.get(index)
            .map(|&s| s as f32 / 32_768.0)
            .unwrap_or(0.0)
    }
}

#[inline]
fn catmull_rom(sm1: f32, s0: f32, s1: f32, s2: f32, t: f32) -> f32 {
    let a = -0.5 * sm1 + 1.5 * s0 - 1.5 * s1 + 0.5 * s2;
    let b = sm1 - 2.5 * s0 + 2.0 * s1 - 0.5 * s2;
    let c = -0.5 * sm1 + 0.5 * s1;
    ((a * t + b) * t + c) * t + s0
}
