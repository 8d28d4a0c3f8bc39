use thiserror::Error;

/// Rejection reasons for note construction.
///
/// Raised at the API boundary so that a [`Note`] that exists is always
/// well-formed; nothing downstream re-checks these ranges.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("pitch {0} is outside the MIDI range 0..=127")]
    PitchOutOfRange(u8),
    #[error("start time {0} is negative")]
    NegativeStart(f64),
    #[error("duration {0} is not positive")]
    NonPositiveDuration(f64),
    #[error("velocity {0} is outside 0.0..=1.0")]
    VelocityOutOfRange(f64),
}

/**
A single pitched sound event.

Invariants, enforced by [`Note::new`]:

- `pitch` is a MIDI key number in `0..=127`
- `start` is non-negative, in seconds
- `duration` is strictly positive, in seconds
- `velocity` is normalized to `0.0..=1.0`
**/
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Note {
    pitch: u8,
    start: f64,
    duration: f64,
    velocity: f64,
}

impl Note {
    /// Validates the given fields and builds a Note from them.
    ///
    /// ```
    /// use cantilena::model::Note;
    ///
    /// let middle_c = Note::new(60, 0.0, 0.5, 0.8).unwrap();
    /// assert_eq!(middle_c.end(), 0.5);
    /// assert!(Note::new(60, -1.0, 0.5, 0.8).is_err());
    /// ```
    pub fn new(pitch: u8, start: f64, duration: f64, velocity: f64) -> Result<Self, ValidationError> {
        if pitch > 127 {
            return Err(ValidationError::PitchOutOfRange(pitch));
        }
        // The comparisons are written so that NaN also fails them.
        if !(start >= 0.0) {
            return Err(ValidationError::NegativeStart(start));
        }
        if !(duration > 0.0) {
            return Err(ValidationError::NonPositiveDuration(duration));
        }
        if !(0.0..=1.0).contains(&velocity) {
            return Err(ValidationError::VelocityOutOfRange(velocity));
        }

        Ok(Self {
            pitch,
            start,
            duration,
            velocity,
        })
    }

    pub fn pitch(&self) -> u8 {
        self.pitch
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// The instant the note stops sounding, in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Moves the onset, clamping at zero rather than rejecting.
    pub fn set_start(&mut self, start: f64) {
        self.start = start.max(0.0);
    }

    /// True if the note is audible at instant `t` (half-open interval).
    pub fn sounds_at(&self, t: f64) -> bool {
        t >= self.start && t < self.end()
    }
}
