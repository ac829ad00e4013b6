//! Musical literal decoding: pitches ("c#4"), rhythms ("dotted quarter")
//! and scale degrees ("iv", "vi#").

use serde::Serialize;

/// Rhythm ticks in a whole note. A dotted sixty-fourth is the smallest
/// value and still lands on a whole tick.
pub const TICKS_PER_WHOLE: u32 = 128;

const ROMAN_DEGREES: [&str; 7] = ["i", "ii", "iii", "iv", "v", "vi", "vii"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Accidental {
    Sharp,
    Flat,
    Natural,
}

impl Accidental {
    fn from_char(ch: char) -> Option<Self> {
        match ch {
            '#' => Some(Accidental::Sharp),
            'b' => Some(Accidental::Flat),
            'n' => Some(Accidental::Natural),
            _ => None,
        }
    }

    pub fn shift(self) -> i32 {
        match self {
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
            Accidental::Natural => 0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Accidental::Sharp => "#",
            Accidental::Flat => "b",
            Accidental::Natural => "n",
        }
    }
}

/// A decoded pitch.
///
/// `pitch_number` counts semitones up from A0 (piano key index), so
/// `midi_number` is always `pitch_number + 21`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pitch {
    pub note: char,
    pub accidental: Option<Accidental>,
    pub octave: u8,
    pub pitch_number: i32,
    pub midi_number: i32,
}

/// Semitone offset of a note letter from A.
fn note_offset(note: char) -> Option<i32> {
    match note {
        'a' => Some(0),
        'b' => Some(2),
        'c' => Some(3),
        'd' => Some(5),
        'e' => Some(7),
        'f' => Some(8),
        'g' => Some(10),
        _ => None,
    }
}

impl Pitch {
    /// Decode `<letter><accidental?><octave>`, e.g. `c#4`, `Bb3`, `en5`.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut chars = text.chars().peekable();
        let note = chars
            .next()
            .map(|c| c.to_ascii_lowercase())
            .ok_or_else(|| "empty pitch".to_string())?;
        let offset = note_offset(note).ok_or_else(|| format!("invalid note name in `{text}`"))?;

        let accidental = match chars.peek().copied().and_then(Accidental::from_char) {
            Some(acc) => {
                chars.next();
                Some(acc)
            }
            None => None,
        };

        let digits: String = chars.collect();
        let written_octave: i32 = digits
            .parse()
            .map_err(|_| format!("invalid octave in pitch `{text}`"))?;

        // Octaves change at C, but the numbering starts at A.
        let octave = if offset > 2 {
            written_octave - 1
        } else {
            written_octave
        };
        if octave < 0 {
            return Err(format!("pitch `{text}` is below the lowest octave"));
        }

        let pitch_number = offset + 12 * octave + accidental.map_or(0, Accidental::shift);
        Ok(Self {
            note,
            accidental,
            octave: written_octave as u8,
            pitch_number,
            midi_number: pitch_number + 21,
        })
    }

    /// Build a pitch from its pitch number, spelled with flats or sharps.
    pub fn from_pitch_number(pitch_number: i32, prefer_flats: bool) -> Option<Self> {
        const SHARPS: [(char, Option<Accidental>); 12] = [
            ('a', None),
            ('a', Some(Accidental::Sharp)),
            ('b', None),
            ('c', None),
            ('c', Some(Accidental::Sharp)),
            ('d', None),
            ('d', Some(Accidental::Sharp)),
            ('e', None),
            ('f', None),
            ('f', Some(Accidental::Sharp)),
            ('g', None),
            ('g', Some(Accidental::Sharp)),
        ];
        const FLATS: [(char, Option<Accidental>); 12] = [
            ('a', None),
            ('b', Some(Accidental::Flat)),
            ('b', None),
            ('c', None),
            ('d', Some(Accidental::Flat)),
            ('d', None),
            ('e', Some(Accidental::Flat)),
            ('e', None),
            ('f', None),
            ('g', Some(Accidental::Flat)),
            ('g', None),
            ('a', Some(Accidental::Flat)),
        ];

        if pitch_number < 0 {
            return None;
        }
        let table = if prefer_flats { &FLATS } else { &SHARPS };
        let (note, accidental) = table[pitch_number.rem_euclid(12) as usize];
        let offset = note_offset(note)?;
        let base = offset + accidental.map_or(0, Accidental::shift);
        // Undo the octave shift for letters above B.
        let octave = (pitch_number - base).div_euclid(12) + i32::from(offset > 2);
        if !(0..=9).contains(&octave) {
            return None;
        }

        Some(Self {
            note,
            accidental,
            octave: octave as u8,
            pitch_number,
            midi_number: pitch_number + 21,
        })
    }

    /// Move by `semitones`, keeping flat spelling for flat pitches.
    pub fn transpose(&self, semitones: i64) -> Option<Self> {
        let target = i64::from(self.pitch_number).checked_add(semitones)?;
        let target = i32::try_from(target).ok()?;
        Self::from_pitch_number(target, self.accidental == Some(Accidental::Flat))
    }

    pub fn name(&self) -> String {
        format!(
            "{}{}{}",
            self.note,
            self.accidental.map_or("", Accidental::symbol),
            self.octave
        )
    }
}

/// A named note duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RhythmName {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
}

impl RhythmName {
    fn parse(word: &str) -> Option<Self> {
        match word {
            "whole" => Some(RhythmName::Whole),
            "half" => Some(RhythmName::Half),
            "quarter" => Some(RhythmName::Quarter),
            "eighth" => Some(RhythmName::Eighth),
            "sixteenth" => Some(RhythmName::Sixteenth),
            "thirty-second" => Some(RhythmName::ThirtySecond),
            "sixty-fourth" => Some(RhythmName::SixtyFourth),
            _ => None,
        }
    }

    /// Fraction of a whole note, as a denominator.
    fn divisions(self) -> u32 {
        match self {
            RhythmName::Whole => 1,
            RhythmName::Half => 2,
            RhythmName::Quarter => 4,
            RhythmName::Eighth => 8,
            RhythmName::Sixteenth => 16,
            RhythmName::ThirtySecond => 32,
            RhythmName::SixtyFourth => 64,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RhythmName::Whole => "whole",
            RhythmName::Half => "half",
            RhythmName::Quarter => "quarter",
            RhythmName::Eighth => "eighth",
            RhythmName::Sixteenth => "sixteenth",
            RhythmName::ThirtySecond => "thirty-second",
            RhythmName::SixtyFourth => "sixty-fourth",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rhythm {
    pub name: RhythmName,
    pub dotted: bool,
}

impl Rhythm {
    pub const QUARTER: Rhythm = Rhythm {
        name: RhythmName::Quarter,
        dotted: false,
    };

    /// Parse `quarter`, `dotted eighth`, ...
    pub fn parse(text: &str) -> Option<Self> {
        let (dotted, word) = match text.strip_prefix("dotted ") {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        RhythmName::parse(word).map(|name| Self { name, dotted })
    }

    /// Duration in [`TICKS_PER_WHOLE`] units. Dotted adds half again.
    pub fn ticks(&self) -> u32 {
        let plain = TICKS_PER_WHOLE / self.name.divisions();
        if self.dotted {
            plain + plain / 2
        } else {
            plain
        }
    }

    pub fn name(&self) -> String {
        if self.dotted {
            format!("dotted {}", self.name.as_str())
        } else {
            self.name.as_str().to_string()
        }
    }
}

/// A scale-relative pitch, 1 through 7, optionally raised or lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScaleDegree {
    pub degree: u8,
    pub accidental: Option<Accidental>,
}

impl ScaleDegree {
    /// Decode a roman-numeral degree such as `iv` or `VII#`.
    ///
    /// Values are summed left to right; a value larger than its predecessor
    /// cancels the predecessor (subtract twice, then add).
    pub fn parse(text: &str) -> Result<Self, String> {
        let lower = text.to_ascii_lowercase();
        let (numeral, accidental) = split_degree_accidental(&lower);

        let mut total: i32 = 0;
        let mut previous: i32 = 0;
        for ch in numeral.chars() {
            let value = match ch {
                'i' => 1,
                'v' => 5,
                _ => return Err(format!("invalid scale degree `{text}`")),
            };
            if value > previous {
                total = total - 2 * previous + value;
            } else {
                total += value;
            }
            previous = value;
        }

        if !(1..=7).contains(&total) {
            return Err(format!(
                "scale degree `{text}` decodes to {total}, degrees run from 1 to 7"
            ));
        }

        Ok(Self {
            degree: total as u8,
            accidental,
        })
    }

    /// Step through the scale, wrapping within 1..=7.
    pub fn transpose(&self, steps: i64) -> Self {
        let zero_based = (i64::from(self.degree) - 1 + steps).rem_euclid(7);
        Self {
            degree: zero_based as u8 + 1,
            accidental: self.accidental,
        }
    }

    pub fn name(&self) -> String {
        format!(
            "{}{}",
            ROMAN_DEGREES[usize::from(self.degree - 1)],
            self.accidental.map_or("", Accidental::symbol)
        )
    }
}

fn split_degree_accidental(lower: &str) -> (&str, Option<Accidental>) {
    if let Some(rest) = lower.strip_suffix('#') {
        (rest, Some(Accidental::Sharp))
    } else if let Some(rest) = lower.strip_suffix('b') {
        (rest, Some(Accidental::Flat))
    } else {
        (lower, None)
    }
}

/// `i`..`vii`, any case, optionally followed by `#` or `b`.
pub fn is_scale_degree(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    let (numeral, _) = split_degree_accidental(&lower);
    ROMAN_DEGREES.contains(&numeral)
}

/// `[a-gA-G][#bn]?[0-9]`, whole symbol.
pub fn is_pitch(s: &str) -> bool {
    let chars: Vec<char> = s.chars().collect();
    if chars.is_empty() || !matches!(chars[0], 'a'..='g' | 'A'..='G') {
        return false;
    }
    let mut i = 1;
    if i < chars.len() && matches!(chars[i], '#' | 'b' | 'n') {
        i += 1;
    }
    i + 1 == chars.len() && chars[i].is_ascii_digit()
}

pub fn is_rhythm(s: &str) -> bool {
    Rhythm::parse(s).is_some()
}
