//! ABC notation output.
//!
//! A top-level list is a melody; a list inside it is a chord. Durations are
//! written in sixty-fourth notes (`L:1/64`), so a quarter note is `C16`.

use std::collections::HashMap;

use crate::dsl::error::CompileError;
use crate::dsl::note::{Accidental, Pitch, Rhythm, ScaleDegree};
use crate::dsl::property;
use crate::runtime::{RuntimeValue, Value};

use super::Renderer;

/// Bars per output line.
const BARS_PER_LINE: usize = 4;

const MAJOR_STEPS: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];
const MINOR_STEPS: [i32; 7] = [0, 2, 3, 5, 7, 8, 10];
const SHARP_ORDER: [char; 7] = ['f', 'c', 'g', 'd', 'a', 'e', 'b'];
const FLAT_ORDER: [char; 7] = ['b', 'e', 'a', 'd', 'g', 'c', 'f'];

#[derive(Debug, Clone, Default)]
pub struct AbcRenderer {
    /// Used when the value has no `title` property.
    pub title: Option<String>,
}

impl AbcRenderer {
    pub fn new(title: Option<String>) -> Self {
        Self { title }
    }
}

impl Renderer for AbcRenderer {
    fn render(&self, output: &RuntimeValue) -> Result<String, CompileError> {
        let key = Key::parse(output.property("key").unwrap_or("c major"))?;
        let time = output.property("time").unwrap_or("4 / 4");
        let (beats, unit) = property::time_signature(time);

        let mut out = String::new();
        out.push_str("X:1\n");
        let title = output
            .property("title")
            .or(self.title.as_deref())
            .unwrap_or("Untitled");
        out.push_str(&format!("T:{title}\n"));
        if let Some(composer) = output.property("composer") {
            out.push_str(&format!("C:{composer}\n"));
        }
        out.push_str(&format!("M:{}\n", meter(time)));
        out.push_str("L:1/64\n");
        match output.property("clef") {
            Some(clef) => out.push_str(&format!("K:{} clef={clef}\n", key.abc_name())),
            None => out.push_str(&format!("K:{}\n", key.abc_name())),
        }

        let mut body = Body::new(&key, bar_ticks(beats, unit));
        if let Some(dynamic) = output.property("dynamic") {
            body.decorate(dynamic);
        }
        match &output.return_value {
            Value::List(items) => {
                for item in items {
                    body.element(item)?;
                }
            }
            _ => body.event(output)?,
        }
        out.push_str(&body.finish());
        out.push('\n');

        log::debug!("rendered {} bytes of ABC", out.len());
        Ok(out)
    }
}

fn meter(time: &str) -> String {
    match time {
        "common" => "C".to_string(),
        "cut" => "C|".to_string(),
        other => other.replace(' ', ""),
    }
}

/// Ticks in one bar of `beats / unit`.
fn bar_ticks(beats: u32, unit: u32) -> u32 {
    beats * (crate::dsl::note::TICKS_PER_WHOLE / unit.max(1))
}

/// A key: where degrees land and which accidentals the signature implies.
#[derive(Debug, Clone)]
struct Key {
    tonic: String,
    minor: bool,
    /// Positive for sharps, negative for flats.
    fifths: i32,
}

impl Key {
    fn parse(value: &str) -> Result<Self, CompileError> {
        let (tonic, mode) = value
            .split_once(' ')
            .ok_or_else(|| CompileError::render(format!("`{value}` is not a key")))?;
        let minor = mode == "minor";
        let fifths = fifths(tonic, minor).ok_or_else(|| {
            CompileError::render(format!(
                "key `{value}` has no standard key signature; use its enharmonic equivalent"
            ))
        })?;
        Ok(Self {
            tonic: tonic.to_string(),
            minor,
            fifths,
        })
    }

    fn abc_name(&self) -> String {
        let mut chars = self.tonic.chars();
        let mut name: String = chars.next().map(|c| c.to_ascii_uppercase()).into_iter().collect();
        name.extend(chars);
        if self.minor {
            name.push('m');
        }
        name
    }

    /// Shift the signature applies to a note letter.
    fn signature_shift(&self, letter: char) -> i32 {
        let count = self.fifths.unsigned_abs() as usize;
        if self.fifths > 0 && SHARP_ORDER[..count].contains(&letter) {
            1
        } else if self.fifths < 0 && FLAT_ORDER[..count].contains(&letter) {
            -1
        } else {
            0
        }
    }

    /// The pitch a scale degree names, in octave 4.
    fn resolve(&self, degree: &ScaleDegree) -> Result<Pitch, CompileError> {
        let tonic = Pitch::parse(&format!("{}4", self.tonic)).map_err(CompileError::render)?;
        let steps = if self.minor { MINOR_STEPS } else { MAJOR_STEPS };
        let step = steps[usize::from(degree.degree.saturating_sub(1)).min(6)];
        let shift = degree.accidental.map_or(0, Accidental::shift);
        Pitch::from_pitch_number(tonic.pitch_number + step + shift, self.fifths < 0).ok_or_else(
            || CompileError::render(format!("degree {} falls outside the piano", degree.name())),
        )
    }
}

fn fifths(tonic: &str, minor: bool) -> Option<i32> {
    let major = [
        ("cb", -7),
        ("gb", -6),
        ("db", -5),
        ("ab", -4),
        ("eb", -3),
        ("bb", -2),
        ("f", -1),
        ("c", 0),
        ("g", 1),
        ("d", 2),
        ("a", 3),
        ("e", 4),
        ("b", 5),
        ("f#", 6),
        ("c#", 7),
    ];
    let minor_keys = [
        ("ab", -7),
        ("eb", -6),
        ("bb", -5),
        ("f", -4),
        ("c", -3),
        ("g", -2),
        ("d", -1),
        ("a", 0),
        ("e", 1),
        ("b", 2),
        ("f#", 3),
        ("c#", 4),
        ("g#", 5),
        ("d#", 6),
        ("a#", 7),
    ];
    let table: &[(&str, i32)] = if minor { &minor_keys } else { &major };
    table.iter().find(|(name, _)| *name == tonic).map(|(_, n)| *n)
}

/// The tune body, built event by event.
struct Body<'k> {
    key: &'k Key,
    bar_ticks: u32,
    elapsed: u32,
    bars: usize,
    /// Accidentals written so far in the current bar.
    bar_accidentals: HashMap<(char, u8), i32>,
    out: String,
}

impl<'k> Body<'k> {
    fn new(key: &'k Key, bar_ticks: u32) -> Self {
        Self {
            key,
            bar_ticks,
            elapsed: 0,
            bars: 0,
            bar_accidentals: HashMap::new(),
            out: String::new(),
        }
    }

    fn push(&mut self, text: &str) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push(' ');
        }
        self.out.push_str(text);
    }

    fn decorate(&mut self, dynamic: &str) {
        self.push(&format!("!{dynamic}!"));
    }

    /// One element of the top-level list.
    fn element(&mut self, item: &RuntimeValue) -> Result<(), CompileError> {
        if let Some(dynamic) = item.property("dynamic") {
            self.decorate(dynamic);
        }
        match &item.return_value {
            Value::List(notes) => self.chord(notes),
            _ => self.event(item),
        }
    }

    /// A single note or rest.
    fn event(&mut self, item: &RuntimeValue) -> Result<(), CompileError> {
        let (text, ticks) = match &item.return_value {
            Value::Rhythm(rhythm) => (format!("z{}", duration(rhythm)), rhythm.ticks()),
            _ => {
                let (pitch, rhythm) = self.sounding(item)?;
                (format!("{}{}", self.note(&pitch), duration(&rhythm)), rhythm.ticks())
            }
        };
        self.push(&text);
        self.advance(ticks);
        Ok(())
    }

    fn chord(&mut self, notes: &[RuntimeValue]) -> Result<(), CompileError> {
        if notes.is_empty() {
            return Err(CompileError::render("a chord needs at least one note"));
        }
        let mut text = String::from("[");
        let mut first_ticks = None;
        for note in notes {
            let (pitch, rhythm) = self.sounding(note)?;
            text.push_str(&self.note(&pitch));
            text.push_str(&duration(&rhythm));
            first_ticks.get_or_insert(rhythm.ticks());
        }
        text.push(']');
        self.push(&text);
        // ABC takes a chord's length from its first note.
        self.advance(first_ticks.unwrap_or(0));
        Ok(())
    }

    /// The pitch and length of something that sounds.
    fn sounding(&self, item: &RuntimeValue) -> Result<(Pitch, Rhythm), CompileError> {
        match &item.return_value {
            Value::Pitch(p) => Ok((*p, Rhythm::QUARTER)),
            Value::PitchRhythm { pitch, rhythm } => Ok((*pitch, *rhythm)),
            Value::Degree(d) => Ok((self.key.resolve(d)?, Rhythm::QUARTER)),
            Value::DegreeRhythm { degree, rhythm } => Ok((self.key.resolve(degree)?, *rhythm)),
            Value::Rhythm(_) => Err(CompileError::render("rests cannot be part of a chord")),
            Value::List(_) => Err(CompileError::render(
                "lists nested more than two levels deep cannot be rendered",
            )),
            Value::Number(_) | Value::Boolean(_) => Err(CompileError::render(format!(
                "a value of type {} cannot be rendered as music",
                item.return_type
            ))),
        }
    }

    /// Note name with whatever accidental the bar needs.
    fn note(&mut self, pitch: &Pitch) -> String {
        let wanted = pitch.accidental.map_or(0, Accidental::shift);
        let slot = (pitch.note, pitch.octave);
        let current = self
            .bar_accidentals
            .get(&slot)
            .copied()
            .unwrap_or_else(|| self.key.signature_shift(pitch.note));

        let mut text = String::new();
        if wanted != current {
            text.push_str(match wanted {
                1 => "^",
                -1 => "_",
                _ => "=",
            });
            self.bar_accidentals.insert(slot, wanted);
        }

        if pitch.octave >= 5 {
            text.push(pitch.note);
            text.push_str(&"'".repeat(usize::from(pitch.octave - 5)));
        } else {
            text.push(pitch.note.to_ascii_uppercase());
            text.push_str(&",".repeat(usize::from(4 - pitch.octave)));
        }
        text
    }

    fn advance(&mut self, ticks: u32) {
        self.elapsed += ticks;
        if self.elapsed < self.bar_ticks {
            return;
        }
        if self.elapsed > self.bar_ticks {
            log::warn!("a note crosses a bar line; ABC output will not tie it");
        }
        let line = self.bars / BARS_PER_LINE;
        self.bars += (self.elapsed / self.bar_ticks) as usize;
        self.elapsed %= self.bar_ticks;
        self.bar_accidentals.clear();
        self.push("|");
        if self.bars / BARS_PER_LINE > line {
            self.out.push('\n');
        }
    }

    fn finish(mut self) -> String {
        if self.out.ends_with('|') {
            self.out.push(']');
        } else if self.out.ends_with("|\n") {
            self.out.pop();
            self.out.push(']');
        } else {
            self.push("|]");
        }
        self.out
    }
}

/// Length in `L:1/64` units.
fn duration(rhythm: &Rhythm) -> String {
    let ticks = rhythm.ticks();
    if ticks % 2 == 0 {
        (ticks / 2).to_string()
    } else {
        format!("{ticks}/2")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::types::Type;

    fn pitch(text: &str) -> RuntimeValue {
        RuntimeValue::new(Type::Pitch, Value::Pitch(Pitch::parse(text).unwrap()))
    }

    fn note(text: &str, rhythm: &str) -> RuntimeValue {
        RuntimeValue::new(
            Type::PitchRhythm,
            Value::PitchRhythm {
                pitch: Pitch::parse(text).unwrap(),
                rhythm: Rhythm::parse(rhythm).unwrap(),
            },
        )
    }

    fn degree(text: &str) -> RuntimeValue {
        RuntimeValue::new(Type::Degree, Value::Degree(ScaleDegree::parse(text).unwrap()))
    }

    fn melody(items: Vec<RuntimeValue>) -> RuntimeValue {
        let ty = items
            .first()
            .map_or(Type::EmptyList, |i| Type::list_of(i.return_type.clone()));
        RuntimeValue::new(ty, Value::List(items))
    }

    fn body(rendered: &str) -> &str {
        rendered
            .split_once("K:")
            .and_then(|(_, rest)| rest.split_once('\n'))
            .map(|(_, body)| body.trim_end())
            .unwrap()
    }

    #[test]
    fn header_defaults() {
        let out = AbcRenderer::default().render(&pitch("c4")).unwrap();
        assert!(out.starts_with("X:1\nT:Untitled\nM:4/4\nL:1/64\nK:C\n"));
    }

    #[test]
    fn header_from_properties() {
        let mut value = melody(vec![pitch("c4")]);
        for (k, v) in [
            ("title", "Air"),
            ("composer", "Anon"),
            ("time", "6 / 8"),
            ("key", "f# minor"),
            ("clef", "bass"),
        ] {
            value.properties.insert(k.into(), v.into());
        }
        let out = AbcRenderer::new(Some("Ignored".into())).render(&value).unwrap();
        assert!(out.contains("T:Air\n"));
        assert!(out.contains("C:Anon\n"));
        assert!(out.contains("M:6/8\n"));
        assert!(out.contains("K:F#m clef=bass\n"));
    }

    #[test]
    fn renderer_title_is_fallback() {
        let out = AbcRenderer::new(Some("Sketch".into()))
            .render(&pitch("c4"))
            .unwrap();
        assert!(out.contains("T:Sketch\n"));
    }

    #[test]
    fn octaves_and_bars() {
        let value = melody(vec![
            note("c4", "half"),
            note("c5", "half"),
            note("b3", "whole"),
            note("e6", "quarter"),
        ]);
        let out = AbcRenderer::default().render(&value).unwrap();
        assert_eq!(body(&out), "C32 c32 | B,64 | e'16 |]");
    }

    #[test]
    fn accidentals_reset_each_bar() {
        let value = melody(vec![
            note("c#4", "half"),
            note("c4", "half"),
            note("c#4", "whole"),
        ]);
        let out = AbcRenderer::default().render(&value).unwrap();
        assert_eq!(body(&out), "^C32 =C32 | ^C64 |]");
    }

    #[test]
    fn key_signature_suppresses_accidentals() {
        let mut value = melody(vec![pitch("f#4"), pitch("f4")]);
        value.properties.insert("key".into(), "g major".into());
        let out = AbcRenderer::default().render(&value).unwrap();
        assert_eq!(body(&out), "F16 =F16 |]");
    }

    #[test]
    fn chords_and_rests() {
        let chord = melody(vec![pitch("c4"), pitch("e4"), pitch("g4")]);
        let rest = RuntimeValue::new(Type::Rhythm, Value::Rhythm(Rhythm::parse("half").unwrap()));
        let value = RuntimeValue::new(
            Type::list_of(Type::list_of(Type::Pitch)),
            Value::List(vec![chord, rest]),
        );
        let out = AbcRenderer::default().render(&value).unwrap();
        assert_eq!(body(&out), "[C16E16G16] z32 |]");
    }

    #[test]
    fn degrees_follow_the_key() {
        let mut value = melody(vec![degree("i"), degree("iii"), degree("v")]);
        value.properties.insert("key".into(), "d minor".into());
        let out = AbcRenderer::default().render(&value).unwrap();
        assert!(out.contains("K:Dm\n"));
        // D minor has one flat, so the third (F) needs no accidental.
        assert_eq!(body(&out), "D16 F16 A16 |]");
    }

    #[test]
    fn dynamics_become_decorations() {
        let mut loud = pitch("g4");
        loud.properties.insert("dynamic".into(), "ff".into());
        let value = melody(vec![pitch("c4"), loud]);
        let out = AbcRenderer::default().render(&value).unwrap();
        assert_eq!(body(&out), "C16 !ff! G16 |]");
    }

    #[test]
    fn long_notes_count_every_bar_they_fill() {
        let mut value = melody(
            ["c4", "d4", "e4", "f4", "g4"]
                .into_iter()
                .map(|p| note(p, "whole"))
                .collect(),
        );
        value.properties.insert("time".into(), "2 / 4".into());
        let out = AbcRenderer::default().render(&value).unwrap();
        assert_eq!(body(&out), "C64 | D64 |\nE64 | F64 |\nG64 |]");
    }

    #[test]
    fn dotted_sixty_fourth_is_fractional() {
        assert_eq!(duration(&Rhythm::parse("dotted sixty-fourth").unwrap()), "3/2");
        assert_eq!(duration(&Rhythm::parse("dotted quarter").unwrap()), "24");
    }

    #[test]
    fn numbers_cannot_render() {
        let err = AbcRenderer::default()
            .render(&RuntimeValue::number(3))
            .unwrap_err();
        assert_eq!(err.kind, crate::dsl::error::ErrorKind::RenderError);
        assert!(err.reason.contains("number"));
    }

    #[test]
    fn theoretical_keys_rejected() {
        let mut value = pitch("c4");
        value.properties.insert("key".into(), "d# major".into());
        assert!(AbcRenderer::default().render(&value).is_err());
    }
}
