//! Render properties that can be attached to values with `x.property = ...;`.

const CLEFS: &[&str] = &["treble", "bass", "alto", "tenor", "percussion"];
const DYNAMICS: &[&str] = &["ppp", "pp", "p", "mp", "mf", "f", "ff", "fff"];
const INSTRUMENTS: &[&str] = &[
    "piano",
    "violin",
    "viola",
    "cello",
    "contrabass",
    "flute",
    "oboe",
    "clarinet",
    "bassoon",
    "trumpet",
    "horn",
    "trombone",
    "tuba",
    "guitar",
    "harp",
    "voice",
];
const KEY_TONICS: &[&str] = &[
    "c", "c#", "db", "d", "d#", "eb", "e", "f", "f#", "gb", "g", "g#", "ab", "a", "a#", "bb",
    "b", "cb",
];
const KEY_MODES: &[&str] = &["major", "minor"];
/// Time signatures arrive as their tokens joined by spaces.
const TIME_SIGNATURES: &[&str] = &[
    "2 / 2", "2 / 4", "3 / 4", "4 / 4", "5 / 4", "3 / 8", "6 / 8", "9 / 8", "12 / 8", "common",
    "cut",
];

/// Properties that take free text.
const WILDCARD_PROPERTIES: &[&str] = &["composer", "title", "part_id"];

/// Check `value` against the values `property` allows.
pub fn validate(property: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("property `{property}` needs a value"));
    }
    if WILDCARD_PROPERTIES.contains(&property) {
        return Ok(());
    }

    let allowed = match property {
        "clef" => CLEFS.contains(&value),
        "dynamic" => DYNAMICS.contains(&value),
        "instrument" => INSTRUMENTS.contains(&value),
        "time" => TIME_SIGNATURES.contains(&value),
        "key" => is_key(value),
        _ => return Err(format!("`{property}` is not a known property")),
    };

    if allowed {
        Ok(())
    } else {
        Err(format!("`{value}` is not a valid value for property `{property}`"))
    }
}

fn is_key(value: &str) -> bool {
    match value.split_once(' ') {
        Some((tonic, mode)) => KEY_TONICS.contains(&tonic) && KEY_MODES.contains(&mode),
        None => false,
    }
}

/// Beats per bar and beat unit of a validated `time` value.
pub fn time_signature(value: &str) -> (u32, u32) {
    match value {
        "common" => (4, 4),
        "cut" => (2, 2),
        _ => {
            let mut parts = value.split(" / ").map(|p| p.parse::<u32>().unwrap_or(4));
            let beats = parts.next().unwrap_or(4);
            let unit = parts.next().unwrap_or(4);
            (beats, unit)
        }
    }
}
