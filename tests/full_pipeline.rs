//! Full pipeline integration tests: source → tokens → syntax tree → value → ABC.

use motif::config::{Config, OutputFormat};
use motif::dsl::expression::lift_literal;
use motif::dsl::{Compiler, ErrorKind, TokenKind};
use motif::runtime::Value;

const SEED: u64 = 42;

fn abc(src: &str) -> String {
    Compiler::compile(src, &Config::default()).unwrap_or_else(|e| panic!("compile failed: {e}"))
}

/// Everything after the `K:` header line.
fn body(rendered: &str) -> String {
    let (_, rest) = rendered.split_once("\nK:").expect("no K: line");
    let (_, body) = rest.split_once('\n').expect("no body");
    body.trim_end().to_string()
}

fn sample_song_src() -> &'static str {
    "-- A short phrase built from a motif and its transpositions.
list pitch_rhythm motif = [c4 quarter, e4 quarter, g4 half];

fn shift(notes: list pitch_rhythm, by: number): list pitch_rhythm {
    list pitch_rhythm out = [];
    for n in notes {
        out = out + [n + by];
    }
    return out;
}

fn main(): list pitch_rhythm {
    list pitch_rhythm song = motif + shift(motif, 5);
    song.title = Little Phrase;
    song.composer = Nobody;
    song.key = c major;
    song[3].dynamic = f;
    return song;
}
"
}

#[test]
fn sample_song_renders() {
    let out = abc(sample_song_src());
    assert!(out.starts_with("X:1\nT:Little Phrase\nC:Nobody\nM:4/4\nL:1/64\nK:C\n"));
    assert_eq!(body(&out), "C16 E16 G32 | !f! F16 A16 c32 |]");
}

#[test]
fn sample_song_as_yaml() {
    let config = Config {
        format: OutputFormat::Yaml,
        ..Config::default()
    };
    let out = Compiler::compile(sample_song_src(), &config).unwrap();
    assert!(out.contains("return_type: list pitch_rhythm"));
    assert!(out.contains("title: Little Phrase"));
    assert!(out.contains("dynamic: f"));
}

#[test]
fn every_pitch_keeps_midi_offset() {
    for octave in 0..=9 {
        for letter in ['a', 'b', 'c', 'd', 'e', 'f', 'g'] {
            for accidental in ["", "#", "b", "n"] {
                let text = format!("{letter}{accidental}{octave}");
                let tokens = Compiler::tokenize(&text);
                assert_eq!(tokens.len(), 1, "{text}");
                assert_eq!(tokens[0].kind, TokenKind::PitchLiteral, "{text}");

                // Letters above B in octave 0 sit below the piano.
                let Ok(literal) = lift_literal(&tokens[0]) else {
                    assert!(octave == 0 && letter > 'b', "{text} should decode");
                    continue;
                };
                let motif::dsl::Literal::Pitch(pitch) = literal.value else {
                    panic!("{text} did not lift to a pitch");
                };
                assert_eq!(pitch.midi_number, pitch.pitch_number + 21, "{text}");
                assert_eq!(pitch.note, letter);
                assert_eq!(pitch.octave, octave);
                assert_eq!(pitch.name(), text);
            }
        }
    }
}

#[test]
fn fused_pitch_rhythm_token() {
    let tokens = Compiler::tokenize("c#4 quarter");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::PitchRhythmLiteral);
    assert_eq!(tokens[0].text, "c#4 quarter");
}

#[test]
fn comment_lines_produce_nothing() {
    assert!(Compiler::tokenize("-- fn main(): number { return 1; }").is_empty());
}

#[test]
fn dash_between_numbers_is_an_operator() {
    let texts: Vec<_> = Compiler::tokenize("20-10+x")
        .into_iter()
        .map(|t| t.text)
        .collect();
    assert_eq!(texts, ["20", "-", "10", "+", "x"]);
}

#[test]
fn main_returning_five() {
    let value = Compiler::evaluate("fn main(): number { return 5; }", SEED).unwrap();
    assert_eq!(value.return_type.to_string(), "number");
    assert_eq!(value.return_value, Value::Number(5));
}

#[test]
fn bare_rhythms_are_rests() {
    let value = Compiler::evaluate("fn main(): rhythm { return quarter; }", SEED).unwrap();
    assert_eq!(value.return_type.to_string(), "rhythm");

    let out = abc("fn main(): list rhythm {
        rhythm r = half;
        list rhythm rs = [r, quarter];
        return rs + [eighth];
    }");
    assert_eq!(body(&out), "z32 z16 z8 |]");
}

#[test]
fn nested_list_element_replaced() {
    let value = Compiler::evaluate(
        "fn main(): list list number {
            list list number x = [[1, 2], [3, 4]];
            x[0] = [9, 9];
            return x;
        }",
        SEED,
    )
    .unwrap();
    assert_eq!(value.return_value.to_string(), "[[9, 9], [3, 4]]");
}

#[test]
fn chords_from_nested_lists() {
    let out = abc("fn main(): list list pitch {
        list list pitch chords = [[c4, e4, g4], [f4, a4, c5]];
        return chords * 2;
    }");
    assert_eq!(
        body(&out),
        "[C16E16G16] [F16A16c16] [C16E16G16] [F16A16c16] |]"
    );
}

#[test]
fn degrees_in_minor_key() {
    let out = abc("fn main(): list degree_rhythm {
        list degree_rhythm line = [i half, iii quarter, v quarter];
        line.key = a minor;
        line.time = 3 / 4;
        return line;
    }");
    assert!(out.contains("M:3/4\n"));
    assert!(out.contains("K:Am\n"));
    assert_eq!(body(&out), "A32 c16 | e16 |]");
}

#[test]
fn rand_depends_only_on_seed() {
    let src = "fn main(): list number { return [rand(), rand(), seed]; }";
    let a = Compiler::evaluate(src, 3).unwrap();
    let b = Compiler::evaluate(src, 3).unwrap();
    assert_eq!(a, b);
    assert!(a.return_value.to_string().ends_with(", 3]"));
}

#[test]
fn runtime_errors_carry_positions() {
    let err = Compiler::evaluate(
        "fn main(): number {\n    list number xs = [1, 2];\n    return xs[5];\n}",
        SEED,
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RuntimeError);
    assert_eq!(err.line, 3);
}

#[test]
fn unrenderable_result() {
    let err = Compiler::compile("fn main(): boolean { return true; }", &Config::default())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RenderError);
}
