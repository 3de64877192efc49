//! Plaintext I/Q handoff between the generators and the container encoder.
//!
//! ```text
//! # any number of comment lines; the last one becomes the waveform comment
//! 15360000.000000
//! -0.180090,-0.050085
//! ...
//! ```

use crate::container::file::write_atomically;
use crate::prelude::{IqSample, Waveform, WaveformError, WaveformResult};
use std::fmt;
use std::fs;
use std::path::Path;

const RULE: &str = "#############################################";

/// Renders `waveform` with a descriptive banner, the comment line, the clock
/// and one `I,Q` line per sample at six decimals.
pub fn write(waveform: &Waveform) -> String {
    write_annotated(waveform, &[])
}

/// Like [`write`], with one banner line per `(label, Hz)` pair, such as the
/// start and stop frequencies of a chirp.
pub fn write_annotated(waveform: &Waveform, frequencies: &[(&str, f64)]) -> String {
    ExchangeText {
        waveform,
        frequencies,
    }
    .to_string()
}

struct ExchangeText<'a> {
    waveform: &'a Waveform,
    frequencies: &'a [(&'a str, f64)],
}

impl fmt::Display for ExchangeText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let waveform = self.waveform;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "### IQ Waveform")?;
        writeln!(
            f,
            "###     {:<12}: {} Samples @ {:.3} MHz",
            "Waveform",
            waveform.len(),
            waveform.sample_rate() / 1e6
        )?;
        writeln!(
            f,
            "###     {:<12}: {:.6} mSec",
            "Wave Length",
            waveform.duration() * 1000.0
        )?;
        for (label, hz) in self.frequencies {
            writeln!(f, "###     {:<12}: {:.3} MHz", label, hz / 1e6)?;
        }
        writeln!(f, "###")?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "#{}", waveform.comment())?;
        writeln!(f, "{:.6}", waveform.sample_rate())?;
        for sample in waveform.samples() {
            writeln!(f, "{:.6},{:.6}", sample.i, sample.q)?;
        }
        Ok(())
    }
}

/// Parses the exchange format. Blank lines are ignored; the comment is the
/// text after `#` on the last comment line before the clock.
pub fn parse(text: &str) -> WaveformResult<Waveform> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let mut comment = "";
    let (clock_line, clock_text) = loop {
        match lines.next() {
            Some((_, line)) if line.starts_with('#') => comment = &line[1..],
            Some(entry) => break entry,
            None => {
                return Err(WaveformError::InvalidParameter(
                    "exchange text has no sample rate line".into(),
                ))
            }
        }
    };

    let sample_rate: f64 = clock_text.parse().map_err(|_| {
        WaveformError::InvalidParameter(format!(
            "line {}: sample rate {:?} is not a number",
            clock_line, clock_text
        ))
    })?;

    let samples = lines
        .map(|(number, line)| parse_sample(number, line))
        .collect::<WaveformResult<Vec<_>>>()?;

    Waveform::new(samples, sample_rate, comment)
}

fn parse_sample(number: usize, line: &str) -> WaveformResult<IqSample> {
    let invalid = || {
        WaveformError::InvalidParameter(format!("line {}: expected 'I,Q', got {:?}", number, line))
    };
    let (i, q) = line.split_once(',').ok_or_else(invalid)?;
    let i: f64 = i.trim().parse().map_err(|_| invalid())?;
    let q: f64 = q.trim().parse().map_err(|_| invalid())?;
    Ok(IqSample::new(i, q))
}

pub fn read_file<P: AsRef<Path>>(path: P) -> WaveformResult<Waveform> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| WaveformError::io(path, e))?;
    parse(&text)
}

/// Writes [`write_annotated`] text to `path`, replacing it atomically.
pub fn write_file<P: AsRef<Path>>(
    path: P,
    waveform: &Waveform,
    frequencies: &[(&str, f64)],
) -> WaveformResult<()> {
    let path = path.as_ref();
    write_atomically(path, &[write_annotated(waveform, frequencies).as_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::single_tone;

    const SAMPLE_FILE: &str = "\
# This file is ready for convertion
# Waveform created by Rohde & Schwarz
# Please put *.wv comment here
15360000
-0.1800899164,-0.0500845546
-0.0804992785,0.1618766459
0.0236197484,-0.1661472281
";

    #[test]
    fn parse_reads_comment_clock_and_samples() {
        let wave = parse(SAMPLE_FILE).unwrap();
        assert_eq!(wave.comment(), " Please put *.wv comment here");
        assert_eq!(wave.sample_rate(), 15_360_000.0);
        assert_eq!(wave.len(), 3);
        assert_eq!(wave.samples()[1], IqSample::new(-0.0804992785, 0.1618766459));
    }

    #[test]
    fn missing_comment_lines_give_empty_comment() {
        let wave = parse("1000\n0.5,0.25\n\n-0.5,-0.25\n").unwrap();
        assert_eq!(wave.comment(), "");
        assert_eq!(wave.len(), 2);
    }

    #[test]
    fn write_then_parse_keeps_six_decimals() {
        let tone = single_tone(1e6, 10e6, 20).unwrap();
        let text = write(&tone);
        assert!(text.contains("###     Waveform    : 20 Samples @ 10.000 MHz"));
        assert!(text.contains(&format!("#{}\n10000000.000000\n", tone.comment())));

        let back = parse(&text).unwrap();
        assert_eq!(back.comment(), tone.comment());
        assert_eq!(back.sample_rate(), tone.sample_rate());
        for (a, b) in back.samples().iter().zip(tone.samples()) {
            assert!((a.i - b.i).abs() <= 1e-6);
            assert!((a.q - b.q).abs() <= 1e-6);
        }
    }

    #[test]
    fn malformed_lines_name_their_position() {
        let err = parse("#c\n1000\n0.1,0.2\n0.3\n").unwrap_err();
        assert!(err.to_string().contains("line 4"));
        assert!(parse("#only comments\n").is_err());
        assert!(parse("fast\n0.1,0.1\n").is_err());
    }

    #[test]
    fn files_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CreateWv.env");
        let tone = single_tone(-2e6, 20e6, 40).unwrap();
        write_file(&path, &tone, &[]).unwrap();
        assert_eq!(read_file(&path).unwrap().len(), 40);
        assert!(read_file(dir.path().join("absent.env")).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn banner_lists_source_frequencies() {
        let tone = single_tone(1e6, 10e6, 20).unwrap();
        let text = write_annotated(&tone, &[("Start Freq", 1e6), ("Stop  Freq", 2.5e6)]);
        assert!(text.contains(
            "###     Wave Length : 0.002000 mSec\n\
             ###     Start Freq  : 1.000 MHz\n\
             ###     Stop  Freq  : 2.500 MHz\n\
             ###\n"
        ));
        assert!(!write(&tone).contains("Start Freq"));
        assert_eq!(parse(&text).unwrap().len(), 20);
    }

    #[test]
    fn write_file_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let tone = single_tone(1e6, 10e6, 20).unwrap();
        let err = write_file(dir.path().join("missing").join("a.env"), &tone, &[]).unwrap_err();
        assert!(matches!(err, WaveformError::Io { .. }));
    }
}
