use crate::container::header::{encode_header, HeaderTag, MarkerLists, WaveformHeader};
use crate::container::levels::LevelStatistics;
use crate::container::payload::{
    decode_payload, encode_payload, EncodedPayload, OverflowPolicy, TERMINATOR,
};
use crate::prelude::{IqSample, Waveform, WaveformError, WaveformResult};
use crate::telemetry::LogManager;
use chrono::{Local, NaiveDateTime};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Knobs for turning a waveform into a container.
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub overflow: OverflowPolicy,
    pub markers: MarkerLists,
    /// Fixed header date; `None` reads the local wall clock.
    pub timestamp: Option<NaiveDateTime>,
}

/// Header, payload and the level figures they were built from.
#[derive(Debug, Clone)]
pub struct WaveformFile {
    header: WaveformHeader,
    payload: EncodedPayload,
    levels: LevelStatistics,
}

impl WaveformFile {
    pub fn encode(waveform: &Waveform, options: &EncodeOptions) -> WaveformResult<Self> {
        let logger = LogManager::new("container");
        let levels = LevelStatistics::compute(waveform)?;
        let timestamp = options
            .timestamp
            .unwrap_or_else(|| Local::now().naive_local());
        let header = encode_header(
            waveform.sample_rate(),
            waveform.comment(),
            waveform.len(),
            &levels,
            timestamp,
            &options.markers,
        )?;
        let payload = encode_payload(waveform, options.overflow);

        logger.record(&format!(
            "comment {:?}, clock {}, {} samples, rms {:.6} dB, peak {:.6} dB",
            waveform.comment(),
            waveform.sample_rate(),
            waveform.len(),
            levels.rms_db,
            levels.peak_db
        ));
        debug_assert_eq!(header.declared_len(), payload.declared_len());

        Ok(Self {
            header,
            payload,
            levels,
        })
    }

    pub fn header(&self) -> &WaveformHeader {
        &self.header
    }

    pub fn payload(&self) -> &EncodedPayload {
        &self.payload
    }

    pub fn levels(&self) -> &LevelStatistics {
        &self.levels
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        bytes.extend_from_slice(self.payload.as_bytes());
        bytes
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> WaveformResult<()> {
        write_waveform_file(path, &self.header, &self.payload)
    }

    pub fn parse(bytes: &[u8]) -> WaveformResult<ParsedWaveformFile> {
        parse_container(bytes)
    }
}

/// Writes `header` then `payload` to `path`.
///
/// Data goes to a temporary file beside the target, which is flushed, synced
/// and renamed over `path`. On any error the temporary file is removed and the
/// target is left untouched.
pub fn write_waveform_file<P: AsRef<Path>>(
    path: P,
    header: &WaveformHeader,
    payload: &EncodedPayload,
) -> WaveformResult<()> {
    let path = path.as_ref();
    let header_bytes = header.to_bytes();
    write_atomically(path, &[header_bytes.as_slice(), payload.as_bytes()])?;
    log::debug!(
        "wrote {} ({} payload bytes)",
        path.display(),
        payload.declared_len()
    );
    Ok(())
}

/// Writes `parts` in order through a synced temporary file renamed over
/// `path`. Shared with the exchange writer.
pub(crate) fn write_atomically(path: &Path, parts: &[&[u8]]) -> WaveformResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| WaveformError::io(path, e))?;
    write_parts(&mut temp, parts).map_err(|e| WaveformError::io(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| WaveformError::io(path, e))?;
    temp.persist(path)
        .map_err(|e| WaveformError::io(path, e.error))?;
    Ok(())
}

fn write_parts<W: Write>(out: W, parts: &[&[u8]]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(out);
    for part in parts {
        writer.write_all(part)?;
    }
    writer.flush()
}

pub fn read_waveform_file<P: AsRef<Path>>(path: P) -> WaveformResult<ParsedWaveformFile> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| WaveformError::io(path, e))?;
    parse_container(&bytes)
}

/// A container read back from bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedWaveformFile {
    pub tags: Vec<HeaderTag>,
    pub declared_len: usize,
    pub iq_bytes: Vec<u8>,
}

impl ParsedWaveformFile {
    /// Tag value with surrounding whitespace removed.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.name == name)
            .map(|tag| tag.value.trim())
    }

    pub fn sample_rate(&self) -> WaveformResult<f64> {
        let clock = self
            .tag("CLOCK")
            .ok_or_else(|| WaveformError::Format("missing CLOCK tag".into()))?;
        clock
            .parse()
            .map_err(|_| WaveformError::Format(format!("unreadable CLOCK value {:?}", clock)))
    }

    pub fn samples(&self) -> WaveformResult<Vec<IqSample>> {
        decode_payload(&self.iq_bytes)
    }

    /// Rebuilds a waveform at the declared clock with the stored comment.
    pub fn to_waveform(&self) -> WaveformResult<Waveform> {
        let comment = self.tag("COMMENT").unwrap_or_default().to_string();
        Waveform::new(self.samples()?, self.sample_rate()?, comment)
    }
}

fn parse_container(bytes: &[u8]) -> WaveformResult<ParsedWaveformFile> {
    let mut tags = Vec::new();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            return Err(WaveformError::Format("no WAVEFORM tag found".into()));
        }
        if bytes[pos] != b'{' {
            return Err(WaveformError::Format(format!(
                "expected '{{' at byte {}",
                pos
            )));
        }

        let colon = find(bytes, pos, b':')?;
        if bytes[pos + 1..colon].iter().any(|&b| b == b'{' || b == b'}') {
            return Err(WaveformError::Format(format!(
                "tag at byte {} has no ':' before the next brace",
                pos
            )));
        }
        let name = ascii(&bytes[pos + 1..colon], pos)?;

        if let Some(length) = name.strip_prefix("WAVEFORM-") {
            let declared_len: usize = length.trim().parse().map_err(|_| {
                WaveformError::Format(format!("bad WAVEFORM length {:?}", length))
            })?;
            if declared_len == 0 || (declared_len - 1) % 4 != 0 {
                return Err(WaveformError::Format(format!(
                    "declared length {} is not 4 * samples + 1",
                    declared_len
                )));
            }
            let hash = find(bytes, colon, b'#')?;
            if !bytes[colon + 1..hash].iter().all(u8::is_ascii_whitespace) {
                return Err(WaveformError::Format(
                    "unexpected bytes before '#' in WAVEFORM tag".into(),
                ));
            }

            let start = hash + 1;
            let end = start
                .checked_add(declared_len - 1)
                .filter(|&end| end < bytes.len())
                .ok_or_else(|| {
                    WaveformError::Format(format!(
                        "payload truncated: declared {} bytes, found {}",
                        declared_len,
                        bytes.len().saturating_sub(start)
                    ))
                })?;
            if bytes[end] != TERMINATOR {
                return Err(WaveformError::Format(format!(
                    "expected '}}' after {} payload bytes",
                    declared_len - 1
                )));
            }

            return Ok(ParsedWaveformFile {
                tags,
                declared_len,
                iq_bytes: bytes[start..end].to_vec(),
            });
        }

        let close = find(bytes, colon, b'}')?;
        let value = ascii(&bytes[colon + 1..close], colon)?;
        tags.push(HeaderTag::new(name, value));
        pos = close + 1;
    }
}

fn find(bytes: &[u8], from: usize, needle: u8) -> WaveformResult<usize> {
    bytes[from..]
        .iter()
        .position(|&b| b == needle)
        .map(|offset| from + offset)
        .ok_or_else(|| {
            WaveformError::Format(format!(
                "unterminated tag starting near byte {}: missing {:?}",
                from, needle as char
            ))
        })
}

fn ascii(bytes: &[u8], offset: usize) -> WaveformResult<String> {
    std::str::from_utf8(bytes)
        .ok()
        .filter(|text| text.is_ascii())
        .map(str::to_string)
        .ok_or_else(|| WaveformError::Format(format!("non-ASCII header text near byte {}", offset)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{dual_tone, AmplitudeScale};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn options() -> EncodeOptions {
        EncodeOptions {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
                .and_then(|d| d.and_hms_opt(8, 0, 0)),
            ..Default::default()
        }
    }

    #[test]
    fn container_round_trips_through_parser() {
        let wave = Waveform::from_components(&[0.5, -0.5], &[0.25, -0.25], 1000.0, "pair").unwrap();
        let file = WaveformFile::encode(&wave, &options()).unwrap();
        let bytes = file.to_bytes();

        let parsed = WaveformFile::parse(&bytes).unwrap();
        assert_eq!(parsed.declared_len, 9);
        assert_eq!(parsed.tag("SAMPLES"), Some("2"));
        assert_eq!(parsed.tag("TYPE"), Some("SMU-WV,0"));
        assert_eq!(parsed.tag("DATE"), Some("2024-03-01;08:00:00"));
        assert_eq!(parsed.sample_rate().unwrap(), 1000.0);
        assert_eq!(parsed.iq_bytes, file.payload().iq_bytes());

        let restored = parsed.to_waveform().unwrap();
        assert_eq!(restored.comment(), "pair");
        assert_eq!(restored.len(), 2);
    }

    #[test]
    fn container_bytes_are_header_then_payload() {
        let wave = dual_tone(2e6, 3e6, 200e6, 3, AmplitudeScale::Half).unwrap();
        let file = WaveformFile::encode(&wave, &options()).unwrap();
        let bytes = file.to_bytes();
        let header_len = file.header().to_bytes().len();
        assert_eq!(bytes.len(), header_len + 4 * 3 + 1);
        assert_eq!(&bytes[header_len..], file.payload().as_bytes());
        assert_eq!(file.header().declared_len(), 13);
    }

    #[test]
    fn encoding_all_zero_waveform_fails() {
        let wave = Waveform::from_components(&[0.0; 4], &[0.0; 4], 1000.0, "").unwrap();
        assert!(matches!(
            WaveformFile::encode(&wave, &options()),
            Err(WaveformError::DegenerateWaveform(_))
        ));
    }

    #[test]
    fn written_file_matches_encoded_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wv");
        let wave = dual_tone(2e6, 3e6, 200e6, 64, AmplitudeScale::Half).unwrap();
        let file = WaveformFile::encode(&wave, &options()).unwrap();
        file.write(&path).unwrap();

        assert_eq!(fs::read(&path).unwrap(), file.to_bytes());
        let parsed = read_waveform_file(&path).unwrap();
        assert_eq!(parsed.samples().unwrap().len(), 64);
    }

    #[test]
    fn unwritable_path_reports_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("tone.wv");
        let wave = Waveform::from_components(&[0.5], &[0.5], 1000.0, "").unwrap();
        let file = WaveformFile::encode(&wave, &options()).unwrap();
        assert!(matches!(file.write(&path), Err(WaveformError::Io { .. })));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let wave = Waveform::from_components(&[0.5, 0.1], &[0.5, 0.1], 1000.0, "").unwrap();
        let bytes = WaveformFile::encode(&wave, &options()).unwrap().to_bytes();
        assert!(WaveformFile::parse(&bytes[..bytes.len() - 2]).is_err());

        let mut broken = bytes.clone();
        *broken.last_mut().unwrap() = b'x';
        assert!(WaveformFile::parse(&broken).is_err());
    }

    #[test]
    fn oversized_declared_length_is_rejected() {
        let bytes = b"{TYPE: SMU-WV,0}{WAVEFORM-18446744073709551613: #abcd}";
        assert!(matches!(
            WaveformFile::parse(bytes),
            Err(WaveformError::Format(message)) if message.contains("truncated")
        ));
    }

    #[test]
    fn tag_without_colon_is_rejected() {
        let bytes = b"{FOO}{BAR:1}{WAVEFORM-5: #abcd}";
        assert!(matches!(
            WaveformFile::parse(bytes),
            Err(WaveformError::Format(_))
        ));

        let ok = WaveformFile::parse(b"{FOO:x}{BAR:1}{WAVEFORM-5: #abcd}").unwrap();
        assert_eq!(ok.tag("FOO"), Some("x"));
        assert_eq!(ok.iq_bytes, b"abcd");
    }
}
