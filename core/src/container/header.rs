use crate::container::levels::LevelStatistics;
use crate::prelude::{WaveformError, WaveformResult};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const WAVEFORM_TYPE: &str = "SMU-WV,0";
pub const DATE_FORMAT: &str = "%Y-%m-%d;%H:%M:%S";

/// A single `{NAME:value}` block. `value` is kept verbatim, including the
/// leading space some tags carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTag {
    pub name: String,
    pub value: String,
}

impl HeaderTag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Tag written as `{NAME: value}`.
    pub fn spaced(name: impl Into<String>, value: impl AsRef<str>) -> Self {
        Self::new(name, format!(" {}", value.as_ref()))
    }

    pub fn render(&self) -> String {
        format!("{{{}:{}}}", self.name, self.value)
    }
}

/// Contents of the four marker list blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerLists(pub [String; 4]);

impl Default for MarkerLists {
    fn default() -> Self {
        Self([
            "0:1;20:0".to_string(),
            "0:0".to_string(),
            "0:0".to_string(),
            "0:0".to_string(),
        ])
    }
}

/// Ordered tag blocks followed by the `{WAVEFORM-N: #` opener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveformHeader {
    tags: Vec<HeaderTag>,
    declared_len: usize,
}

impl WaveformHeader {
    pub fn tags(&self) -> &[HeaderTag] {
        &self.tags
    }

    /// Byte count declared in the waveform tag, `4 × samples + 1`.
    pub fn declared_len(&self) -> usize {
        self.declared_len
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.name == name)
            .map(|tag| tag.value.as_str())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut text: String = self.tags.iter().map(HeaderTag::render).collect();
        text.push_str(&waveform_opener(self.declared_len));
        text.into_bytes()
    }
}

fn waveform_opener(declared_len: usize) -> String {
    format!("{{WAVEFORM-{}: #", declared_len)
}

/// Clock text: integral rates print without a fraction.
pub fn format_clock(sample_rate: f64) -> String {
    if sample_rate.fract() == 0.0 && sample_rate.abs() < 1e15 {
        format!("{:.0}", sample_rate)
    } else {
        format!("{}", sample_rate)
    }
}

/// Builds the header for `sample_count` samples stamped with `timestamp`.
pub fn encode_header(
    sample_rate: f64,
    comment: &str,
    sample_count: usize,
    levels: &LevelStatistics,
    timestamp: NaiveDateTime,
    markers: &MarkerLists,
) -> WaveformResult<WaveformHeader> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(WaveformError::InvalidParameter(format!(
            "clock must be positive, got {}",
            sample_rate
        )));
    }
    if sample_count == 0 {
        return Err(WaveformError::InvalidParameter(
            "header needs at least one sample".into(),
        ));
    }
    check_header_text("comment", comment)?;
    for list in &markers.0 {
        check_header_text("marker list", list)?;
    }

    let clock = format_clock(sample_rate);
    let mut tags = vec![
        HeaderTag::spaced("TYPE", WAVEFORM_TYPE),
        HeaderTag::spaced("COMMENT", comment),
        HeaderTag::new("DATE", timestamp.format(DATE_FORMAT).to_string()),
        HeaderTag::new("CLOCK", clock.clone()),
        HeaderTag::spaced("CLOCK MARKER", &clock),
        HeaderTag::new("LEVEL OFFS", levels.level_offs()),
        HeaderTag::new("SAMPLES", sample_count.to_string()),
    ];
    for (index, list) in markers.0.iter().enumerate() {
        tags.push(HeaderTag::spaced(format!("MARKER LIST {}", index + 1), list));
    }

    Ok(WaveformHeader {
        tags,
        declared_len: 4 * sample_count + 1,
    })
}

/// Same as [`encode_header`], stamped with the local wall clock.
pub fn encode_header_now(
    sample_rate: f64,
    comment: &str,
    sample_count: usize,
    levels: &LevelStatistics,
    markers: &MarkerLists,
) -> WaveformResult<WaveformHeader> {
    encode_header(
        sample_rate,
        comment,
        sample_count,
        levels,
        Local::now().naive_local(),
        markers,
    )
}

fn check_header_text(field: &str, text: &str) -> WaveformResult<()> {
    if !text.is_ascii() || text.contains(|c| matches!(c, '{' | '}' | '\r' | '\n')) {
        return Err(WaveformError::InvalidParameter(format!(
            "{} must be single-line ASCII without braces: {:?}",
            field, text
        )));
    }
    Ok(())
}
