use iqwavecore::container::WaveformFile;
use iqwavecore::{exchange, Waveform, WaveformResult, WaveformSink};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes each waveform to a `.wv` container, optionally with the plaintext
/// `.env` exchange file beside it.
pub struct FileSink {
    path: PathBuf,
    write_exchange: bool,
    banner: Vec<(&'static str, f64)>,
    written: Vec<PathBuf>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, write_exchange: bool) -> Self {
        Self {
            path: path.into(),
            write_exchange,
            banner: Vec::new(),
            written: Vec::new(),
        }
    }

    /// Frequency lines for the `.env` banner.
    pub fn with_banner(mut self, banner: Vec<(&'static str, f64)>) -> Self {
        self.banner = banner;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every file produced so far, container first.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl WaveformSink for FileSink {
    /// The `.env` goes first so a failed container write can take it back;
    /// either both files land or neither does.
    fn consume(&mut self, waveform: &Waveform, file: &WaveformFile) -> WaveformResult<()> {
        let mut staged = Vec::new();
        if self.write_exchange {
            let exchange_path = self.path.with_extension("env");
            exchange::write_file(&exchange_path, waveform, &self.banner)?;
            staged.push(exchange_path);
        }

        if let Err(err) = file.write(&self.path) {
            for path in &staged {
                if let Err(cleanup) = fs::remove_file(path) {
                    log::warn!("could not remove {}: {}", path.display(), cleanup);
                }
            }
            return Err(err);
        }

        self.written.push(self.path.clone());
        self.written.extend(staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iqwavecore::container::{read_waveform_file, EncodeOptions};
    use iqwavecore::synth::single_tone;
    use tempfile::tempdir;

    #[test]
    fn file_sink_writes_container_and_exchange() {
        let dir = tempdir().unwrap();
        let wave = single_tone(1e6, 100e6, 100).unwrap();
        let file = WaveformFile::encode(&wave, &EncodeOptions::default()).unwrap();

        let mut sink = FileSink::new(dir.path().join("tone.wv"), true);
        sink.consume(&wave, &file).unwrap();
        sink.finish().unwrap();

        assert_eq!(sink.written().len(), 2);
        let parsed = read_waveform_file(sink.path()).unwrap();
        assert_eq!(parsed.tag("SAMPLES"), Some("100"));
        let back = exchange::read_file(dir.path().join("tone.env")).unwrap();
        assert_eq!(back.len(), 100);
    }

    #[test]
    fn container_only_by_default() {
        let dir = tempdir().unwrap();
        let wave = single_tone(1e6, 100e6, 10).unwrap();
        let file = WaveformFile::encode(&wave, &EncodeOptions::default()).unwrap();

        let mut sink = FileSink::new(dir.path().join("tone.wv"), false);
        sink.consume(&wave, &file).unwrap();
        assert_eq!(sink.written(), &[dir.path().join("tone.wv")]);
        assert!(!dir.path().join("tone.env").exists());
    }

    #[test]
    fn failed_container_write_removes_exchange_file() {
        let dir = tempdir().unwrap();
        let wave = single_tone(1e6, 100e6, 10).unwrap();
        let file = WaveformFile::encode(&wave, &EncodeOptions::default()).unwrap();
        fs::create_dir(dir.path().join("tone.wv")).unwrap();

        let mut sink = FileSink::new(dir.path().join("tone.wv"), true);
        assert!(sink.consume(&wave, &file).is_err());
        assert!(sink.written().is_empty());
        assert!(!dir.path().join("tone.env").exists());
    }

    #[test]
    fn banner_frequencies_reach_exchange_file() {
        let dir = tempdir().unwrap();
        let wave = single_tone(1e6, 100e6, 10).unwrap();
        let file = WaveformFile::encode(&wave, &EncodeOptions::default()).unwrap();

        let mut sink = FileSink::new(dir.path().join("tone.wv"), true)
            .with_banner(vec![("Tone Freq", 1e6)]);
        sink.consume(&wave, &file).unwrap();
        let text = fs::read_to_string(dir.path().join("tone.env")).unwrap();
        assert!(text.contains("###     Tone Freq   : 1.000 MHz\n"));
    }
}
