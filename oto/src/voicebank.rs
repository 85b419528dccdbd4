//! Voicebanks: a directory of recorded samples described by an oto.ini.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use uta_audio::{AudioError, Segment};

use crate::cache::Cache;
use crate::error::{OtoError, Result};
use crate::frq::Frq;
use crate::sample::Sample;

/// Name of the sample configuration inside a voicebank directory.
pub const CONFIG_FILE: &str = "oto.ini";

/// Pitch analysis used to fill missing frq files.
pub trait FrqAnalyzer: Send + Sync {
    fn analyze(&self, audio: &Segment) -> Result<Frq>;
}

/// A set of samples indexed by alias, with memoized audio and frq loading.
///
/// Loaded audio and frq data are cached per alias for the lifetime of the
/// voicebank (or until [`Voicebank::teardown`]). The voicebank is `Sync`, so
/// one instance can serve all rendering threads.
#[derive(Debug)]
pub struct Voicebank {
    dir: PathBuf,
    samples: Vec<Sample>,
    index: HashMap<String, usize>,
    audio: Cache<Segment>,
    frq: Cache<Frq>,
}

impl Voicebank {
    /// Creates a voicebank rooted at `dir` from already parsed samples.
    ///
    /// When two samples share an alias the later one wins.
    pub fn new(dir: impl Into<PathBuf>, samples: impl IntoIterator<Item = Sample>) -> Self {
        let mut vb = Self {
            dir: dir.into(),
            samples: Vec::new(),
            index: HashMap::new(),
            audio: Cache::new(),
            frq: Cache::new(),
        };
        for sample in samples {
            vb.insert(sample);
        }
        vb
    }

    /// Opens the voicebank in `dir`, parsing its oto.ini.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let path = dir.join(CONFIG_FILE);
        let data = fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => OtoError::FileNotFound(path.clone()),
            _ => OtoError::Io(e),
        })?;

        let samples = Self::parse_config(&String::from_utf8_lossy(&data))?;
        debug!(dir = %dir.display(), samples = samples.len(), "opened voicebank");
        Ok(Self::new(dir, samples))
    }

    /// Like [`Voicebank::open`], also checking that every sample file exists.
    pub fn open_checked(dir: impl AsRef<Path>) -> Result<Self> {
        let vb = Self::open(dir)?;
        for sample in &vb.samples {
            let path = vb.dir.join(&sample.file);
            if !path.is_file() {
                return Err(OtoError::FileNotFound(path));
            }
        }
        Ok(vb)
    }

    /// Parses oto.ini text into samples.
    ///
    /// Blank lines and `[section]` headers are skipped. The first malformed
    /// record fails the whole parse with its 1-based line number.
    pub fn parse_config(text: &str) -> Result<Vec<Sample>> {
        let mut samples = Vec::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim_start_matches('\u{feff}').trim();
            if line.is_empty() || (line.starts_with('[') && line.ends_with(']')) {
                continue;
            }
            let sample = Sample::parse(line).map_err(|e| e.at_line(i + 1))?;
            if sample.overlap_exceeds_preutterance() {
                warn!(
                    alias = %sample.alias,
                    overlap = sample.overlap,
                    preutterance = sample.preutterance,
                    "overlap exceeds preutterance"
                );
            }
            samples.push(sample);
        }
        Ok(samples)
    }

    fn insert(&mut self, sample: Sample) {
        match self.index.get(&sample.alias) {
            Some(&i) => {
                warn!(alias = %sample.alias, "duplicate alias, keeping the later entry");
                self.samples[i] = sample;
            }
            None => {
                self.index.insert(sample.alias.clone(), self.samples.len());
                self.samples.push(sample);
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the sample for `alias`.
    pub fn get(&self, alias: &str) -> Result<&Sample> {
        self.index
            .get(alias)
            .map(|&i| &self.samples[i])
            .ok_or_else(|| OtoError::NotFound(alias.to_string()))
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.index.contains_key(alias)
    }

    /// All samples in configuration order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.samples.iter().map(|s| s.alias.as_str())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Path to the audio file of `alias`.
    pub fn path_to(&self, alias: &str) -> Result<PathBuf> {
        Ok(self.dir.join(&self.get(alias)?.file))
    }

    /// Path to the frq file of `alias`: `a.wav` maps to `a_wav.frq`.
    pub fn path_to_frq(&self, alias: &str) -> Result<PathBuf> {
        Ok(frq_path(&self.path_to(alias)?))
    }

    /// Loads the audio of `alias`, decoding it on first use.
    pub fn load(&self, alias: &str) -> Result<Arc<Segment>> {
        let path = self.path_to(alias)?;
        self.audio.get_or_try_insert_with(alias, || {
            debug!(alias, path = %path.display(), "loading sample audio");
            Segment::from_file(&path).map_err(|e| match e {
                AudioError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                    OtoError::FileNotFound(path.clone())
                }
                other => OtoError::Audio(other),
            })
        })
    }

    /// Loads the frq of `alias`.
    ///
    /// The frq file next to the sample is read if present. Otherwise the
    /// audio is analysed with `analyzer` and the result is written back so
    /// later runs skip the analysis; a failed write is only logged.
    pub fn load_frq(&self, alias: &str, analyzer: &dyn FrqAnalyzer) -> Result<Arc<Frq>> {
        let path = self.path_to_frq(alias)?;
        self.frq.get_or_try_insert_with(alias, || {
            if path.is_file() {
                debug!(alias, path = %path.display(), "reading frq");
                return Frq::read_from(BufReader::new(File::open(&path)?));
            }

            debug!(alias, "analysing sample pitch");
            let audio = self.load(alias)?;
            let frq = analyzer.analyze(&audio)?;
            if let Err(e) = write_frq(&path, &frq) {
                warn!(alias, path = %path.display(), error = %e, "failed to write frq");
            }
            Ok(frq)
        })
    }

    /// Number of samples whose audio is currently cached.
    pub fn cached_audio(&self) -> usize {
        self.audio.len()
    }

    /// Number of samples whose frq is currently cached.
    pub fn cached_frq(&self) -> usize {
        self.frq.len()
    }

    /// Clears the audio and frq caches.
    pub fn teardown(&self) {
        self.audio.clear();
        self.frq.clear();
    }
}

fn write_frq(path: &Path, frq: &Frq) -> Result<()> {
    let file = File::create(path)?;
    frq.write_to(BufWriter::new(file))
}

fn frq_path(audio: &Path) -> PathBuf {
    let stem = audio.file_stem().unwrap_or_default().to_string_lossy();
    let name = match audio.extension() {
        Some(ext) => format!("{stem}_{}.frq", ext.to_string_lossy()),
        None => format!("{stem}.frq"),
    };
    audio.with_file_name(name)
}
