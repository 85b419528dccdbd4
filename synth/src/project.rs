//! Multi-track projects.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uta_audio::Segment;
use uta_oto::Voicebank;

use crate::config::ProjectConfig;
use crate::engine::Engine;
use crate::error::{Result, SynthError};
use crate::note::Note;
use crate::pool;
use crate::render::Renderer;

/// A named note timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub name: String,
    pub notes: Vec<Note>,
}

/// On-disk form of a project: the configuration plus its tracks.
///
/// ```yaml
/// name: demo
/// voicebank: voice
/// tracks:
///   lead:
///     - { kind: sung, alias: a, pitch: C4, duration_ms: 500 }
///     - { kind: rest, duration_ms: 250 }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(flatten)]
    pub config: ProjectConfig,

    #[serde(default)]
    pub tracks: BTreeMap<String, Vec<Note>>,
}

impl ProjectFile {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let file: Self = serde_yaml::from_str(text)?;
        file.config.validate()?;
        Ok(file)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Tracks rendered with one voicebank and mixed into a single output.
#[derive(Debug, Clone, Default)]
pub struct Project {
    config: ProjectConfig,
    tracks: Vec<Track>,
}

impl Project {
    pub fn new(config: ProjectConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
        }
    }

    /// Loads a project file, resolving its voicebank path against the file's
    /// directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = ProjectFile::from_yaml(&std::fs::read_to_string(path)?)?;
        file.config.resolve_paths(path);
        info!(path = %path.display(), tracks = file.tracks.len(), "loaded project");
        Self::from_project_file(file)
    }

    pub fn from_project_file(file: ProjectFile) -> Result<Self> {
        let mut project = Self::new(file.config);
        for (name, notes) in file.tracks {
            project.add_track(name, notes)?;
        }
        Ok(project)
    }

    pub fn to_project_file(&self) -> ProjectFile {
        ProjectFile {
            config: self.config.clone(),
            tracks: self
                .tracks
                .iter()
                .map(|t| (t.name.clone(), t.notes.clone()))
                .collect(),
        }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Adds a track. Track names are unique.
    pub fn add_track(&mut self, name: impl Into<String>, notes: Vec<Note>) -> Result<()> {
        let name = name.into();
        if self.track(&name).is_some() {
            return Err(SynthError::Track {
                name,
                reason: "duplicate track name".into(),
            });
        }
        self.tracks.push(Track { name, notes });
        Ok(())
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, name: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.name == name)
    }

    /// Opens the configured voicebank.
    pub fn open_voicebank(&self) -> Result<Voicebank> {
        Ok(Voicebank::open(&self.config.voicebank)?)
    }

    /// Renders every track, in track order.
    ///
    /// Tracks render in parallel and split the configured workers between
    /// them. The engine is set up once before any track starts.
    pub fn render_tracks(
        &self,
        voicebank: &Voicebank,
        engine: &dyn Engine,
    ) -> Result<Vec<Segment>> {
        engine.setup(voicebank)?;

        let parallel = self.tracks.len().clamp(1, self.config.workers.max(1));
        let per_track = (self.config.workers / parallel).max(1);

        pool::run_indexed(self.tracks.len(), parallel, |i| {
            let track = &self.tracks[i];
            let renderer = Renderer::new(voicebank, engine, self.config.format())
                .with_workers(per_track)
                .with_crossfade(self.config.crossfade_ms);

            match renderer.render(&track.notes) {
                Ok(seg) => {
                    info!(
                        track = %track.name,
                        notes = track.notes.len(),
                        len_ms = seg.len(),
                        "rendered track"
                    );
                    Ok(seg)
                }
                Err(e) => {
                    error!(track = %track.name, error = %e, "track render failed");
                    Err(e)
                }
            }
        })
    }

    /// Renders every track and mixes them down.
    pub fn render(&self, voicebank: &Voicebank, engine: &dyn Engine) -> Result<Segment> {
        let renders = self.render_tracks(voicebank, engine)?;
        Ok(uta_audio::mix(self.config.format(), &renders)?)
    }

    /// Renders the project and writes it to a WAV file.
    pub fn export(
        &self,
        voicebank: &Voicebank,
        engine: &dyn Engine,
        path: impl AsRef<Path>,
    ) -> Result<Segment> {
        let path = path.as_ref();
        let out = self.render(voicebank, engine)?;
        out.export_wav(path)?;
        info!(path = %path.display(), len_ms = out.len(), "exported project");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_track() {
        let mut project = Project::default();
        project.add_track("lead", vec![Note::rest(100.0)]).unwrap();
        let err = project.add_track("lead", Vec::new()).unwrap_err();
        assert!(matches!(err, SynthError::Track { name, .. } if name == "lead"));
        assert_eq!(project.tracks().len(), 1);
    }

    #[test]
    fn test_project_file_yaml() {
        let yaml = r#"
name: demo
sample_rate: 22050
tracks:
  lead:
    - { kind: sung, alias: a, pitch: C4, duration_ms: 500 }
    - { kind: rest, duration_ms: 250 }
  harmony:
    - { kind: sung, alias: a, pitch: 64, duration_ms: 750 }
"#;
        let file = ProjectFile::from_yaml(yaml).unwrap();
        assert_eq!(file.config.name, "demo");
        assert_eq!(file.config.sample_rate, 22050);
        assert_eq!(file.tracks["lead"][0], Note::sung("a", 60.0, 500.0));

        let project = Project::from_project_file(file.clone()).unwrap();
        assert_eq!(project.tracks().len(), 2);
        assert_eq!(project.track("harmony").unwrap().notes.len(), 1);
        assert_eq!(project.to_project_file(), file);
    }

    #[test]
    fn test_project_file_roundtrip() {
        let mut project = Project::new(ProjectConfig {
            name: "rt".into(),
            workers: 2,
            ..Default::default()
        });
        project
            .add_track("a", vec![Note::sung("ka", 61.0, 200.0).with_overlap(10.0)])
            .unwrap();

        let file = project.to_project_file();
        let back = ProjectFile::from_yaml(&file.to_yaml().unwrap()).unwrap();
        assert_eq!(back, file);
    }

    #[test]
    fn test_project_file_invalid_config() {
        assert!(matches!(
            ProjectFile::from_yaml("sample_rate: 0\ntracks: {}\n"),
            Err(SynthError::Config(_))
        ));
    }
}
