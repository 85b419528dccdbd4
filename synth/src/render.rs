//! The note stitcher.
//!
//! Rendering a track happens in two passes. First every note is rendered on
//! its own: the sample is pitched, split into consonant and vowel, and the
//! vowel is stretched (or the whole sample truncated) to fit the note. A
//! note's length depends on the timing of the note after it, but on nothing
//! rendered before it, so this pass runs in parallel. Then the renders are
//! spliced into the timeline strictly in order, each one reaching back into
//! the previous note's tail by the following note's overlap.

use tracing::{debug, error};
use uta_audio::{Format, Segment};
use uta_oto::Voicebank;

use crate::engine::Engine;
use crate::error::{Result, SynthError};
use crate::note::Note;
use crate::pool;

/// Resolved preutterance and overlap of a sung note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub preutterance: f64,
    pub overlap: f64,
}

/// Renders note timelines with one voicebank and engine.
pub struct Renderer<'a> {
    voicebank: &'a Voicebank,
    engine: &'a dyn Engine,
    format: Format,
    workers: usize,
    crossfade_ms: f64,
}

impl<'a> Renderer<'a> {
    /// Creates a sequential renderer producing audio in `format`.
    pub fn new(voicebank: &'a Voicebank, engine: &'a dyn Engine, format: Format) -> Self {
        Self {
            voicebank,
            engine,
            format,
            workers: 1,
            crossfade_ms: 0.0,
        }
    }

    /// Renders up to `workers` notes at once.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Crossfades each consonant into its vowel over `ms`.
    ///
    /// The vowel is stretched by the same amount so note lengths are kept.
    pub fn with_crossfade(mut self, ms: f64) -> Self {
        self.crossfade_ms = ms.max(0.0);
        self
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Prepares the engine for this renderer's voicebank.
    pub fn setup(&self) -> Result<()> {
        self.engine.setup(self.voicebank)
    }

    /// Resolves the timing of a sung note: per-note overrides first, then the
    /// sample's own values. Returns `None` for rests and for notes whose
    /// timing cannot be known without a sample the voicebank lacks.
    pub fn timing(&self, note: &Note) -> Option<Timing> {
        let Note::Sung {
            alias,
            preutterance,
            overlap,
            ..
        } = note
        else {
            return None;
        };
        let sample = self.voicebank.get(alias).ok();
        Some(Timing {
            preutterance: preutterance.or(sample.map(|s| s.preutterance))?,
            overlap: overlap.or(sample.map(|s| s.overlap))?,
        })
    }

    fn note_at(notes: &[Note], index: usize) -> Result<&Note> {
        notes.get(index).ok_or(SynthError::NoteOutOfRange {
            index,
            len: notes.len(),
        })
    }

    fn next_timing(&self, notes: &[Note], index: usize) -> Option<Timing> {
        notes.get(index + 1).and_then(|n| self.timing(n))
    }

    /// Length a note must render to: its preutterance plus its duration,
    /// adjusted by how far the next note overlaps into it.
    ///
    /// Rests render exactly their duration.
    pub fn actual_duration(&self, notes: &[Note], index: usize) -> Result<f64> {
        let note = Self::note_at(notes, index)?;
        let Some(own) = self.timing(note) else {
            if let Note::Sung { alias, .. } = note {
                // Unresolvable timing means the alias is missing.
                self.voicebank.get(alias)?;
            }
            return Ok(note.duration_ms());
        };

        let lookahead = self
            .next_timing(notes, index)
            .map_or(0.0, |next| next.overlap - next.preutterance);
        Ok(own.preutterance + note.duration_ms() + lookahead)
    }

    /// Renders note `index` of `notes` on its own, in the output format.
    ///
    /// Failures are logged and returned wrapped with the note index.
    pub fn render_note(&self, notes: &[Note], index: usize) -> Result<Segment> {
        self.render_note_inner(notes, index).map_err(|e| {
            error!(index, error = %e, "note render failed");
            e.at_note(index)
        })
    }

    fn render_note_inner(&self, notes: &[Note], index: usize) -> Result<Segment> {
        let note = Self::note_at(notes, index)?;
        let (alias, pitch) = match note {
            Note::Rest { duration_ms } => return Ok(Segment::silence(self.format, *duration_ms)),
            Note::Sung { alias, pitch, .. } => (alias, *pitch),
        };

        let sample = self.voicebank.get(alias)?;
        let pitched = self.engine.pitch(self.voicebank, sample, pitch)?;
        let (consonant, vowel) = sample.slice(&pitched)?;

        let actual = self.actual_duration(notes, index)?;
        let natural = consonant.duration_ms() + vowel.duration_ms();

        let render = if actual < natural {
            // Short note: keep the whole consonant and cut the tail.
            consonant
                .append(&vowel, self.crossfade_ms)?
                .slice(..note.duration_ms())
        } else {
            let target = actual - consonant.duration_ms() + self.crossfade_ms;
            let stretched = self.engine.stretch(&vowel, target)?;
            consonant.append(&stretched, self.crossfade_ms)?
        };

        debug!(
            index,
            alias = %alias,
            actual,
            natural,
            len = render.len(),
            "rendered note"
        );
        Ok(render.conform(self.format)?)
    }

    /// Renders every note on its own, using up to `workers` threads.
    pub fn render_notes(&self, notes: &[Note]) -> Result<Vec<Segment>> {
        pool::run_indexed(notes.len(), self.workers, |i| self.render_note(notes, i))
    }

    /// Splices per-note renders into one timeline.
    ///
    /// Each render is placed so it ends at the new end of the timeline and
    /// starts the next note's overlap before the previous end, additively
    /// blending with the previous note's tail.
    pub fn splice(&self, notes: &[Note], renders: &[Segment]) -> Result<Segment> {
        let mut timeline = Segment::empty(self.format).into_mut();
        for (i, render) in renders.iter().enumerate() {
            let render = render.conform(self.format)?;
            let overlap_ms = self.next_timing(notes, i).map_or(0.0, |t| t.overlap);
            let overlap = self.format.frames_in(overlap_ms);

            let timestamp = timeline.frames();
            timeline.extend_frames(render.frames().saturating_sub(overlap));
            timeline.mix_at(timestamp.saturating_sub(overlap), &render);

            debug!(
                index = i,
                total = renders.len(),
                timeline_ms = self.format.millis(timeline.frames()),
                "spliced note"
            );
        }
        Ok(timeline.freeze())
    }

    /// Renders a whole timeline.
    pub fn render(&self, notes: &[Note]) -> Result<Segment> {
        let renders = self.render_notes(notes)?;
        self.splice(notes, &renders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uta_oto::{OtoError, Sample};

    const SR: u32 = 1000;

    /// Sings every sample as one second of a constant signal.
    struct Identity;

    impl Engine for Identity {
        fn pitch(&self, _: &Voicebank, _: &Sample, _: f64) -> Result<Segment> {
            Ok(Segment::mono(SR, vec![1.0; 1000]))
        }

        fn stretch(&self, vowel: &Segment, duration_ms: f64) -> Result<Segment> {
            Ok(crate::dsp::loop_fill(vowel, duration_ms))
        }
    }

    fn voicebank() -> Voicebank {
        let samples = Voicebank::parse_config(
            "a.wav=a,100,200,0,100,0\n\
             b.wav=b,0,100,0,20,50\n\
             c.wav=c,0,100,-300,60,10\n",
        )
        .unwrap();
        Voicebank::new("/vb", samples)
    }

    fn renderer<'a>(vb: &'a Voicebank, engine: &'a Identity) -> Renderer<'a> {
        Renderer::new(vb, engine, Format::mono(SR))
    }

    #[test]
    fn test_timing_overrides() {
        let vb = voicebank();
        let r = renderer(&vb, &Identity);

        let t = r.timing(&Note::sung("b", 60.0, 100.0)).unwrap();
        assert_eq!(t, Timing { preutterance: 20.0, overlap: 50.0 });

        let t = r.timing(&Note::sung("b", 60.0, 100.0).with_overlap(5.0)).unwrap();
        assert_eq!(t, Timing { preutterance: 20.0, overlap: 5.0 });

        assert!(r.timing(&Note::rest(100.0)).is_none());
        assert!(r.timing(&Note::sung("zz", 60.0, 100.0)).is_none());

        let known = Note::sung("zz", 60.0, 100.0).with_preutterance(1.0).with_overlap(2.0);
        assert!(r.timing(&known).is_some());
    }

    #[test]
    fn test_lookahead_extends_duration() {
        let vb = voicebank();
        let r = renderer(&vb, &Identity);

        let alone = vec![Note::sung("a", 60.0, 500.0)];
        let with_next = vec![Note::sung("a", 60.0, 500.0), Note::sung("b", 60.0, 300.0)];

        // a.preutterance + 500
        assert_eq!(r.actual_duration(&alone, 0).unwrap(), 600.0);
        // a.preutterance + 500 + (50 - 20)
        assert_eq!(r.actual_duration(&with_next, 0).unwrap(), 630.0);
    }

    #[test]
    fn test_lookahead_ignores_rest() {
        let vb = voicebank();
        let r = renderer(&vb, &Identity);
        let notes = vec![Note::sung("a", 60.0, 500.0), Note::rest(100.0)];
        assert_eq!(r.actual_duration(&notes, 0).unwrap(), 600.0);
        assert_eq!(r.actual_duration(&notes, 1).unwrap(), 100.0);
    }

    #[test]
    fn test_render_note_stretch() {
        let vb = voicebank();
        let r = renderer(&vb, &Identity);
        let notes = vec![Note::sung("a", 60.0, 1500.0), Note::sung("b", 60.0, 300.0)];

        // 100 + 1500 + 30 = 1630 > consonant 200 + vowel 700
        let render = r.render_note(&notes, 0).unwrap();
        assert_eq!(render.len(), 1630);
    }

    #[test]
    fn test_render_note_truncate() {
        let vb = voicebank();
        let r = renderer(&vb, &Identity);
        let notes = vec![Note::sung("a", 60.0, 500.0)];

        // 100 + 500 = 600 < 900, cut to the note duration.
        let render = r.render_note(&notes, 0).unwrap();
        assert_eq!(render.len(), 500);
    }

    #[test]
    fn test_render_note_negative_cutoff() {
        let vb = voicebank();
        let r = renderer(&vb, &Identity);
        // consonant 100, vowel 300; 60 + 1000 = 1060 is stretched.
        let render = r.render_note(&[Note::sung("c", 60.0, 1000.0)], 0).unwrap();
        assert_eq!(render.len(), 1060);
    }

    #[test]
    fn test_render_rest() {
        let vb = voicebank();
        let r = renderer(&vb, &Identity);
        let render = r.render_note(&[Note::rest(250.0)], 0).unwrap();
        assert_eq!(render.len(), 250);
        assert!(render.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_render_missing_alias() {
        let vb = voicebank();
        let r = renderer(&vb, &Identity);
        let notes = vec![Note::rest(100.0), Note::sung("zz", 60.0, 100.0)];

        let err = r.render(&notes).unwrap_err();
        assert_eq!(err.note_index(), Some(1));
        assert!(matches!(err.root(), SynthError::Oto(OtoError::NotFound(a)) if a == "zz"));
    }

    #[test]
    fn test_render_empty_vowel_is_timing_error() {
        let samples = Voicebank::parse_config("x.wav=x,100,500,500,10,0\n").unwrap();
        let vb = Voicebank::new("/vb", samples);
        let r = renderer(&vb, &Identity);

        let err = r.render(&[Note::sung("x", 60.0, 100.0)]).unwrap_err();
        assert_eq!(err.note_index(), Some(0));
        assert!(err.is_timing());
    }

    #[test]
    fn test_render_vowel_past_end_is_timing_error() {
        // Identity audio lasts 1000ms; the vowel would run 1100..1200.
        let samples = Voicebank::parse_config("x.wav=x,900,200,-100,50,0\n").unwrap();
        let vb = Voicebank::new("/vb", samples);
        let r = renderer(&vb, &Identity);

        let err = r.render(&[Note::sung("x", 60.0, 500.0)]).unwrap_err();
        assert_eq!(err.note_index(), Some(0));
        assert!(err.is_timing());
    }

    #[test]
    fn test_note_index_out_of_range() {
        let vb = voicebank();
        let r = renderer(&vb, &Identity);
        let notes = vec![Note::rest(100.0)];

        assert!(matches!(
            r.actual_duration(&notes, 1),
            Err(SynthError::NoteOutOfRange { index: 1, len: 1 })
        ));
        let err = r.render_note(&notes, 3).unwrap_err();
        assert_eq!(err.note_index(), Some(3));
        assert!(matches!(err.root(), SynthError::NoteOutOfRange { index: 3, len: 1 }));
    }

    #[test]
    fn test_splice_overlap() {
        let vb = voicebank();
        let r = renderer(&vb, &Identity);
        let notes = vec![Note::rest(100.0), Note::sung("b", 60.0, 100.0), Note::rest(100.0)];
        let renders = vec![
            Segment::mono(SR, vec![1.0; 100]),
            Segment::mono(SR, vec![2.0; 100]),
            Segment::mono(SR, vec![3.0; 100]),
        ];

        // "b" overlaps 50ms, so the render before it only extends the
        // timeline by 50ms and "b" starts right after.
        let timeline = r.splice(&notes, &renders).unwrap();
        assert_eq!(timeline.len(), 250);
        let s = timeline.samples();
        assert_eq!(s[0], 1.0);
        assert_eq!(s[49], 1.0);
        assert_eq!(s[50], 2.0);
        assert_eq!(s[149], 2.0);
        assert_eq!(s[150], 3.0);
        assert_eq!(s[249], 3.0);
    }

    #[test]
    fn test_splice_blends_previous_tail() {
        let vb = voicebank();
        let r = renderer(&vb, &Identity);
        let notes = vec![Note::rest(100.0), Note::rest(100.0), Note::sung("b", 60.0, 100.0)];
        let renders = vec![
            Segment::mono(SR, vec![1.0; 100]),
            Segment::mono(SR, vec![2.0; 100]),
            Segment::mono(SR, vec![4.0; 100]),
        ];

        let timeline = r.splice(&notes, &renders).unwrap();
        assert_eq!(timeline.len(), 250);
        let s = timeline.samples();
        assert_eq!(s[49], 1.0);
        assert_eq!(s[50], 3.0);
        assert_eq!(s[99], 3.0);
        assert_eq!(s[100], 2.0);
        assert_eq!(s[150], 4.0);
    }

    #[test]
    fn test_splice_first_overlap_clamped() {
        let vb = voicebank();
        let r = renderer(&vb, &Identity);
        let notes = vec![Note::rest(30.0), Note::sung("b", 60.0, 100.0)];
        let renders = vec![
            Segment::mono(SR, vec![1.0; 30]),
            Segment::mono(SR, vec![2.0; 100]),
        ];

        // Overlap 50 > 30: nothing of the first render survives.
        let timeline = r.splice(&notes, &renders).unwrap();
        assert_eq!(timeline.len(), 100);
        assert_eq!(timeline.samples()[0], 2.0);
    }

    #[test]
    fn test_render_parallel_matches_sequential() {
        let vb = voicebank();
        let notes: Vec<Note> = (0..24)
            .map(|i| match i % 4 {
                0 => Note::sung("a", 60.0, 400.0 + i as f64),
                1 => Note::sung("b", 62.0, 300.0),
                2 => Note::rest(120.0),
                _ => Note::sung("c", 64.0, 900.0),
            })
            .collect();

        let sequential = renderer(&vb, &Identity).render(&notes).unwrap();
        let parallel = renderer(&vb, &Identity).with_workers(4).render(&notes).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_crossfade_keeps_length() {
        let vb = voicebank();
        let r = renderer(&vb, &Identity).with_crossfade(20.0);
        let notes = vec![Note::sung("a", 60.0, 1500.0)];
        assert_eq!(r.render_note(&notes, 0).unwrap().len(), 1600);
    }

    #[test]
    fn test_crossfade_too_long() {
        let vb = voicebank();
        let r = renderer(&vb, &Identity).with_crossfade(150.0);
        // The consonant of "b" lasts only 100ms.
        let err = r.render(&[Note::sung("b", 60.0, 500.0)]).unwrap_err();
        assert!(err.is_timing());
    }
}
