use criterion::{black_box, criterion_group, criterion_main, Criterion};
use uta_audio::{Format, Segment};
use uta_oto::{Sample, Voicebank};
use uta_synth::dsp::{self, StretchMode};
use uta_synth::{Engine, Note, Renderer, Result};

const SR: u32 = 44100;

struct Flat;

impl Engine for Flat {
    fn pitch(&self, _: &Voicebank, _: &Sample, _: f64) -> Result<Segment> {
        Ok(Segment::mono(SR, vec![0.1; SR as usize]))
    }

    fn stretch(&self, vowel: &Segment, duration_ms: f64) -> Result<Segment> {
        Ok(dsp::stretch(vowel, duration_ms, StretchMode::Loop))
    }
}

fn tone(ms: f64) -> Segment {
    let n = Format::mono(SR).frames_in(ms);
    Segment::mono(
        SR,
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * 220.0 * i as f64 / SR as f64).sin())
            .collect(),
    )
}

fn bench_render(c: &mut Criterion) {
    let samples = Voicebank::parse_config(
        "a.wav=a,50,100,0,60,20\nka.wav=ka,20,80,-400,50,30\n",
    )
    .unwrap();
    let vb = Voicebank::new("/vb", samples);
    let notes: Vec<Note> = (0..64)
        .map(|i| match i % 3 {
            0 => Note::sung("a", 60.0, 400.0),
            1 => Note::sung("ka", 62.0, 250.0),
            _ => Note::rest(100.0),
        })
        .collect();

    c.bench_function("render_64_notes_sequential", |b| {
        let r = Renderer::new(&vb, &Flat, Format::mono(SR));
        b.iter(|| r.render(black_box(&notes)).unwrap())
    });

    c.bench_function("render_64_notes_4_workers", |b| {
        let r = Renderer::new(&vb, &Flat, Format::mono(SR)).with_workers(4);
        b.iter(|| r.render(black_box(&notes)).unwrap())
    });
}

fn bench_stretch(c: &mut Criterion) {
    let vowel = tone(300.0);

    c.bench_function("stretch_ola_300_to_1000ms", |b| {
        b.iter(|| dsp::stretch(black_box(&vowel), 1000.0, StretchMode::Ola))
    });

    c.bench_function("stretch_loop_300_to_1000ms", |b| {
        b.iter(|| dsp::stretch(black_box(&vowel), 1000.0, StretchMode::Loop))
    });

    c.bench_function("pitch_shift_300ms_up_3", |b| {
        b.iter(|| dsp::pitch_shift(black_box(&vowel), 3.0, StretchMode::Ola).unwrap())
    });
}

criterion_group!(benches, bench_render, bench_stretch);
criterion_main!(benches);
