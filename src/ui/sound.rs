/// Sound cues: small procedural chimes via rodio.
///
/// All cues are rendered to in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Build without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

use crate::sim::event::GameEvent;

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Cue;

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        /// Indexed by `Cue as usize`.
        cues: Vec<Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!("no audio output, sound disabled: {e}");
                    return None;
                }
            };
            let cues = Cue::ALL.iter().map(|&c| Arc::new(make_wav(&render(c)))).collect();
            Some(SoundEngine { _stream: stream, handle, cues })
        }

        pub fn play(&self, cue: Cue) {
            let Some(buf) = self.cues.get(cue as usize) else { return };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: mono f32 samples
    // ════════════════════════════════════════════════════════════

    fn render(cue: Cue) -> Vec<f32> {
        match cue {
            // Soft single bell: something is nearby.
            Cue::Nearby => notes(&[(880.0, 0.09)], 0.15),
            // Rising fourth: overlay opens.
            Cue::Open => notes(&[(659.0, 0.06), (880.0, 0.10)], 0.22),
            // Falling fourth: overlay closes.
            Cue::Close => notes(&[(880.0, 0.05), (659.0, 0.08)], 0.18),
            Cue::Dust => puff(0.08, 0.12),
        }
    }

    /// Note sequence, sine plus a touch of octave, each note fading out.
    fn notes(seq: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in seq {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.6);
                let wave = (t * freq * TAU).sin() * 0.8 + (t * freq * 2.0 * TAU).sin() * 0.2;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Short filtered noise burst.
    fn puff(duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut rng: u32 = 0x2545_F491;
        let mut prev = 0.0f32;
        (0..n)
            .map(|i| {
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                prev = prev * 0.85 + noise * 0.15; // low-pass
                let env = 1.0 - i as f32 / n as f32;
                prev * env * volume * 4.0
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit PCM mono
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let bits_per_sample: u16 = 16;
        let block_align: u16 = bits_per_sample / 8;
        let byte_rate = SAMPLE_RATE * block_align as u32;
        let data_size = samples.len() as u32 * block_align as u32;

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&1u16.to_le_bytes()); // mono
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }
        buf
    }

}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cue {
    Nearby,
    Open,
    Close,
    Dust,
}

impl Cue {
    #[cfg_attr(not(feature = "sound"), allow(dead_code))]
    pub const ALL: &'static [Cue] = &[Cue::Nearby, Cue::Open, Cue::Close, Cue::Dust];

    /// Cue for a simulation event, if it has one.
    pub fn for_event(ev: &GameEvent) -> Option<Cue> {
        match ev {
            GameEvent::EnteredRange { .. } => Some(Cue::Nearby),
            GameEvent::OverlayOpened { .. } => Some(Cue::Open),
            GameEvent::OverlayClosed => Some(Cue::Close),
            GameEvent::DustStarted => Some(Cue::Dust),
            GameEvent::LeftRange | GameEvent::DustStopped => None,
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _cue: Cue) {}
}

impl SoundEngine {
    pub fn play_events(&self, events: &[GameEvent]) {
        for cue in events.iter().filter_map(Cue::for_event) {
            self.play(cue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_events_have_no_cue() {
        assert_eq!(Cue::for_event(&GameEvent::LeftRange), None);
        assert_eq!(Cue::for_event(&GameEvent::DustStopped), None);
        assert_eq!(Cue::for_event(&GameEvent::OverlayOpened { poi: 3 }), Some(Cue::Open));
    }
}
