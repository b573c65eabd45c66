/// Sound engine: procedural chiptune effects plus a background music worker.
///
/// All effects are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Music runs on its own thread. The thread owns the output stream and the
/// decoder, loops the track until told to stop, and is joined on shutdown.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub types do nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::fs::File;
    use std::io::{BufReader, Cursor};
    use std::path::{Path, PathBuf};
    use std::sync::mpsc::{self, Sender};
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};

    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
    use tracing::{debug, info, warn};

    const SAMPLE_RATE: u32 = 22050;

    /// Pre-generated WAV buffers for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_treasure: Arc<Vec<u8>>,
        sfx_portal: Arc<Vec<u8>>,
        sfx_jump: Arc<Vec<u8>>,
        sfx_fall: Arc<Vec<u8>>,
        sfx_clear: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "no audio output, effects disabled");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_treasure: Arc::new(make_wav(&gen_treasure())),
                sfx_portal: Arc::new(make_wav(&gen_portal())),
                sfx_jump: Arc::new(make_wav(&gen_jump())),
                sfx_fall: Arc::new(make_wav(&gen_fall())),
                sfx_clear: Arc::new(make_wav(&gen_clear())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play_treasure(&self) { self.play(&self.sfx_treasure); }
        pub fn play_portal(&self) { self.play(&self.sfx_portal); }
        pub fn play_jump(&self) { self.play(&self.sfx_jump); }
        pub fn play_fall(&self) { self.play(&self.sfx_fall); }
        pub fn play_clear(&self) { self.play(&self.sfx_clear); }
    }

    /// Looping background track on a dedicated thread.
    pub struct MusicWorker {
        stop: Option<Sender<()>>,
        handle: Option<JoinHandle<()>>,
    }

    impl MusicWorker {
        pub fn start(path: &Path) -> Option<Self> {
            let path: PathBuf = path.to_path_buf();
            let (tx, rx) = mpsc::channel::<()>();

            let spawned = thread::Builder::new()
                .name("music".into())
                .spawn(move || {
                    // OutputStream is not Send: it has to be created here.
                    let Some((_stream, sink)) = open_track(&path) else {
                        return;
                    };
                    info!(path = %path.display(), "music started");
                    // Blocks until a stop signal arrives or the sender is dropped.
                    let _ = rx.recv();
                    sink.stop();
                    debug!("music stopped");
                });

            match spawned {
                Ok(handle) => Some(MusicWorker { stop: Some(tx), handle: Some(handle) }),
                Err(e) => {
                    warn!(error = %e, "could not start music thread");
                    None
                }
            }
        }

        /// Signal the worker and wait for it to finish.
        pub fn stop(&mut self) {
            if let Some(tx) = self.stop.take() {
                let _ = tx.send(());
            }
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }

    impl Drop for MusicWorker {
        fn drop(&mut self) {
            self.stop();
        }
    }

    fn open_track(path: &Path) -> Option<(OutputStream, Sink)> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open music file");
                return None;
            }
        };
        let source = match rodio::Decoder::new(BufReader::new(file)) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not decode music file");
                return None;
            }
        };
        let (stream, handle) = OutputStream::try_default().ok()?;
        let sink = Sink::try_new(&handle).ok()?;
        sink.append(source.repeat_infinite());
        Some((stream, sink))
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators — all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn tone(freq: f32, i: usize) -> f32 {
        let t = i as f32 / SAMPLE_RATE as f32;
        (t * freq * 2.0 * std::f32::consts::PI).sin()
    }

    /// Treasure pickup: quick ascending arpeggio C6→E6→G6
    fn gen_treasure() -> Vec<f32> {
        let notes = [1047.0_f32, 1319.0, 1568.0];
        let n = (SAMPLE_RATE as f32 * 0.045) as usize;
        let mut samples = Vec::with_capacity(n * notes.len());
        for &freq in &notes {
            for i in 0..n {
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                // Sine + 3rd harmonic for a square-ish edge
                let wave = tone(freq, i) * 0.7 + tone(freq * 3.0, i) * 0.3;
                samples.push(wave * env * 0.25);
            }
        }
        samples
    }

    /// Portal open: shimmering two-note chime G5, C6
    fn gen_portal() -> Vec<f32> {
        let pairs = [(784.0_f32, 0.08), (1047.0, 0.25)];
        let mut samples = Vec::new();
        for &(freq, dur) in &pairs {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let shimmer = 1.0 + 0.2 * tone(12.0, i);
                let wave = tone(freq, i) * 0.7 + tone(freq * 2.0, i) * 0.3;
                samples.push(wave * env * shimmer * 0.25);
            }
        }
        samples
    }

    /// Jump: short rising sweep
    fn gen_jump() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.09) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 300.0 + t * 500.0;
                phase += freq / SAMPLE_RATE as f32;
                let env = 1.0 - t;
                (phase * 2.0 * std::f32::consts::PI).sin() * env * 0.25
            })
            .collect()
    }

    /// Fall: descending whistle
    fn gen_fall() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.4) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 700.0 - t * 550.0;
                phase += freq / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(0.6);
                (phase * 2.0 * std::f32::consts::PI).sin() * env * 0.25
            })
            .collect()
    }

    /// Level clear: ascending fanfare C5→E5→G5→C6 with a held top note
    fn gen_clear() -> Vec<f32> {
        let notes = [523.0_f32, 659.0, 784.0, 1047.0];
        let n = (SAMPLE_RATE as f32 * 0.1) as usize;
        let mut samples = Vec::new();
        for &freq in &notes {
            for i in 0..n {
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                let wave = tone(freq, i) * 0.6 + tone(freq * 2.0, i) * 0.3 + tone(freq * 3.0, i) * 0.1;
                samples.push(wave * env * 0.3);
            }
        }
        let hold = (SAMPLE_RATE as f32 * 0.25) as usize;
        for i in 0..hold {
            let env = 1.0 - (i as f32 / hold as f32);
            samples.push(tone(1047.0, i) * env * 0.3);
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder — wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API — compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::{MusicWorker, SoundEngine};

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_treasure(&self) {}
    pub fn play_portal(&self) {}
    pub fn play_jump(&self) {}
    pub fn play_fall(&self) {}
    pub fn play_clear(&self) {}
}

#[cfg(not(feature = "sound"))]
pub struct MusicWorker;

#[cfg(not(feature = "sound"))]
impl MusicWorker {
    pub fn start(_path: &std::path::Path) -> Option<Self> { None }
    pub fn stop(&mut self) {}
}
