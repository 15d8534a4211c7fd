//! n333 - audio stream, MIDI port and the control loop

use std::{
    collections::HashMap,
    io::stdout,
    time::{Duration, Instant},
};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::supports_keyboard_enhancement,
};
use n333_synth::{
    config::SynthConfig,
    engine::{AudioBackend, SharedEngine},
    io::KeyboardLayout,
    runtime::Synth,
    synth::{EnvelopePhase, NoteSink, SynthMessage},
    MAX_BLOCK_SIZE,
};
use ratatui::DefaultTerminal;
use rtrb::{Consumer, PushError, RingBuffer};
use tracing::{error, info, warn};

use crate::ui::{self, ParamField, View, VoiceRow};

// Tunables
const SCOPE_LEN: usize = 1024;
const SCOPE_RING_BLOCKS: usize = 16; // Capacity in blocks for audio→UI ring
const MIDI_QUEUE_LEN: usize = 256;
const FRAME: Duration = Duration::from_millis(16);

/*
Threads
=======

    cpal callback ── engine.render() ──> device
          │
          └── samples ──> scope ring ─────────┐
                                              ▼
    midir callback ── SynthMessage::Midi ──> main thread: drain, keys, tick, draw
                                              │
                                              └── Synth (voices, MIDI adapter)

The main thread is the only one that touches voices. The audio callback
only renders what the engine has been told to play.
*/

pub struct App {
    synth: Synth<SharedEngine>,
    engine: SharedEngine,
    keys: KeyboardLayout,
    midi_rx: Consumer<SynthMessage>,
    midi_port: Option<String>,
    #[cfg(feature = "midi-io")]
    _midi_connection: Option<n333_synth::io::port::MidiConnection>,
    scope_rx: Consumer<f32>,
    scope: Vec<f32>,
    _stream: cpal::Stream,
    sample_rate: f32,
    selected: usize,
    key_gate: Duration,
    key_release: bool,
    /// Keys auto-released after `key_gate` when the terminal has no key-up events.
    gated: HashMap<char, Instant>,
    should_quit: bool,
}

impl App {
    pub fn new(config: &SynthConfig, midi_port: Option<usize>) -> EyreResult<Self> {
        let engine = SharedEngine::default();

        // --- Set up CPAL ---
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let stream_config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;
        let sample_rate = stream_config.sample_rate().0 as f32;
        let channels = stream_config.channels() as usize;

        engine.activate(sample_rate);
        engine.set_master_gain(config.params.master_gain);

        // --- Cross-thread rings ---
        let (scope_tx, scope_rx) = RingBuffer::<f32>::new(SCOPE_LEN * SCOPE_RING_BLOCKS);
        let (midi_tx, midi_rx) = RingBuffer::<SynthMessage>::new(MIDI_QUEUE_LEN);

        let stream = device
            .build_output_stream(
                &stream_config.into(),
                {
                    let engine = engine.clone();
                    let mut scope_tx = scope_tx;
                    let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];
                    move |data: &mut [f32], _| {
                        let total_frames = data.len() / channels;
                        let mut frames_written = 0;
                        while frames_written < total_frames {
                            let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                            let block = &mut render_buf[..frames_to_render];
                            engine.render(block);

                            // Duplicate mono to all channels
                            let out_off = frames_written * channels;
                            for (i, &s) in block.iter().enumerate() {
                                for ch in 0..channels {
                                    data[out_off + i * channels + ch] = s;
                                }
                            }

                            // Feed the scope, drop on overflow
                            for &s in block.iter() {
                                if let Err(PushError::Full(_)) = scope_tx.push(s) {
                                    break;
                                }
                            }

                            frames_written += frames_to_render;
                        }
                    }
                },
                move |err| error!(%err, "output stream error"),
                None,
            )
            .wrap_err("failed to build output stream")?;
        stream.play().wrap_err("failed to start output stream")?;
        info!(sample_rate, channels, "output stream running");

        // --- MIDI ---
        #[cfg(feature = "midi-io")]
        let (midi_connection, midi_port_name) = match midi_port {
            Some(index) => {
                let connection = n333_synth::io::port::connect(index, midi_tx)
                    .wrap_err("failed to open MIDI input")?;
                let name = connection.name().to_owned();
                (Some(connection), Some(name))
            }
            None => {
                drop(midi_tx);
                (None, None)
            }
        };
        #[cfg(not(feature = "midi-io"))]
        let midi_port_name = {
            drop(midi_tx);
            if midi_port.is_some() {
                warn!("built without MIDI support, --midi-port ignored");
            }
            None
        };

        let synth = Synth::from_config(engine.clone(), config);
        let keys = KeyboardLayout::new(synth.params().clone());

        Ok(Self {
            synth,
            engine,
            keys,
            midi_rx,
            midi_port: midi_port_name,
            #[cfg(feature = "midi-io")]
            _midi_connection: midi_connection,
            scope_rx,
            scope: vec![0.0; SCOPE_LEN],
            _stream: stream,
            sample_rate,
            selected: 0,
            key_gate: Duration::from_secs_f64(config.key_gate),
            key_release: false,
            gated: HashMap::new(),
            should_quit: false,
        })
    }

    /// Run the control loop until Esc.
    pub fn run(mut self, mut terminal: DefaultTerminal) -> EyreResult<()> {
        self.key_release = supports_keyboard_enhancement().unwrap_or(false);
        if self.key_release {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        } else {
            warn!(gate = ?self.key_gate, "terminal reports no key releases, notes are gated");
        }

        let res = self.event_loop(&mut terminal);

        if self.key_release {
            execute!(stdout(), PopKeyboardEnhancementFlags)?;
        }
        self.synth.stop_all();
        res
    }

    fn event_loop(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.synth.drain(&mut self.midi_rx);
            self.expire_gated();
            self.synth.tick();
            self.engine
                .set_master_gain(self.synth.params().snapshot().master_gain);
            self.poll_scope();

            let view = self.view();
            terminal.draw(|frame| ui::render(frame, &view))?;

            // Keyboard input (non-blocking, ~60fps, sooner if a cleanup is due)
            if event::poll(self.poll_timeout())? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }
        }
        Ok(())
    }

    fn poll_timeout(&self) -> Duration {
        match self.synth.until_next_cleanup() {
            Some(secs) => FRAME.min(Duration::from_secs_f64(secs)),
            None => FRAME,
        }
    }

    /// Keep the last SCOPE_LEN samples.
    fn poll_scope(&mut self) {
        while let Ok(sample) = self.scope_rx.pop() {
            self.scope.push(sample);
        }
        if self.scope.len() > SCOPE_LEN {
            let excess = self.scope.len() - SCOPE_LEN;
            self.scope.drain(0..excess);
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            if let KeyCode::Char(c) = key.code {
                self.release_key(c);
            }
            return;
        }

        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(' ') => {
                self.keys.release_all();
                self.gated.clear();
                self.synth.stop_all();
            }
            KeyCode::Tab => {
                let mode = self.synth.playback_mode().toggled();
                self.synth.set_playback_mode(mode);
            }
            KeyCode::Up => {
                self.selected = (self.selected + ParamField::ALL.len() - 1) % ParamField::ALL.len();
            }
            KeyCode::Down => self.selected = (self.selected + 1) % ParamField::ALL.len(),
            KeyCode::Left => self.adjust_selected(-1.0),
            KeyCode::Right => self.adjust_selected(1.0),
            KeyCode::PageUp => self.synth.params().update(|p| ParamField::Octave.adjust(p, 1.0)),
            KeyCode::PageDown => self.synth.params().update(|p| ParamField::Octave.adjust(p, -1.0)),
            KeyCode::Char(c) => self.press_key(c),
            _ => {}
        }
    }

    fn adjust_selected(&mut self, direction: f32) {
        let field = ParamField::ALL[self.selected];
        self.synth.params().update(|p| field.adjust(p, direction));
    }

    fn press_key(&mut self, c: char) {
        if let Some((id, frequency)) = self.keys.press(c) {
            self.synth.note_on(id, frequency);
        }
        if !self.key_release && KeyboardLayout::offset(c).is_some() {
            // key repeat keeps a gated note alive
            self.gated.insert(c.to_ascii_lowercase(), Instant::now());
        }
    }

    fn release_key(&mut self, c: char) {
        self.gated.remove(&c.to_ascii_lowercase());
        if let Some(id) = self.keys.release(c) {
            self.synth.note_off(&id);
        }
    }

    fn expire_gated(&mut self) {
        if self.gated.is_empty() {
            return;
        }
        let gate = self.key_gate;
        let expired: Vec<char> = self
            .gated
            .iter()
            .filter(|(_, pressed)| pressed.elapsed() >= gate)
            .map(|(c, _)| *c)
            .collect();
        for c in expired {
            self.release_key(c);
        }
    }

    fn view(&self) -> View<'_> {
        let now = self.engine.now();
        let mut voices: Vec<_> = self.synth.voices().voices().collect();
        voices.sort_by_key(|v| v.serial());
        let rows = voices
            .into_iter()
            .map(|v| VoiceRow {
                id: v.id().to_string(),
                frequency: v.frequency(),
                phase: match v.phase() {
                    EnvelopePhase::Attacking { .. } => "attack",
                    EnvelopePhase::Sustaining => "sustain",
                    EnvelopePhase::Releasing => "release",
                },
                sources: v.sources().len(),
                level: self.engine.value_at(v.amplitude(), now).unwrap_or(0.0),
            })
            .collect();

        View {
            params: self.synth.params().snapshot(),
            mode: self.synth.playback_mode(),
            voices: rows,
            scope: &self.scope,
            selected: self.selected,
            sample_rate: self.sample_rate,
            midi_port: self.midi_port.as_deref(),
            midi_held: self.synth.midi().pressed().len(),
            key_release: self.key_release,
        }
    }
}
