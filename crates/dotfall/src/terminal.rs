//! Draw the animation in the user's terminal and react to their key presses.

use color_eyre::eyre::Result;
use termwiz::surface::Change as TermwizChange;
use termwiz::terminal::buffered::BufferedTerminal;
use termwiz::terminal::Terminal as TermwizTerminal;
use tokio::sync::broadcast::error::RecvError;

use crate::config::input::{KeybindingAction, KeybindingsAsEvents};
use crate::config::main::Config;
use crate::engine::{Engine, Schedule};
use crate::run::{FrameClock, Protocol};
use crate::surface::Surface;

/// The user's terminal, ready to be drawn on.
pub struct Terminal<T: TermwizTerminal> {
    /// Only the differences between frames are sent to the real terminal.
    buffered: BufferedTerminal<T>,
}

/// We need this just because I can't figure out how to pass `Box<dyn Terminal>` to
/// `BufferedTerminal::new()`
fn get_termwiz_terminal() -> Result<impl TermwizTerminal> {
    let capabilities = termwiz::caps::Capabilities::new_from_env()?;
    Ok(termwiz::terminal::new_terminal(capabilities)?)
}

/// Run the animation in the user's terminal until they quit. The terminal is always put back
/// how we found it, even if something goes wrong.
pub async fn run(
    config: &Config,
    keybindings: &KeybindingsAsEvents,
    seed: Option<u64>,
    protocol_tx: &tokio::sync::broadcast::Sender<Protocol>,
) -> Result<()> {
    let protocol_rx = protocol_tx.subscribe();
    let mut terminal = Terminal::open(get_termwiz_terminal()?)?;
    let result = terminal.run(config, keybindings, seed, protocol_rx).await;
    terminal.restore()?;
    result
}

impl<T: TermwizTerminal> Terminal<T> {
    /// Take over the user's terminal. If that fails part way through then the terminal is put
    /// back into cooked mode before returning the error.
    pub fn open(mut terminal: T) -> Result<Self> {
        tracing::debug!("Putting user's terminal into raw mode");
        terminal.set_raw_mode()?;
        if let Err(error) = terminal.enter_alternate_screen() {
            return Err(Self::abandon(&mut terminal, false, error.into()));
        }

        // `BufferedTerminal::new()` consumes the terminal and then asks for its size, so ask
        // first whilst we can still recover.
        if let Err(error) = terminal.get_screen_size() {
            return Err(Self::abandon(&mut terminal, true, error.into()));
        }

        let mut buffered = BufferedTerminal::new(terminal)?;
        buffered.add_change(TermwizChange::CursorVisibility(
            termwiz::surface::CursorVisibility::Hidden,
        ));
        if let Err(error) = buffered.flush() {
            return Err(Self::abandon(buffered.terminal(), true, error.into()));
        }

        Ok(Self { buffered })
    }

    /// Undo a partially opened terminal, passing on the error that caused it.
    fn abandon(
        terminal: &mut T,
        is_alternate_screen: bool,
        error: color_eyre::eyre::Report,
    ) -> color_eyre::eyre::Report {
        tracing::error!("Couldn't open terminal: {error:?}");
        if is_alternate_screen {
            if let Err(exit_error) = terminal.exit_alternate_screen() {
                tracing::error!("Couldn't exit alternate screen: {exit_error:?}");
            }
        }
        if let Err(cooked_error) = terminal.set_cooked_mode() {
            tracing::error!("Couldn't set cooked mode: {cooked_error:?}");
        }
        error
    }

    /// Give the terminal back to the user.
    pub fn restore(&mut self) -> Result<()> {
        tracing::debug!("Setting user's terminal to cooked mode");
        self.buffered.add_changes(vec![
            TermwizChange::ClearScreen(termwiz::color::ColorAttribute::Default),
            TermwizChange::CursorVisibility(termwiz::surface::CursorVisibility::Visible),
        ]);
        self.buffered.flush()?;

        let terminal = self.buffered.terminal();
        terminal.exit_alternate_screen()?;
        terminal.set_cooked_mode()?;
        Ok(())
    }

    /// The number of columns and rows.
    pub fn dimensions(&self) -> (usize, usize) {
        self.buffered.dimensions()
    }

    /// Check if the user's terminal has changed size, and if so resize our surface and tell the
    /// engine about it.
    fn handle_resize(&mut self, surface: &mut Surface, engine: &mut Engine) -> Result<()> {
        let is_resized = self.buffered.check_for_resize()?;
        if !is_resized {
            return Ok(());
        }

        self.buffered.repaint()?;
        let (width, height) = self.buffered.dimensions();
        tracing::debug!("Terminal resized to {width}x{height}");
        surface.resize(width, height);
        engine.set_size(surface.pixel_size());
        Ok(())
    }

    /// Copy the surface to the user's actual terminal. It uses a diffing algorithm to make the
    /// minimum number of changes.
    fn draw(&mut self, surface: &Surface) -> Result<()> {
        self.buffered.draw_from_screen(&surface.surface, 0, 0);
        self.buffered.flush()?;
        Ok(())
    }

    /// Render a frame and report whether another one is needed.
    fn frame(&mut self, surface: &mut Surface, engine: &mut Engine) -> Result<bool> {
        self.handle_resize(surface, engine)?;
        let schedule = engine.frame(surface);
        self.draw(surface)?;
        Ok(schedule == Schedule::Continue)
    }

    /// Start, or restart, the animation. The first frame is drawn straight away.
    fn start(&mut self, surface: &mut Surface, engine: &mut Engine) -> Result<bool> {
        self.handle_resize(surface, engine)?;
        let schedule = engine.start(surface);
        self.draw(surface)?;
        Ok(schedule == Schedule::Continue)
    }

    /// The main loop. Frames are only rendered whilst the engine asks for them, but input is
    /// always listened to.
    async fn run(
        &mut self,
        config: &Config,
        keybindings: &KeybindingsAsEvents,
        seed: Option<u64>,
        mut protocol_rx: tokio::sync::broadcast::Receiver<Protocol>,
    ) -> Result<()> {
        let (width, height) = self.dimensions();
        let mut surface = Surface::new(config.surface.clone(), width, height, config.scale);
        let mut engine = Engine::new(surface.pixel_size(), seed);
        let mut clock = FrameClock::new(config.frame_rate);

        let mut is_scheduled = false;
        if config.autostart {
            is_scheduled = self.start(&mut surface, &mut engine)?;
        }

        tracing::debug!("Starting render loop on the '{}' surface", surface.id);
        #[expect(
            clippy::integer_division_remainder_used,
            reason = "`tokio::select! generates this.`"
        )]
        loop {
            tokio::select! {
                () = clock.sleep_until_next_frame_tick(), if is_scheduled => {
                    is_scheduled = self.frame(&mut surface, &mut engine)?;
                }
                message = protocol_rx.recv() => {
                    let event = match message {
                        Ok(Protocol::End) | Err(RecvError::Closed) => break,
                        Ok(Protocol::Input(event)) => event,
                        Err(RecvError::Lagged(missed)) => {
                            tracing::warn!("Missed {missed} input events");
                            continue;
                        }
                    };

                    let termwiz::input::InputEvent::Key(key_event) = event else {
                        continue;
                    };
                    let Some(action) = crate::config::input::action_for(keybindings, &key_event)
                    else {
                        continue;
                    };

                    tracing::debug!("Keybinding triggered: {action:?}");
                    match action {
                        KeybindingAction::Toggle if engine.is_running() => engine.stop(),
                        KeybindingAction::Toggle | KeybindingAction::Start => {
                            is_scheduled = self.start(&mut surface, &mut engine)?;
                        }
                        KeybindingAction::Stop => engine.stop(),
                        KeybindingAction::Quit => break,
                    }
                    tracing::debug!("Engine is now {:?}", engine.lifecycle());
                }
            }
        }
        tracing::debug!("Exited render loop");

        Ok(())
    }
}
