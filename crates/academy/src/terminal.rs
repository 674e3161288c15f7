//! Terminal client
//!
//! Feeds crossterm key events into the frame loop and redraws a status
//! panel from the session view. Arrow key releases are only reported when
//! the terminal supports keyboard enhancement; otherwise every press (and
//! auto-repeat) is a single step. The world viewport follows the terminal
//! size at a fixed pixel size per cell.

use academy_client::{
    reward::claim_message, ChestClaim, EventSender, RewardClient, SessionEvent, SessionView,
};
use academy_world::ArrowKey;
use crossterm::{
    cursor,
    event::{
        DisableFocusChange, EnableFocusChange, Event, EventStream, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::Print,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use std::{
    io::{stdout, Write},
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::{mpsc, watch},
    time::Instant,
};

const REDRAW_MS: u64 = 100;

/// Pixels per terminal cell when mapping the window onto the world viewport
const CELL_WIDTH_PX: f64 = 8.0;
const CELL_HEIGHT_PX: f64 = 16.0;

/// What a key press asks for
#[derive(Debug, PartialEq)]
pub enum KeyAction {
    Events(Vec<SessionEvent>),
    Claim,
    Quit,
    None,
}

/// Translate a key event. `enhanced` is true when the terminal reports
/// releases.
pub fn key_action(key: KeyEvent, enhanced: bool) -> KeyAction {
    if let Some(arrow) = arrow_key(key.code) {
        return match (key.kind, enhanced) {
            (KeyEventKind::Release, _) => KeyAction::Events(vec![SessionEvent::KeyUp(arrow)]),
            (KeyEventKind::Press, true) => KeyAction::Events(vec![SessionEvent::KeyDown(arrow)]),
            (KeyEventKind::Repeat, true) => KeyAction::None,
            (_, false) => KeyAction::Events(vec![
                SessionEvent::KeyDown(arrow),
                SessionEvent::KeyUp(arrow),
            ]),
        };
    }

    if key.kind == KeyEventKind::Release {
        return KeyAction::None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        KeyCode::Char('m') => KeyAction::Events(vec![SessionEvent::ToggleMinimap]),
        KeyCode::Char('c') => KeyAction::Claim,
        _ => KeyAction::None,
    }
}

/// World viewport change for a terminal of `cols` x `rows` cells
pub fn viewport_event(cols: u16, rows: u16) -> SessionEvent {
    SessionEvent::Resize {
        width: f64::from(cols) * CELL_WIDTH_PX,
        height: f64::from(rows) * CELL_HEIGHT_PX,
    }
}

/// Status line for a claim attempted while the chest is still locked
fn locked_message(chest: &ChestClaim, now: Instant) -> String {
    if chest.is_open() {
        format!("Chest unlocks in {}s", chest.remaining_secs(now))
    } else {
        "Walk to the chest first".to_string()
    }
}

fn arrow_key(code: KeyCode) -> Option<ArrowKey> {
    match code {
        KeyCode::Up => Some(ArrowKey::Up),
        KeyCode::Down => Some(ArrowKey::Down),
        KeyCode::Left => Some(ArrowKey::Left),
        KeyCode::Right => Some(ArrowKey::Right),
        _ => None,
    }
}

/// Run the terminal client until the user quits. Always asks the frame loop
/// to shut down on the way out.
pub async fn run(
    events: EventSender,
    view: watch::Receiver<SessionView>,
    reward: RewardClient,
    unlock_after: Duration,
) -> anyhow::Result<()> {
    terminal::enable_raw_mode()?;
    let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableFocusChange, cursor::Hide)?;
    if enhanced {
        execute!(
            out,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }

    if let Ok((cols, rows)) = terminal::size() {
        if let Err(e) = events.send(viewport_event(cols, rows)) {
            tracing::warn!("Could not size the viewport: {}", e);
        }
    }

    let result = event_loop(&events, view, Arc::new(reward), unlock_after, enhanced).await;

    if enhanced {
        let _ = execute!(out, PopKeyboardEnhancementFlags);
    }
    let _ = execute!(out, DisableFocusChange, cursor::Show, LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();

    if let Err(e) = events.send(SessionEvent::Shutdown) {
        tracing::warn!("Could not stop the frame loop: {}", e);
    }
    result
}

async fn event_loop(
    events: &EventSender,
    view: watch::Receiver<SessionView>,
    reward: Arc<RewardClient>,
    unlock_after: Duration,
    enhanced: bool,
) -> anyhow::Result<()> {
    let mut reader = EventStream::new();
    let mut chest = ChestClaim::new(unlock_after);
    let mut status = String::new();
    let mut claiming = false;
    let (status_tx, mut status_rx) = mpsc::unbounded_channel::<String>();
    let mut redraw = tokio::time::interval(Duration::from_millis(REDRAW_MS));

    loop {
        tokio::select! {
            next = reader.next() => {
                let event = match next {
                    Some(event) => event?,
                    None => break,
                };
                match event {
                    Event::Key(key) => match key_action(key, enhanced) {
                        KeyAction::Quit => break,
                        KeyAction::Events(list) => {
                            for event in list {
                                events.send(event)?;
                            }
                        }
                        KeyAction::Claim if claiming => {}
                        KeyAction::Claim => {
                            claiming = true;
                            let now = Instant::now();
                            if chest.can_claim(now) {
                                status = "Claiming...".to_string();
                            }
                            let chest = chest.clone();
                            let reward = reward.clone();
                            let status_tx = status_tx.clone();
                            tokio::spawn(async move {
                                let message = match chest.claim(&reward, now).await {
                                    Some(message) => message,
                                    None => locked_message(&chest, now),
                                };
                                let _ = status_tx.send(message);
                            });
                        }
                        KeyAction::None => {}
                    },
                    Event::FocusLost => events.send(SessionEvent::FocusLost)?,
                    Event::Resize(cols, rows) => events.send(viewport_event(cols, rows))?,
                    _ => {}
                }
            }
            Some(message) = status_rx.recv() => {
                claiming = false;
                status = message;
            }
            _ = redraw.tick() => {
                let current = view.borrow().clone();
                chest.observe(current.zones.chest, Instant::now());
                draw(&current, &chest, &status)?;
            }
        }
    }

    Ok(())
}

fn draw(view: &SessionView, chest: &ChestClaim, status: &str) -> std::io::Result<()> {
    let mut lines = Vec::new();
    match &view.player {
        Some(player) => {
            lines.push(format!(
                "{} [{}]  ({:.0}, {:.0}) facing {}{}",
                player.name,
                player.color,
                player.x,
                player.y,
                player.direction.as_str(),
                if view.walking { "  walking" } else { "" }
            ));
            lines.push(format!("Coins: {}", player.coins));
        }
        None => lines.push("Joining...".to_string()),
    }
    lines.push(format!(
        "Players nearby: {}   Coins on the map: {}",
        view.others.len(),
        view.coins.len()
    ));
    if view.zones.information {
        lines.push("You found an information board.".to_string());
    }
    if view.zones.chest {
        let remaining = chest.remaining_secs(Instant::now());
        lines.push(if remaining == 0 {
            "Treasure chest! Press c to claim.".to_string()
        } else {
            format!("Treasure chest! Unlocks in {}s", remaining)
        });
    }
    if view.minimap {
        lines.push(format!(
            "Minimap: camera offset ({:.0}, {:.0})",
            view.camera.offset_x, view.camera.offset_y
        ));
    }
    lines.extend(status.lines().map(str::to_string));
    lines.push("arrows move  m minimap  c claim  q quit".to_string());

    let mut out = stdout();
    queue!(out, cursor::MoveTo(0, 0), Clear(ClearType::All))?;
    for (row, line) in lines.iter().enumerate() {
        queue!(out, cursor::MoveTo(0, row as u16), Print(line))?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_arrows_with_release_reporting() {
        assert_eq!(
            key_action(key(KeyCode::Left, KeyEventKind::Press), true),
            KeyAction::Events(vec![SessionEvent::KeyDown(ArrowKey::Left)])
        );
        assert_eq!(
            key_action(key(KeyCode::Left, KeyEventKind::Repeat), true),
            KeyAction::None
        );
        assert_eq!(
            key_action(key(KeyCode::Left, KeyEventKind::Release), true),
            KeyAction::Events(vec![SessionEvent::KeyUp(ArrowKey::Left)])
        );
    }

    #[test]
    fn test_arrows_without_release_reporting_step_once() {
        assert_eq!(
            key_action(key(KeyCode::Up, KeyEventKind::Press), false),
            KeyAction::Events(vec![
                SessionEvent::KeyDown(ArrowKey::Up),
                SessionEvent::KeyUp(ArrowKey::Up),
            ])
        );
    }

    #[test]
    fn test_command_keys() {
        assert_eq!(
            key_action(key(KeyCode::Char('m'), KeyEventKind::Press), true),
            KeyAction::Events(vec![SessionEvent::ToggleMinimap])
        );
        assert_eq!(
            key_action(key(KeyCode::Char('c'), KeyEventKind::Press), false),
            KeyAction::Claim
        );
        assert_eq!(
            key_action(key(KeyCode::Char('q'), KeyEventKind::Press), false),
            KeyAction::Quit
        );
        assert_eq!(
            key_action(key(KeyCode::Char('m'), KeyEventKind::Release), true),
            KeyAction::None
        );

        let mut ctrl_c = key(KeyCode::Char('c'), KeyEventKind::Press);
        ctrl_c.modifiers = KeyModifiers::CONTROL;
        assert_eq!(key_action(ctrl_c, false), KeyAction::Quit);
    }

    #[test]
    fn test_terminal_size_becomes_viewport() {
        assert_eq!(
            viewport_event(120, 40),
            SessionEvent::Resize {
                width: 960.0,
                height: 640.0,
            }
        );
        assert_eq!(
            viewport_event(0, 0),
            SessionEvent::Resize {
                width: 0.0,
                height: 0.0,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_locked_claim_messages() {
        let reward = RewardClient::new("http://127.0.0.1:1", "token").unwrap();
        let mut chest = ChestClaim::new(Duration::from_millis(1000));
        let start = Instant::now();

        assert_eq!(chest.claim(&reward, start).await, None);
        assert_eq!(locked_message(&chest, start), "Walk to the chest first");

        chest.observe(true, start);
        let now = start + Duration::from_millis(200);
        assert_eq!(chest.claim(&reward, now).await, None);
        assert_eq!(locked_message(&chest, now), "Chest unlocks in 1s");
    }
}
