// src/sink.rs - Where action events end up: key state, bindings, injection
use crate::actions::{ActionEvent, KeyboardAction, MouseAction, Persistence};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Consumer of detector output. Called from the pipeline's single
/// forwarding thread, so implementations see one event at a time.
pub trait ActionSink: Send {
    fn handle(&mut self, event: &ActionEvent) -> Result<()>;

    /// Called once after the last event. Default does nothing.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub action: KeyboardAction,
    pub key: String,
}

/// Keyboard action to OS key name table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyBindings(Vec<KeyBinding>);

impl Default for KeyBindings {
    fn default() -> Self {
        use KeyboardAction::*;
        let table = [
            (MoveRight, "D"),
            (MoveLeft, "A"),
            (MoveUp, "W"),
            (MoveDown, "S"),
            (Jump, "Space"),
            (LongJump, "Z"),
            (Shoot, "Z"),
            (Stop, "X"),
            (Esc, "Escape"),
            (UpArrow, "Up"),
            (DownArrow, "Down"),
            (LeftArrow, "Left"),
            (RightArrow, "Right"),
            (Reload, "R"),
            (Enter, "Return"),
            (Knife, "V"),
            (Grenade, "G"),
        ];
        Self(
            table
                .into_iter()
                .map(|(action, key)| KeyBinding { action, key: key.to_string() })
                .collect(),
        )
    }
}

impl KeyBindings {
    pub fn key_for(&self, action: KeyboardAction) -> Option<&str> {
        self.0.iter().find(|b| b.action == action).map(|b| b.key.as_str())
    }

    /// Replaces an existing binding or appends a new one.
    pub fn bind(&mut self, action: KeyboardAction, key: impl Into<String>) {
        let key = key.into();
        match self.0.iter_mut().find(|b| b.action == action) {
            Some(binding) => binding.key = key,
            None => self.0.push(KeyBinding { action, key }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyBinding> {
        self.0.iter()
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for binding in &self.0 {
            if binding.key.trim().is_empty() {
                return Err(PipelineError::Config(format!("empty key bound to {:?}", binding.action)));
            }
            if !seen.insert(binding.action) {
                return Err(PipelineError::Config(format!("{:?} is bound twice", binding.action)));
            }
        }
        Ok(())
    }
}

/// Low-level operation handed to the OS layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    KeyDown(String),
    KeyUp(String),
    MouseDown(MouseAction),
    MouseUp(MouseAction),
    MouseMove { dx: i32, dy: i32 },
}

/// The OS boundary. Real implementations send scan codes or synthesized
/// mouse input to the focused window.
pub trait InputInjector: Send {
    fn inject(&mut self, command: &InputCommand) -> Result<()>;
}

/// Logs every command instead of touching the OS.
#[derive(Debug, Default)]
pub struct TracingInjector {
    injected: u64,
}

impl TracingInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn injected(&self) -> u64 {
        self.injected
    }
}

impl InputInjector for TracingInjector {
    fn inject(&mut self, command: &InputCommand) -> Result<()> {
        self.injected += 1;
        info!(?command, "inject");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub events: u64,
    pub commands: u64,
    pub suppressed: u64,
    pub unbound: u64,
    pub failures: u64,
}

/// Turns action events into key/button transitions, tracking what is held
/// so a repeated press is dropped and `finish` can let go of everything.
pub struct KeyStateSink<I: InputInjector> {
    injector: I,
    bindings: KeyBindings,
    held_keys: HashSet<String>,
    held_buttons: HashSet<MouseAction>,
    stats: SinkStats,
}

impl<I: InputInjector> KeyStateSink<I> {
    pub fn new(injector: I, bindings: KeyBindings) -> Self {
        Self {
            injector,
            bindings,
            held_keys: HashSet::new(),
            held_buttons: HashSet::new(),
            stats: SinkStats::default(),
        }
    }

    pub fn stats(&self) -> SinkStats {
        self.stats
    }

    pub fn injector(&self) -> &I {
        &self.injector
    }

    pub fn is_key_held(&self, key: &str) -> bool {
        self.held_keys.contains(key)
    }

    pub fn is_button_held(&self, button: MouseAction) -> bool {
        self.held_buttons.contains(&button)
    }

    fn send(&mut self, command: InputCommand) {
        match self.injector.inject(&command) {
            Ok(()) => self.stats.commands += 1,
            Err(e) => {
                self.stats.failures += 1;
                warn!(?command, error = %e, "input injection failed");
            }
        }
    }

    fn key(&mut self, action: KeyboardAction, persistence: Persistence) {
        let Some(key) = self.bindings.key_for(action).map(str::to_owned) else {
            self.stats.unbound += 1;
            debug!(?action, "no key bound");
            return;
        };

        match persistence {
            Persistence::Press | Persistence::PressAndHold => {
                if !self.held_keys.insert(key.clone()) {
                    self.stats.suppressed += 1;
                    return;
                }
                self.send(InputCommand::KeyDown(key));
            }
            Persistence::Release => {
                self.held_keys.remove(&key);
                self.send(InputCommand::KeyUp(key));
            }
            Persistence::PressAndRelease | Persistence::DoubleClickHold => {
                self.held_keys.remove(&key);
                self.send(InputCommand::KeyDown(key.clone()));
                self.send(InputCommand::KeyUp(key));
            }
        }
    }

    fn mouse(&mut self, action: MouseAction, persistence: Persistence, x: i32, y: i32) {
        if action == MouseAction::Move {
            self.send(InputCommand::MouseMove { dx: x, dy: y });
            return;
        }

        match persistence {
            Persistence::Press | Persistence::PressAndHold => {
                if !self.held_buttons.insert(action) {
                    self.stats.suppressed += 1;
                    return;
                }
                self.send(InputCommand::MouseDown(action));
            }
            Persistence::Release => {
                self.held_buttons.remove(&action);
                self.send(InputCommand::MouseUp(action));
            }
            Persistence::PressAndRelease => {
                self.send(InputCommand::MouseDown(action));
                self.send(InputCommand::MouseUp(action));
            }
            // One full click, then a second press that stays down.
            Persistence::DoubleClickHold => {
                self.send(InputCommand::MouseDown(action));
                self.send(InputCommand::MouseUp(action));
                self.send(InputCommand::MouseDown(action));
                self.held_buttons.insert(action);
            }
        }
    }
}

impl<I: InputInjector> ActionSink for KeyStateSink<I> {
    fn handle(&mut self, event: &ActionEvent) -> Result<()> {
        self.stats.events += 1;
        match *event {
            ActionEvent::Keyboard { action, persistence, .. } => self.key(action, persistence),
            ActionEvent::Mouse { action, persistence, x, y, .. } => self.mouse(action, persistence, x, y),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let keys: Vec<String> = self.held_keys.drain().collect();
        let buttons: Vec<MouseAction> = self.held_buttons.drain().collect();
        if !keys.is_empty() || !buttons.is_empty() {
            info!(keys = keys.len(), buttons = buttons.len(), "releasing held input");
        }
        for key in keys {
            self.send(InputCommand::KeyUp(key));
        }
        for button in buttons {
            self.send(InputCommand::MouseUp(button));
        }
        Ok(())
    }
}

/// Collects events behind a shared handle so a test can inspect what the
/// pipeline emitted after handing the sink over.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<ActionEvent>>>,
    finished: Arc<Mutex<bool>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ActionEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_finished(&self) -> bool {
        *self.finished.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ActionSink for RecordingSink {
    fn handle(&mut self, event: &ActionEvent) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        *self.finished.lock().unwrap_or_else(PoisonError::into_inner) = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::GestureKind;

    #[derive(Default)]
    struct Captured(Arc<Mutex<Vec<InputCommand>>>);

    impl InputInjector for Captured {
        fn inject(&mut self, command: &InputCommand) -> Result<()> {
            self.0.lock().unwrap().push(command.clone());
            Ok(())
        }
    }

    struct Failing;

    impl InputInjector for Failing {
        fn inject(&mut self, _command: &InputCommand) -> Result<()> {
            Err(PipelineError::Injection("window gone".into()))
        }
    }

    fn key_event(action: KeyboardAction, persistence: Persistence) -> ActionEvent {
        ActionEvent::keyboard(GestureKind::MoveLeftRight, action, persistence)
    }

    #[test]
    fn repeated_press_is_suppressed_until_release() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut sink = KeyStateSink::new(Captured(Arc::clone(&log)), KeyBindings::default());

        sink.handle(&key_event(KeyboardAction::MoveRight, Persistence::Press)).unwrap();
        sink.handle(&key_event(KeyboardAction::MoveRight, Persistence::Press)).unwrap();
        assert!(sink.is_key_held("D"));
        sink.handle(&key_event(KeyboardAction::MoveRight, Persistence::Release)).unwrap();
        sink.handle(&key_event(KeyboardAction::MoveRight, Persistence::Press)).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                InputCommand::KeyDown("D".into()),
                InputCommand::KeyUp("D".into()),
                InputCommand::KeyDown("D".into()),
            ]
        );
        assert_eq!(sink.stats().suppressed, 1);
    }

    #[test]
    fn double_click_hold_leaves_button_down() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut sink = KeyStateSink::new(Captured(Arc::clone(&log)), KeyBindings::default());

        let shot = ActionEvent::mouse_button(GestureKind::AimShoot, MouseAction::LeftButton, Persistence::DoubleClickHold);
        sink.handle(&shot).unwrap();
        assert!(sink.is_button_held(MouseAction::LeftButton));

        sink.finish().unwrap();
        assert!(!sink.is_button_held(MouseAction::LeftButton));
        assert_eq!(log.lock().unwrap().last(), Some(&InputCommand::MouseUp(MouseAction::LeftButton)));
        assert_eq!(log.lock().unwrap().len(), 4);
    }

    #[test]
    fn pointer_moves_pass_straight_through() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut sink = KeyStateSink::new(Captured(Arc::clone(&log)), KeyBindings::default());

        sink.handle(&ActionEvent::mouse_move(GestureKind::MousePointer, 12, -4)).unwrap();
        assert_eq!(*log.lock().unwrap(), vec![InputCommand::MouseMove { dx: 12, dy: -4 }]);
    }

    #[test]
    fn injection_failures_are_counted_not_raised() {
        let mut sink = KeyStateSink::new(Failing, KeyBindings::default());
        let result = sink.handle(&key_event(KeyboardAction::Jump, Persistence::PressAndRelease));

        assert!(result.is_ok());
        assert_eq!(sink.stats().failures, 2);
    }

    #[test]
    fn rebinding_replaces_key() {
        let mut bindings = KeyBindings::default();
        bindings.bind(KeyboardAction::Jump, "J");
        assert_eq!(bindings.key_for(KeyboardAction::Jump), Some("J"));
        assert!(bindings.validate().is_ok());

        bindings.bind(KeyboardAction::Reload, "  ");
        assert!(matches!(bindings.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn recording_sink_shares_events_across_clones() {
        let sink = RecordingSink::new();
        let mut handle = sink.clone();
        handle.handle(&key_event(KeyboardAction::Jump, Persistence::PressAndRelease)).unwrap();
        handle.finish().unwrap();

        assert_eq!(sink.events().len(), 1);
        assert!(sink.is_finished());
    }
}
