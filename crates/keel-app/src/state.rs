//! Game states and the state stack.

use keel_gpu::GpuContext;
use keel_input::InputManager;
use tracing::debug;

use crate::assets::AssetStore;
use crate::events::EventBus;

/// Services handed to every state hook during a tick.
pub struct StateContext<'a> {
    /// GPU context, for resource uploads.
    pub gpu: &'a GpuContext,
    /// Keyboard state for the current tick.
    pub input: &'a InputManager,
    /// Event registry, cleared at end of tick.
    pub events: &'a mut EventBus,
    /// Asset registry.
    pub assets: &'a mut AssetStore,
    /// Seconds since the previous tick.
    pub dt: f32,
    commands: &'a mut Vec<StateCommand>,
}

impl<'a> StateContext<'a> {
    pub(crate) fn new(
        gpu: &'a GpuContext,
        input: &'a InputManager,
        events: &'a mut EventBus,
        assets: &'a mut AssetStore,
        dt: f32,
        commands: &'a mut Vec<StateCommand>,
    ) -> Self {
        Self {
            gpu,
            input,
            events,
            assets,
            dt,
            commands,
        }
    }

    /// Queue a new game state to push once this update finishes.
    pub fn push_state(&mut self, state: Box<dyn GameState>) {
        self.commands.push(StateCommand::PushState(state));
    }

    /// Queue removal of the top game state.
    pub fn pop_state(&mut self) {
        self.commands.push(StateCommand::PopState);
    }

    /// Queue a popup to push over the current state.
    pub fn push_popup(&mut self, popup: Box<dyn GameState>) {
        self.commands.push(StateCommand::PushPopup(popup));
    }

    /// Queue removal of the top popup.
    pub fn pop_popup(&mut self) {
        self.commands.push(StateCommand::PopPopup);
    }

    /// Queue engine shutdown: every popup and state is popped, and the
    /// empty stack closes the window on the next tick.
    pub fn quit(&mut self) {
        self.commands.push(StateCommand::Quit);
    }
}

/// A screen of the game: menu, gameplay, pause overlay.
///
/// States live on the [`StateStack`]. The topmost state is active; a
/// state reporting [`is_loading`](Self::is_loading) runs its loading
/// hooks instead of the regular ones until its background work lands.
///
/// Stack changes requested during an update are queued on the context
/// and applied after the update returns, so the stack never mutates
/// under the state currently running.
pub trait GameState {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Called when the state lands on the stack. A state that needs
    /// background preparation starts it here (see `LoadTask`).
    fn on_enter(&mut self) {}

    /// Still preparing? While `true` the loading hooks run instead of
    /// [`update`](Self::update) and [`draw`](Self::draw).
    fn is_loading(&self) -> bool {
        false
    }

    /// Per-tick update while loading.
    #[allow(unused_variables)]
    fn update_loading(&mut self, ctx: &mut StateContext) {}

    /// Per-tick draw while loading.
    #[allow(unused_variables)]
    fn draw_loading(&mut self, ctx: &mut StateContext) {}

    /// Per-tick update.
    fn update(&mut self, ctx: &mut StateContext);

    /// Per-tick draw bookkeeping. The frame itself is recorded by the
    /// renderer; states use this for overlay and debug output.
    #[allow(unused_variables)]
    fn draw(&mut self, ctx: &mut StateContext) {}

    /// Called when the state leaves the stack. Background tasks held by
    /// the state end here (dropping a `LoadTask` joins it).
    fn on_exit(&mut self) {}
}

/// A stack change requested by a state during update.
pub enum StateCommand {
    PushState(Box<dyn GameState>),
    PopState,
    PushPopup(Box<dyn GameState>),
    PopPopup,
    Quit,
}

/// Stacked game states with a popup overlay stack.
///
/// The last state is active. Popups sit above every state: while any
/// popup is up, the topmost popup receives the tick's update instead of
/// the active state. Draw always renders the active state first, then
/// the topmost popup over it.
#[derive(Default)]
pub struct StateStack {
    states: Vec<Box<dyn GameState>>,
    popups: Vec<Box<dyn GameState>>,
}

impl StateStack {
    /// Create an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a game state and run its enter hook.
    pub fn push_state(&mut self, mut state: Box<dyn GameState>) {
        debug!("Entering state: {}", state.name());
        state.on_enter();
        self.states.push(state);
    }

    /// Pop the top game state, running its exit hook.
    pub fn pop_state(&mut self) {
        if let Some(mut state) = self.states.pop() {
            debug!("Leaving state: {}", state.name());
            state.on_exit();
        }
    }

    /// Push a popup over the current state and run its enter hook.
    pub fn push_popup(&mut self, mut popup: Box<dyn GameState>) {
        debug!("Opening popup: {}", popup.name());
        popup.on_enter();
        self.popups.push(popup);
    }

    /// Pop the top popup, running its exit hook.
    pub fn pop_popup(&mut self) {
        if let Some(mut popup) = self.popups.pop() {
            debug!("Closing popup: {}", popup.name());
            popup.on_exit();
        }
    }

    /// Name of the entry that receives the next update, popups first.
    #[must_use]
    pub fn update_target(&self) -> Option<&str> {
        self.popups
            .last()
            .or_else(|| self.states.last())
            .map(|state| state.name())
    }

    /// Returns `true` when no states and no popups remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && self.popups.is_empty()
    }

    /// Number of game states on the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.states.len()
    }

    /// Number of popups on the stack.
    #[must_use]
    pub fn popup_depth(&self) -> usize {
        self.popups.len()
    }

    /// Update the topmost popup, or the active state when no popup is
    /// up. A loading state runs its loading update instead.
    pub fn update(&mut self, ctx: &mut StateContext) {
        if let Some(popup) = self.popups.last_mut() {
            popup.update(ctx);
        } else if let Some(state) = self.states.last_mut() {
            if state.is_loading() {
                state.update_loading(ctx);
            } else {
                state.update(ctx);
            }
        }
    }

    /// Draw the active state, then the topmost popup over it.
    pub fn draw(&mut self, ctx: &mut StateContext) {
        if let Some(state) = self.states.last_mut() {
            if state.is_loading() {
                state.draw_loading(ctx);
            } else {
                state.draw(ctx);
            }
        }
        if let Some(popup) = self.popups.last_mut() {
            popup.draw(ctx);
        }
    }

    /// Apply queued stack commands in queue order.
    pub fn apply(&mut self, commands: &mut Vec<StateCommand>) {
        for command in commands.drain(..) {
            match command {
                StateCommand::PushState(state) => self.push_state(state),
                StateCommand::PopState => self.pop_state(),
                StateCommand::PushPopup(popup) => self.push_popup(popup),
                StateCommand::PopPopup => self.pop_popup(),
                StateCommand::Quit => self.clear(),
            }
        }
    }

    /// Pop everything, topmost first, running exit hooks.
    pub fn clear(&mut self) {
        while !self.popups.is_empty() {
            self.pop_popup();
        }
        while !self.states.is_empty() {
            self.pop_state();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    struct Probe {
        name: String,
        journal: Rc<RefCell<Vec<String>>>,
    }

    impl Probe {
        fn boxed(name: &str, journal: &Rc<RefCell<Vec<String>>>) -> Box<dyn GameState> {
            Box::new(Self {
                name: name.to_string(),
                journal: Rc::clone(journal),
            })
        }
    }

    impl GameState for Probe {
        fn name(&self) -> &str {
            &self.name
        }

        fn on_enter(&mut self) {
            self.journal.borrow_mut().push(format!("enter {}", self.name));
        }

        fn update(&mut self, _ctx: &mut StateContext) {}

        fn on_exit(&mut self) {
            self.journal.borrow_mut().push(format!("exit {}", self.name));
        }
    }

    #[test]
    fn popup_takes_update_priority() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let mut stack = StateStack::new();

        stack.push_state(Probe::boxed("menu", &journal));
        assert_eq!(stack.update_target(), Some("menu"));

        stack.push_popup(Probe::boxed("pause", &journal));
        assert_eq!(stack.update_target(), Some("pause"));

        stack.pop_popup();
        assert_eq!(stack.update_target(), Some("menu"));
    }

    #[test]
    fn commands_apply_in_queue_order() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let mut stack = StateStack::new();
        stack.push_state(Probe::boxed("menu", &journal));

        let mut commands = vec![
            StateCommand::PushPopup(Probe::boxed("pause", &journal)),
            StateCommand::PopPopup,
            StateCommand::PushState(Probe::boxed("game", &journal)),
        ];
        stack.apply(&mut commands);

        assert!(commands.is_empty());
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.popup_depth(), 0);
        assert_eq!(stack.update_target(), Some("game"));
        assert_eq!(
            *journal.borrow(),
            vec!["enter menu", "enter pause", "exit pause", "enter game"]
        );
    }

    #[test]
    fn quit_unwinds_from_the_top() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let mut stack = StateStack::new();
        stack.push_state(Probe::boxed("menu", &journal));
        stack.push_state(Probe::boxed("game", &journal));
        stack.push_popup(Probe::boxed("pause", &journal));

        stack.apply(&mut vec![StateCommand::Quit]);

        assert!(stack.is_empty());
        assert_eq!(
            *journal.borrow(),
            vec![
                "enter menu",
                "enter game",
                "enter pause",
                "exit pause",
                "exit game",
                "exit menu"
            ]
        );
    }

    #[test]
    fn pops_on_empty_stacks_are_harmless() {
        let mut stack = StateStack::new();
        stack.apply(&mut vec![StateCommand::PopState, StateCommand::PopPopup]);
        assert!(stack.is_empty());
        assert_eq!(stack.update_target(), None);
    }
}
