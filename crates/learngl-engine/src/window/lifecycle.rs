/// Window/context lifecycle.
///
/// `Uninitialized -> Initialized -> Running -> Closing -> Terminated`.
/// Startup failures jump straight to `Terminated`, the only terminal state.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Lifecycle {
    /// Nothing created yet.
    #[default]
    Uninitialized,
    /// Windowing system is up; no window yet.
    Initialized,
    /// Window and graphics context exist; frames are being rendered.
    Running,
    /// Close was requested; the loop stops at its next iteration.
    Closing,
    /// Platform resources released.
    Terminated,
}

impl Lifecycle {
    pub fn can_advance_to(self, next: Lifecycle) -> bool {
        use Lifecycle::*;
        match (self, next) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (Uninitialized, Initialized) | (Initialized, Running) | (Running, Closing) => true,
            _ => false,
        }
    }

    /// Moves to `next` if the transition is legal; returns whether it moved.
    pub fn advance(&mut self, next: Lifecycle) -> bool {
        if self.can_advance_to(next) {
            log::debug!("lifecycle {self:?} -> {next:?}");
            *self = next;
            true
        } else {
            log::warn!("ignoring lifecycle transition {self:?} -> {next:?}");
            false
        }
    }

    pub fn is_terminated(self) -> bool {
        self == Lifecycle::Terminated
    }
}
