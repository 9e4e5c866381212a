/// "Should close" flag for the window.
///
/// Setting it is a one-way transition: there is no way to clear it while the
/// window is open. The runtime checks it at the top of each loop iteration.
#[derive(Debug, Default)]
pub struct CloseRequest {
    requested: bool,
}

impl CloseRequest {
    pub fn request(&mut self) {
        if !self.requested {
            log::debug!("close requested");
        }
        self.requested = true;
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }
}
