use std::fmt;

/// Fatal errors raised while bringing up the window, device, or application.
///
/// None of these are recoverable: the runtime leaves the event loop and returns
/// the error from [`Runtime::run`](crate::window::Runtime::run).
#[derive(Debug)]
pub enum StartupError {
    /// The platform windowing system could not be initialized.
    Init(winit::error::EventLoopError),
    /// The OS window could not be created.
    WindowCreate(winit::error::OsError),
    /// The graphics device, queue, or surface could not be created.
    DeviceInit(anyhow::Error),
    /// The application failed to create its device resources.
    AppInit(anyhow::Error),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(_) => write!(f, "failed to initialize the windowing system"),
            Self::WindowCreate(_) => write!(f, "failed to create window"),
            Self::DeviceInit(_) => write!(f, "failed to initialize the graphics device"),
            Self::AppInit(_) => write!(f, "application initialization failed"),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Init(e) => Some(e),
            Self::WindowCreate(e) => Some(e),
            Self::DeviceInit(e) | Self::AppInit(e) => Some(e.as_ref()),
        }
    }
}
