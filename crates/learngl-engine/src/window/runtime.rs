use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::coords::Viewport;
use crate::core::{App, FrameCtx};
use crate::device::{Gpu, GpuInit};
use crate::error::StartupError;
use crate::input::{InputEvent, InputState, Key, KeyState};
use crate::time::FrameClock;

use super::{CloseRequest, Lifecycle};

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "LearnOpenGL".to_string(),
            width: 800,
            height: 600,
            resizable: true,
        }
    }
}

/// Entry point for the runtime.
///
/// Must be called from the main thread: winit only allows the event loop (and
/// therefore the window and its surface) to live there.
pub struct Runtime;

impl Runtime {
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + App,
    {
        let event_loop = EventLoop::new().map_err(StartupError::Init)?;
        let mut state = AppState::new(config, gpu_init, app);
        state.lifecycle.advance(Lifecycle::Initialized);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        state.finish()
    }
}

#[self_referencing]
struct WindowEntry {
    input: InputState,
    clock: FrameClock,
    viewport: Viewport,
    close: CloseRequest,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    entry: Option<WindowEntry>,
    lifecycle: Lifecycle,
    fatal: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            entry: None,
            lifecycle: Lifecycle::default(),
            fatal: None,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height))
            .with_resizable(self.config.resizable);

        let window = event_loop
            .create_window(attrs)
            .map_err(StartupError::WindowCreate)?;

        let size = window.inner_size();
        let gpu_init = self.gpu_init.clone();

        let entry = WindowEntryTryBuilder {
            input: InputState::default(),
            clock: FrameClock::new(),
            viewport: Viewport::from_size(size.width, size.height),
            close: CloseRequest::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .map_err(StartupError::DeviceInit)?;

        let app = &mut self.app;
        entry
            .with_gpu(|gpu| app.on_init(gpu))
            .map_err(StartupError::AppInit)?;

        Ok(entry)
    }

    /// Records a fatal error and shuts down; the caller of `run` reports it.
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::debug!("shutting down after fatal error");
        self.fatal = Some(err);
        self.terminate(event_loop);
    }

    /// Releases the window and device and leaves the event loop.
    fn terminate(&mut self, event_loop: &ActiveEventLoop) {
        if self.lifecycle.is_terminated() {
            return;
        }
        if self.lifecycle == Lifecycle::Running {
            self.lifecycle.advance(Lifecycle::Closing);
        }

        if let Some(entry) = self.entry.take() {
            self.app.on_exit();
            log::info!("rendered {} frames", entry.borrow_clock().frames());
            drop(entry);
        }

        self.lifecycle.advance(Lifecycle::Terminated);
        event_loop.exit();
    }

    fn request_close(&mut self) {
        if let Some(entry) = self.entry.as_mut() {
            entry.with_close_mut(|close| close.request());
        }
        if self.lifecycle == Lifecycle::Running {
            self.lifecycle.advance(Lifecycle::Closing);
        }
    }

    /// One render-loop iteration.
    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        if entry.borrow_close().is_requested() {
            self.terminate(event_loop);
            return;
        }

        let app = &mut self.app;
        let result = entry.with_mut(|fields| {
            let time = fields.clock.tick();
            let mut ctx = FrameCtx {
                window: fields.window,
                gpu: fields.gpu,
                input: fields.input,
                viewport: *fields.viewport,
                close: fields.close,
                time,
            };
            app.on_frame(&mut ctx)
        });

        if let Err(err) = result {
            self.fail(event_loop, err.context("render loop failed"));
            return;
        }

        // The app may have set the flag itself (e.g. on Escape).
        if self.entry.as_ref().is_some_and(|e| e.borrow_close().is_requested())
            && self.lifecycle == Lifecycle::Running
        {
            self.lifecycle.advance(Lifecycle::Closing);
        }
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };
        entry.with_mut(|fields| {
            fields.gpu.resize(new_size);
            fields
                .viewport
                .on_framebuffer_resized(new_size.width, new_size.height);
            log::debug!("framebuffer resized to {}x{}", new_size.width, new_size.height);
            fields.window.request_redraw();
        });
    }

    fn finish(self) -> Result<()> {
        match self.fatal {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.lifecycle.is_terminated() {
            return;
        }

        match self.create_window_entry(event_loop) {
            Ok(entry) => {
                entry.with_window(|w| w.request_redraw());
                self.entry = Some(entry);
                self.lifecycle.advance(Lifecycle::Running);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.lifecycle.is_terminated() {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw; FIFO presentation paces the loop.
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.lifecycle.is_terminated() {
            event_loop.exit();
            return;
        }

        if let (Some(ev), Some(entry)) = (translate_input_event(&event), self.entry.as_mut()) {
            entry.with_input_mut(|input| input.apply_event(&ev));
        }

        match event {
            WindowEvent::CloseRequested => self.request_close(),
            WindowEvent::Resized(new_size) => self.resize(new_size),
            WindowEvent::RedrawRequested => self.frame(event_loop),
            _ => {}
        }
    }
}

fn translate_input_event(event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::Focused(f) => Some(InputEvent::Focused(*f)),

        WindowEvent::KeyboardInput { event, .. } => {
            let state = match event.state {
                ElementState::Pressed => KeyState::Pressed,
                ElementState::Released => KeyState::Released,
            };
            Some(InputEvent::Key {
                key: map_key(event.physical_key),
                state,
                repeat: event.repeat,
            })
        }

        _ => None,
    }
}

fn map_key(pk: PhysicalKey) -> Key {
    match pk {
        PhysicalKey::Code(KeyCode::Escape) => Key::Escape,
        PhysicalKey::Code(other) => Key::Unknown(other as u32),
        // NativeKeyCode is not a u32 in winit 0.30; preserve "unknown" without a stable numeric.
        PhysicalKey::Unidentified(_) => Key::Unknown(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_matches_demo_parameters() {
        let cfg = RuntimeConfig::default();
        assert_eq!((cfg.width, cfg.height), (800, 600));
        assert_eq!(cfg.title, "LearnOpenGL");
    }

    #[test]
    fn escape_maps_to_named_key() {
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::Escape)), Key::Escape);
        assert!(matches!(map_key(PhysicalKey::Code(KeyCode::KeyA)), Key::Unknown(_)));
    }

    #[test]
    fn focus_events_are_translated() {
        assert_eq!(
            translate_input_event(&WindowEvent::Focused(false)),
            Some(InputEvent::Focused(false))
        );
        assert_eq!(translate_input_event(&WindowEvent::RedrawRequested), None);
    }
}
