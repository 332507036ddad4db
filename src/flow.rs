//! Application lifecycle and the winit event loop.
//!
//! [`run`] opens the window, builds the GPU [`Context`] and starts loading the
//! configured models in the background. Each finished load comes back to the
//! event loop as a [`ViewerEvent::Model`] and is added to the [`Scene`]; once
//! every model has reported back the camera is framed around the assembly.
//!
//! Natively the context is created synchronously on a tokio runtime and the
//! loads run on that runtime. In the browser nothing may block, so context
//! creation and loading are spawned onto the JS event loop and report back
//! through the event loop proxy.

use std::{fmt::Debug, sync::Arc};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    camera::Framing,
    config::ViewerConfig,
    context::Context,
    render::{self, Recovery},
    resources::{LoadOutcome, load_models},
    scene::{LoadReport, Progress, Scene},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub enum ViewerEvent {
    /// The GPU context finished initializing (web only).
    #[allow(dead_code)]
    Initialized(Box<Context>),
    Model(LoadOutcome),
    #[allow(dead_code)]
    Exit,
}

impl Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized(Context)"),
            Self::Model(outcome) => f.debug_tuple("Model").field(&outcome.path()).finish(),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

pub struct AppState {
    pub(crate) ctx: Context,
    pub(crate) scene: Scene,
    is_surface_configured: bool,
}

impl AppState {
    fn new(ctx: Context, expected_models: usize) -> Self {
        Self {
            ctx,
            scene: Scene::new(expected_models),
            is_surface_configured: false,
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
        }
    }

    fn reconfigure(&mut self) {
        let size = self.ctx.window.inner_size();
        self.resize(size.width, size.height);
    }

    fn ingest(&mut self, outcome: LoadOutcome) {
        let progress = self.scene.ingest(&self.ctx.device, outcome);
        self.handle_progress(progress);
    }

    fn handle_progress(&mut self, progress: Progress) {
        match progress {
            Progress::Pending { remaining } => log::debug!("{remaining} models still loading"),
            Progress::Complete(report) => self.frame_assembly(&report),
        }
        self.ctx.window.request_redraw();
    }

    fn frame_assembly(&mut self, report: &LoadReport) {
        // individual failures were already logged as they arrived
        if report.failed.is_empty() {
            log::info!("assembly complete: {}", report.summary());
        } else {
            log::warn!("assembly complete: {}", report.summary());
        }

        match Framing::from_bounds(&report.bounds) {
            Some(framing) => {
                log::info!(
                    "framing assembly at {:?} from distance {}",
                    framing.target,
                    framing.distance
                );
                let camera = &mut self.ctx.camera;
                camera.controller.frame(&mut camera.camera, &framing);
            }
            None => log::warn!("nothing to frame, keeping the default view"),
        }
    }

    fn redraw(&mut self) {
        if !self.is_surface_configured {
            return;
        }
        self.ctx.update_camera();

        match render::render(&self.ctx, &self.scene) {
            Ok(()) => {}
            Err(e) => match Recovery::for_error(&e) {
                Recovery::Reconfigure => self.reconfigure(),
                Recovery::Skip => log::debug!("frame skipped: {e}"),
                Recovery::Report => log::error!("Unable to render {}", e),
            },
        }
        // continuous redraw keeps damping and input responsive
        self.ctx.window.request_redraw();
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewerEvent>,
    config: ViewerConfig,
    state: Option<AppState>,
    load_started: Instant,
}

impl App {
    fn new(event_loop: &EventLoop<ViewerEvent>, config: ViewerConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            state: None,
            load_started: Instant::now(),
        })
    }

    fn window_attributes(&self) -> winit::window::WindowAttributes {
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title(&self.config.title);

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID))
                .and_then(|element| element.dyn_into::<web_sys::HtmlCanvasElement>().ok());
            window_attributes = match canvas {
                Some(canvas) => window_attributes.with_canvas(Some(canvas)),
                None => {
                    log::info!("no #{CANVAS_ID} element, appending a canvas to the page");
                    window_attributes.with_append(true)
                }
            };
        }

        window_attributes
    }

    /// Installs the freshly created context and kicks off the model loads.
    fn start(&mut self, ctx: Context) {
        let mut state = AppState::new(ctx, self.config.models.len());
        state.reconfigure();
        if self.config.models.is_empty() {
            log::warn!("no models configured");
            let progress = state.scene.assembly.poll();
            state.handle_progress(progress);
        }
        state.ctx.window.request_redraw();
        self.state = Some(state);
        self.spawn_loads();
    }

    fn spawn_loads(&mut self) {
        if self.config.models.is_empty() {
            return;
        }
        log::info!(
            "loading {} models from {}",
            self.config.models.len(),
            self.config.asset_root
        );
        self.load_started = Instant::now();

        let proxy = self.proxy.clone();
        let asset_root = self.config.asset_root.clone();
        let models = self.config.models.clone();
        let loads = async move {
            load_models(&asset_root, &models, |outcome| {
                if proxy.send_event(ViewerEvent::Model(outcome)).is_err() {
                    log::warn!("event loop closed before all models were delivered");
                }
            })
            .await;
        };

        #[cfg(not(target_arch = "wasm32"))]
        self.async_runtime.spawn(loads);

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(loads);
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let window = match event_loop.create_window(self.window_attributes()) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create the window: {e}");
                event_loop.exit();
                return;
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let init = Context::new(window, &self.config);
            match self.async_runtime.block_on(init) {
                Ok(ctx) => self.start(ctx),
                Err(e) => {
                    log::error!("Cannot create the main context: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let config = self.config.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match Context::new(window, &config).await {
                    Ok(ctx) => ViewerEvent::Initialized(Box::new(ctx)),
                    Err(e) => {
                        log::error!("Cannot create the main context: {e:#}");
                        ViewerEvent::Exit
                    }
                };
                if proxy.send_event(event).is_err() {
                    log::error!("event loop closed during initialization");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Initialized(ctx) => self.start(*ctx),
            ViewerEvent::Model(outcome) => match &mut self.state {
                Some(state) => {
                    state.ingest(outcome);
                    if state.scene.assembly.is_complete() {
                        log::debug!("models loaded in {:?}", self.load_started.elapsed());
                    }
                }
                None => log::warn!("dropping {}: no context yet", outcome.path()),
            },
            ViewerEvent::Exit => event_loop.exit(),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        state.ctx.camera.controller.handle_window_events(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => state.redraw(),
            _ => {}
        }
    }
}

pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
