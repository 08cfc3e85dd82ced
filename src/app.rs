use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono::Local;
use eframe::egui::{self, Context as EguiContext, Key, RichText, SidePanel, TopBottomPanel};
use eframe::{App, Frame};
use image::{ImageFormat, RgbaImage};

use crate::canvas::CanvasView;
use crate::chat::{self, ChatAction};
use crate::clipboard;
use crate::config::{AppConfig, MaskProfiles};
use crate::generation::HttpGenerator;
use crate::prompt_bar;
use crate::state::{EditorState, PendingRequest, Session};
use crate::theme::{self, AppTheme};
use crate::toolbar;
use crate::ui_controls;
use crate::worker::{SubmitJob, SubmitWorker, WorkerEvent};

const STATUS_SECS: f64 = 4.0;
const COPY_FEEDBACK_SECS: f64 = 1.5;
const LOADING_POLL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StatusKind {
    Info,
    Error,
}

struct StatusLine {
    text: String,
    kind: StatusKind,
    until: f64,
}

#[derive(Default)]
struct AppUiFlags {
    status: Option<StatusLine>,
    copy_feedback_until: Option<f64>,
}

pub struct PolyPromptApp {
    state: EditorState,
    canvas: CanvasView,
    worker: Option<SubmitWorker>,
    /// The session behind the request in flight, kept for the snapshot commit.
    in_flight: Option<Session>,
    profiles: MaskProfiles,
    ui_flags: AppUiFlags,
    theme: AppTheme,
}

impl PolyPromptApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let theme = theme::studio_dark_theme();
        theme::apply_theme(&cc.egui_ctx, &theme);

        let worker = match HttpGenerator::new(config.generate_url(), config.request_timeout()) {
            Ok(generator) => {
                log::info!("generation endpoint: {}", config.generate_url());
                Some(SubmitWorker::new(Box::new(generator)))
            }
            Err(err) => {
                log::error!("cannot create http client: {err}");
                None
            }
        };

        Self {
            state: EditorState::default(),
            canvas: CanvasView::new(),
            worker,
            in_flight: None,
            profiles: config.mask.to_profiles(),
            ui_flags: AppUiFlags::default(),
            theme,
        }
    }

    fn set_status(&mut self, ctx: &EguiContext, kind: StatusKind, text: impl Into<String>) {
        let until = ctx.input(|input| input.time) + STATUS_SECS;
        self.ui_flags.status = Some(StatusLine {
            text: text.into(),
            kind,
            until,
        });
    }

    fn report_error(&mut self, ctx: &EguiContext, what: &str, err: anyhow::Error) {
        log::error!("{what}: {err:#}");
        self.set_status(ctx, StatusKind::Error, format!("{what}: {err:#}"));
    }

    fn process_worker_events(&mut self, ctx: &EguiContext) {
        let Some(worker) = self.worker.as_ref() else {
            return;
        };
        let events: Vec<WorkerEvent> = std::iter::from_fn(|| worker.try_recv()).collect();

        for event in events {
            match event {
                WorkerEvent::Composed { kind, preview } => {
                    if kind == PendingRequest::Submit {
                        if let Some(request) = self.in_flight.as_ref() {
                            self.state.commit_submission(request, preview);
                        }
                    }
                }
                WorkerEvent::CompositeFailed(err) => {
                    log::error!("composite failed: {err}");
                    self.state.fail_pending();
                    self.in_flight = None;
                    self.set_status(
                        ctx,
                        StatusKind::Error,
                        format!("Could not prepare the image: {err}"),
                    );
                }
                WorkerEvent::Generated(image) => {
                    self.state.apply_generated(image);
                    self.in_flight = None;
                    self.set_status(ctx, StatusKind::Info, "Image generated");
                }
                WorkerEvent::GenerationFailed(err) => {
                    self.state.fail_pending();
                    self.in_flight = None;
                    self.set_status(ctx, StatusKind::Error, format!("Generation failed: {err}"));
                }
            }
        }
    }

    fn submit(&mut self, ctx: &EguiContext) {
        match self.state.begin_submit() {
            Ok(request) => self.dispatch(ctx, request, PendingRequest::Submit),
            Err(reason) => log::debug!("submit skipped: {}", reason.describe()),
        }
    }

    fn redo(&mut self, ctx: &EguiContext) {
        match self.state.begin_redo() {
            Ok(request) => self.dispatch(ctx, request, PendingRequest::Resubmit),
            Err(reason) => log::debug!("redo did not resubmit: {}", reason.describe()),
        }
    }

    fn dispatch(&mut self, ctx: &EguiContext, request: Session, kind: PendingRequest) {
        let Some(image) = request.image.as_ref() else {
            self.state.fail_pending();
            return;
        };
        let job = SubmitJob {
            kind,
            image: image.shared_pixels(),
            polygon: request.points.clone(),
            prompt: request.prompt.clone(),
            profiles: self.profiles,
        };

        let sent = self
            .worker
            .as_ref()
            .is_some_and(|worker| worker.submit(job));
        if sent {
            self.in_flight = Some(request);
        } else {
            log::error!("submit worker is not running");
            self.state.fail_pending();
            self.set_status(ctx, StatusKind::Error, "Generation service is unavailable");
        }
    }

    fn handle_shortcuts(&mut self, ctx: &EguiContext) {
        let cmd = ctx.input(|input| input.modifiers.command || input.modifiers.ctrl);
        // Text fields keep their own copy, paste and undo.
        let text_focused = ctx.memory(|memory| memory.focused().is_some());
        if !cmd || text_focused {
            return;
        }
        let shift = ctx.input(|input| input.modifiers.shift);

        if ctx.input(|input| input.key_pressed(Key::O)) {
            self.open_image(ctx);
        }

        let pasted = ctx.input(|input| {
            input.key_pressed(Key::V)
                || input
                    .events
                    .iter()
                    .any(|event| matches!(event, egui::Event::Paste(_)))
        });
        if pasted {
            self.paste_image(ctx);
        }

        let copied = ctx.input(|input| {
            input.key_pressed(Key::C)
                || input
                    .events
                    .iter()
                    .any(|event| matches!(event, egui::Event::Copy))
        });
        if copied {
            self.copy_current(ctx);
        }

        if ctx.input(|input| input.key_pressed(Key::S)) {
            if let Err(err) = self.save_to_file() {
                self.report_error(ctx, "Save failed", err);
            }
        }

        if ctx.input(|input| input.key_pressed(Key::Z)) {
            if shift {
                self.redo(ctx);
            } else {
                self.state.undo();
            }
        }
    }

    fn open_image(&mut self, ctx: &EguiContext) {
        if self.state.is_loading() {
            return;
        }
        let Some(path) = rfd::FileDialog::new()
            .set_title("Open image")
            .add_filter("Images", &["png", "jpg", "jpeg", "webp", "bmp", "gif"])
            .pick_file()
        else {
            return;
        };

        match image::open(&path).with_context(|| format!("cannot decode {}", path.display())) {
            Ok(decoded) => {
                log::info!("opened {}", path.display());
                self.state.load_image(decoded.to_rgba8());
            }
            Err(err) => self.report_error(ctx, "Open failed", err),
        }
    }

    fn paste_image(&mut self, ctx: &EguiContext) {
        if self.state.is_loading() {
            return;
        }
        match clipboard::read_image_from_clipboard() {
            Ok(Some(image)) => self.state.load_image(image),
            Ok(None) => self.set_status(ctx, StatusKind::Info, "Clipboard has no image"),
            Err(err) => self.report_error(ctx, "Paste failed", err),
        }
    }

    fn copy_current(&mut self, ctx: &EguiContext) {
        let Some(image) = self.state.current.image.as_ref() else {
            return;
        };
        let result = clipboard::write_image_to_clipboard(image.pixels());
        self.finish_copy(ctx, result);
    }

    fn copy_chat_image(&mut self, ctx: &EguiContext, index: usize) {
        let Some(image) = self.state.chat.image(index) else {
            return;
        };
        let result = clipboard::write_image_to_clipboard(image);
        self.finish_copy(ctx, result);
    }

    fn finish_copy(&mut self, ctx: &EguiContext, result: Result<()>) {
        match result {
            Ok(()) => {
                self.ui_flags.copy_feedback_until =
                    Some(ctx.input(|input| input.time) + COPY_FEEDBACK_SECS);
            }
            Err(err) => self.report_error(ctx, "Copy failed", err),
        }
    }

    fn save_to_file(&self) -> Result<()> {
        let Some(image) = self.state.current.image.as_ref() else {
            return Ok(());
        };

        let default_name = format!("PolyPrompt {}", Local::now().format("%Y-%m-%d at %H.%M.%S"));

        let file = rfd::FileDialog::new()
            .set_title("Save image")
            .set_file_name(&default_name)
            .add_filter("PNG", &["png"])
            .add_filter("JPEG", &["jpg", "jpeg"])
            .save_file();

        let Some(path) = file else {
            return Ok(());
        };

        save_image(image.pixels(), &path)?;
        log::info!("saved {}", path.display());
        Ok(())
    }

    fn show_status(&mut self, ctx: &EguiContext) {
        let now = ctx.input(|input| input.time);
        if self
            .ui_flags
            .status
            .as_ref()
            .is_some_and(|status| status.until < now)
        {
            self.ui_flags.status = None;
        }
        let Some(status) = self.ui_flags.status.as_ref() else {
            return;
        };

        let color = match status.kind {
            StatusKind::Info => self.theme.text.secondary,
            StatusKind::Error => self.theme.text.error,
        };
        TopBottomPanel::bottom("status_line")
            .frame(ui_controls::bar_frame(&self.theme))
            .show(ctx, |ui| {
                ui.label(RichText::new(&status.text).size(12.0).color(color));
            });
        ctx.request_repaint_after(Duration::from_secs_f64((status.until - now).max(0.0)));
    }
}

fn save_image(image: &RgbaImage, path: &std::path::Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|item| item.to_str())
        .unwrap_or("png")
        .to_ascii_lowercase();

    if ext == "jpg" || ext == "jpeg" {
        image::DynamicImage::ImageRgba8(image.clone())
            .to_rgb8()
            .save_with_format(path, ImageFormat::Jpeg)
            .with_context(|| format!("cannot save jpeg to {}", path.display()))
    } else {
        image
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("cannot save png to {}", path.display()))
    }
}

impl App for PolyPromptApp {
    fn update(&mut self, ctx: &EguiContext, _frame: &mut Frame) {
        self.process_worker_events(ctx);
        self.handle_shortcuts(ctx);

        let copied_feedback = self
            .ui_flags
            .copy_feedback_until
            .is_some_and(|deadline| ctx.input(|input| input.time) <= deadline);

        let toolbar_output = TopBottomPanel::top("toolbar")
            .exact_height(self.theme.layout.toolbar_height)
            .frame(ui_controls::bar_frame(&self.theme))
            .show(ctx, |ui| {
                let width_class = self.theme.width_class(ui.available_width());
                toolbar::show_toolbar(ui, &self.theme, &self.state, width_class, copied_feedback)
            })
            .inner;

        self.show_status(ctx);

        let prompt_output = if self.state.current.image.is_some() {
            TopBottomPanel::bottom("prompt_bar")
                .frame(ui_controls::bar_frame(&self.theme))
                .show(ctx, |ui| prompt_bar::show_prompt_bar(ui, &self.theme, &self.state))
                .inner
        } else {
            prompt_bar::PromptBarOutput::default()
        };

        let mut chat_action = None;
        if let Some(width) = self.theme.chat_width(ctx.screen_rect().width()) {
            let loading = self.state.is_loading();
            let theme = &self.theme;
            let chat_log = &mut self.state.chat;
            SidePanel::right("chat")
                .exact_width(width)
                .resizable(false)
                .frame(ui_controls::bar_frame(theme).fill(theme.surfaces.panel_bg))
                .show(ctx, |ui| {
                    chat_action = chat::show_chat_panel(ui, theme, chat_log, loading);
                });
        }

        egui::CentralPanel::default()
            .frame(
                egui::Frame::none()
                    .fill(self.theme.surfaces.app_bg)
                    .inner_margin(egui::Margin::symmetric(
                        self.theme.layout.panel_padding_x,
                        self.theme.layout.panel_padding_y,
                    )),
            )
            .show(ctx, |ui| {
                self.canvas.show(ui, &self.theme, &mut self.state);
            });

        if let Some(label) = prompt_output.remove_label {
            self.state.remove_point(label);
        }
        if let Some(prompt) = prompt_output.prompt {
            self.state.set_prompt(prompt);
        }
        if prompt_output.submit {
            self.submit(ctx);
        }
        if prompt_output.attach || toolbar_output.open {
            self.open_image(ctx);
        }
        if toolbar_output.paste {
            self.paste_image(ctx);
        }
        if toolbar_output.undo {
            self.state.undo();
        }
        if toolbar_output.redo {
            self.redo(ctx);
        }
        if toolbar_output.copy {
            self.copy_current(ctx);
        }
        if toolbar_output.save {
            if let Err(err) = self.save_to_file() {
                self.report_error(ctx, "Save failed", err);
            }
        }
        if let Some(ChatAction::CopyImage(index)) = chat_action {
            self.copy_chat_image(ctx, index);
        }

        if self.state.is_loading() {
            ctx.request_repaint_after(LOADING_POLL);
        }
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::save_image;

    #[test]
    fn save_picks_format_from_extension() {
        let dir = std::env::temp_dir().join(format!("polyprompt-save-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let image = RgbaImage::from_pixel(6, 4, Rgba([200, 10, 10, 255]));

        let png = dir.join("out.png");
        save_image(&image, &png).expect("png");
        assert_eq!(image::open(&png).expect("reopen").to_rgba8(), image);

        let jpeg = dir.join("out.JPG");
        save_image(&image, &jpeg).expect("jpeg");
        let bytes = std::fs::read(&jpeg).expect("read");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        std::fs::remove_dir_all(&dir).ok();
    }
}
