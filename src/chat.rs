//! Conversation history: one entry per request sent and per image received.

use egui::{Align, ColorImage, Layout, RichText, ScrollArea, TextureHandle, TextureOptions, Ui};
use image::RgbaImage;

use crate::theme::AppTheme;
use crate::ui_controls;

const THUMBNAIL_MAX_HEIGHT: f32 = 256.0;

pub enum ChatEntry {
    /// `image` is the decoded preview composite; it may be missing when the
    /// preview could not be decoded.
    UserRequest {
        prompt: String,
        image: Option<RgbaImage>,
    },
    AiResponse {
        image: RgbaImage,
    },
}

impl ChatEntry {
    pub fn image(&self) -> Option<&RgbaImage> {
        match self {
            ChatEntry::UserRequest { image, .. } => image.as_ref(),
            ChatEntry::AiResponse { image } => Some(image),
        }
    }
}

struct ChatItem {
    entry: ChatEntry,
    texture: Option<TextureHandle>,
}

#[derive(Default)]
pub struct ChatLog {
    items: Vec<ChatItem>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    CopyImage(usize),
}

impl ChatLog {
    pub fn push_request(&mut self, prompt: String, preview: Option<RgbaImage>) {
        self.push(ChatEntry::UserRequest {
            prompt,
            image: preview,
        });
    }

    pub fn push_response(&mut self, image: RgbaImage) {
        self.push(ChatEntry::AiResponse { image });
    }

    fn push(&mut self, entry: ChatEntry) {
        self.items.push(ChatItem {
            entry,
            texture: None,
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn image(&self, index: usize) -> Option<&RgbaImage> {
        self.items.get(index).and_then(|item| item.entry.image())
    }
}

impl ChatItem {
    fn ensure_texture(&mut self, ctx: &egui::Context, index: usize) -> Option<&TextureHandle> {
        if self.texture.is_none() {
            let rgba = self.entry.image()?;
            let size = [rgba.width() as usize, rgba.height() as usize];
            let color = ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
            self.texture = Some(ctx.load_texture(
                format!("chat-{index}"),
                color,
                TextureOptions::LINEAR,
            ));
        }
        self.texture.as_ref()
    }
}

pub fn show_chat_panel(
    ui: &mut Ui,
    theme: &AppTheme,
    chat: &mut ChatLog,
    loading: bool,
) -> Option<ChatAction> {
    let mut action = None;

    let title = if chat.is_empty() {
        "History".to_string()
    } else {
        format!("History ({})", chat.len())
    };
    ui.label(
        RichText::new(title)
            .strong()
            .color(theme.text.secondary),
    );
    ui.add_space(theme.layout.space_2);

    if chat.is_empty() {
        ui.label(
            RichText::new("Outline a region on the image and describe the change.")
                .color(theme.text.muted),
        );
        return None;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            let ctx = ui.ctx().clone();
            let max_width = ui.available_width();
            for (index, item) in chat.items.iter_mut().enumerate() {
                let request_prompt = match &item.entry {
                    ChatEntry::UserRequest { prompt, .. } => Some(prompt.clone()),
                    ChatEntry::AiResponse { .. } => None,
                };
                match request_prompt {
                    Some(prompt) => {
                        ui.with_layout(Layout::top_down(Align::Max), |ui| {
                            ui_controls::accent_card_frame(theme).show(ui, |ui| {
                                ui.label(RichText::new(prompt).color(theme.text.primary));
                            });
                            if let Some(texture) = item.ensure_texture(&ctx, index) {
                                thumbnail(ui, texture, max_width);
                            }
                        });
                    }
                    None => {
                        ui.with_layout(Layout::top_down(Align::Min), |ui| {
                            if let Some(texture) = item.ensure_texture(&ctx, index) {
                                thumbnail(ui, texture, max_width);
                            }
                            let copy = ui.add_enabled(
                                !loading,
                                egui::Button::new(
                                    RichText::new("Copy").size(12.0).color(theme.text.secondary),
                                )
                                .frame(false),
                            );
                            if copy.clicked() {
                                action = Some(ChatAction::CopyImage(index));
                            }
                        });
                    }
                }
                ui.add_space(theme.layout.space_3);
            }
        });

    action
}

fn thumbnail(ui: &mut Ui, texture: &TextureHandle, max_width: f32) {
    let size = texture.size_vec2();
    if size.x <= 0.0 || size.y <= 0.0 {
        return;
    }
    let scale = (max_width / size.x).min(THUMBNAIL_MAX_HEIGHT / size.y).min(1.0);
    ui.add(egui::Image::new((texture.id(), size * scale)).rounding(4.0));
    ui.add_space(2.0);
}
