use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use confession_core::{
    Action, ApiClient, AppConfig, AuthEvent, BulkAction, Confession, DetailOverlay, Enrichment,
    FeedEvent, FeedViewModel, ImageAttachment, LoadState, ModerationFilters, ModerationViewModel,
    OverlayContext, PageButton, SourceFilter, SourceType, StatusFilter, SubmissionDraft,
};
use eframe::egui::{self, Color32, RichText};
use tokio::runtime::Runtime;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

const ACCENT: Color32 = Color32::from_rgb(255, 105, 180);
const ERROR: Color32 = Color32::from_rgb(229, 57, 53);
const SUCCESS: Color32 = Color32::from_rgb(76, 175, 80);

pub struct AppInit {
    pub runtime: Arc<Runtime>,
    pub config: AppConfig,
    pub client: ApiClient,
    pub auth_events: broadcast::Receiver<AuthEvent>,
    pub overlay_ctx: OverlayContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppView {
    Feed,
    AdminLogin,
    AdminDashboard,
}

#[derive(Debug, Clone)]
enum Confirm {
    Delete(Confession),
    Reject(Confession),
    Bulk(BulkAction, usize),
    Logout,
}

pub struct ConfessionApp {
    runtime: Arc<Runtime>,
    config: AppConfig,
    client: ApiClient,
    auth_events: broadcast::Receiver<AuthEvent>,
    current_view: AppView,
    // Feed
    feed: FeedViewModel,
    feed_tx: mpsc::Sender<FeedEvent>,
    feed_rx: mpsc::Receiver<FeedEvent>,
    search_input: String,
    overlay_ctx: OverlayContext,
    overlay: Option<DetailOverlay>,
    // Submission form
    show_form: bool,
    draft: SubmissionDraft,
    image_path: String,
    form_feedback: Option<(bool, String)>,
    // Admin
    login_username: String,
    login_password: String,
    login_error: Option<String>,
    moderation: ModerationViewModel,
    moderation_feedback: Option<(bool, String)>,
    confirm: Option<Confirm>,
}

impl ConfessionApp {
    pub fn new(init: AppInit) -> Self {
        let (feed_tx, feed_rx) = mpsc::channel(8);
        let mut app = Self {
            runtime: init.runtime,
            feed: FeedViewModel::new(init.config.feed.page_size),
            moderation: ModerationViewModel::new(init.config.moderation.page_size),
            config: init.config,
            client: init.client,
            auth_events: init.auth_events,
            current_view: AppView::Feed,
            feed_tx,
            feed_rx,
            search_input: String::new(),
            overlay_ctx: init.overlay_ctx,
            overlay: None,
            show_form: false,
            draft: SubmissionDraft::default(),
            image_path: String::new(),
            form_feedback: None,
            login_username: String::new(),
            login_password: String::new(),
            login_error: None,
            moderation_feedback: None,
            confirm: None,
        };
        app.start_feed_load();
        app
    }

    fn start_feed_load(&mut self) {
        let _guard = self.runtime.enter();
        self.feed.start_load(
            self.client.clone(),
            self.config.feed.clone(),
            self.feed_tx.clone(),
        );
    }

    fn refresh_updates(&mut self) {
        while let Ok(event) = self.feed_rx.try_recv() {
            self.feed.apply(event);
        }
        while let Ok(event) = self.auth_events.try_recv() {
            match event {
                AuthEvent::LoginRequired => {
                    info!("redirecting to admin login");
                    self.login_error = Some("Your session has expired. Please log in again.".into());
                    self.current_view = AppView::AdminLogin;
                }
            }
        }
    }

    fn open_admin(&mut self) {
        let authenticated = self.runtime.block_on(self.client.session().is_authenticated());
        if authenticated {
            self.current_view = AppView::AdminDashboard;
            self.reload_moderation(self.moderation.filters());
        } else {
            self.current_view = AppView::AdminLogin;
        }
    }

    fn reload_moderation(&mut self, filters: ModerationFilters) {
        let result = self
            .runtime
            .block_on(self.moderation.refresh(&self.client, filters));
        if let Err(err) = result {
            warn!(error = %err, "moderation refresh failed");
        }
    }

    fn open_overlay(&mut self, confession: Confession) {
        let _guard = self.runtime.enter();
        // Replacing drops the previous overlay and its timers.
        self.overlay = Some(DetailOverlay::open(confession, &self.overlay_ctx));
    }

    fn draw_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(RichText::new("Confession Board").color(ACCENT).strong());
                ui.separator();
                if ui
                    .selectable_label(self.current_view == AppView::Feed, "Feed")
                    .clicked()
                {
                    self.current_view = AppView::Feed;
                }
                if ui
                    .selectable_label(self.current_view != AppView::Feed, "Admin")
                    .clicked()
                {
                    self.open_admin();
                }
                if self.current_view == AppView::Feed {
                    ui.separator();
                    let search = ui.add(
                        egui::TextEdit::singleline(&mut self.search_input)
                            .hint_text("Search by ES id or content...")
                            .desired_width(280.0),
                    );
                    if search.changed() {
                        self.feed.set_query(self.search_input.clone());
                    }
                    if !self.search_input.is_empty() && ui.small_button("✕").clicked() {
                        self.search_input.clear();
                        self.feed.set_query("");
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("✍ Confess").clicked() {
                            self.show_form = true;
                            self.form_feedback = None;
                        }
                    });
                }
            });
        });
    }

    fn draw_feed(&mut self, ui: &mut egui::Ui) {
        match self.feed.state().clone() {
            LoadState::Idle | LoadState::Loading if self.feed.all().is_empty() => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading confessions...");
                });
                return;
            }
            LoadState::Failed(message) => {
                ui.colored_label(ERROR, message);
                if ui.button("Retry").clicked() {
                    self.start_feed_load();
                }
                if self.feed.all().is_empty() {
                    return;
                }
            }
            _ => {}
        }

        let filtered = self.feed.filtered().len();
        if self.feed.all().is_empty() {
            ui.label(RichText::new("No confessions yet. Be the first!").weak());
            return;
        }
        if filtered == 0 {
            ui.label(RichText::new(format!("Nothing matches \"{}\".", self.feed.query())).weak());
            if ui.button("Clear search").clicked() {
                self.search_input.clear();
                self.feed.set_query("");
            }
            return;
        }
        if !self.feed.query().trim().is_empty() {
            ui.label(RichText::new(format!("{filtered} results")).weak());
        }

        let visible: Vec<Confession> = self.feed.visible().into_iter().cloned().collect();
        let mut clicked = None;
        egui::ScrollArea::vertical()
            .enable_scrolling(!self.overlay_ctx.scroll.is_locked())
            .auto_shrink([false, false])
            .max_height(ui.available_height() - 40.0)
            .show(ui, |ui| {
                for confession in &visible {
                    if draw_card(ui, confession) {
                        clicked = Some(confession.clone());
                    }
                    ui.add_space(6.0);
                }
            });
        if let Some(confession) = clicked {
            self.open_overlay(confession);
        }

        self.draw_pagination(ui);
    }

    fn draw_pagination(&mut self, ui: &mut egui::Ui) {
        let buttons = self.feed.page_buttons();
        if buttons.is_empty() {
            return;
        }
        let current = self.feed.page();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(self.feed.has_prev(), egui::Button::new("← Prev"))
                .clicked()
            {
                self.feed.set_page(current - 1);
            }
            for button in buttons {
                match button {
                    PageButton::Page(n) => {
                        if ui.selectable_label(n == current, n.to_string()).clicked() {
                            self.feed.set_page(n);
                        }
                    }
                    PageButton::Ellipsis => {
                        ui.label("…");
                    }
                }
            }
            if ui
                .add_enabled(self.feed.has_next(), egui::Button::new("Next →"))
                .clicked()
            {
                self.feed.set_page(current + 1);
            }
        });
    }

    fn draw_overlay(&mut self, ctx: &egui::Context) {
        let Some(overlay) = self.overlay.as_mut() else {
            return;
        };
        let mut open = true;
        let app_id = self.config.embed.app_id.clone();
        let confession = overlay.confession().clone();
        egui::Window::new(confession.display_id())
            .id(egui::Id::new("confession_overlay"))
            .collapsible(false)
            .resizable(true)
            .default_width(560.0)
            .open(&mut open)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(format_time(&confession)).weak());
                    ui.separator();
                    ui.label(format!("♥ {} reactions", confession.reactions()));
                    ui.label(format!("💬 {} comments", confession.comments()));
                });
                ui.separator();

                if let Some(url) = overlay.current_image().map(str::to_owned) {
                    let carousel = *overlay.carousel();
                    ui.horizontal(|ui| {
                        if carousel.has_controls() && ui.button("◀").clicked() {
                            overlay.prev_image();
                        }
                        ui.hyperlink_to(
                            format!("🖼 Image {}/{}", carousel.index() + 1, carousel.len()),
                            url,
                        );
                        if carousel.has_controls() && ui.button("▶").clicked() {
                            overlay.next_image();
                        }
                    });
                }

                egui::ScrollArea::vertical().max_height(300.0).show(ui, |ui| {
                    ui.label(RichText::new(&confession.content).size(15.0));
                });
                ui.separator();

                let Some(permalink) = confession.permalink() else {
                    ui.label(RichText::new("This confession has not been posted publicly yet.").weak());
                    return;
                };
                if ui.button("View on Facebook").clicked() {
                    open_link(&permalink);
                }
                match overlay.enrichment() {
                    Enrichment::Loading => {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Loading comments...");
                        });
                    }
                    Enrichment::Embedded => {
                        ui.label("Log in to Facebook to comment and react here.");
                    }
                    Enrichment::Fallback => {
                        ui.label(
                            RichText::new("Comments plugin unavailable. Open the post preview instead:")
                                .weak(),
                        );
                        if let Some(preview) = confession.embed_fallback_url(&app_id) {
                            if ui.button("Open post preview").clicked() {
                                open_link(&preview);
                            }
                        }
                    }
                }
            });
        if !open {
            self.overlay = None;
        }
    }

    fn draw_form(&mut self, ctx: &egui::Context) {
        if !self.show_form {
            return;
        }
        let mut open = true;
        let mut submit = false;
        egui::Window::new("New confession")
            .collapsible(false)
            .open(&mut open)
            .show(ctx, |ui| {
                if let Some((ok, message)) = &self.form_feedback {
                    ui.colored_label(if *ok { SUCCESS } else { ERROR }, message);
                }
                ui.add(
                    egui::TextEdit::multiline(&mut self.draft.content)
                        .hint_text("Share what's on your mind...")
                        .desired_rows(8)
                        .desired_width(f32::INFINITY),
                );
                ui.label(
                    RichText::new(format!(
                        "{}/{}",
                        self.draft.char_count(),
                        confession_core::validation::MAX_CONTENT_CHARS
                    ))
                    .weak(),
                );

                let mut remove = None;
                for (index, image) in self.draft.images().iter().enumerate() {
                    ui.horizontal(|ui| {
                        ui.label(format!("🖼 {}", image.file_name));
                        if ui.small_button("🗑").clicked() {
                            remove = Some(index);
                        }
                    });
                }
                if let Some(index) = remove {
                    self.draft.remove_image(index);
                }

                if self.draft.can_add_images() {
                    ui.horizontal(|ui| {
                        ui.add(
                            egui::TextEdit::singleline(&mut self.image_path)
                                .hint_text("Path to an image file"),
                        );
                        if ui.button("Add image").clicked() {
                            self.form_feedback = self
                                .add_image_from_path()
                                .err()
                                .map(|message| (false, message));
                        }
                    });
                }

                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(
                            !self.draft.content.trim().is_empty(),
                            egui::Button::new("Send"),
                        )
                        .clicked()
                    {
                        submit = true;
                    }
                    if ui.button("Cancel").clicked() {
                        self.show_form = false;
                    }
                });
            });
        if !open {
            self.show_form = false;
        }
        if submit {
            self.submit_draft();
        }
    }

    fn add_image_from_path(&mut self) -> Result<(), String> {
        let raw = self.image_path.trim().to_string();
        let path = Path::new(&raw);
        let data = std::fs::read(path).map_err(|e| format!("Unable to read {raw}: {e}"))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| raw.clone());
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        self.draft
            .add_images(vec![ImageAttachment::new(file_name, mime, data)])
            .map_err(|e| e.to_string())?;
        self.image_path.clear();
        Ok(())
    }

    fn submit_draft(&mut self) {
        let result = self.runtime.block_on(
            self.client
                .submit_confession(&self.draft.content, self.draft.images()),
        );
        match result {
            Ok(_) => {
                self.draft.clear();
                self.show_form = false;
                self.form_feedback = None;
                info!("confession sent for review");
            }
            Err(err) => {
                self.form_feedback = Some((false, err.user_message()));
            }
        }
    }

    fn draw_login(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.heading("Admin login");
            if let Some(message) = &self.login_error {
                ui.colored_label(ERROR, message);
            }
            ui.add(egui::TextEdit::singleline(&mut self.login_username).hint_text("Username"));
            ui.add(
                egui::TextEdit::singleline(&mut self.login_password)
                    .password(true)
                    .hint_text("Password"),
            );
            if ui.button("Log in").clicked() {
                let result = self
                    .runtime
                    .block_on(self.client.login(&self.login_username, &self.login_password));
                match result {
                    Ok(_) => {
                        self.login_password.clear();
                        self.login_error = None;
                        self.current_view = AppView::AdminDashboard;
                        self.reload_moderation(self.moderation.filters());
                    }
                    Err(err) => self.login_error = Some(err.user_message()),
                }
            }
            if ui.link("← Back to the feed").clicked() {
                self.current_view = AppView::Feed;
            }
        });
    }

    fn draw_dashboard(&mut self, ui: &mut egui::Ui) {
        let filters = self.moderation.filters();
        let stats = self.moderation.stats().copied().unwrap_or_default();

        ui.horizontal(|ui| {
            ui.heading("Moderation");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Log out").clicked() {
                    self.confirm = Some(Confirm::Logout);
                }
            });
        });

        let mut next = filters;
        ui.horizontal(|ui| {
            for (source, label) in [
                (SourceFilter::All, format!("All ({})", stats.total)),
                (SourceFilter::Website, format!("Website ({})", stats.website)),
                (
                    SourceFilter::GoogleSheets,
                    format!("Google Sheets ({})", stats.google_sheets),
                ),
            ] {
                if ui.selectable_label(filters.source == source, label).clicked() {
                    next.source = source;
                }
            }
            ui.separator();
            for status in [
                StatusFilter::Pending,
                StatusFilter::Approved,
                StatusFilter::Rejected,
                StatusFilter::All,
            ] {
                if ui
                    .selectable_label(filters.status == status, status.as_str())
                    .clicked()
                {
                    next.status = status;
                }
            }
        });
        if next != filters {
            self.reload_moderation(next);
        }

        ui.horizontal(|ui| {
            let busy = self.moderation.is_busy();
            let approvable = self.moderation.bulk_targets(BulkAction::ApproveAll);
            if filters.status == StatusFilter::Pending
                && approvable > 0
                && ui
                    .add_enabled(!busy, egui::Button::new(format!("Approve all ({approvable})")))
                    .clicked()
            {
                self.confirm = Some(Confirm::Bulk(BulkAction::ApproveAll, approvable));
            }
            let deletable = self.moderation.bulk_targets(BulkAction::DeleteAll);
            if filters.status != StatusFilter::Pending
                && deletable > 0
                && ui
                    .add_enabled(!busy, egui::Button::new(format!("Delete all ({deletable})")))
                    .clicked()
            {
                self.confirm = Some(Confirm::Bulk(BulkAction::DeleteAll, deletable));
            }
        });

        if let Some((ok, message)) = &self.moderation_feedback {
            ui.colored_label(if *ok { SUCCESS } else { ERROR }, message);
        }
        if let Some(message) = self.moderation.error() {
            ui.colored_label(ERROR, message);
        }

        let rows: Vec<Confession> = self.moderation.confessions().to_vec();
        if rows.is_empty() && !self.moderation.is_loading() {
            ui.label(RichText::new("Nothing to review.").weak());
            return;
        }

        let mut action = None;
        let mut load_more = false;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for confession in &rows {
                    let enabled = !self.moderation.is_processing(&confession.id);
                    egui::Frame::group(ui.style()).show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.label(RichText::new(source_label(confession.source_type)).strong());
                            if let Some(status) = confession.status {
                                ui.label(RichText::new(status.as_str()).weak());
                            }
                            ui.label(RichText::new(format_time(confession)).weak());
                        });
                        ui.label(&confession.content);
                        for (index, url) in confession.image_urls().into_iter().enumerate() {
                            ui.hyperlink_to(format!("🖼 Image {}", index + 1), url);
                        }
                        if let Some(link) = confession.attachment_link() {
                            ui.hyperlink_to("🔗 Attachment", link);
                        }
                        ui.horizontal(|ui| {
                            ui.add_enabled_ui(enabled, |ui| {
                                for offered in Action::available_for(confession) {
                                    let (label, confirm) = match offered {
                                        Action::Approve => ("✔ Approve", None),
                                        Action::Reject => {
                                            ("✖ Reject", Some(Confirm::Reject(confession.clone())))
                                        }
                                        Action::Delete => {
                                            ("🗑 Delete", Some(Confirm::Delete(confession.clone())))
                                        }
                                    };
                                    if ui.button(label).clicked() {
                                        action = Some((confession.clone(), confirm));
                                    }
                                }
                            });
                        });
                    });
                    ui.add_space(4.0);
                }
                if self.moderation.has_more()
                    && ui
                        .add_enabled(!self.moderation.is_loading(), egui::Button::new("Load more"))
                        .clicked()
                {
                    load_more = true;
                }
            });

        match action {
            Some((_, Some(confirm))) => self.confirm = Some(confirm),
            Some((confession, None)) => {
                let result = self
                    .runtime
                    .block_on(self.moderation.approve(&self.client, &confession));
                self.report(result.map(|_| "Confession approved.".to_string()));
            }
            None => {}
        }
        if load_more {
            let result = self.runtime.block_on(self.moderation.load_more(&self.client));
            if let Err(err) = result {
                warn!(error = %err, "load more failed");
            }
        }
    }

    fn draw_confirm(&mut self, ctx: &egui::Context) {
        let Some(confirm) = self.confirm.clone() else {
            return;
        };
        let prompt = match &confirm {
            Confirm::Delete(c) => format!("Permanently delete this confession?\n\n\"{}\"", preview(&c.content)),
            Confirm::Reject(c) => format!("Reject this confession?\n\n\"{}\"", preview(&c.content)),
            Confirm::Bulk(BulkAction::ApproveAll, n) => {
                format!("Approve all {n} confessions ({})?", self.moderation.filters().source.as_str())
            }
            Confirm::Bulk(BulkAction::DeleteAll, n) => format!(
                "Delete all {n} {} confessions ({})? This cannot be undone.",
                self.moderation.filters().status.as_str(),
                self.moderation.filters().source.as_str()
            ),
            Confirm::Logout => "Log out of the admin panel?".to_string(),
        };

        let mut decision = None;
        egui::Window::new("Confirm")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(prompt);
                ui.horizontal(|ui| {
                    if ui.button("Yes").clicked() {
                        decision = Some(true);
                    }
                    if ui.button("Cancel").clicked() {
                        decision = Some(false);
                    }
                });
            });

        match decision {
            Some(true) => {
                self.confirm = None;
                self.execute(confirm);
            }
            Some(false) => self.confirm = None,
            None => {}
        }
    }

    fn execute(&mut self, confirm: Confirm) {
        match confirm {
            Confirm::Delete(confession) => {
                let result = self
                    .runtime
                    .block_on(self.moderation.delete(&self.client, &confession));
                self.report(result.map(|_| "Confession deleted.".to_string()));
            }
            Confirm::Reject(confession) => {
                let result = self
                    .runtime
                    .block_on(self.moderation.reject(&self.client, &confession));
                self.report(result.map(|_| "Confession rejected.".to_string()));
            }
            Confirm::Bulk(action, _) => {
                let result = self
                    .runtime
                    .block_on(self.moderation.bulk(&self.client, action));
                self.report(result.map(|outcome| {
                    format!(
                        "Done: {} succeeded, {} failed.",
                        outcome.success_count, outcome.fail_count
                    )
                }));
            }
            Confirm::Logout => {
                self.runtime.block_on(self.client.logout());
                self.current_view = AppView::AdminLogin;
            }
        }
    }

    fn report(&mut self, result: Result<String, confession_core::ApiError>) {
        self.moderation_feedback = match result {
            Ok(message) => Some((true, message)),
            Err(err) if err.is_auth() => None,
            Err(err) => Some((false, err.user_message())),
        };
    }
}

/// Draws one feed card; returns true when it was clicked.
fn draw_card(ui: &mut egui::Ui, confession: &Confession) -> bool {
    let mut clicked = false;
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal(|ui| {
            ui.label(RichText::new(confession.display_id()).color(ACCENT).strong());
            ui.label(RichText::new(format_time(confession)).weak().size(12.0));
        });
        let body = ui.add(
            egui::Label::new(RichText::new(preview(&confession.content)).size(14.0))
                .sense(egui::Sense::click()),
        );
        clicked |= body.clicked();
        ui.horizontal(|ui| {
            let images = confession.image_urls().len();
            if images > 0 {
                ui.label(RichText::new(format!("🖼 {images}")).weak());
            }
            if let Some(url) = confession.post_url() {
                if ui.small_button("Facebook").clicked() {
                    open_link(&url);
                }
            }
            if ui.small_button("Read more").clicked() {
                clicked = true;
            }
        });
    });
    clicked
}

fn open_link(url: &str) {
    if let Err(e) = webbrowser::open(url) {
        warn!(url, error = %e, "failed to open browser");
    }
}

fn preview(content: &str) -> String {
    const MAX: usize = 280;
    if content.chars().count() > MAX {
        let cut: String = content.chars().take(MAX).collect();
        format!("{cut}…")
    } else {
        content.to_string()
    }
}

fn format_time(confession: &Confession) -> String {
    confession
        .created_at()
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%d/%m/%Y %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "Unknown date".to_string())
}

fn source_label(source: Option<SourceType>) -> &'static str {
    match source {
        Some(SourceType::Website) => "🌐 Website",
        Some(SourceType::GoogleSheets) => "📊 Google Sheets",
        None => "❔ Unknown",
    }
}

impl eframe::App for ConfessionApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.refresh_updates();
        self.draw_top_bar(ctx);

        let view = self.current_view;
        egui::CentralPanel::default().show(ctx, |ui| match view {
            AppView::Feed => self.draw_feed(ui),
            AppView::AdminLogin => self.draw_login(ui),
            AppView::AdminDashboard => self.draw_dashboard(ui),
        });

        if self.current_view == AppView::Feed {
            self.draw_overlay(ctx);
            self.draw_form(ctx);
        }
        self.draw_confirm(ctx);

        let settling = self
            .overlay
            .as_ref()
            .is_some_and(|overlay| !overlay.phase().is_settled());
        if self.feed.is_loading() || settling {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
