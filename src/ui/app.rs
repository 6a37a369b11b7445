use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use chrono::{Datelike, Local, NaiveDate};
use eframe::egui::{
    self, Align, Align2, Color32, DragValue, Layout, RichText, Sense, TextEdit, TopBottomPanel, Ui,
};

use crate::alarm::scheduler::{FileAlarmService, TimeDisplayMode};
use crate::alarm::watcher::AlarmWatcher;
use crate::dispatcher::NotificationDispatcher;
use crate::handler::{Dialog, ScheduleError, ScheduleForm, SchedulingHandler};
use crate::notification::desktop::DesktopNotifier;
use crate::notification::{NotificationChannel, NotificationService};
use crate::ui::press::{ButtonVisual, PressEvent, PressTracker};

const ACCENT: Color32 = Color32::from_rgb(233, 150, 58);
const MUTED: Color32 = Color32::from_rgb(110, 110, 118);
const ALERT: Color32 = Color32::from_rgb(214, 72, 72);

pub fn run_gui(alarm_file: PathBuf, poll_interval: Duration) -> Result<()> {
    let alarms = Arc::new(Mutex::new(FileAlarmService::open(&alarm_file)?));

    let mut notifier = DesktopNotifier::new();
    notifier.create_channel(NotificationChannel::reminders());
    let watcher = AlarmWatcher::start(
        Arc::clone(&alarms),
        NotificationDispatcher::new(notifier),
        poll_interval,
    );

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Notify Yourself")
            .with_inner_size([420.0, 640.0])
            .with_min_inner_size([360.0, 560.0]),
        ..Default::default()
    };

    let app = NotifyApp::new(alarms, watcher);
    eframe::run_native(
        "Notify Yourself",
        native_options,
        Box::new(move |cc| {
            configure_theme(&cc.egui_ctx);
            Ok(Box::new(app))
        }),
    )
    .map_err(|err| anyhow!("failed to launch Notify Yourself GUI: {err}"))?;

    Ok(())
}

fn configure_theme(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::light();
    visuals.panel_fill = Color32::from_rgb(250, 246, 238);
    visuals.window_fill = Color32::from_rgb(255, 252, 246);
    visuals.widgets.inactive.bg_fill = Color32::from_rgb(240, 232, 218);
    visuals.widgets.hovered.bg_fill = Color32::from_rgb(246, 214, 168);
    visuals.widgets.active.bg_fill = ACCENT;
    visuals.selection.bg_fill = Color32::from_rgb(245, 190, 120);
    ctx.set_visuals(visuals);
}

struct NotifyApp {
    alarms: Arc<Mutex<FileAlarmService>>,
    handler: SchedulingHandler<Arc<Mutex<FileAlarmService>>>,
    form: ScheduleForm,
    press: PressTracker,
    dialog: Option<Dialog>,
    settings_open: bool,
    status_message: Option<(String, Instant)>,
    _watcher: AlarmWatcher,
}

impl NotifyApp {
    fn new(alarms: Arc<Mutex<FileAlarmService>>, watcher: AlarmWatcher) -> Self {
        let now = Local::now();
        Self {
            handler: SchedulingHandler::new(Arc::clone(&alarms)),
            alarms,
            form: ScheduleForm::starting_at(now),
            press: PressTracker::default(),
            dialog: None,
            settings_open: false,
            status_message: None,
            _watcher: watcher,
        }
    }

    fn set_status(&mut self, text: impl Into<String>, ttl: Duration) {
        self.status_message = Some((text.into(), Instant::now() + ttl));
    }

    fn display_mode(&self) -> TimeDisplayMode {
        self.alarms
            .lock()
            .map(|alarms| TimeDisplayMode::from_settings(alarms.settings()))
            .unwrap_or(TimeDisplayMode::Hour24)
    }

    fn exact_alarms_granted(&self) -> bool {
        self.alarms
            .lock()
            .map(|alarms| alarms.settings().exact_alarm_granted)
            .unwrap_or(false)
    }

    fn on_press_down(&mut self) {
        // Another process may have changed the grant since the last press.
        if let Ok(mut alarms) = self.alarms.lock()
            && let Err(err) = alarms.reload()
        {
            log::warn!("could not reload alarm store: {err:#}");
        }

        match self.handler.schedule(&self.form) {
            Ok(request) => {
                self.dialog = Some(request.confirmation(self.display_mode()));
            }
            Err(ScheduleError::PermissionDenied) => {
                self.settings_open = true;
            }
            Err(err) => match err.dialog() {
                Some(dialog) => self.dialog = Some(dialog),
                None => {
                    log::error!("scheduling failed: {err}");
                    self.set_status(format!("Scheduling failed: {err}"), Duration::from_secs(4));
                }
            },
        }
    }

    fn show_form(&mut self, ui: &mut Ui) {
        ui.add_space(12.0);
        ui.label(RichText::new("Title").strong());
        ui.add(
            TextEdit::singleline(&mut self.form.title)
                .hint_text("What should the notification say?")
                .desired_width(f32::INFINITY),
        );
        ui.add_space(8.0);
        ui.label(RichText::new("Message").strong());
        ui.add(
            TextEdit::multiline(&mut self.form.message)
                .hint_text("Details")
                .desired_rows(3)
                .desired_width(f32::INFINITY),
        );

        ui.add_space(12.0);
        ui.label(RichText::new("Date").strong());
        let this_year = Local::now().year();
        ui.horizontal(|ui| {
            ui.add(
                DragValue::new(&mut self.form.year)
                    .range(this_year..=this_year + 10)
                    .prefix("year "),
            );
            ui.add(DragValue::new(&mut self.form.month).range(1..=12).prefix("month "));
            let last_day = days_in_month(self.form.year, self.form.month);
            self.form.day = self.form.day.clamp(1, last_day);
            ui.add(DragValue::new(&mut self.form.day).range(1..=last_day).prefix("day "));
        });

        ui.add_space(8.0);
        ui.label(RichText::new("Time").strong());
        ui.horizontal(|ui| {
            ui.add(
                DragValue::new(&mut self.form.hour)
                    .range(0..=23)
                    .custom_formatter(|value, _| format!("{value:02}")),
            );
            ui.label(":");
            ui.add(
                DragValue::new(&mut self.form.minute)
                    .range(0..=59)
                    .custom_formatter(|value, _| format!("{value:02}")),
            );
        });
    }

    fn show_schedule_button(&mut self, ui: &mut Ui) {
        let visual = self.press.visual();
        let [r, g, b] = visual.text_rgb();
        let fill = match visual {
            ButtonVisual::Idle => Color32::from_rgb(246, 214, 168),
            ButtonVisual::Pressed => ACCENT,
        };

        ui.add_space(20.0);
        let response = ui.add(
            egui::Button::new(
                RichText::new(format!("{}  Notify me", visual.glyph()))
                    .size(22.0)
                    .color(Color32::from_rgb(r, g, b))
                    .strong(),
            )
            .fill(fill)
            .min_size(egui::vec2(ui.available_width(), 64.0))
            .sense(Sense::click_and_drag()),
        );

        // A dialog on screen swallows presses, like a blocking alert would.
        let held = response.is_pointer_button_down_on() && self.dialog.is_none();
        match self.press.update(held) {
            Some(PressEvent::Down) => self.on_press_down(),
            Some(PressEvent::Up) | None => {}
        }
    }

    fn show_dialog(&mut self, ctx: &egui::Context) {
        let Some(dialog) = &self.dialog else {
            return;
        };
        let heading = dialog.heading();
        let body = dialog.body();
        let heading_color = match dialog {
            Dialog::Validation(_) => ALERT,
            _ => ACCENT,
        };

        let mut dismissed = false;
        egui::Window::new(RichText::new(heading).color(heading_color).strong())
            .id(egui::Id::new("blocking_dialog"))
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(body);
                ui.add_space(8.0);
                ui.with_layout(Layout::right_to_left(Align::Min), |ui| {
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            });
        if dismissed {
            self.dialog = None;
        }
    }

    fn show_exact_alarm_settings(&mut self, ctx: &egui::Context) {
        if !self.settings_open {
            return;
        }

        let mut granted = self.exact_alarms_granted();
        let mut toggled = false;
        let mut close = false;
        egui::Window::new("Alarms & reminders")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(RichText::new(Dialog::PermissionRequired.body()).color(MUTED));
                ui.add_space(8.0);
                toggled = ui
                    .checkbox(&mut granted, "Allow setting alarms and reminders")
                    .changed();
                ui.add_space(8.0);
                ui.with_layout(Layout::right_to_left(Align::Min), |ui| {
                    if ui.button("Done").clicked() {
                        close = true;
                    }
                });
            });

        if toggled {
            let result = self
                .alarms
                .lock()
                .map_err(|_| anyhow!("failed to lock alarm service"))
                .and_then(|mut alarms| alarms.set_exact_alarm_grant(granted));
            match result {
                Ok(()) => log::info!("exact alarm permission set to {granted}"),
                Err(err) => {
                    log::error!("could not store exact alarm permission: {err:#}");
                    self.set_status(format!("Settings not saved: {err}"), Duration::from_secs(4));
                }
            }
        }
        if close {
            self.settings_open = false;
        }
    }
}

impl eframe::App for NotifyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some((_, expires_at)) = &self.status_message
            && Instant::now() >= *expires_at
        {
            self.status_message = None;
        }

        TopBottomPanel::top("header")
            .resizable(false)
            .show(ctx, |ui| {
                ui.add_space(6.0);
                ui.label(
                    RichText::new("Notify Yourself")
                        .size(24.0)
                        .color(ACCENT)
                        .strong(),
                );
                ui.add_space(6.0);
            });

        TopBottomPanel::bottom("footer")
            .resizable(false)
            .show(ctx, |ui| {
                if let Some((msg, _)) = &self.status_message {
                    ui.label(RichText::new(msg).color(ALERT).strong());
                }
                ui.label(
                    RichText::new("Reminders fire while this window or `--watch` is running.")
                        .color(MUTED),
                );
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_form(ui);
            self.show_schedule_button(ui);
        });

        self.show_dialog(ctx);
        self.show_exact_alarm_settings(ctx);

        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}
