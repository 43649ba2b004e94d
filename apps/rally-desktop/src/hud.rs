use egui::{Align2, Context, RichText};
use rally_scene::{HELP_LINES, HudState};

pub fn draw(ctx: &Context, hud: &HudState, fps: f64) {
    egui::Area::new(egui::Id::new("hud_info"))
        .anchor(Align2::LEFT_TOP, egui::vec2(12.0, 12.0))
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                for line in hud.info_lines() {
                    ui.label(line);
                }
                ui.separator();
                ui.small(format!(
                    "{:.0} fps | {}",
                    fps,
                    if hud.first_person {
                        "first person"
                    } else {
                        "third person"
                    }
                ));
            });
        });

    if hud.help_visible {
        egui::Area::new(egui::Id::new("hud_help"))
            .anchor(Align2::RIGHT_TOP, egui::vec2(-12.0, 12.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.strong("Controls");
                    for line in HELP_LINES {
                        ui.label(*line);
                    }
                });
            });
    }

    if let Some(message) = hud.win_message() {
        egui::Area::new(egui::Id::new("hud_win"))
            .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        for (i, line) in message.lines().enumerate() {
                            let text = RichText::new(line);
                            ui.label(if i == 0 {
                                text.size(40.0).strong()
                            } else {
                                text.size(20.0)
                            });
                        }
                    });
                });
            });
    }
}
