use crate::dimensions::Dimensions;
use crate::render;
use morphview::{Contact, Frame, SensorGeometry};
use std::collections::VecDeque;
use std::sync::mpsc;

const HISTORY_MAX: usize = 20;

pub struct ViewerApp {
    frame_rx: mpsc::Receiver<Frame>,
    dims: Dimensions,
    current: Frame,
    history: VecDeque<Vec<Contact>>,
    trails: usize,
    frames_seen: u64,
    lost: i64,
}

impl ViewerApp {
    pub fn new(frame_rx: mpsc::Receiver<Frame>, geometry: &SensorGeometry, trails: usize) -> Self {
        Self {
            frame_rx,
            dims: Dimensions::for_geometry(geometry),
            current: Frame::default(),
            history: VecDeque::with_capacity(HISTORY_MAX),
            trails: trails.min(HISTORY_MAX),
            frames_seen: 0,
            lost: 0,
        }
    }

    fn pump_history(&mut self) {
        let active = self
            .current
            .contacts
            .iter()
            .filter(|c| c.is_active())
            .copied()
            .collect();
        self.history.push_front(active);
        self.history.truncate(HISTORY_MAX);
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Drain everything the acquisition thread sent since the last repaint
        while let Ok(frame) = self.frame_rx.try_recv() {
            self.frames_seen += 1;
            self.lost += i64::from(frame.lost_frame_count.max(0));
            self.current = frame;
        }

        let screen_rect = ctx.screen_rect();
        self.dims.screen_width = screen_rect.width();
        self.dims.screen_height = screen_rect.height();

        let scale = self.dims.scale();
        let corner = self.dims.corner(scale);
        let cscale = scale.clamp(0.5, 2.0);
        let width = self.dims.surface_width * scale;
        let height = self.dims.surface_height * scale;

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(egui::Color32::WHITE))
            .show(ctx, |ui| {
                let painter = ui.painter();

                render::draw_heatmap(painter, &self.current, corner, width, height);
                render::draw_surface_boundary(painter, corner, width, height);

                for contacts in self.history.iter().take(self.trails) {
                    for contact in contacts {
                        let pos = self.dims.to_screen(contact.x, contact.y, corner, scale);
                        render::draw_trail(painter, contact, pos, cscale);
                    }
                }

                for contact in &self.current.contacts {
                    let pos = self.dims.to_screen(contact.x, contact.y, corner, scale);
                    render::draw_contact(painter, contact, pos, scale, cscale);
                }

                let status = format!(
                    "frames {}  lost {}  contacts {}  force {:.0}g",
                    self.frames_seen,
                    self.lost,
                    self.current.contacts.len(),
                    self.current.total_force()
                );
                painter.text(
                    egui::Pos2::new(self.dims.margin, self.dims.margin / 2.0),
                    egui::Align2::LEFT_TOP,
                    status,
                    egui::FontId::monospace(12.0),
                    egui::Color32::GRAY,
                );
            });

        self.pump_history();

        // Request continuous repaint for animation
        ctx.request_repaint();
    }
}
