use egui::{Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, StrokeKind, Vec2};
use morphview::{Contact, Frame};

pub const MAGENTA: Color32 = Color32::from_rgb(255, 0, 182);
pub const TEAL: Color32 = Color32::from_rgb(0, 213, 255);
pub const ORANGE: Color32 = Color32::from_rgb(255, 101, 0);

/// Force in grams per cell drawn at full intensity, at least.
const HEATMAP_FLOOR: f32 = 4.0;
const ELLIPSE_SEGMENTS: usize = 32;

fn fade(color: Color32, alpha: f32) -> Color32 {
    Color32::from_rgba_unmultiplied(
        color.r(),
        color.g(),
        color.b(),
        (255.0 * alpha.clamp(0.0, 1.0)) as u8,
    )
}

fn contact_color(id: u8) -> Color32 {
    if id == 0 {
        MAGENTA
    } else {
        TEAL
    }
}

pub fn draw_surface_boundary(painter: &Painter, corner: Pos2, width: f32, height: f32) {
    painter.rect_stroke(
        Rect::from_min_size(corner, Vec2::new(width, height)),
        0.0,
        Stroke::new(1.0, ORANGE),
        StrokeKind::Outside,
    );
}

/// Paint the force map, one rectangle per loaded cell, scaled against the
/// frame's peak.
pub fn draw_heatmap(painter: &Painter, frame: &Frame, corner: Pos2, width: f32, height: f32) {
    if frame.force.is_empty() || frame.rows == 0 || frame.cols == 0 {
        return;
    }
    let peak = frame
        .force
        .iter()
        .copied()
        .fold(HEATMAP_FLOOR, f32::max);
    let cell = Vec2::new(width / frame.cols as f32, height / frame.rows as f32);

    for row in 0..frame.rows {
        for col in 0..frame.cols {
            let force = frame.force_at(row, col).unwrap_or(0.0);
            if force <= 0.0 {
                continue;
            }
            let min = Pos2::new(corner.x + col as f32 * cell.x, corner.y + row as f32 * cell.y);
            painter.rect_filled(
                Rect::from_min_size(min, cell),
                0.0,
                fade(ORANGE, force / peak),
            );
        }
    }
}

pub fn draw_ring(
    painter: &Painter,
    center: Pos2,
    inner_radius: f32,
    outer_radius: f32,
    color: Color32,
) {
    let mid_radius = (inner_radius + outer_radius) / 2.0;
    let thickness = outer_radius - inner_radius;
    painter.circle_stroke(center, mid_radius, Stroke::new(thickness, color));
}

pub fn draw_trail(painter: &Painter, contact: &Contact, pos: Pos2, cscale: f32) {
    let color = fade(contact_color(contact.id), 0.2);
    draw_ring(painter, pos, 1.0, 12.0 * cscale, color);
}

/// Points of the contact ellipse in screen space. Falls back to a circle when
/// the frame carried no ellipse.
fn ellipse_points(contact: &Contact, pos: Pos2, scale: f32, cscale: f32) -> Vec<Pos2> {
    let (major, minor) = if contact.major_axis > 0.0 && contact.minor_axis > 0.0 {
        (contact.major_axis * scale / 2.0, contact.minor_axis * scale / 2.0)
    } else {
        (10.0 * cscale, 10.0 * cscale)
    };
    let (sin, cos) = contact.orientation.to_radians().sin_cos();
    (0..ELLIPSE_SEGMENTS)
        .map(|i| {
            let t = i as f32 / ELLIPSE_SEGMENTS as f32 * std::f32::consts::TAU;
            let (x, y) = (major * t.cos(), minor * t.sin());
            Pos2::new(pos.x + x * cos - y * sin, pos.y + x * sin + y * cos)
        })
        .collect()
}

pub fn draw_contact(painter: &Painter, contact: &Contact, pos: Pos2, scale: f32, cscale: f32) {
    let color = contact_color(contact.id);
    painter.add(Shape::convex_polygon(
        ellipse_points(contact, pos, scale, cscale),
        fade(color, 0.6),
        Stroke::new(2.0, color),
    ));

    // Peak dot
    if contact.peak_force > 0.0 {
        painter.circle_filled(pos, 3.0 * cscale, Color32::BLACK);
    }

    let label_pos = Pos2::new(pos.x - 6.0 * cscale, pos.y - 36.0 * cscale);
    painter.text(
        label_pos,
        egui::Align2::LEFT_TOP,
        format!("{}", contact.id),
        FontId::monospace(20.0 * cscale),
        Color32::BLACK,
    );
}
