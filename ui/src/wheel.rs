//! egui painter for `WheelScene`.

use egui::epaint::TextShape;
use egui::{Color32, FontId, Pos2, Stroke, Vec2};

use gamewheel::{Wedge, WheelScene};

const ARC_STEPS: usize = 12;
const EMPTY_FILL: Color32 = Color32::from_rgb(48, 48, 56);
const RIM: Color32 = Color32::from_rgb(235, 235, 235);
const POINTER: Color32 = Color32::from_rgb(255, 255, 255);

fn dir(angle: f64) -> Vec2 {
    Vec2::new(angle.cos() as f32, angle.sin() as f32)
}

/// Outline of one wedge: the center followed by the outer arc.
pub(crate) fn wedge_points(center: Pos2, radius: f32, start: f64, end: f64) -> Vec<Pos2> {
    let mut points = Vec::with_capacity(ARC_STEPS + 2);
    points.push(center);
    for step in 0..=ARC_STEPS {
        let a = start + (end - start) * step as f64 / ARC_STEPS as f64;
        points.push(center + dir(a) * radius);
    }
    points
}

fn fill(wedge: &Wedge, highlight: Option<usize>) -> Color32 {
    if !wedge.occupied {
        return EMPTY_FILL;
    }
    let [r, g, b] = wedge.color();
    let base = Color32::from_rgb(r, g, b);
    match highlight {
        Some(idx) if idx != wedge.index => base.gamma_multiply(0.35),
        _ => base,
    }
}

/// Allocate a square and draw the wheel into it.
pub(crate) fn paint(ui: &mut egui::Ui, scene: &WheelScene) {
    let available = ui.available_size();
    let side = available.x.min(available.y).max(160.0);
    let (rect, _) = ui.allocate_exact_size(Vec2::splat(side), egui::Sense::hover());
    let painter = ui.painter_at(rect);
    let center = rect.center();
    let radius = side * 0.44;

    for wedge in &scene.wedges {
        let points = wedge_points(center, radius, wedge.start_angle, wedge.end_angle);
        let stroke = if scene.highlight == Some(wedge.index) {
            Stroke::new(4.0, Color32::WHITE)
        } else {
            Stroke::new(1.0, Color32::from_black_alpha(120))
        };
        painter.add(egui::Shape::convex_polygon(
            points,
            fill(wedge, scene.highlight),
            stroke,
        ));
    }

    for wedge in scene.wedges.iter().filter(|w| w.occupied) {
        paint_label(&painter, center, radius, wedge, side);
    }

    painter.circle_stroke(center, radius, Stroke::new(3.0, RIM));
    painter.circle_filled(center, radius * 0.07, RIM);
    paint_pointer(&painter, center, radius, scene.pointer_angle);
}

fn paint_label(painter: &egui::Painter, center: Pos2, radius: f32, wedge: &Wedge, side: f32) {
    let font = FontId::proportional((side / 42.0).clamp(9.0, 18.0));
    let galley = painter.layout_no_wrap(wedge.label.clone(), font, Color32::BLACK);
    let mid = wedge.mid_angle();

    // Text runs outward from the hub; flipped labels run inward from the rim
    // so they never read upside down.
    let (anchor_r, text_angle) = if wedge.flip_label {
        (radius * 0.92, mid + std::f64::consts::PI)
    } else {
        (radius * 0.2, mid)
    };
    let across = Vec2::new(-(text_angle.sin() as f32), text_angle.cos() as f32);
    let pos = center + dir(mid) * anchor_r - across * (galley.size().y / 2.0);

    painter.add(TextShape::new(pos, galley, Color32::BLACK).with_angle(text_angle as f32));
}

fn paint_pointer(painter: &egui::Painter, center: Pos2, radius: f32, angle: f64) {
    let d = dir(angle);
    let across = Vec2::new(-d.y, d.x);
    let tip = center + d * (radius * 0.88);
    let base = center + d * (radius * 1.1);
    painter.add(egui::Shape::convex_polygon(
        vec![tip, base + across * (radius * 0.07), base - across * (radius * 0.07)],
        POINTER,
        Stroke::new(1.5, Color32::BLACK),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamewheel::{POINTER_ANGLE, segment_angle};

    #[test]
    fn wedge_outline_starts_at_center_and_spans_arc() {
        let center = Pos2::new(100.0, 100.0);
        let pts = wedge_points(center, 50.0, 0.0, segment_angle());
        assert_eq!(pts.len(), ARC_STEPS + 2);
        assert_eq!(pts[0], center);
        assert!((pts[1].x - 150.0).abs() < 1e-3);
        for p in &pts[1..] {
            assert!((p.distance(center) - 50.0).abs() < 1e-3);
        }
    }

    #[test]
    fn pointer_direction_is_up() {
        let d = dir(POINTER_ANGLE);
        assert!(d.x.abs() < 1e-6);
        assert!((d.y + 1.0).abs() < 1e-6);
    }
}
