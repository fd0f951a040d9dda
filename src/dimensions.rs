use egui::Pos2;
use morphview::SensorGeometry;

/// Maps sensor millimeters onto the window, keeping the surface's aspect
/// ratio and centering it.
pub struct Dimensions {
    pub surface_width: f32,
    pub surface_height: f32,
    pub screen_width: f32,
    pub screen_height: f32,
    pub margin: f32,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            surface_width: 240.0,
            surface_height: 139.0,
            screen_width: 960.0,
            screen_height: 600.0,
            margin: 15.0,
        }
    }
}

impl Dimensions {
    pub fn for_geometry(geometry: &SensorGeometry) -> Self {
        let mut dims = Self::default();
        if geometry.width_mm > 0.0 && geometry.height_mm > 0.0 {
            dims.surface_width = geometry.width_mm;
            dims.surface_height = geometry.height_mm;
        }
        dims
    }

    /// Screen pixels per millimeter.
    pub fn scale(&self) -> f32 {
        let ratio_screen = self.screen_width / self.screen_height;
        let ratio_surface = self.surface_width / self.surface_height;

        if ratio_screen > ratio_surface {
            self.screen_height / (self.surface_height + self.margin * 2.0)
        } else {
            self.screen_width / (self.surface_width + self.margin * 2.0)
        }
    }

    pub fn corner(&self, scale: f32) -> Pos2 {
        Pos2::new(
            self.screen_width / 2.0 - (self.surface_width / 2.0) * scale,
            self.screen_height / 2.0 - (self.surface_height / 2.0) * scale,
        )
    }

    pub fn to_screen(&self, x_mm: f32, y_mm: f32, corner: Pos2, scale: f32) -> Pos2 {
        Pos2::new(corner.x + x_mm * scale, corner.y + y_mm * scale)
    }
}
