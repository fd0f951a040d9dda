use crate::ffi;
use bitflags::bitflags;

bitflags! {
    /// Which data categories a frame carries. Values are the SDK's wire bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FrameContent: u8 {
        const PRESSURE = ffi::FRAME_CONTENT_PRESSURE_MASK;
        const LABELS = ffi::FRAME_CONTENT_LABELS_MASK;
        const CONTACTS = ffi::FRAME_CONTENT_CONTACTS_MASK;
        const ACCEL = ffi::FRAME_CONTENT_ACCEL_MASK;
    }
}

bitflags! {
    /// Optional field groups the native layer filled in on a contact.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ContactMask: u8 {
        const ELLIPSE = ffi::CONTACT_MASK_ELLIPSE;
        const DELTAS = ffi::CONTACT_MASK_DELTAS;
        const BOUNDING_BOX = ffi::CONTACT_MASK_BOUNDING_BOX;
        const PEAK = ffi::CONTACT_MASK_PEAK;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContactState {
    #[default]
    Invalid,
    Start,
    Move,
    End,
}

impl ContactState {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            ffi::CONTACT_INVALID => Some(ContactState::Invalid),
            ffi::CONTACT_START => Some(ContactState::Start),
            ffi::CONTACT_MOVE => Some(ContactState::Move),
            ffi::CONTACT_END => Some(ContactState::End),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            ContactState::Invalid => ffi::CONTACT_INVALID,
            ContactState::Start => ffi::CONTACT_START,
            ContactState::Move => ffi::CONTACT_MOVE,
            ContactState::End => ffi::CONTACT_END,
        }
    }
}

impl std::fmt::Display for ContactState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContactState::Invalid => write!(f, "CONTACT_INVALID"),
            ContactState::Start => write!(f, "CONTACT_START"),
            ContactState::Move => write!(f, "CONTACT_MOVE"),
            ContactState::End => write!(f, "CONTACT_END"),
        }
    }
}

/// One tracked touch. Positions and axes are in millimeters, forces in grams,
/// areas in sensor cells. `id` is stable for the lifetime of a physical touch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Contact {
    pub id: u8,
    pub state: ContactState,
    pub content: ContactMask,
    pub x: f32,
    pub y: f32,
    pub total_force: f32,
    pub area: f32,
    pub orientation: f32,
    pub major_axis: f32,
    pub minor_axis: f32,
    pub delta_x: f32,
    pub delta_y: f32,
    pub delta_force: f32,
    pub delta_area: f32,
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub peak_x: f32,
    pub peak_y: f32,
    pub peak_force: f32,
}

impl Contact {
    /// Returns `None` when the native state value is outside the known range.
    pub(crate) fn from_raw(raw: &ffi::SenselContact) -> Option<Self> {
        Some(Self {
            id: raw.id,
            state: ContactState::from_raw(raw.state)?,
            content: ContactMask::from_bits_retain(raw.content_bit_mask),
            x: raw.x_pos,
            y: raw.y_pos,
            total_force: raw.total_force,
            area: raw.area,
            orientation: raw.orientation,
            major_axis: raw.major_axis,
            minor_axis: raw.minor_axis,
            delta_x: raw.delta_x,
            delta_y: raw.delta_y,
            delta_force: raw.delta_force,
            delta_area: raw.delta_area,
            min_x: raw.min_x,
            min_y: raw.min_y,
            max_x: raw.max_x,
            max_y: raw.max_y,
            peak_x: raw.peak_x,
            peak_y: raw.peak_y,
            peak_force: raw.peak_force,
        })
    }

    pub fn to_raw(&self) -> ffi::SenselContact {
        ffi::SenselContact {
            content_bit_mask: self.content.bits(),
            id: self.id,
            state: self.state.as_raw(),
            x_pos: self.x,
            y_pos: self.y,
            total_force: self.total_force,
            area: self.area,
            orientation: self.orientation,
            major_axis: self.major_axis,
            minor_axis: self.minor_axis,
            delta_x: self.delta_x,
            delta_y: self.delta_y,
            delta_force: self.delta_force,
            delta_area: self.delta_area,
            min_x: self.min_x,
            min_y: self.min_y,
            max_x: self.max_x,
            max_y: self.max_y,
            peak_x: self.peak_x,
            peak_y: self.peak_y,
            peak_force: self.peak_force,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ContactState::Start | ContactState::Move)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Accel {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl From<ffi::SenselAccelData> for Accel {
    fn from(raw: ffi::SenselAccelData) -> Self {
        Self {
            x: raw.x,
            y: raw.y,
            z: raw.z,
        }
    }
}

/// A single decoded sensor snapshot, owned by the caller.
///
/// Categories not present in `content` are left empty (`None` for accel).
/// `force` and `labels` are row-major, `rows * cols` long when present.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub content: FrameContent,
    pub lost_frame_count: i32,
    pub rows: usize,
    pub cols: usize,
    pub contacts: Vec<Contact>,
    pub force: Vec<f32>,
    pub labels: Vec<u8>,
    pub accel: Option<Accel>,
}

impl Frame {
    pub fn force_at(&self, row: usize, col: usize) -> Option<f32> {
        if col >= self.cols {
            return None;
        }
        self.force.get(row * self.cols + col).copied()
    }

    pub fn label_at(&self, row: usize, col: usize) -> Option<u8> {
        if col >= self.cols {
            return None;
        }
        self.labels.get(row * self.cols + col).copied()
    }

    /// Sum of the force map in grams; zero when no force map was requested.
    pub fn total_force(&self) -> f32 {
        self.force.iter().sum()
    }

    pub fn contact(&self, id: u8) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    pub fn has_contacts(&self) -> bool {
        !self.contacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_frame() -> Frame {
        Frame {
            content: FrameContent::PRESSURE | FrameContent::LABELS,
            rows: 2,
            cols: 3,
            force: vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
            labels: vec![0, 0, 1, 1, 2, 2],
            ..Default::default()
        }
    }

    #[test]
    fn force_and_label_are_row_major() {
        let frame = grid_frame();
        assert_eq!(frame.force_at(1, 0), Some(3.0));
        assert_eq!(frame.force_at(0, 2), Some(2.0));
        assert_eq!(frame.label_at(1, 2), Some(2));
    }

    #[test]
    fn out_of_grid_lookups_are_none() {
        let frame = grid_frame();
        assert_eq!(frame.force_at(0, 3), None);
        assert_eq!(frame.force_at(2, 0), None);
        assert_eq!(frame.label_at(5, 5), None);
    }

    #[test]
    fn total_force_sums_map() {
        assert_eq!(grid_frame().total_force(), 15.0);
        assert_eq!(Frame::default().total_force(), 0.0);
    }

    #[test]
    fn contact_state_rejects_unknown_values() {
        assert_eq!(ContactState::from_raw(2), Some(ContactState::Move));
        assert_eq!(ContactState::from_raw(4), None);
        assert_eq!(ContactState::End.to_string(), "CONTACT_END");
    }

    #[test]
    fn contact_raw_conversion_keeps_every_field() {
        let contact = Contact {
            id: 7,
            state: ContactState::Start,
            content: ContactMask::ELLIPSE | ContactMask::PEAK,
            x: 12.5,
            y: 40.25,
            total_force: 310.0,
            orientation: -45.0,
            peak_force: 99.5,
            ..Default::default()
        };
        assert_eq!(Contact::from_raw(&contact.to_raw()), Some(contact));
    }

    #[test]
    fn lookup_contact_by_id() {
        let frame = Frame {
            contacts: vec![
                Contact {
                    id: 1,
                    ..Default::default()
                },
                Contact {
                    id: 4,
                    x: 2.0,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(frame.contact(4).map(|c| c.x), Some(2.0));
        assert!(frame.contact(2).is_none());
    }
}
