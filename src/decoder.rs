//! Native frame buffer → owned [`Frame`].
//!
//! The header is validated in full before anything is copied, so a failed
//! decode never leaves a half-filled frame behind.

use crate::device::SensorGeometry;
use crate::error::{Error, Result};
use crate::ffi::SenselFrameData;
use crate::frame::{Accel, Contact, Frame, FrameContent};
use std::slice;

#[derive(Clone, Copy, Debug)]
pub struct FrameDecoder {
    geometry: SensorGeometry,
}

impl FrameDecoder {
    pub fn new(geometry: SensorGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &SensorGeometry {
        &self.geometry
    }

    /// Decode into a fresh frame.
    ///
    /// # Safety
    ///
    /// Every non-null array pointer in `raw` whose content flag is set must
    /// point to memory readable for the counts the geometry implies:
    /// `max_contacts` contacts, `rows * cols` forces and labels, one accel
    /// record. The memory must not be written during the call.
    pub unsafe fn decode(&self, raw: &SenselFrameData) -> Result<Frame> {
        let mut frame = Frame::default();
        self.decode_into(raw, &mut frame)?;
        Ok(frame)
    }

    /// Decode into `frame`, reusing its allocations. On error `frame` is left
    /// exactly as it was.
    ///
    /// # Safety
    ///
    /// Same contract as [`FrameDecoder::decode`].
    pub unsafe fn decode_into(&self, raw: &SenselFrameData, frame: &mut Frame) -> Result<()> {
        let content = FrameContent::from_bits_retain(raw.content_bit_mask);
        let unknown = content.bits() & !FrameContent::all().bits();
        if unknown != 0 {
            return Err(Error::corrupt(format!(
                "unknown content bits {:#04x}",
                unknown
            )));
        }

        let cells = self.geometry.cell_count();
        let contacts = self.contact_records(raw, content)?;
        let force = require(content, FrameContent::PRESSURE, raw.force_array, "force_array")?;
        let labels = require(content, FrameContent::LABELS, raw.labels_array, "labels_array")?;
        let accel = require(content, FrameContent::ACCEL, raw.accel_data, "accel_data")?;

        let mut decoded = Vec::with_capacity(contacts.len());
        for (i, record) in contacts.iter().enumerate() {
            let contact = Contact::from_raw(record).ok_or_else(|| {
                Error::corrupt(format!(
                    "contact {} has unknown state {}",
                    i, record.state
                ))
            })?;
            decoded.push(contact);
        }

        // Everything checked; from here on only copies.
        frame.content = content;
        frame.lost_frame_count = raw.lost_frame_count;
        frame.rows = self.geometry.rows as usize;
        frame.cols = self.geometry.cols as usize;

        frame.contacts.clear();
        frame.contacts.extend_from_slice(&decoded);

        frame.force.clear();
        if let Some(ptr) = force {
            frame
                .force
                .extend_from_slice(slice::from_raw_parts(ptr, cells));
        }

        frame.labels.clear();
        if let Some(ptr) = labels {
            frame
                .labels
                .extend_from_slice(slice::from_raw_parts(ptr, cells));
        }

        frame.accel = match accel {
            Some(ptr) => Some(Accel::from(ptr.read())),
            None => None,
        };

        tracing::trace!(
            content = content.bits(),
            contacts = frame.contacts.len(),
            lost = frame.lost_frame_count,
            "decoded frame"
        );
        Ok(())
    }

    unsafe fn contact_records<'a>(
        &self,
        raw: &'a SenselFrameData,
        content: FrameContent,
    ) -> Result<&'a [crate::ffi::SenselContact]> {
        if !content.contains(FrameContent::CONTACTS) {
            return Ok(&[]);
        }
        let count = raw.n_contacts as usize;
        if count > self.geometry.max_contacts as usize {
            return Err(Error::corrupt(format!(
                "{} contacts exceeds sensor maximum of {}",
                count, self.geometry.max_contacts
            )));
        }
        if raw.contacts.is_null() {
            return Err(Error::corrupt("contacts flag set with null contacts"));
        }
        Ok(slice::from_raw_parts(raw.contacts, count))
    }
}

fn require<T>(
    content: FrameContent,
    flag: FrameContent,
    ptr: *mut T,
    name: &str,
) -> Result<Option<*const T>> {
    if !content.contains(flag) {
        return Ok(None);
    }
    if ptr.is_null() {
        return Err(Error::corrupt(format!("{} is null", name)));
    }
    Ok(Some(ptr as *const T))
}
