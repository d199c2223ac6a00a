//! Output buffer management for block encoders

/// A block of data being built.
///
/// Encoders plan sub-block offsets up front and then write sequentially,
/// skipping forward with [`Section::pad_to`] so reserved gaps stay zeroed.
#[derive(Debug, Default)]
pub struct Section {
    pub data: Vec<u8>,
}

impl Section {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn align(&mut self, alignment: usize) {
        let padding = (alignment - (self.data.len() % alignment)) % alignment;
        self.data.extend(std::iter::repeat_n(0u8, padding));
    }

    /// Zero-fill up to `offset`. Offsets behind the cursor are a planner bug.
    pub fn pad_to(&mut self, offset: usize) {
        debug_assert!(offset >= self.data.len(), "section cursor moved backwards");
        if offset > self.data.len() {
            self.data.resize(offset, 0);
        }
    }

    pub fn write_zeros(&mut self, count: usize) {
        self.data.extend(std::iter::repeat_n(0u8, count));
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.data.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i16(&mut self, v: i16) {
        self.data.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.data.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.data.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_vec3(&mut self, v: [f32; 3]) {
        for c in v {
            self.write_f32(c);
        }
    }

    /// Write a block pointer; `None` is the null pointer.
    pub fn write_ptr(&mut self, target: Option<usize>) {
        self.write_i32(target.map_or(0, |t| t as i32));
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_and_pad() {
        let mut section = Section::new();
        section.write_u8(1);
        section.align(16);
        assert_eq!(section.len(), 16);
        section.align(16);
        assert_eq!(section.len(), 16);
        section.pad_to(0x20);
        section.write_u16(0xBEEF);
        assert_eq!(&section.data[0x20..], &[0xBE, 0xEF]);
    }

    #[test]
    fn test_null_pointer() {
        let mut section = Section::new();
        section.write_ptr(None);
        section.write_ptr(Some(0x40));
        assert_eq!(section.into_bytes(), vec![0, 0, 0, 0, 0, 0, 0, 0x40]);
    }
}
