/// Default end-of-line marker.
pub const DEFAULT_LINE_DELIMITER: u8 = b'\n';

/// Bytes received since the last delimiter.
#[derive(Debug, Clone)]
pub struct LineAccumulator {
    buffer: Vec<u8>,
    delimiter: u8,
}

impl LineAccumulator {
    pub fn new(delimiter: u8) -> Self {
        Self {
            buffer: Vec::new(),
            delimiter,
        }
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn set_delimiter(&mut self, delimiter: u8) {
        self.delimiter = delimiter;
    }

    /// Feed raw bytes, calling `on_line` once per completed line.
    ///
    /// The delimiter itself is never part of a line. Returns the number of lines
    /// dispatched.
    pub fn feed<F>(&mut self, bytes: &[u8], mut on_line: F) -> usize
    where
        F: FnMut(String),
    {
        let mut dispatched = 0;
        for &byte in bytes {
            if byte == self.delimiter {
                let line = String::from_utf8_lossy(&self.buffer).into_owned();
                self.buffer.clear();
                on_line(line);
                dispatched += 1;
            } else {
                self.buffer.push(byte);
            }
        }
        dispatched
    }

    /// Bytes still waiting for a delimiter.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for LineAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_DELIMITER)
    }
}
