/// Fixed-capacity circular byte queue between a capture callback and the
/// thread reading captured audio.
///
/// Wrap in `parking_lot::Mutex` for cross-thread access.
///
/// Overflow behavior: the oldest unread bytes are overwritten, so the
/// writer never blocks and latency stays bounded.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Vec<u8>,
    write_index: usize,
    read_index: usize,
    available: usize,
    overwritten: u64,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            write_index: 0,
            read_index: 0,
            available: 0,
            overwritten: 0,
        }
    }

    /// Write bytes into the ring buffer.
    ///
    /// If the buffer overflows, the oldest bytes are dropped.
    /// If `data` is larger than capacity, only its last `capacity` bytes are kept.
    pub fn write(&mut self, data: &[u8]) {
        let capacity = self.capacity();
        if data.is_empty() || capacity == 0 {
            return;
        }

        let data = if data.len() > capacity {
            self.overwritten += (data.len() - capacity) as u64;
            &data[data.len() - capacity..]
        } else {
            data
        };

        let overflow = (self.available + data.len()).saturating_sub(capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % capacity;
            self.available -= overflow;
            self.overwritten += overflow as u64;
        }

        // At most two contiguous runs: up to the end, then from the start.
        let first = data.len().min(capacity - self.write_index);
        self.buffer[self.write_index..self.write_index + first].copy_from_slice(&data[..first]);
        self.buffer[..data.len() - first].copy_from_slice(&data[first..]);
        self.write_index = (self.write_index + data.len()) % capacity;
        self.available += data.len();
    }

    /// Read and remove up to `out.len()` bytes into `out`.
    ///
    /// Returns the number of bytes copied.
    pub fn read_into(&mut self, out: &mut [u8]) -> usize {
        let to_read = out.len().min(self.available);
        if to_read == 0 {
            return 0;
        }

        let capacity = self.capacity();
        let first = to_read.min(capacity - self.read_index);
        out[..first].copy_from_slice(&self.buffer[self.read_index..self.read_index + first]);
        out[first..to_read].copy_from_slice(&self.buffer[..to_read - first]);
        self.read_index = (self.read_index + to_read) % capacity;
        self.available -= to_read;
        to_read
    }

    /// Read and remove up to `count` bytes.
    pub fn read(&mut self, count: usize) -> Vec<u8> {
        let mut out = vec![0; count.min(self.available)];
        self.read_into(&mut out);
        out
    }

    /// Number of bytes currently available for reading.
    pub fn count(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    /// Total bytes dropped to make room for newer data since creation.
    pub fn overwritten(&self) -> u64 {
        self.overwritten
    }

    /// Discard all unread bytes.
    pub fn reset(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_write_read() {
        let mut buf = RingBuffer::new(10);
        buf.write(&[1, 2, 3]);

        assert_eq!(buf.count(), 3);
        assert_eq!(buf.read(3), vec![1, 2, 3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn fifo_prefix_read() {
        let mut buf = RingBuffer::new(8);
        buf.write(&[10, 20, 30, 40, 50, 60]);

        assert_eq!(buf.read(4), vec![10, 20, 30, 40]);
        assert_eq!(buf.count(), 2);

        let rest = buf.read(10);
        assert_eq!(rest, vec![50, 60]);
        assert!(buf.is_empty());
    }

    #[test]
    fn overflow_keeps_newest_capacity_bytes() {
        let mut buf = RingBuffer::new(4);
        buf.write(&[1, 2, 3, 4]);
        buf.write(&[5, 6]);

        assert_eq!(buf.count(), 4);
        assert_eq!(buf.overwritten(), 2);
        assert_eq!(buf.read(4), vec![3, 4, 5, 6]);
    }

    #[test]
    fn single_write_larger_than_capacity() {
        let mut buf = RingBuffer::new(3);
        buf.write(&[1, 2, 3, 4, 5]);

        assert_eq!(buf.count(), 3);
        assert_eq!(buf.overwritten(), 2);
        assert_eq!(buf.read(3), vec![3, 4, 5]);
    }

    #[test]
    fn wraparound() {
        let mut buf = RingBuffer::new(4);

        buf.write(&[1, 2, 3]);
        buf.read(2);

        buf.write(&[4, 5, 6]);

        assert_eq!(buf.count(), 4);
        let mut out = [0u8; 4];
        assert_eq!(buf.read_into(&mut out), 4);
        assert_eq!(out, [3, 4, 5, 6]);
    }

    #[test]
    fn reset_clears_buffer() {
        let mut buf = RingBuffer::new(10);
        buf.write(&[1, 2, 3]);
        buf.reset();

        assert!(buf.is_empty());
        assert!(buf.read(10).is_empty());
    }

    #[test]
    fn zero_capacity_drops_everything() {
        let mut buf = RingBuffer::new(0);
        buf.write(&[1, 2]);

        assert!(buf.is_empty());
        let mut out = [0u8; 2];
        assert_eq!(buf.read_into(&mut out), 0);
    }
}
