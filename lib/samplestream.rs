#[allow(unused)]
use {
    crate::{attribution::SAMPLE_STRIDE, AttributionTable, KpdumpError},
    byteorder::{BigEndian, ByteOrder},
    error_stack::{Report, Result, ResultExt},
    jlogger_tracing::{jdebug, jerror, jinfo, jwarn},
    std::io::{self, Read},
};

/// Lazy walk of a profiling sample file against an attribution table.
///
/// Records are 4-byte big-endian counts, one per SAMPLE_STRIDE bytes of
/// code starting at the table's range start. The walk is single pass:
/// each record is read once, in file order.
pub struct SampleStream<'a, R> {
    reader: R,
    table: &'a AttributionTable,
    pc: u64,
}

impl<'a, R: Read> SampleStream<'a, R> {
    pub fn new(reader: R, table: &'a AttributionTable) -> Self {
        let pc = table.range().start;
        SampleStream { reader, table, pc }
    }

    /// Program counter the next record will be attributed at.
    pub fn pc(&self) -> u64 {
        self.pc
    }

    // One record, or None on a clean end of stream. A record cut short
    // is an error: the stream is corrupt, not finished.
    fn read_count(&mut self) -> Result<Option<u32>, KpdumpError> {
        let mut buf = [0_u8; 4];
        let mut filled = 0;

        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(Report::new(KpdumpError::IOError)).attach_printable(format!(
                        "Truncated sample record: {} of 4 bytes",
                        filled
                    ))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(Report::new(KpdumpError::IOError))
                        .attach_printable(format!("Failed to read sample record: {}", e))
                }
            }
        }

        Ok(Some(BigEndian::read_u32(&buf)))
    }

    /// Next attributed sample, skipping zero counts. Ok(None) is the
    /// normal end of the stream.
    pub fn next_sample(&mut self) -> Result<Option<(&'a str, u32)>, KpdumpError> {
        loop {
            let count = match self.read_count()? {
                Some(count) => count,
                None => return Ok(None),
            };

            let name = self.table.name_at(self.pc).ok_or_else(|| {
                Report::new(KpdumpError::SampleOutOfRange).attach_printable(format!(
                    "Sample stream exceeds known code range: pc 0x{:x} not in 0x{:x}..0x{:x}",
                    self.pc,
                    self.table.range().start,
                    self.table.range().end
                ))
            })?;

            self.pc = self.pc.wrapping_add(SAMPLE_STRIDE);

            if count > 0 {
                return Ok(Some((name, count)));
            }
        }
    }
}

impl<'a, R: Read> Iterator for SampleStream<'a, R> {
    type Item = Result<(&'a str, u32), KpdumpError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_sample().transpose()
    }
}
