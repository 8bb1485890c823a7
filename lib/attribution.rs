#[allow(unused)]
use {
    crate::{KpdumpError, LoadSegment, SymbolRecord},
    error_stack::{Report, Result, ResultExt},
    jlogger_tracing::{jdebug, jerror, jinfo, jwarn},
};

/// Log2 of the profiling resolution: one sample slot covers 1 << LRES
/// bytes of code.
pub const LRES: u32 = 3;

/// Bytes of code per sample record.
pub const SAMPLE_STRIDE: u64 = 1 << LRES;

/// Lowest canonical kernel address. Load segments linked below this are
/// relocation-relative and must be shifted into kernel space.
pub const KERNEL_ADDR_FLOOR: u64 = 0xffff_ffff_0000_0000;

/// Offset that maps relocation-relative segment addresses into the
/// canonical kernel address space.
pub const KERNEL_RELOC_OFFSET: u64 = 0xffff_ffff_f000_0000;

/// Slot 0 of every dump carries the running total, not a symbol hit.
pub const TOTAL_LABEL: &str = "Total ms";

/// The second sample slot collects hits the profiler could not attribute.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Shift a relocation-relative address into kernel space. Addresses
/// already at or above KERNEL_ADDR_FLOOR are canonical and stay put.
pub fn normalize_kernel_addr(addr: u64) -> u64 {
    if addr < KERNEL_ADDR_FLOOR {
        addr.wrapping_add(KERNEL_RELOC_OFFSET)
    } else {
        addr
    }
}

/// Half-open address range of the kernel's executable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRange {
    pub start: u64,
    pub end: u64,
}

impl CodeRange {
    /// Fold the executable load segments into one contiguous range.
    ///
    /// Every segment is normalized first, so a kernel linked
    /// relocation-relative and one linked high-half reduce to the same
    /// range.
    pub fn from_segments(segments: &[LoadSegment]) -> Result<Self, KpdumpError> {
        let mut start = u64::MAX;
        let mut end = 0_u64;

        for seg in segments {
            let curstart = normalize_kernel_addr(seg.vaddr);
            let curend = normalize_kernel_addr(seg.vaddr.wrapping_add(seg.memsz));
            jdebug!(
                "load segment 0x{:x}..0x{:x} exec={}",
                curstart,
                curend,
                seg.executable
            );

            if seg.executable {
                if curstart < start {
                    start = curstart;
                }
                if curend > end {
                    end = curend;
                }
                jdebug!("code 0x{:x}..0x{:x}", start, end);
            }
        }

        if start >= end {
            return Err(Report::new(KpdumpError::NoCodeSegment))
                .attach_printable("No executable load segment found in kernel image");
        }

        Ok(CodeRange { start, end })
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }
}

/// Dense map from every code address to the name of the symbol owning it.
///
/// Entry i names address range.start + i. Slots no symbol claims keep a
/// hex address placeholder so every sample resolves to something
/// printable.
pub struct AttributionTable {
    range: CodeRange,
    names: Vec<String>,
}

impl AttributionTable {
    pub fn build(range: CodeRange, symbols: &[SymbolRecord]) -> Self {
        let mut names: Vec<String> = (0..range.len())
            .map(|i| format!("[0x{:x}]", range.start + i))
            .collect();

        for sym in symbols {
            let vstart = sym.value;
            let vend = sym.value.wrapping_add(sym.size);

            if vstart >= range.end || vend <= range.start {
                continue;
            }

            // Clip to the table bounds; a symbol straddling the range
            // owns exactly the in-range part.
            let vstart = vstart.max(range.start);
            let vend = vend.min(range.end);

            // Symbol table order decides overlaps: the last symbol
            // covering an address wins.
            for addr in vstart..vend {
                names[(addr - range.start) as usize] = sym.name.clone();
            }
        }

        names[0] = TOTAL_LABEL.to_string();
        if let Some(slot) = names.get_mut(SAMPLE_STRIDE as usize) {
            *slot = UNKNOWN_LABEL.to_string();
        }

        AttributionTable { range, names }
    }

    pub fn range(&self) -> CodeRange {
        self.range
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name_at(&self, addr: u64) -> Option<&str> {
        if !self.range.contains(addr) {
            return None;
        }

        Some(self.names[(addr - self.range.start) as usize].as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(vaddr: u64, memsz: u64, executable: bool) -> LoadSegment {
        LoadSegment {
            vaddr,
            memsz,
            executable,
        }
    }

    fn sym(name: &str, value: u64, size: u64) -> SymbolRecord {
        SymbolRecord {
            name: name.to_string(),
            value,
            size,
        }
    }

    #[test]
    fn range_is_tight_union_of_executable_segments() {
        let segments = vec![
            seg(0xffff_ffff_8000_0000, 0x1000, true),
            seg(0xffff_ffff_8000_4000, 0x2000, true),
            // Data segment far above must not widen the code range.
            seg(0xffff_ffff_9000_0000, 0x10000, false),
        ];

        let range = CodeRange::from_segments(&segments).unwrap();
        assert_eq!(range.start, 0xffff_ffff_8000_0000);
        assert_eq!(range.end, 0xffff_ffff_8000_6000);
        assert_eq!(range.len(), 0x6000);
    }

    #[test]
    fn range_normalizes_relocation_relative_segments() {
        let segments = vec![seg(0x20_0000, 0x1000, true)];

        let range = CodeRange::from_segments(&segments).unwrap();
        assert_eq!(range.start, 0xffff_ffff_f020_0000);
        assert_eq!(range.end, 0xffff_ffff_f020_1000);
    }

    #[test]
    fn normalization_is_idempotent_on_kernel_addresses() {
        let addr = 0xffff_ffff_8010_0000;
        assert_eq!(normalize_kernel_addr(addr), addr);
        assert_eq!(
            normalize_kernel_addr(normalize_kernel_addr(0x20_0000)),
            normalize_kernel_addr(0x20_0000)
        );
    }

    #[test]
    fn range_requires_an_executable_segment() {
        let segments = vec![seg(0xffff_ffff_8000_0000, 0x1000, false)];

        let r = CodeRange::from_segments(&segments);
        assert!(matches!(
            r.unwrap_err().current_context(),
            KpdumpError::NoCodeSegment
        ));
    }

    #[test]
    fn range_rejects_zero_size_code_segment() {
        let segments = vec![seg(0xffff_ffff_8000_0000, 0, true)];

        let r = CodeRange::from_segments(&segments);
        assert!(matches!(
            r.unwrap_err().current_context(),
            KpdumpError::NoCodeSegment
        ));
    }

    #[test]
    fn table_defaults_to_address_placeholders() {
        let range = CodeRange {
            start: 0x1000,
            end: 0x1010,
        };
        let table = AttributionTable::build(range, &[]);

        assert_eq!(table.len(), 0x10);
        assert_eq!(table.name_at(0x1001), Some("[0x1001]"));
        assert_eq!(table.name_at(0x100f), Some("[0x100f]"));
        assert_eq!(table.name_at(0x1010), None);
    }

    #[test]
    fn later_symbol_wins_overlap() {
        let range = CodeRange {
            start: 0x1000,
            end: 0x1020,
        };
        let symbols = vec![sym("early", 0x1010, 0x10), sym("late", 0x1014, 0x4)];
        let table = AttributionTable::build(range, &symbols);

        assert_eq!(table.name_at(0x1010), Some("early"));
        assert_eq!(table.name_at(0x1014), Some("late"));
        assert_eq!(table.name_at(0x1017), Some("late"));
        assert_eq!(table.name_at(0x1018), Some("early"));
    }

    #[test]
    fn sentinels_override_symbols() {
        let range = CodeRange {
            start: 0x1000,
            end: 0x1020,
        };
        // One symbol spanning the whole range still loses slots 0 and 8.
        let table = AttributionTable::build(range, &[sym("kmain", 0x1000, 0x20)]);

        assert_eq!(table.name_at(0x1000), Some(TOTAL_LABEL));
        assert_eq!(table.name_at(0x1000 + SAMPLE_STRIDE), Some(UNKNOWN_LABEL));
        assert_eq!(table.name_at(0x1001), Some("kmain"));
        assert_eq!(table.name_at(0x1009), Some("kmain"));
    }

    #[test]
    fn straddling_symbol_is_clipped_not_skipped() {
        let range = CodeRange {
            start: 0x1000,
            end: 0x1010,
        };
        let table = AttributionTable::build(range, &[sym("huge", 0x800, 0x10000)]);

        assert_eq!(table.name_at(0x1001), Some("huge"));
        assert_eq!(table.name_at(0x100f), Some("huge"));
    }

    #[test]
    fn out_of_range_symbols_are_skipped() {
        let range = CodeRange {
            start: 0x1000,
            end: 0x1010,
        };
        let symbols = vec![
            sym("below", 0x800, 0x100),
            sym("above", 0x2000, 0x100),
            // Half-open: ends exactly at range start, owns nothing here.
            sym("adjacent", 0xf00, 0x100),
        ];
        let table = AttributionTable::build(range, &symbols);

        for addr in 0x1001..0x1008 {
            assert_eq!(table.name_at(addr), Some(format!("[0x{:x}]", addr).as_str()));
        }
    }

    #[test]
    fn tiny_table_has_no_unknown_slot() {
        let range = CodeRange {
            start: 0x1000,
            end: 0x1004,
        };
        let table = AttributionTable::build(range, &[]);

        assert_eq!(table.len(), 4);
        assert_eq!(table.name_at(0x1000), Some(TOTAL_LABEL));
        assert_eq!(table.name_at(0x1003), Some("[0x1003]"));
    }
}
