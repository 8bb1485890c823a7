#[allow(unused)]
use {
    crate::KpdumpError,
    error_stack::{Report, Result, ResultExt},
    jlogger_tracing::{jdebug, jerror, jinfo, jwarn},
    object::{elf, Object, ObjectSegment, ObjectSymbol, SegmentFlags},
    std::{fs, path::Path},
};

pub fn demangle_sym(sym: &str) -> String {
    if let Ok(sym) = cpp_demangle::Symbol::new(sym.as_bytes()) {
        sym.to_string()
    } else {
        sym.to_string()
    }
}

/// One PT_LOAD program header of the kernel image.
#[derive(Debug, Clone, Copy)]
pub struct LoadSegment {
    pub vaddr: u64,
    pub memsz: u64,
    pub executable: bool,
}

/// One symbol table entry, name already demangled.
#[derive(Debug, Clone)]
pub struct SymbolRecord {
    pub name: String,
    pub value: u64,
    pub size: u64,
}

/// Load segments and symbols extracted from a kernel ELF image.
///
/// The image file is fully read at open time; the records keep the order
/// the ELF tables store them in.
#[derive(Debug)]
pub struct KernelImage {
    path: String,
    segments: Vec<LoadSegment>,
    symbols: Vec<SymbolRecord>,
}

impl KernelImage {
    pub fn open(file_name: &str) -> Result<Self, KpdumpError> {
        let mut fpathbuf = Path::new(file_name)
            .canonicalize()
            .map_err(|_| Report::new(KpdumpError::InvalidElfFile))
            .attach_printable(format!("Invalid ELF file: {}", file_name))?;

        if fpathbuf.is_symlink() {
            fpathbuf = fs::read_link(fpathbuf)
                .map_err(|_| Report::new(KpdumpError::InvalidElfFile))
                .attach_printable(format!("Invalid ELF file: {}", file_name))?
                .canonicalize()
                .map_err(|_| Report::new(KpdumpError::InvalidElfFile))
                .attach_printable(format!("Invalid ELF file: {}", file_name))?;
        }

        let fpath = fpathbuf.as_path();
        if !fpath.is_file() {
            return Err(Report::new(KpdumpError::InvalidElfFile))
                .attach_printable(format!("Invalid ELF binary : {}", file_name));
        }

        let file = fs::File::open(fpath)
            .map_err(|_| Report::new(KpdumpError::InvalidElfFile))
            .attach_printable(format!("Failed to open {}", file_name))?;

        let map = unsafe {
            memmap::Mmap::map(&file)
                .map_err(|_| Report::new(KpdumpError::InvalidElfFile))
                .attach_printable(format!("Failed to map {}", file_name))?
        };

        let object = object::File::parse(&map[..])
            .map_err(|_| Report::new(KpdumpError::InvalidElfFile))
            .attach_printable(format!("Failed to parse {}", file_name))?;

        // The segment iterator walks exactly the PT_LOAD program headers.
        let mut segments = Vec::new();
        for seg in object.segments() {
            let executable = match seg.flags() {
                SegmentFlags::Elf { p_flags } => p_flags & elf::PF_X != 0,
                _ => false,
            };

            segments.push(LoadSegment {
                vaddr: seg.address(),
                memsz: seg.size(),
                executable,
            });
        }

        let mut symbols = Vec::new();
        for sym in object.symbols() {
            if let Ok(name) = sym.name() {
                // The null entry and section symbols carry no name to
                // attribute samples to.
                if name.is_empty() {
                    continue;
                }

                symbols.push(SymbolRecord {
                    name: demangle_sym(name),
                    value: sym.address(),
                    size: sym.size(),
                });
            }
        }

        if symbols.is_empty() {
            return Err(Report::new(KpdumpError::InvalidElfFile))
                .attach_printable(format!("No symbol table in {}", file_name));
        }

        jdebug!(
            "{}: {} load segments, {} symbols",
            file_name,
            segments.len(),
            symbols.len()
        );

        Ok(KernelImage {
            path: String::from(fpath.to_str().unwrap_or(file_name)),
            segments,
            symbols,
        })
    }

    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    pub fn segments(&self) -> &[LoadSegment] {
        &self.segments
    }

    pub fn symbols(&self) -> &[SymbolRecord] {
        &self.symbols
    }
}
