#[allow(unused)]
use {
    error_stack::{Report, Result, ResultExt},
    jlogger_tracing::{
        jdebug, jerror, jinfo, jtrace, jwarn, JloggerBuilder, LevelFilter, LogTimeFormat,
    },
    std::fmt::Display,
};

#[derive(Debug)]
pub enum KpdumpError {
    InvalidElfFile,
    NoCodeSegment,
    SampleOutOfRange,
    IOError,
    InvalidData,
}

impl Display for KpdumpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (code, desc) = error_desc(self);
        write!(f, "{}({}).", code, desc)
    }
}

impl std::error::Error for KpdumpError {}

pub fn error_desc(error: &KpdumpError) -> (i32, &'static str) {
    match error {
        KpdumpError::InvalidElfFile => (-1, "Invalid ELF file"),
        KpdumpError::NoCodeSegment => (-2, "No executable code segment"),
        KpdumpError::SampleOutOfRange => (-3, "Sample out of code range"),
        KpdumpError::IOError => (-4, "IO error"),
        KpdumpError::InvalidData => (-5, "Invalid data"),
    }
}
