#[allow(unused)]
use {
    clap::{ArgAction, Parser},
    error_stack::{Report, Result, ResultExt},
    jlogger_tracing::{
        jdebug, jerror, jinfo, jtrace, jwarn, JloggerBuilder, LevelFilter, LogTimeFormat,
    },
    kdumplib::{AttributionTable, CodeRange, KernelImage, KpdumpError, SampleStream},
    std::{
        fs,
        io::{self, BufReader, BufWriter, Write},
    },
};

#[derive(Parser, Debug)]
struct Cli {
    ///Kernel image to attribute samples against.
    #[clap(short, long, default_value = "9k")]
    kernel: String,

    ///File to store the dump instead of stdout.
    #[clap(short, long)]
    output: Option<String>,

    ///Verbose.
    #[clap(short, long, action = ArgAction::Count)]
    verbose: u8,

    ///Profiling sample count file.
    #[clap()]
    samples: String,
}

fn main() -> Result<(), KpdumpError> {
    let cli = Cli::parse();
    let max_level = match cli.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    JloggerBuilder::new()
        .max_level(max_level)
        .log_runtime(false)
        .build();

    let image = KernelImage::open(&cli.kernel)?;
    let range = CodeRange::from_segments(image.segments())?;
    jinfo!(
        "{}: code 0x{:x}..0x{:x}",
        image.path(),
        range.start,
        range.end
    );

    let table = AttributionTable::build(range, image.symbols());

    let samples = fs::OpenOptions::new()
        .read(true)
        .open(&cli.samples)
        .map_err(|_| Report::new(KpdumpError::IOError))
        .attach_printable(format!("Failed to open {}", cli.samples))?;

    let mut out: BufWriter<Box<dyn Write>> = if let Some(file_name) = &cli.output {
        let _ = fs::remove_file(file_name);
        let f = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(file_name)
            .map_err(|_| Report::new(KpdumpError::IOError))
            .attach_printable(format!("Failed to open {}", file_name))?;
        BufWriter::new(Box::new(f))
    } else {
        BufWriter::new(Box::new(io::stdout()))
    };

    let mut stream = SampleStream::new(BufReader::new(samples), &table);
    loop {
        match stream.next_sample() {
            Ok(Some((name, count))) => {
                writeln!(out, "{} {}", name, count)
                    .map_err(|_| Report::new(KpdumpError::IOError))
                    .attach_printable("Failed to write dump line")?;
            }
            Ok(None) => break,
            Err(e) => match e.current_context() {
                // A bad read ends the dump where it stands; everything
                // attributed so far is still valid output.
                KpdumpError::IOError => {
                    jerror!("{:?}", e);
                    break;
                }
                _ => return Err(e),
            },
        }
    }

    out.flush()
        .map_err(|_| Report::new(KpdumpError::IOError))
        .attach_printable("Failed to flush dump output")?;

    if let Some(file_name) = &cli.output {
        jinfo!("Written to {}.", file_name);
    }

    Ok(())
}
