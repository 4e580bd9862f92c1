use clap::Parser;
use lc3_vm::emulator::Emulator;
use lc3_vm::errors::ExecutionError;
use lc3_vm::terminal;
use log::{LevelFilter, info};
use simple_logger::SimpleLogger;
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_LOAD_FAILURE: u8 = 1;
const EXIT_ILLEGAL_OPCODE: u8 = 3;
const EXIT_IO_FAILURE: u8 = 4;
const EXIT_INTERRUPTED: u8 = 130;

/// Runs LC-3 program images in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Program images, loaded in the given order, later ones overwrite overlapping memory
    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<PathBuf>,
    /// Level of log messages written to stderr
    #[arg(long, default_value_t = LevelFilter::Off)]
    log_level: LevelFilter,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = SimpleLogger::new().with_level(args.log_level).init() {
        eprintln!("Could not initialize logging: {e}");
    }

    let mut emu = Emulator::new();
    if let Err(code) = load_images(&mut emu, &args.images, &mut io::stderr()) {
        return ExitCode::from(code);
    }

    let result = {
        let _lock = terminal::set_terminal_raw();
        emu.execute()
    };
    ExitCode::from(report_result(result, &mut io::stdout(), &mut io::stderr()))
}

/// Loads all images in order, stops at the first one failing and reports it on `stderr`.
fn load_images(emu: &mut Emulator, images: &[PathBuf], stderr: &mut impl Write) -> Result<(), u8> {
    for image in images {
        if let Err(e) = emu.load_program_file(image) {
            // nothing left to report to if stderr fails
            let _ = writeln!(stderr, "{e}");
            return Err(EXIT_LOAD_FAILURE);
        }
    }
    Ok(())
}

/// Maps the end of a run to the process exit code, an interrupted run ends the line the
/// program was writing.
fn report_result(
    result: Result<(), ExecutionError>,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> u8 {
    match result {
        Ok(()) => {
            info!("Program halted");
            0
        }
        Err(ExecutionError::Interrupted) => {
            let _ = writeln!(stdout);
            let _ = stdout.flush();
            EXIT_INTERRUPTED
        }
        Err(e @ ExecutionError::IllegalOpcode { .. }) => {
            let _ = writeln!(stderr, "{e}");
            EXIT_ILLEGAL_OPCODE
        }
        Err(e @ ExecutionError::IOInputOutputError(_)) => {
            let _ = writeln!(stderr, "{e}");
            EXIT_IO_FAILURE
        }
    }
}
