use std::process::ExitCode;

use psnap::{SnapError, SnapResult};

fn run() -> SnapResult<()> {
    let mut args = std::env::args().skip(1);
    let pid = match (args.next(), args.next()) {
        (Some(pid), None) => pid,
        _ => return Err(SnapError::Usage("usage: psnap <pid>")),
    };
    // atoi semantics: a malformed pid queries the kernel as pid 0 and
    // surfaces as a missing record, not as a parse error
    let pid = pid.trim().parse::<i32>().unwrap_or(0);

    let snapshot = psnap::snapshot(pid)?;
    println!("{}", snapshot.render_line()?);
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("psnap: {}", e);
            ExitCode::FAILURE
        }
    }
}
