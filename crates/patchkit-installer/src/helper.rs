use anyhow::{anyhow, Context, Result};
use std::io::{self, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

/// Runs an external helper, copying its stdout and stderr to the given sinks
/// on two background threads until each stream ends.
///
/// The pumps share nothing with each other or with the patch engine.
pub fn run_helper<O, E>(command: &mut Command, stdout_sink: O, stderr_sink: E) -> Result<ExitStatus>
where
    O: Write + Send + 'static,
    E: Write + Send + 'static,
{
    let program = command.get_program().to_string_lossy().into_owned();
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start helper '{program}'"))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("helper '{program}' stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("helper '{program}' stderr was not captured"))?;

    let stdout_pump = start_pump("helper-stdout", stdout, stdout_sink)?;
    let stderr_pump = start_pump("helper-stderr", stderr, stderr_sink)?;

    let status = child
        .wait()
        .with_context(|| format!("failed waiting for helper '{program}'"))?;

    for (stream, pump) in [("stdout", stdout_pump), ("stderr", stderr_pump)] {
        pump.join()
            .map_err(|_| anyhow!("helper '{program}' {stream} pump panicked"))?
            .with_context(|| format!("failed copying helper '{program}' {stream}"))?;
    }

    Ok(status)
}

fn start_pump<R, W>(name: &str, mut reader: R, mut writer: W) -> Result<JoinHandle<io::Result<u64>>>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let copied = io::copy(&mut reader, &mut writer)?;
            writer.flush()?;
            Ok(copied)
        })
        .with_context(|| format!("failed to start {name} pump"))
}
