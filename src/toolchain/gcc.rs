//! Driving a gcc-style compiler through a subprocess.

use std::path::Path;
use std::process::{Command, Stdio};

use super::{Compiler, ToolchainError};

/// A C compiler invoked as `<command> -o <out> <file> -lm`. Both `gcc`
/// and `cc` speak this interface.
pub struct CommandCompiler {
    command: &'static str,
}

impl CommandCompiler {
    pub fn new(command: &'static str) -> Self {
        Self { command }
    }

    /// Probe for the compiler by asking for its version.
    pub fn is_available(&self) -> bool {
        Command::new(self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl Compiler for CommandCompiler {
    fn name(&self) -> &'static str {
        self.command
    }

    fn compile_to_executable(&self, file: &Path, out: &Path) -> Result<(), ToolchainError> {
        let args = [
            "-o".to_owned(),
            out.display().to_string(),
            file.display().to_string(),
            "-lm".to_owned(),
        ];
        let output = Command::new(self.command)
            .args(&args)
            .output()
            .map_err(|source| ToolchainError::Spawn {
                compiler: self.command,
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ToolchainError::CompilationFailed {
                compiler: self.command,
                code: output.status.code().unwrap_or(-1),
                file: file.to_owned(),
                command: format!("{} {}", self.command, args.join(" ")),
                diagnostics: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}
