// f-lang -- an interpreter and compiler for the F language
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Wraps the external C toolchain: one translation unit in, one native
//! executable out. Non-zero exit status surfaces as a compilation
//! failure carrying the command line and the captured diagnostics.

use std::path::{Path, PathBuf};

use snafu::Snafu;

pub mod gcc;

#[derive(Debug, Snafu)]
pub enum ToolchainError {
    #[snafu(display(
        "couldn't find any C compiler on this system; install gcc or cc"
    ))]
    NoCompilerFound,
    #[snafu(display(
        "{} failed with return code {} while compiling {}\ncommand line: {}\n\n{}",
        compiler,
        code,
        file.display(),
        command,
        diagnostics
    ))]
    CompilationFailed {
        compiler: &'static str,
        code: i32,
        file: PathBuf,
        command: String,
        diagnostics: String,
    },
    #[snafu(display("failed to run {}: {}", compiler, source))]
    Spawn {
        compiler: &'static str,
        source: std::io::Error,
    },
}

/// The interface to a C compiler: one translation unit in, one
/// executable out.
pub trait Compiler {
    fn name(&self) -> &'static str;
    fn compile_to_executable(&self, file: &Path, out: &Path) -> Result<(), ToolchainError>;
}

/// Pick the first compiler available on this system.
pub fn get_compiler() -> Result<Box<dyn Compiler>, ToolchainError> {
    for command in &["gcc", "cc"] {
        let candidate = gcc::CommandCompiler::new(command);
        if candidate.is_available() {
            return Ok(Box::new(candidate));
        }
    }
    Err(ToolchainError::NoCompilerFound)
}

/// Where the executable for a translation unit goes: the same path with
/// the extension dropped (`.exe` on Windows).
pub fn make_executable_path(file: &Path) -> PathBuf {
    if cfg!(windows) {
        file.with_extension("exe")
    } else {
        file.with_extension("")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn executable_paths() {
        let exe = make_executable_path(Path::new("/tmp/prog.c"));
        if cfg!(windows) {
            assert_eq!(exe, Path::new("/tmp/prog.exe"));
        } else {
            assert_eq!(exe, Path::new("/tmp/prog"));
        }
    }
}
