// f-lang -- an interpreter and compiler for the F language
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The AST-to-C transpiler: scope analysis, emission, and the driver
//! that hands the translation unit to an external C compiler.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use snafu::Snafu;

use crate::lang::ast::Module;
use crate::toolchain;

pub mod builder;
pub mod cast;
pub mod emit;
pub mod scope;

/// The pre-written runtime the emitted unit `#include`s; written next to
/// the generated source so the include resolves.
pub const F_RUNTIME: &str = include_str!("f_runtime.c");

#[derive(Debug, Snafu)]
pub enum BuildError {
    #[snafu(display("{}", source))]
    Analysis { source: cast::AnalysisError },
    #[snafu(display("cannot write {}: {}", path.display(), source))]
    WriteSource {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("{}", source))]
    Toolchain { source: toolchain::ToolchainError },
}

/// Translate a module into a single C translation unit.
pub fn transpile(module: &Module) -> Result<String, cast::AnalysisError> {
    let analysis = cast::analyze(module)?;
    Ok(emit::generate(&analysis))
}

/// Transpile `module` and compile it to a native executable placed next
/// to `source_path`. Returns the path of the executable.
pub fn compile_to_executable(module: &Module, source_path: &Path) -> Result<PathBuf, BuildError> {
    let c_source = transpile(module).map_err(|source| BuildError::Analysis { source })?;

    let unit_path = source_path.with_extension("c");
    let runtime_path = unit_path.with_file_name("f_runtime.c");
    write_file(&runtime_path, F_RUNTIME)?;
    write_file(&unit_path, &c_source)?;

    let compiler = toolchain::get_compiler()
        .map_err(|source| BuildError::Toolchain { source })?;
    let executable = toolchain::make_executable_path(&unit_path);
    info!(
        "compiling {} with {}",
        unit_path.display(),
        compiler.name()
    );
    compiler
        .compile_to_executable(&unit_path, &executable)
        .map_err(|source| BuildError::Toolchain { source })?;
    Ok(executable)
}

fn write_file(path: &Path, contents: &str) -> Result<(), BuildError> {
    fs::write(path, contents).map_err(|source| BuildError::WriteSource {
        path: path.to_owned(),
        source,
    })
}
