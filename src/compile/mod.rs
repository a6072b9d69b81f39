use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use rand::distr::{Alphanumeric, SampleString};

use crate::infra::{ExitCode, MiniJavaError, report};

pub mod ast;
pub mod llvm;
pub mod parser;
pub mod semantic;

/// Parses, analyzes and lowers one unit held in memory.
pub fn compile_source(src: &str) -> Result<String, MiniJavaError> {
    let program = parser::parse_source(src)?;
    let model = semantic::analyze(&program)?;

    Ok(llvm::generate(&program, &model)?)
}

/// `dir/name.java` becomes `dir/name.ll`, or `out_dir/name.ll` when a directory is given.
pub fn output_path(src: &Path, out_dir: Option<&Path>) -> PathBuf {
    let out = src.with_extension("ll");

    match (out_dir, out.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => out,
    }
}

/// Compiles each unit on its own. Failures are reported as they happen and do
/// not stop later units; the first failing unit decides the exit code.
pub fn compile_all(srcs: &[PathBuf], out_dir: Option<&Path>, verbose: bool, offsets: bool) -> ExitCode {
    let mut exit_code = ExitCode::SUCCESS;

    for src in srcs.iter() {
        let mut compiler = Compiler::new();
        compiler
            .src(src.clone())
            .out(output_path(src, out_dir))
            .verbose(verbose)
            .offsets(offsets);

        let Err(err) = compiler.compile() else {
            continue;
        };

        let path = src.display().to_string();
        if let Err(io_err) = report::eprint(&path, compiler.source().unwrap_or_default(), &err) {
            eprintln!("{path}: {err} ({io_err})");
        }

        if exit_code.is_success() {
            exit_code = ExitCode::from(&err);
        }
    }

    exit_code
}

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    src_path: Option<PathBuf>,
    out_path: Option<PathBuf>,
    verbose: bool,
    offsets: bool,
    source: Option<String>,
}

impl Compiler {
    pub fn new() -> Compiler {
        Compiler::default()
    }

    pub fn src(&mut self, src: PathBuf) -> &mut Self {
        self.src_path = Some(src);

        self
    }

    pub fn out(&mut self, out: PathBuf) -> &mut Self {
        self.out_path = Some(out);

        self
    }

    pub fn verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;

        self
    }

    pub fn offsets(&mut self, offsets: bool) -> &mut Self {
        self.offsets = offsets;

        self
    }

    /// Text of the last unit read, for rendering diagnostics.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn compile(&mut self) -> Result<&mut Self, MiniJavaError> {
        let src_path = self
            .src_path
            .clone()
            .ok_or_else(|| missing_path("source"))?;
        let out_path = match &self.out_path {
            Some(out_path) => out_path.clone(),
            None => output_path(&src_path, None),
        };

        let src = fs::read_to_string(&src_path)?;
        self.source = Some(src.clone());

        let program = parser::parse_source(&src)?;
        self.progress(format_args!("{} parsed successfully.", src_path.display()));

        let model = semantic::analyze(&program)?;
        if self.offsets {
            print!("{}", model.render_offsets()?);
        }

        let ir = llvm::generate(&program, &model)?;
        write_atomically(&out_path, &ir)?;
        self.progress(format_args!(
            "{} written to {}",
            src_path.display(),
            out_path.display()
        ));

        Ok(self)
    }

    fn progress(&self, message: std::fmt::Arguments) {
        if self.verbose {
            eprintln!("{message}");
        }
    }
}

fn missing_path(kind: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("no {kind} path provided"))
}

// Writes next to the target under a random name first, so a failed unit never leaves partial output.
fn write_atomically(out_path: &Path, text: &str) -> Result<(), io::Error> {
    let Some(file_name) = out_path.file_name() else {
        return Err(missing_path("output"));
    };

    let slug: String = Alphanumeric.sample_string(&mut rand::rng(), 8);
    let tmp_path = out_path.with_file_name(format!("{}.{slug}.tmp", file_name.to_string_lossy()));

    let written = File::create(&tmp_path)
        .and_then(|mut file| {
            file.write_all(text.as_bytes())?;
            file.flush()
        })
        .and_then(|_| fs::rename(&tmp_path, out_path));

    if written.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }

    written
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let slug: String = Alphanumeric.sample_string(&mut rand::rng(), 8);
        let dir = std::env::temp_dir().join(format!("minijava-{name}-{slug}"));
        fs::create_dir_all(&dir).unwrap();

        dir
    }

    #[test]
    fn output_path_replaces_extension() {
        assert_eq!(
            output_path(Path::new("dir/Fac.java"), None),
            PathBuf::from("dir/Fac.ll")
        );
        assert_eq!(
            output_path(Path::new("dir/Fac.java"), Some(Path::new("out"))),
            PathBuf::from("out/Fac.ll")
        );
    }

    #[test]
    fn compiles_file_to_sibling_output() {
        let dir = scratch_dir("ok");
        let src = dir.join("Main.java");
        fs::write(
            &src,
            "class Main { public static void main(String[] a) { System.out.println(1); } }",
        )
        .unwrap();

        Compiler::new().src(src.clone()).compile().unwrap();

        let ir = fs::read_to_string(dir.join("Main.ll")).unwrap();
        assert!(ir.contains("define void @main()"));

        let leftovers: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn failing_unit_leaves_no_output() {
        let dir = scratch_dir("fail");
        let src = dir.join("Bad.java");
        fs::write(
            &src,
            "class Main { public static void main(String[] a) { x = 1; } }",
        )
        .unwrap();

        let mut compiler = Compiler::new();
        let err = compiler.src(src).compile().unwrap_err();

        assert_eq!(ExitCode::from(&err), ExitCode::FAIL_SEMANTIC);
        assert!(compiler.source().is_some());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn later_units_still_compile_after_a_failure() {
        let dir = scratch_dir("many");
        let bad = dir.join("Bad.java");
        let good = dir.join("Good.java");
        let broken = dir.join("Broken.java");
        fs::write(
            &bad,
            "class Main { public static void main(String[] a) { int x; x = true; } }",
        )
        .unwrap();
        fs::write(
            &good,
            "class Main { public static void main(String[] a) { System.out.println(2); } }",
        )
        .unwrap();
        fs::write(&broken, "class Main {").unwrap();

        let out = dir.join("out");
        fs::create_dir_all(&out).unwrap();
        let exit_code = compile_all(&[bad, good, broken], Some(out.as_path()), false, false);

        assert_eq!(exit_code, ExitCode::FAIL_SEMANTIC);
        assert!(fs::read_to_string(out.join("Good.ll")).unwrap().contains("define void @main()"));
        assert!(!out.join("Bad.ll").exists());
        assert!(!out.join("Broken.ll").exists());

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn all_units_compiling_is_a_success() {
        let dir = scratch_dir("all");
        let src = dir.join("One.java");
        fs::write(
            &src,
            "class Main { public static void main(String[] a) { System.out.println(1); } }",
        )
        .unwrap();

        assert_eq!(compile_all(&[src], None, false, false), ExitCode::SUCCESS);
        assert!(dir.join("One.ll").exists());

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_source_is_an_io_failure() {
        let err = Compiler::new()
            .src(PathBuf::from("/definitely/not/here.java"))
            .compile()
            .unwrap_err();

        assert_eq!(ExitCode::from(&err), ExitCode::FAIL_IO);
    }
}
