// ============================================================================
// PixelForge CLI: headless batch processing via command-line arguments
// ============================================================================
//
// Usage examples:
//   pixelforge -i sprite.png -o sprite.bmp              (format inferred from output ext)
//   pixelforge -i tiles/*.png --output-dir out/ --format jpeg --quality 85
//   pixelforge -i icon.png -o icon@4x.png --resize 64x64 --scale-contents
//   pixelforge -i a.png b.png --output-dir out/ --resize 32x32 --scale-contents --smooth
//
// Each input goes through the same Project pipeline the editor uses: load,
// optional resize, flatten, encode.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use thiserror::Error;

use crate::canvas::CanvasError;
use crate::io::{self, ImageIoError, SaveFormat};
use crate::project::Project;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PixelForge headless image processor.
///
/// Convert, resize and flatten images without opening an editor.
#[derive(Parser, Debug)]
#[command(
    name = "pixelforge",
    about = "PixelForge headless batch image processor",
    long_about = "Convert and resize pixel-art images between PNG, JPEG and BMP.\n\n\
                  Example:\n  \
                  pixelforge --input sprite.png --output sprite.bmp\n  \
                  pixelforge -i *.png --resize 64x64 --scale-contents --output-dir out/"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "tiles/*.bmp").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the input's stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, bmp.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1-100, default 90).
    #[arg(short, long, default_value_t = io::DEFAULT_JPEG_QUALITY, value_name = "1-100")]
    pub quality: u8,

    /// Resize every image to WIDTHxHEIGHT before saving.
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    pub resize: Option<(u32, u32)>,

    /// Resample the content on --resize instead of clearing it.
    #[arg(long)]
    pub scale_contents: bool,

    /// Use bilinear instead of nearest-neighbour sampling with --scale-contents.
    #[arg(long)]
    pub smooth: bool,

    /// Log to stderr and print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("no input files matched the given pattern(s)")]
    NoInputs,
    #[error("{0} input files given but --output only accepts a single file path; use --output-dir")]
    OutputWithBatch(usize),
    #[error("unknown output format '{0}' (expected png, jpeg or bmp)")]
    UnknownFormat(String),
    #[error("could not create output directory '{}': {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot determine output path for '{}'", .0.display())]
    NoOutputPath(PathBuf),
    #[error("load failed: {0}")]
    Load(#[source] ImageIoError),
    #[error("save failed: {0}")]
    Save(#[source] ImageIoError),
    #[error("resize failed: {0}")]
    Resize(#[from] CanvasError),
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    match run_batch(&args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            tracing::warn!("{} file(s) failed", failures);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Process every input; returns how many files failed.  Errors that stop the
/// whole batch before any file is touched are returned as `Err`.
pub fn run_batch(args: &CliArgs) -> Result<usize, CliError> {
    // Resolve glob patterns / literal paths → concrete PathBufs
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        return Err(CliError::NoInputs);
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        return Err(CliError::OutputWithBatch(inputs.len()));
    }

    let save_format = parse_format(args.format.as_deref(), args.output.as_deref())?;

    // Create output directory if specified
    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir).map_err(|source| CliError::OutputDir {
            path: dir.clone(),
            source,
        })?;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut failures = 0usize;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();
        let result = build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            save_format,
        )
        .ok_or_else(|| CliError::NoOutputPath(input_path.clone()))
        .and_then(|output_path| {
            run_one(input_path, &output_path, save_format, args)?;
            Ok(output_path)
        });

        match result {
            Ok(output_path) => {
                tracing::info!("{} -> {}", input_path.display(), output_path.display());
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                tracing::error!("{}: {}", input_path.display(), e);
                failures += 1;
            }
        }
    }

    Ok(failures)
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(input: &Path, output: &Path, format: SaveFormat, args: &CliArgs) -> Result<(), CliError> {
    // -- Step 1: Load ----------------------------------------------------
    // One undo step is plenty for a headless run
    let mut project = Project::open(input, 1).map_err(CliError::Load)?;

    // -- Step 2: Resize (optional) ---------------------------------------
    if let Some((w, h)) = args.resize {
        project.resize(w, h, args.scale_contents, args.smooth)?;
    }

    // -- Step 3: Flatten + save ------------------------------------------
    let flat_img = project.flatten_image();
    io::encode_and_write(&flat_img, output, format, args.quality).map_err(CliError::Save)?;
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse a `WIDTHxHEIGHT` size argument.
pub fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("invalid width '{}'", w))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("invalid height '{}'", h))?;
    if w == 0 || h == 0 {
        return Err(format!("size must be non-zero, got {}x{}", w, h));
    }
    Ok((w, h))
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path, use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        // Treat as glob pattern
        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the [`SaveFormat`] from the `--format` string or infer it from the
/// output file extension. Defaults to PNG when neither is known.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<SaveFormat, CliError> {
    if let Some(f) = format_arg {
        return SaveFormat::from_extension(f).ok_or_else(|| CliError::UnknownFormat(f.to_string()));
    }

    let inferred = output
        .and_then(|out| out.extension())
        .and_then(|e| e.to_str())
        .and_then(SaveFormat::from_extension);
    Ok(inferred.unwrap_or(SaveFormat::Png))
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> Option<PathBuf> {
    // Explicit output path
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    // Write next to the input file
    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("64x32"), Ok((64, 32)));
        assert_eq!(parse_size("8X8"), Ok((8, 8)));
        assert!(parse_size("64").is_err());
        assert!(parse_size("0x5").is_err());
        assert!(parse_size("ax5").is_err());
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format(Some("JPG"), None).unwrap(), SaveFormat::Jpeg);
        assert_eq!(
            parse_format(None, Some(Path::new("out/a.bmp"))).unwrap(),
            SaveFormat::Bmp
        );
        assert_eq!(parse_format(None, Some(Path::new("a.xyz"))).unwrap(), SaveFormat::Png);
        assert_eq!(parse_format(None, None).unwrap(), SaveFormat::Png);
        assert!(matches!(parse_format(Some("tiff"), None), Err(CliError::UnknownFormat(_))));
    }

    #[test]
    fn test_build_output_path() {
        let input = Path::new("art/sprite.png");
        assert_eq!(
            build_output_path(input, Some(Path::new("x.bmp")), None, SaveFormat::Png),
            Some(PathBuf::from("x.bmp"))
        );
        assert_eq!(
            build_output_path(input, None, Some(Path::new("out")), SaveFormat::Jpeg),
            Some(PathBuf::from("out/sprite.jpg"))
        );
        assert_eq!(
            build_output_path(input, None, None, SaveFormat::Bmp),
            Some(PathBuf::from("art/sprite.bmp"))
        );
        assert_eq!(
            build_output_path(input, None, None, SaveFormat::Png),
            Some(PathBuf::from("art/sprite_out.png"))
        );
    }

    #[test]
    fn test_args_parse() {
        let args = CliArgs::try_parse_from([
            "pixelforge",
            "-i",
            "a.png",
            "b.png",
            "--output-dir",
            "out",
            "--resize",
            "16x8",
            "--scale-contents",
        ])
        .unwrap();
        assert_eq!(args.input, vec!["a.png", "b.png"]);
        assert_eq!(args.resize, Some((16, 8)));
        assert!(args.scale_contents);
        assert!(!args.smooth);
        assert_eq!(args.quality, 90);

        assert!(CliArgs::try_parse_from(["pixelforge"]).is_err());
        assert!(CliArgs::try_parse_from(["pixelforge", "-i", "a.png", "--resize", "big"]).is_err());
    }

    #[test]
    fn test_resolve_inputs_glob() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.png", "c.bmp"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let pattern = dir.path().join("*.png").to_string_lossy().into_owned();
        let literal = dir.path().join("a.png").to_string_lossy().into_owned();
        let found = resolve_inputs(&[literal, pattern]);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.extension().is_some_and(|e| e == "png")));
    }

    #[test]
    fn test_batch_with_single_output_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let pattern = dir.path().join("*.png").to_string_lossy().into_owned();
        let args = CliArgs::try_parse_from(["pixelforge", "-i", &pattern, "-o", "x.png"]).unwrap();
        assert!(matches!(run_batch(&args), Err(CliError::OutputWithBatch(2))));
    }
}
