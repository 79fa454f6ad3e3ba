//! Entry point for vtkmesh.
//! Converts legacy mesh files into flat render buffers (JSON).

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;

use asset::derive::{Precedence, UvSource};
use asset::legacy::{load_legacy_from_str, scan_lookup_table};
use asset::mesh::{AttributeSet, Mesh};
use asset::{ConvertOptions, LookupMode, LookupTable, VertexMode, convert_file};

#[derive(Parser)]
#[command(name = "vtkmesh")]
#[command(about = "Legacy mesh to render-buffer converter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert mesh files to <stem>.mesh.json
    Convert {
        /// Input legacy mesh files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory (defaults to each input's directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: ConvertArgs,
    },

    /// Print geometry, arrays, tables and warnings of a mesh file
    Inspect {
        input: PathBuf,
    },

    /// Write the sample cube file
    Generate {
        #[arg(default_value = "cube.vtk")]
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Shared,
    Duplicated,
}

#[derive(Clone, Copy, ValueEnum)]
enum PrecedenceArg {
    Point,
    Cell,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Vertex sharing between triangles
    #[arg(long, value_enum, default_value = "shared")]
    mode: ModeArg,

    /// Scalar array to color by (default: the active one)
    #[arg(long)]
    scalars: Option<String>,

    /// Component of the scalar array to map
    #[arg(long, default_value_t = 0)]
    component: usize,

    /// Lookup table to use instead of the array's own
    #[arg(long)]
    lut: Option<String>,

    /// Entries of the fallback hue-ramp table
    #[arg(long, default_value_t = LookupTable::DEFAULT_SIZE)]
    lut_size: usize,

    /// Scalar range mapped onto the table
    #[arg(long, num_args = 2, value_names = ["LO", "HI"], allow_negative_numbers = true)]
    range: Option<Vec<f64>>,

    /// Data class whose scalars win when both exist
    #[arg(long, value_enum, default_value = "point")]
    precedence: PrecedenceArg,

    /// Blend neighbouring table entries instead of picking the nearest
    #[arg(long)]
    interpolate: bool,

    /// Ignore file texture coordinates
    #[arg(long)]
    planar_uvs: bool,

    /// Compute normals when the file has none (smooth in shared mode)
    #[arg(long)]
    compute_normals: bool,
}

impl ConvertArgs {
    fn to_options(&self) -> ConvertOptions {
        ConvertOptions {
            vertex_mode: match self.mode {
                ModeArg::Shared => VertexMode::Shared,
                ModeArg::Duplicated => VertexMode::Duplicated,
            },
            scalars: self.scalars.clone(),
            component: self.component,
            lookup_table: self.lut.clone(),
            default_table_size: self.lut_size,
            scalar_range: self.range.as_deref().and_then(|r| match r {
                [lo, hi] => Some((*lo, *hi)),
                _ => None,
            }),
            precedence: match self.precedence {
                PrecedenceArg::Point => Precedence::Point,
                PrecedenceArg::Cell => Precedence::Cell,
            },
            lookup_mode: if self.interpolate {
                LookupMode::Linear
            } else {
                LookupMode::Nearest
            },
            uv_source: if self.planar_uvs {
                UvSource::Planar
            } else {
                UvSource::Auto
            },
            compute_normals: self.compute_normals,
        }
    }
}

fn output_path(input: &Path, dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "mesh".into(), |s| s.to_string_lossy().into_owned());
    let dir = dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{stem}.mesh.json"))
}

/// Output file for every input, refusing two inputs that would write the
/// same file.
fn plan_outputs(inputs: &[PathBuf], dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut seen: HashMap<PathBuf, &Path> = HashMap::new();
    let mut outputs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let out = output_path(input, dir);
        if let Some(first) = seen.insert(out.clone(), input) {
            bail!(
                "{} and {} would both write {}",
                first.display(),
                input.display(),
                out.display()
            );
        }
        outputs.push(out);
    }
    Ok(outputs)
}

fn convert_one(input: &Path, out: &Path, opts: &ConvertOptions) -> Result<()> {
    let conversion =
        convert_file(input, opts).with_context(|| format!("converting {}", input.display()))?;
    conversion
        .buffers
        .validate()
        .with_context(|| format!("assembled buffers of {}", input.display()))?;

    let file = File::create(out).with_context(|| format!("creating {}", out.display()))?;
    serde_json::to_writer(BufWriter::new(file), &conversion)
        .with_context(|| format!("writing {}", out.display()))?;
    log::info!(
        "{} -> {} ({} triangles)",
        input.display(),
        out.display(),
        conversion.report.triangles
    );
    Ok(())
}

fn convert(inputs: &[PathBuf], output: Option<&Path>, opts: &ConvertOptions) -> Result<()> {
    let outputs = plan_outputs(inputs, output)?;
    if let Some(dir) = output {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    // Inputs share nothing, so each converts on its own worker.
    let failures = inputs
        .par_iter()
        .zip(&outputs)
        .map(|(input, out)| convert_one(input, out, opts))
        .filter_map(Result::err)
        .inspect(|err| log::error!("{err:#}"))
        .count();

    if failures > 0 {
        bail!("{failures} of {} inputs failed", inputs.len());
    }
    Ok(())
}

/// File contents with invalid UTF-8 replaced, as the converter reads them.
fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn print_arrays(label: &str, set: &AttributeSet) {
    for array in set.arrays() {
        println!(
            "  {label} {:<24} {:?}, {} x {}{}",
            array.name,
            array.role,
            array.values.tuple_count(),
            array.values.components(),
            array
                .lookup_table
                .as_deref()
                .map_or_else(String::new, |t| format!(", table {t}"))
        );
    }
}

fn inspect(input: &Path) -> Result<()> {
    let text = read_text(input)?;
    let mesh: Mesh =
        load_legacy_from_str(&text).with_context(|| format!("parsing {}", input.display()))?;

    println!("{}: '{}' ({:?})", input.display(), mesh.description, mesh.kind);
    println!(
        "  points {}, verts {}, lines {}, polygons {}, strips {}, cells {}, triangles {}",
        mesh.points.len(),
        mesh.verts.len(),
        mesh.lines.len(),
        mesh.polys.len(),
        mesh.strips.len(),
        mesh.cell_count,
        mesh.triangle_count()
    );
    let bounds = mesh.bounds();
    if !bounds.is_empty() {
        println!("  bounds {:?} .. {:?}", bounds.min, bounds.max);
    }
    print_arrays("point", &mesh.point_data);
    print_arrays("cell ", &mesh.cell_data);
    for field in mesh.field_data.values() {
        println!(
            "  field {:<24} {} x {} ({:?})",
            field.name,
            field.values.tuple_count(),
            field.values.components(),
            field.association
        );
    }
    for name in mesh.lookup_tables.keys() {
        match scan_lookup_table(&text, name) {
            Ok(entries) => println!("  table {name:<24} {} entries", entries.len()),
            Err(err) => println!("  table {name:<24} unusable: {err}"),
        }
    }
    for warning in &mesh.warnings {
        println!("  warning: {warning}");
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert {
            inputs,
            output,
            options,
        } => convert(&inputs, output.as_deref(), &options.to_options()),
        Commands::Inspect { input } => inspect(&input),
        Commands::Generate { path } => asset::sample::write_sample_cube(&path)
            .with_context(|| format!("writing {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_lands_next_to_input_by_default() {
        let p = output_path(Path::new("data/cube.vtk"), None);
        assert_eq!(p, PathBuf::from("data/cube.mesh.json"));
        let p = output_path(Path::new("data/cube.vtk"), Some(Path::new("out")));
        assert_eq!(p, PathBuf::from("out/cube.mesh.json"));
    }

    #[test]
    fn colliding_outputs_are_refused() {
        let inputs = [PathBuf::from("a/cube.vtk"), PathBuf::from("b/cube.vtk")];
        let outs = plan_outputs(&inputs, None).expect("distinct directories");
        assert_eq!(outs[1], PathBuf::from("b/cube.mesh.json"));

        let err = plan_outputs(&inputs, Some(Path::new("out"))).expect_err("same output");
        let msg = err.to_string();
        assert!(msg.contains("a/cube.vtk") && msg.contains("out/cube.mesh.json"), "{msg}");
    }

    #[test]
    fn inspect_reads_non_utf8_files() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let mut bytes = asset::sample::SAMPLE_CUBE.as_bytes().to_vec();
        // Latin-1 e-acute in the title line.
        let title = bytes.iter().position(|&b| b == b'\n').expect("header line") + 1;
        bytes.insert(title, 0xE9);
        std::io::Write::write_all(&mut file, &bytes).expect("write");

        let text = read_text(file.path()).expect("lossy read");
        let mesh = load_legacy_from_str(&text).expect("parse");
        assert!(mesh.description.starts_with('\u{FFFD}'));
        inspect(file.path()).expect("inspect");
    }

    #[test]
    fn cli_flags_map_onto_options() {
        let cli = Cli::parse_from([
            "vtkmesh",
            "convert",
            "a.vtk",
            "--mode",
            "duplicated",
            "--range",
            "-1",
            "2.5",
            "--precedence",
            "cell",
            "--interpolate",
        ]);
        let Commands::Convert { options, .. } = cli.command else {
            panic!("expected convert");
        };
        let opts = options.to_options();
        assert_eq!(opts.vertex_mode, VertexMode::Duplicated);
        assert_eq!(opts.scalar_range, Some((-1.0, 2.5)));
        assert_eq!(opts.precedence, Precedence::Cell);
        assert_eq!(opts.lookup_mode, LookupMode::Linear);
        assert_eq!(opts.default_table_size, 256);
    }
}
