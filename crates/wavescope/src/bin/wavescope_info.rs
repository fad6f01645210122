use clap::{arg, value_parser, ArgMatches, Command};
use serde_json::json;
use std::path::PathBuf;
use wavescope_data::{decode_voxel_map, load_mesh, FrameSeries};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let matches = Command::new("wavescope-info")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Display information about wavescope data files")
        .subcommand_required(true)
        .arg(arg!(--json "Print the summary as JSON").global(true))
        .subcommand(
            Command::new("mesh")
                .about("Summarize a binary STL mesh")
                .arg(arg!(<FILE> "Mesh file").value_parser(value_parser!(PathBuf))),
        )
        .subcommand(
            Command::new("series")
                .about("Summarize a frame series")
                .arg(arg!(<FILE> "Series file").value_parser(value_parser!(PathBuf)))
                .arg(
                    arg!(--elements <N> "Values per frame")
                        .required(true)
                        .value_parser(value_parser!(usize)),
                )
                .arg(arg!([FRAME] "Frame to inspect").value_parser(value_parser!(u64))),
        )
        .subcommand(
            Command::new("voxels")
                .about("Summarize a voxel material map")
                .arg(arg!(<FILE> "Voxel map file").value_parser(value_parser!(PathBuf)))
                .arg(
                    arg!(--dims <DIM> "Grid size along x and y")
                        .required(true)
                        .num_args(2)
                        .value_parser(value_parser!(u32)),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("mesh", sub)) => mesh_info(sub),
        Some(("series", sub)) => series_info(sub),
        Some(("voxels", sub)) => voxel_info(sub),
        _ => unreachable!("subcommand_required"),
    }
}

fn file_arg(matches: &ArgMatches) -> Result<&PathBuf, Box<dyn std::error::Error>> {
    matches
        .get_one::<PathBuf>("FILE")
        .ok_or_else(|| "missing FILE argument".into())
}

fn mesh_info(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let path = file_arg(matches)?;
    let mesh = load_mesh(path)?;

    if matches.get_flag("json") {
        let bounds = mesh
            .bounds()
            .map(|(min, max)| json!({ "min": min, "max": max }));
        let report = json!({
            "file": path,
            "triangles": mesh.triangle_count(),
            "vertices": mesh.vertex_count(),
            "bounds": bounds,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Mesh File Information:");
    println!("=====================");
    println!("File: {}", path.display());
    println!("Number of triangles: {}", mesh.triangle_count());
    println!("Vertices: {}", mesh.vertex_count());

    if let Some((min, max)) = mesh.bounds() {
        println!("\nBounding Box:");
        println!("  Min: [{:.6}, {:.6}, {:.6}]", min[0], min[1], min[2]);
        println!("  Max: [{:.6}, {:.6}, {:.6}]", max[0], max[1], max[2]);
        println!(
            "  Size: [{:.6}, {:.6}, {:.6}]",
            max[0] - min[0],
            max[1] - min[1],
            max[2] - min[2]
        );
    }
    Ok(())
}

fn series_info(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let path = file_arg(matches)?;
    let elements = matches
        .get_one::<usize>("elements")
        .copied()
        .ok_or("missing --elements")?;
    let frame = matches.get_one::<u64>("FRAME").copied().unwrap_or(0);

    let mut series = FrameSeries::open(path, elements)?;
    let layout = *series.layout();
    let total_len = std::fs::metadata(path)?.len();
    let loaded = series.load_frame(frame).map(|()| min_max(series.values()));

    if matches.get_flag("json") {
        let frame_report = match &loaded {
            Ok((min, max)) => json!({ "index": frame, "min": min, "max": max }),
            Err(e) => json!({ "index": frame, "error": e.to_string() }),
        };
        let report = json!({
            "file": path,
            "layout": layout,
            "trailing_bytes": layout.trailing_bytes(total_len),
            "frame": frame_report,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Frame Series Information:");
    println!("========================");
    println!("File: {}", path.display());
    println!("Values per frame: {}", layout.element_count);
    println!("Frame size: {} bytes", layout.frame_bytes());
    println!("Frames: {}", layout.frame_count);
    println!("Trailing bytes: {}", layout.trailing_bytes(total_len));

    match loaded {
        Ok((min, max)) => {
            println!("\nFrame {}:", frame);
            println!("  Min: {:.6}", min);
            println!("  Max: {:.6}", max);
        }
        Err(e) => println!("\nFrame {}: {}", frame, e),
    }
    Ok(())
}

fn voxel_info(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let path = file_arg(matches)?;
    let dims: Vec<u32> = matches
        .get_many::<u32>("dims")
        .map(|values| values.copied().collect())
        .unwrap_or_default();
    let &[x, y] = dims.as_slice() else {
        return Err("--dims takes two values".into());
    };

    let grid = decode_voxel_map(path, [x, y])?;
    let histogram = grid.material_histogram();

    if matches.get_flag("json") {
        let report = json!({
            "file": path,
            "dims": grid.dims,
            "instances": grid.instance_count(),
            "materials": histogram,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Voxel Map Information:");
    println!("=====================");
    println!("File: {}", path.display());
    println!("Grid: {} x {} x {}", grid.dims[0], grid.dims[1], grid.dims[2]);
    println!("Instances: {}", grid.instance_count());

    if !histogram.is_empty() {
        println!("\nMaterials:");
        for (material, count) in histogram {
            println!("  {:>3}: {}", material, count);
        }
    }
    Ok(())
}

fn min_max(values: &[f32]) -> (f32, f32) {
    values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}
