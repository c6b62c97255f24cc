//! terrain-sim CLI - heightfield generation and erosion.
//!
//! Generate noise or shape-based terrain, erode it, and run frame-based
//! erosion pipelines described in JSON.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use terrain_sim::erosion::{run_passes, ErosionConfig, ErosionSimulator, ExecutionMode, ThermalConfig, ThermalRelaxer};
use terrain_sim::export::{
    expected_file_size, export_field_png, export_field_raw, frame_path, PngExportOptions, RawFormat,
};
use terrain_sim::pipeline::{validate, JobExecutor, ModelingConfig, ModelingMethod, PipelineConfig};
use terrain_sim::Field;

/// Heightfield terrain generator and erosion simulator.
#[derive(Parser)]
#[command(name = "terrain-sim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a heightfield, optionally erode it, and export it.
    Generate {
        /// Grid width in cells.
        #[arg(long, default_value = "512")]
        width: usize,

        /// Grid height in cells.
        #[arg(long, default_value = "512")]
        height: usize,

        /// Random seed for reproducible generation.
        #[arg(short, long)]
        seed: Option<u32>,

        /// Terrain generator.
        #[arg(short, long, default_value = "fbm")]
        method: Method,

        /// Output directory for generated files.
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Base name for output files.
        #[arg(short, long, default_value = "terrain")]
        name: String,

        /// Export format.
        #[arg(short, long, default_value = "png")]
        format: ExportFormat,

        /// Number of noise octaves (1-16).
        #[arg(long, default_value = "6")]
        octaves: u32,

        /// Base noise frequency in cycles per cell.
        #[arg(long, default_value = "0.01")]
        frequency: f32,

        /// Noise amplitude.
        #[arg(long, default_value = "50.0")]
        amplitude: f32,

        /// Frequency multiplier per octave (lacunarity).
        #[arg(long, default_value = "2.0")]
        lacunarity: f32,

        /// Amplitude decay per octave (persistence).
        #[arg(long, default_value = "0.5")]
        persistence: f32,

        /// Radius of the radial shapes, in cells.
        #[arg(long, default_value = "128.0")]
        radius: f32,

        /// Peak height of the cone and sigmoid shapes.
        #[arg(long, default_value = "100.0")]
        peak: f32,

        // Erosion options
        /// Particles per erosion pass (0 skips erosion).
        #[arg(long, default_value = "50000")]
        particles: u32,

        /// Number of erosion passes.
        #[arg(long, default_value = "1")]
        passes: u32,

        /// Erosion brush radius in cells.
        #[arg(long, default_value = "1")]
        erosion_radius: u32,

        /// Trace particles in parallel batches of this size.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Thermal relaxation iterations after each pass (0 skips relaxation).
        #[arg(long, default_value = "0")]
        thermal_iters: u32,

        /// Angle of repose in degrees.
        #[arg(long, default_value = "40")]
        talus_angle_deg: f32,
    },

    /// Run a JSON pipeline and export the final frame.
    Run {
        /// Pipeline configuration file.
        #[arg(short, long)]
        config: PathBuf,

        /// Output directory for exported frames.
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Base name for output files.
        #[arg(short, long, default_value = "frame")]
        name: String,

        /// Export format.
        #[arg(short, long, default_value = "png")]
        format: ExportFormat,

        /// Also export every Nth frame (0 exports only the final frame).
        #[arg(long, default_value = "0")]
        every: u32,
    },

    /// Show memory and file size estimates for a grid.
    Info {
        /// Grid width in cells.
        #[arg(long, default_value = "512")]
        width: usize,

        /// Grid height in cells.
        #[arg(long, default_value = "512")]
        height: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    Perlin,
    Fbm,
    SemiSphere,
    Cone,
    Sigmoid,
}

impl From<Method> for ModelingMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Perlin => ModelingMethod::Perlin,
            Method::Fbm => ModelingMethod::Fbm,
            Method::SemiSphere => ModelingMethod::SemiSphere,
            Method::Cone => ModelingMethod::Cone,
            Method::Sigmoid => ModelingMethod::Sigmoid,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    /// 16-bit PNG (universal compatibility).
    Png,
    /// 16-bit RAW little-endian (Unity).
    Raw,
    /// 32-bit float RAW (high precision).
    RawFloat,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Raw => "raw",
            ExportFormat::RawFloat => "r32",
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            width,
            height,
            seed,
            method,
            output,
            name,
            format,
            octaves,
            frequency,
            amplitude,
            lacunarity,
            persistence,
            radius,
            peak,
            particles,
            passes,
            erosion_radius,
            batch_size,
            thermal_iters,
            talus_angle_deg,
        } => {
            let seed = seed.unwrap_or_else(|| {
                use std::time::{SystemTime, UNIX_EPOCH};
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_nanos() as u32)
                    .unwrap_or(0)
            });
            let modeling = ModelingConfig {
                method: method.into(),
                seed,
                frequency,
                amplitude,
                octaves,
                persistence,
                lacunarity,
                radius,
                height: peak,
            };
            let erosion = ErosionConfig {
                particle_count: particles,
                radius: erosion_radius,
                seed: seed as u64,
                mode: batch_size.map_or(ExecutionMode::Sequential, |batch_size| ExecutionMode::Batched { batch_size }),
                ..Default::default()
            };
            let thermal = ThermalConfig {
                talus_angle: talus_angle_deg.to_radians(),
                iterations: thermal_iters,
                ..Default::default()
            };
            run_generate(width, height, &modeling, &erosion, passes, &thermal, &output, &name, format);
        }
        Commands::Run {
            config,
            output,
            name,
            format,
            every,
        } => {
            run_pipeline(&config, &output, &name, format, every);
        }
        Commands::Info { width, height } => {
            run_info(width, height);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_generate(
    width: usize,
    height: usize,
    modeling: &ModelingConfig,
    erosion: &ErosionConfig,
    passes: u32,
    thermal: &ThermalConfig,
    output: &Path,
    name: &str,
    format: ExportFormat,
) {
    println!("terrain-sim - Heightfield Generator");
    println!("===================================");
    println!("Grid: {}x{}", width, height);
    println!("Seed: {}", modeling.seed);
    println!("Output: {}", output.display());

    let start = Instant::now();

    println!("\nGenerating terrain ({:?})...", modeling.method);
    let mut field = modeling.build(width, height).unwrap_or_else(|e| {
        eprintln!("Error during generation: {}", e);
        std::process::exit(1);
    });

    if erosion.particle_count > 0 && passes > 0 {
        let simulator = ErosionSimulator::new(erosion.clone()).unwrap_or_else(|e| {
            eprintln!("Error in erosion settings: {}", e);
            std::process::exit(1);
        });
        let relaxer = if thermal.iterations > 0 {
            Some(ThermalRelaxer::new(thermal.clone()).unwrap_or_else(|e| {
                eprintln!("Error in thermal settings: {}", e);
                std::process::exit(1);
            }))
        } else {
            None
        };

        println!(
            "Eroding: {} passes x {} particles{}",
            passes,
            erosion.particle_count,
            if relaxer.is_some() { " + thermal relaxation" } else { "" }
        );
        for report in run_passes(&mut field, &simulator, passes, relaxer.as_ref()) {
            println!(
                "  [{}/{}] eroded {:.2}, deposited {:.2}, max {:.4} (ceiling {:.4}), discarded {}",
                report.pass + 1,
                passes,
                report.erosion.eroded,
                report.erosion.deposited,
                report.field.max,
                report.erosion.initial_max_height,
                report.erosion.particles_discarded,
            );
        }
    } else {
        println!("Erosion: SKIPPED");
    }

    println!("Generation completed in {:.2?}", start.elapsed());

    let stats = field.min_max_mean();
    println!("Height range: [{:.4}, {:.4}], mean {:.4}", stats.min, stats.max, stats.mean);

    println!("\nExporting heightmap...");
    std::fs::create_dir_all(output).unwrap_or_else(|e| {
        eprintln!("Error creating output directory: {}", e);
        std::process::exit(1);
    });
    let path = output.join(format!("{}.{}", name, format.extension()));
    export(&field, &path, format);
    println!("  Exported {}", path.display());
}

fn run_pipeline(config_path: &Path, output: &Path, name: &str, format: ExportFormat, every: u32) {
    let config = PipelineConfig::from_file(config_path).unwrap_or_else(|e| {
        eprintln!("Error loading {}: {}", config_path.display(), e);
        std::process::exit(1);
    });

    println!("terrain-sim - Pipeline Runner");
    println!("=============================");
    println!("Config: {}", config_path.display());
    println!("Grid: {}x{}", config.width, config.height);
    println!("Frames: {}", config.total_frames);
    println!("Jobs: {}", config.jobs.len());

    let report = validate(&config);
    for warning in &report.warnings {
        println!("  Warning: {}", warning);
    }
    if !report.is_valid {
        for error in &report.errors {
            eprintln!("Error: {}", error);
        }
        std::process::exit(1);
    }

    let executor = JobExecutor::new(&config).unwrap_or_else(|e| {
        eprintln!("Error preparing jobs: {}", e);
        std::process::exit(1);
    });
    let mut field = config.initial_field().unwrap_or_else(|e| {
        eprintln!("Error during initial modeling: {}", e);
        std::process::exit(1);
    });

    std::fs::create_dir_all(output).unwrap_or_else(|e| {
        eprintln!("Error creating output directory: {}", e);
        std::process::exit(1);
    });

    let start = Instant::now();
    let total = config.total_frames;
    executor
        .run_with_callbacks(
            &mut field,
            |_, job_name, frame| {
                println!("  [{}/{}] Starting: {}", frame, total, job_name);
            },
            |_, job_name, frame| {
                println!("  [{}/{}] Completed: {}", frame, total, job_name);
            },
            |frame, field| {
                if every > 0 && frame % every == 0 && frame != total {
                    export(field, &frame_path(output, name, frame, format.extension()), format);
                }
            },
        )
        .unwrap_or_else(|e| {
            eprintln!("Error during pipeline execution: {}", e);
            std::process::exit(1);
        });

    println!("Pipeline completed in {:.2?}", start.elapsed());
    let stats = field.min_max_mean();
    println!("Height range: [{:.4}, {:.4}], mean {:.4}", stats.min, stats.max, stats.mean);

    let path = frame_path(output, name, total, format.extension());
    export(&field, &path, format);
    println!("  Exported {}", path.display());
}

fn export(field: &Field, path: &Path, format: ExportFormat) {
    let stats = field.min_max_mean();
    let max = if stats.max > stats.min { stats.max } else { stats.min + 1.0 };
    let result = match format {
        ExportFormat::Png => export_field_png(field, path, &PngExportOptions::auto_range(field)).map_err(|e| e.to_string()),
        ExportFormat::Raw => {
            export_field_raw(field, path, RawFormat::R16LittleEndian, stats.min, max).map_err(|e| e.to_string())
        }
        ExportFormat::RawFloat => {
            export_field_raw(field, path, RawFormat::R32Float, stats.min, max).map_err(|e| e.to_string())
        }
    };
    if let Err(e) = result {
        eprintln!("Error exporting {}: {}", path.display(), e);
        std::process::exit(1);
    }
}

fn run_info(width: usize, height: usize) {
    let cells = (width as u64) * (height as u64);

    let bytes_heights = cells * 4; // f32
    let bytes_png = expected_file_size(width, height, RawFormat::R16LittleEndian);
    let bytes_raw_r16 = expected_file_size(width, height, RawFormat::R16LittleEndian);
    let bytes_raw_r32 = expected_file_size(width, height, RawFormat::R32Float);

    println!("terrain-sim - Grid Info");
    println!("=======================");
    println!();
    println!("Grid: {}x{}", width, height);
    println!("Cells: {:>12}", cells);
    if cells > terrain_sim::terrain::DEFAULT_MAX_CELLS as u64 {
        println!("  Exceeds the default limit of {} cells", terrain_sim::terrain::DEFAULT_MAX_CELLS);
    }
    println!();
    println!("Memory usage (in-memory):");
    println!("  Heights:        {:>12} bytes ({:.2} MB)", bytes_heights, bytes_heights as f64 / 1024.0 / 1024.0);
    println!("  Batch snapshot: {:>12} bytes ({:.2} MB)", bytes_heights, bytes_heights as f64 / 1024.0 / 1024.0);
    println!();
    println!("Export file sizes:");
    println!("  PNG (16-bit):   {:>8} bytes ({:.2} MB) uncompressed", bytes_png, bytes_png as f64 / 1024.0 / 1024.0);
    println!("  RAW (R16):      {:>8} bytes ({:.2} MB)", bytes_raw_r16, bytes_raw_r16 as f64 / 1024.0 / 1024.0);
    println!("  RAW (R32):      {:>8} bytes ({:.2} MB)", bytes_raw_r32, bytes_raw_r32 as f64 / 1024.0 / 1024.0);
    println!();

    println!("Engine compatibility notes:");
    if width == height && is_power_of_two(width) {
        println!("  Unity:    OK (square, power of 2)");
    } else {
        println!("  Unity:    Prefers square power-of-2 grids");
    }
    if width == height && width > 1 && is_power_of_two(width - 1) {
        println!("  Unreal:   OK (power-of-2 + 1)");
    } else {
        println!("  Unreal:   Recommended size {}x{} (power-of-2 + 1)", width.next_power_of_two() + 1, width.next_power_of_two() + 1);
    }
}

fn is_power_of_two(n: usize) -> bool {
    n > 0 && (n & (n - 1)) == 0
}
