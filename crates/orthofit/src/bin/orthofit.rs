//! orthofit CLI: measure a hand photo and fit a brace.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use orthofit::hand::{HandPoseEstimator, JsonPoseEstimator, StaticPoseEstimator};
use orthofit::{OutputImage, Pipeline, PipelineConfig, PipelineReport, PipelineRequest};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "orthofit")]
#[command(about = "Measure a hand photographed next to a 6 cm blue square and fit a wrist brace")]
#[command(version)]
struct Cli {
    /// Input photo (JPEG or PNG).
    #[arg(long)]
    image: PathBuf,

    /// Landmark JSON written by an external hand pose estimator.
    #[arg(long)]
    landmarks: Option<PathBuf>,

    /// Brace template STL to scale.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Skip detection and use the canned hand layout.
    #[arg(long)]
    manual: bool,

    /// Pipeline configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for report.json, the output image and brace.stl.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Log debug output (otherwise `ORTHOFIT_LOG` or `info`).
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    #[cfg(feature = "tracing")]
    {
        let _ = verbose;
        orthofit::core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = if verbose {
            orthofit::core::init_with_level(log::LevelFilter::Debug)
        } else {
            orthofit::core::init_from_env(log::LevelFilter::Info)
        };
    }
}

fn estimator(landmarks: Option<&Path>) -> CliResult<Arc<dyn HandPoseEstimator>> {
    let estimator: Arc<dyn HandPoseEstimator> = match landmarks {
        Some(path) => Arc::new(JsonPoseEstimator::load(path)?),
        None => {
            log::warn!("no --landmarks given; hand detection will report no hand");
            Arc::new(StaticPoseEstimator::no_hand())
        }
    };
    Ok(estimator)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::load_json(path)?,
        None => PipelineConfig::default(),
    };
    let pipeline = Pipeline::new(config, estimator(cli.landmarks.as_deref())?)?;

    let mut request = PipelineRequest::new(std::fs::read(&cli.image)?).manual(cli.manual);
    request.template_path = cli.template.clone();
    let result = pipeline.run(&request)?;

    std::fs::create_dir_all(&cli.out_dir)?;
    let ext = result
        .output_format()
        .extensions_str()
        .first()
        .copied()
        .unwrap_or("png");
    let stem = match result.image {
        OutputImage::Annotated(_) => "annotated",
        OutputImage::Original(_) => "original",
    };
    let image_path = cli.out_dir.join(format!("{stem}.{ext}"));
    std::fs::write(&image_path, result.image.bytes())?;

    if let Some(stl) = &result.stl {
        let stl_path = cli.out_dir.join("brace.stl");
        std::fs::write(&stl_path, stl)?;
        println!("wrote {}", stl_path.display());
    }

    let report_path = cli.out_dir.join("report.json");
    PipelineReport::from_result(&result).write_json(&report_path)?;
    println!("wrote {}", image_path.display());
    println!("wrote {}", report_path.display());
    println!(
        "{}: wrist {} cm, palm {} cm, length {} cm, size {}, {} hand",
        result.tier,
        result.measurements.wrist_width_cm,
        result.measurements.palm_width_cm,
        result.measurements.hand_length_cm,
        result.measurements.size_class,
        result.handedness
    );
    Ok(())
}
