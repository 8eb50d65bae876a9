use anyhow::Result;
use clap::Parser;
use onnx_aircraft::{
    config::{Config, DEFAULT_DETECTOR_MODEL},
    image::ImageLoader,
    models::Detector,
    report::{annotate_detections, load_system_font, ResultFormatter},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "detect")]
#[command(about = "Run the aircraft detector on one image at a low confidence threshold")]
struct Args {
    /// Image to run detection on
    #[arg(env = "AIRCRAFT_DET_IMAGE")]
    image: PathBuf,

    /// Detection model path (ONNX)
    #[arg(long, env = "AIRCRAFT_DET_MODEL", default_value = DEFAULT_DETECTOR_MODEL)]
    model: PathBuf,

    /// Confidence threshold
    #[arg(long, default_value_t = 0.05)]
    conf: f32,

    /// NMS IoU threshold
    #[arg(long, default_value_t = 0.7)]
    iou: f32,

    /// Annotated output image
    #[arg(long, default_value = "detections.png")]
    output: PathBuf,

    /// Number of inference threads
    #[arg(long)]
    threads: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    onnx_aircraft::init_tracing(&args.log_level);

    if let Err(e) = run(&args) {
        e.log();
        return Err(e.into());
    }

    Ok(())
}

fn run(args: &Args) -> onnx_aircraft::Result<()> {
    let config = Config::new(args.threads)?
        .with_detector_model(&args.model)
        .with_detection_thresholds(args.conf, args.iou)?;

    let image = ImageLoader::from_path(&args.image)?;

    let detector = Detector::new(&config)?;
    let detections = detector.detect(&image)?;

    for detection in &detections {
        println!("{}", ResultFormatter::detection_line(detection));
    }
    if detections.is_empty() {
        tracing::info!("No detections above confidence {}", args.conf);
    }

    let mut canvas = image.to_rgb8();
    let font = load_system_font();
    annotate_detections(&mut canvas, &detections, font.as_ref());
    canvas.save(&args.output)?;
    tracing::info!("Annotated image written to {}", args.output.display());

    Ok(())
}
