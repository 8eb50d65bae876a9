use anyhow::Result;
use clap::Parser;
use image::DynamicImage;
use onnx_aircraft::{
    config::{Config, DEFAULT_CLASSIFIER_MODEL},
    image::ImageLoader,
    models::Classifier,
    predict::ClassificationPipeline,
    report::{BarChart, ChartStyle, LabelHistogram, ResultFormatter},
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "onnx-aircraft")]
#[command(about = "Classify a single aircraft image as civilian, military or uav")]
struct Args {
    /// Image to classify
    image: Option<PathBuf>,

    /// Classification model path (ONNX)
    #[arg(long, env = "AIRCRAFT_CLS_MODEL", default_value = DEFAULT_CLASSIFIER_MODEL)]
    model: PathBuf,

    /// Number of inference threads
    #[arg(long)]
    threads: Option<usize>,

    /// Print the full prediction as JSON
    #[arg(long)]
    json: bool,

    /// Write a bar chart of the prediction to this path
    #[arg(long)]
    chart: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // 初始化日志系统
    onnx_aircraft::init_tracing(&args.log_level);

    let Some(image_path) = args.image.as_deref() else {
        println!("Error: No image path provided.");
        return Ok(ExitCode::FAILURE);
    };

    // 先解码图像，再加载模型
    let image = match ImageLoader::from_path(image_path) {
        Ok(image) => image,
        Err(e) => {
            println!("Error loading image: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    if let Err(e) = classify(&args, &image) {
        e.log();
        return Err(e.into());
    }

    Ok(ExitCode::SUCCESS)
}

fn classify(args: &Args, image: &DynamicImage) -> onnx_aircraft::Result<()> {
    let config = Config::new(args.threads)?.with_classifier_model(&args.model);
    tracing::info!("Classification model: {}", config.classifier_model.display());

    let classifier = Classifier::new(&config)?;
    let pipeline = ClassificationPipeline::new(classifier, config.preprocess.clone());
    let prediction = pipeline.classify_image(image)?;

    if args.json {
        println!("{}", ResultFormatter::json(&prediction)?);
    } else {
        println!("{}", ResultFormatter::line(&prediction));
    }

    if let Some(chart_path) = &args.chart {
        let histogram = LabelHistogram::from_predictions([&prediction]);
        BarChart::save(&histogram, &ChartStyle::with_system_font(), chart_path)?;
    }

    Ok(())
}
