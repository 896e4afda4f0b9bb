use std::{fs, path::Path};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, LevelFilter};
use mvcalib::core::{logger, nan_pt2};
use mvcalib::prelude::*;
use serde::{Deserialize, Serialize};

/// Calibration CLI for single- and multi-camera planar setups.
#[derive(Debug, Parser)]
#[command(author, version, about = "Multi-view planar camera calibration")]
struct Args {
    /// Path to a JSON file with the board layout and refined control points.
    #[arg(long)]
    input: String,

    /// Optional path to a JSON CalibConfig. Defaults are used if omitted.
    #[arg(long)]
    config: Option<String>,

    /// Calibrate one camera only, or the full multi-camera setup.
    #[arg(long, value_enum, default_value_t = Mode::Multi)]
    mode: Mode,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Single,
    Multi,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
        }
    }
}

/// Control points of one image. JSON has no NaN, so missing points are `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InputImage {
    name: String,
    #[serde(default)]
    camera: usize,
    #[serde(default)]
    placement: usize,
    /// `[height, width]` in pixels.
    size: (usize, usize),
    points: Vec<Option<[f64; 2]>>,
}

impl From<InputImage> for ImageObservation {
    fn from(image: InputImage) -> Self {
        ImageObservation {
            name: image.name,
            camera: image.camera,
            placement: image.placement,
            size: image.size,
            points: image
                .points
                .into_iter()
                .map(|p| p.map_or_else(nan_pt2, |[x, y]| Pt2::new(x, y)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CalibInput {
    board: BoardGeometry,
    images: Vec<InputImage>,
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value =
        serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(value)
}

fn run_from_files(input_path: &str, config_path: Option<&str>, mode: Mode) -> Result<String> {
    let input: CalibInput = load_json_file(Path::new(input_path))?;
    let config = match config_path {
        Some(path) => CalibConfig::load(path)?,
        None => CalibConfig::default(),
    };
    let observations: Vec<ImageObservation> =
        input.images.into_iter().map(ImageObservation::from).collect();
    info!(
        "calibrating {} images of a {}-point board",
        observations.len(),
        input.board.num_control_points()
    );

    let json = match mode {
        Mode::Single => {
            let calib = calibrate_single(&observations, &input.board, &config)?;
            info!("rms reprojection error {:.4} px", calib.stats.rms);
            serde_json::to_string_pretty(&calib)?
        }
        Mode::Multi => {
            let calib = calibrate_multi(&observations, &input.board, &config)?;
            info!("rms reprojection error {:.4} px", calib.stats.rms);
            serde_json::to_string_pretty(&calib)?
        }
    };
    Ok(json)
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    logger::init_with_level(args.log_level.into())?;
    let json = run_from_files(&args.input, args.config.as_deref(), args.mode)?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvcalib::core::synthetic::planar;
    use tempfile::NamedTempFile;

    fn write_json<T: Serialize>(value: &T, path: &Path) {
        serde_json::to_writer_pretty(fs::File::create(path).unwrap(), value).unwrap();
    }

    fn synthetic_input() -> CalibInput {
        let board = BoardGeometry::checker(7, 5, 0.03).unwrap();
        let cam = CameraModel::new(
            Intrinsics::SingleFocal {
                f: 800.0,
                cx: 319.5,
                cy: 239.5,
            },
            Distortion::zeros(DistortionKind::RadTan4),
        );
        let poses = planar::poses_around_board(&board, 4, 0.6, 0.4);
        let images = poses
            .iter()
            .enumerate()
            .map(|(i, pose)| {
                let mut points: Vec<Option<[f64; 2]>> = planar::project_board(&cam, pose, &board)
                    .iter()
                    .map(|p| Some([p.x, p.y]))
                    .collect();
                if i == 1 {
                    points[3] = None;
                }
                InputImage {
                    name: format!("img{i}"),
                    camera: 0,
                    placement: i,
                    size: (480, 640),
                    points,
                }
            })
            .collect();
        CalibInput { board, images }
    }

    #[test]
    fn missing_points_become_nan() {
        let input = synthetic_input();
        let obs = ImageObservation::from(input.images[1].clone());
        assert!(obs.points[3].x.is_nan());
        assert!(obs.points[4].x.is_finite());
    }

    #[test]
    fn helper_smoke_test() {
        let input_file = NamedTempFile::new().unwrap();
        let config_file = NamedTempFile::new().unwrap();
        write_json(&synthetic_input(), input_file.path());
        fs::write(config_file.path(), r#"{ "distortion": "None" }"#).unwrap();

        let json = run_from_files(
            input_file.path().to_str().unwrap(),
            Some(config_file.path().to_str().unwrap()),
            Mode::Multi,
        )
        .expect("cli helper should succeed");

        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        let rms = report["stats"]["rms"].as_f64().unwrap();
        assert!(rms < 1e-3, "rms too high: {rms}");
        assert_eq!(report["cameras"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn single_mode_reports_rigids() {
        let input_file = NamedTempFile::new().unwrap();
        write_json(&synthetic_input(), input_file.path());

        let json = run_from_files(input_file.path().to_str().unwrap(), None, Mode::Single).unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(report["rigids"].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn missing_input_is_an_error() {
        assert!(run_from_files("/nonexistent/input.json", None, Mode::Multi).is_err());
    }
}
