use std::env;
use std::fs;
use std::process;

use log::LevelFilter;

use humdrum::report::{
    csv_report, data_type_report, duration_report, spine_info_report, track_report, FileSummary,
};
use humdrum::{HumdrumError, HumdrumFile, HumdrumFileSet, ReadOptions};

const USAGE: &str = "Usage: humdrum [--no-rhythm] [--strophes] [--config FILE] \
                     [--summary|--spines|--types|--tracks|--durations|--csv] FILE...";

#[derive(Clone, Copy, PartialEq)]
enum Output {
    Summary,
    Spines,
    Types,
    Tracks,
    Durations,
    Csv,
}

/// Logging is controlled with RUST_LOG; see docs for the env_logger crate.
fn main() {
    let mut log_builder = env_logger::builder();
    if env::var("RUST_LOG").is_err() {
        log_builder.filter_level(LevelFilter::Info);
    }
    log_builder.init();

    let args: Vec<String> = env::args().skip(1).collect();

    let mut no_rhythm = false;
    let mut strophes = false;
    let mut config_path: Option<String> = None;
    let mut output = Output::Summary;
    let mut inputs: Vec<String> = Vec::new();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--no-rhythm" => no_rhythm = true,
            "--strophes" => strophes = true,
            "--config" => match iter.next() {
                Some(path) => config_path = Some(path),
                None => {
                    eprintln!("--config needs a file name");
                    eprintln!("{}", USAGE);
                    process::exit(1);
                }
            },
            "--summary" => output = Output::Summary,
            "--spines" => output = Output::Spines,
            "--types" => output = Output::Types,
            "--tracks" => output = Output::Tracks,
            "--durations" => output = Output::Durations,
            "--csv" => output = Output::Csv,
            "-h" | "--help" => {
                println!("{}", USAGE);
                return;
            }
            flag if flag.starts_with("--") => {
                eprintln!("Unknown option '{}'", flag);
                eprintln!("{}", USAGE);
                process::exit(1);
            }
            input => inputs.push(input.to_string()),
        }
    }

    if inputs.is_empty() {
        eprintln!("{}", USAGE);
        process::exit(1);
    }

    let mut options = match &config_path {
        Some(path) => match load_options(path) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path, e);
                process::exit(1);
            }
        },
        None => ReadOptions::default(),
    };
    if no_rhythm {
        options.analyze_rhythm = false;
    }
    if strophes {
        options.analyze_strophes = true;
    }
    if output == Output::Durations && !options.analyze_rhythm {
        eprintln!("--durations needs rhythm analysis; drop --no-rhythm");
        process::exit(1);
    }

    let mut failed = false;
    for input in &inputs {
        let source = match fs::read_to_string(input) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", input, e);
                process::exit(1);
            }
        };

        let set = match HumdrumFileSet::read_string_with(&source, &options) {
            Ok(set) => set,
            Err(e) => {
                eprintln!("{}: {}", input, e);
                failed = true;
                continue;
            }
        };

        let labelled = inputs.len() > 1 || set.len() > 1;
        for file in &set {
            if labelled {
                let name = file.segment_name().unwrap_or(input);
                println!("!!!!SEGMENT: {}", name);
            }
            match render(file, output) {
                Ok(text) => print!("{}", text),
                Err(e) => {
                    eprintln!("{}: {}", input, e);
                    failed = true;
                }
            }
        }
    }

    if failed {
        process::exit(1);
    }
}

fn load_options(path: &str) -> Result<ReadOptions, HumdrumError> {
    let content = fs::read_to_string(path)?;
    ReadOptions::from_yaml(&content)
}

fn render(file: &HumdrumFile, output: Output) -> Result<String, HumdrumError> {
    match output {
        Output::Summary => FileSummary::from_file(file).to_yaml(),
        Output::Spines => Ok(spine_info_report(file)),
        Output::Types => Ok(data_type_report(file)),
        Output::Tracks => Ok(track_report(file)),
        Output::Durations => duration_report(file),
        Output::Csv => Ok(csv_report(file)),
    }
}
