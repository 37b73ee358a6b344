use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use ard_log::{error, info, LevelFilter, LogConfig};
use ard_resource::prelude::*;
use ard_save_load::format::ResourceFormat;
use ard_scene::scene::Scene;
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scene resource to convert. The format is detected from its contents.
    input: PathBuf,
    /// Output path. Defaults to the input path with the extension of the output format.
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Format to write. Defaults to the format of the input.
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,
    /// Write a flattened prefab of the scene instead of the scene itself.
    #[arg(long, default_value_t = false)]
    prefab: bool,
    /// Minimum level of log messages to print.
    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
    /// Folder to write a log file into.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Copy, Clone)]
enum FormatArg {
    Json,
    Xml,
    Binary,
}

impl From<FormatArg> for ResourceFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Json => ResourceFormat::Json,
            FormatArg::Xml => ResourceFormat::Xml,
            FormatArg::Binary => ResourceFormat::Binary,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut log_config = LogConfig::new(args.log_level);
    if let Some(dir) = &args.log_dir {
        log_config = log_config.with_log_dir(dir);
    }
    ard_log::init(log_config).expect("unable to initialize logging");

    match bake(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn bake(args: &Args) -> anyhow::Result<()> {
    let mut resource = SceneResource::new(args.input.display().to_string(), Scene::default());

    info!("Loading scene...");
    let mut source = BufReader::new(File::open(&args.input)?);
    if !resource.load(&mut source) {
        return Err(anyhow::Error::msg(format!(
            "`{}` is not a readable scene resource",
            args.input.display()
        )));
    }
    info!(
        "Loaded {} nodes from a {:?} document",
        resource.scene().len(),
        resource.load_format().unwrap_or_default()
    );

    if let Some(format) = args.format {
        resource.set_save_format_hint(format.into());
    }
    resource.set_prefab(args.prefab);

    let format = resource.default_save_format();
    let out_path = match &args.out {
        Some(path) => path.clone(),
        None => args
            .input
            .with_extension(format.extension().unwrap_or_default()),
    };

    info!("Saving {format:?} to `{}`...", out_path.display());
    let mut dest = BufWriter::new(File::create(&out_path)?);
    if !resource.save_default(&mut dest) {
        return Err(anyhow::Error::msg(format!(
            "unable to write `{}`",
            out_path.display()
        )));
    }
    dest.flush()?;

    Ok(())
}
