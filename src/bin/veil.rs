use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sha2::Digest as _;

#[derive(Parser, Debug)]
#[command(name = "veil", version, about = "Place text behind the subject of a photo")]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a new project file with one default text layer.
    Init(InitArgs),
    /// Render a project at native resolution and export it.
    Render(RenderArgs),
    /// Render a width-fitted preview PNG.
    Preview(PreviewArgs),
    /// Run background removal on an image and save the cutout.
    Cutout(CutoutArgs),
    /// List font families found in the font directories.
    Fonts(FontsArgs),
}

#[derive(Parser, Debug)]
struct InitArgs {
    /// Background image (PNG, JPEG or GIF).
    #[arg(long)]
    image: PathBuf,

    /// Output project JSON path.
    #[arg(long, default_value = "project.json")]
    out: PathBuf,

    /// Precomputed cutout image to reference from the project.
    #[arg(long)]
    cutout_file: Option<PathBuf>,

    /// Overwrite an existing project file.
    #[arg(long)]
    force: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Directory receiving `text-behind-image.<ext>`.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Output format (defaults to the project's export format).
    #[arg(long, value_enum)]
    format: Option<veil::ExportFormat>,

    /// JPEG quality 1..=100 (defaults to the project's setting).
    #[arg(long)]
    quality: Option<u8>,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Preview width in pixels; height follows the image aspect ratio.
    #[arg(long)]
    width: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct CutoutArgs {
    /// Input image.
    #[arg(long)]
    image: PathBuf,

    /// Output cutout path.
    #[arg(long)]
    out: PathBuf,

    /// Local program to run instead of remove.bg; `{input}`/`{output}` are substituted.
    #[arg(long, num_args = 1.., allow_hyphen_values = true, value_name = "PROGRAM [ARGS]...")]
    command: Option<Vec<String>>,

    /// Environment variable holding the remove.bg API key.
    #[arg(long, default_value = veil::REMOVE_BG_API_KEY_ENV)]
    api_key_env: String,
}

#[derive(Parser, Debug)]
struct FontsArgs {
    /// Extra font directories to scan (in addition to VEIL_FONT_DIRS).
    #[arg(long)]
    dir: Vec<PathBuf>,

    /// Also scan the font directories of this project.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::Init(args) => cmd_init(args),
        Command::Render(args) => cmd_render(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Cutout(args) => cmd_cutout(args),
        Command::Fonts(args) => cmd_fonts(args),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn cmd_init(args: InitArgs) -> anyhow::Result<()> {
    if args.out.exists() && !args.force {
        anyhow::bail!(
            "'{}' already exists (pass --force to overwrite)",
            args.out.display()
        );
    }

    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("read image '{}'", args.image.display()))?;
    let format = veil::sniff_format(&bytes)?;
    let decoded = veil::decode_source(&bytes, format)?;

    let mut project = veil::Project::new(absolute(&args.image)?);
    if let Some(cutout) = &args.cutout_file {
        project.cutout = veil::CutoutSource::File {
            path: absolute(cutout)?,
        };
    }
    project
        .save(&args.out)
        .with_context(|| format!("write project '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}x{} {:?})",
        args.out.display(),
        decoded.width,
        decoded.height,
        format
    );
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut project = veil::Project::load(&args.in_path)
        .with_context(|| format!("load project '{}'", args.in_path.display()))?;
    if let Some(format) = args.format {
        project.export.format = format;
    }
    if let Some(quality) = args.quality {
        project.export.jpeg_quality = quality;
    }
    project.validate()?;

    let mut session = project.open_session()?;
    let path = session
        .export_to_dir(project.export.format, &args.out_dir)?
        .context("image is not ready for export")?;

    eprintln!("wrote {}", path.display());
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let project = veil::Project::load(&args.in_path)
        .with_context(|| format!("load project '{}'", args.in_path.display()))?;
    let mut session = project.open_session()?;
    let raster = session
        .render_preview(args.width)?
        .context("no image loaded")?;
    let bytes = veil::encode(&raster, veil::ExportFormat::Png, veil::DEFAULT_JPEG_QUALITY)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, bytes)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {} ({}x{})", args.out.display(), raster.width, raster.height);
    Ok(())
}

fn cmd_cutout(args: CutoutArgs) -> anyhow::Result<()> {
    let remover: Box<dyn veil::BackgroundRemover> = match &args.command {
        Some(cmd) => {
            let (program, rest) = cmd.split_first().context("--command needs a program")?;
            Box::new(veil::CommandRemover::new(program.clone(), rest.to_vec()))
        }
        None => remove_bg(&args.api_key_env)?,
    };

    let mut pipeline = veil::ImagePipeline::new();
    let ticket = pipeline.upload(veil::ImageFile::read(&args.image)?)?;
    let source = pipeline.source().context("image upload failed")?;

    let bytes = remover
        .remove_background(source)
        .with_context(|| format!("background removal via {}", remover.name()))?;
    let cutout = veil::decode_image(&bytes).context("decode cutout returned by remover")?;
    if (cutout.width, cutout.height) != (source.decoded.width, source.decoded.height) {
        tracing::warn!(
            cutout_w = cutout.width,
            cutout_h = cutout.height,
            image_w = source.decoded.width,
            image_h = source.decoded.height,
            "cutout size differs from image; it will be scaled when compositing"
        );
    }

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &bytes)
        .with_context(|| format!("write cutout '{}'", args.out.display()))?;
    pipeline.settle(ticket, Ok(bytes));

    eprintln!("wrote {} ({}x{})", args.out.display(), cutout.width, cutout.height);
    Ok(())
}

#[cfg(feature = "remove-bg")]
fn remove_bg(api_key_env: &str) -> anyhow::Result<Box<dyn veil::BackgroundRemover>> {
    Ok(Box::new(veil::RemoveBgApi::from_env(api_key_env)?))
}

#[cfg(not(feature = "remove-bg"))]
fn remove_bg(_api_key_env: &str) -> anyhow::Result<Box<dyn veil::BackgroundRemover>> {
    anyhow::bail!("built without remove.bg support; pass --command")
}

fn cmd_fonts(args: FontsArgs) -> anyhow::Result<()> {
    let mut dirs = args.dir.clone();
    if let Some(p) = &args.in_path {
        let project = veil::Project::load(p)
            .with_context(|| format!("load project '{}'", p.display()))?;
        dirs.extend(project.font_dirs());
    } else {
        dirs.extend(veil::env_font_dirs());
    }

    let mut book = veil::FontBook::new();
    for dir in &dirs {
        if dir.is_dir() {
            book.load_dir(dir);
        } else {
            tracing::debug!(dir = %dir.display(), "font directory missing");
        }
    }

    if book.is_empty() {
        eprintln!("no fonts found");
        return Ok(());
    }
    for face in book.faces() {
        println!(
            "{}\tweight={}\tsha256={}\t{}",
            face.family,
            face.weight,
            sha256_hex(&face.bytes),
            face.source
        );
    }
    Ok(())
}

fn absolute(p: &Path) -> anyhow::Result<PathBuf> {
    std::path::absolute(p).with_context(|| format!("resolve path '{}'", p.display()))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
