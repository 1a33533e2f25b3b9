// ============================================================================
// Headless mode: run one edit from the command line without opening a window
// ============================================================================
//
// Usage examples:
//   product-editor edit -i shoe.png -p "place on a white studio background"
//   product-editor edit -i shoe.png -r style.jpg -p "match the reference lighting" -o out.png
//   product-editor edit -i edited.png --region 20,30,40,25 -p "remove the scratch"
//   product-editor edit -i "data:image/png;base64,iVBOR..." -p "add a shadow" --data-url
//
// Running with no subcommand opens the editor window.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::codec::{self, ImageAsset};
use crate::error::EditError;
use crate::export;
use crate::pipeline::{EditJob, EditPipeline};
use crate::selection::{self, NormalizedRegion, PercentPoint};
use crate::service::GeminiService;
use crate::state::settings::Settings;

/// Product photo editor backed by a generative image service
#[derive(Parser, Debug)]
#[command(name = "product-editor", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Edit one image and write the result, without opening a window
    Edit(EditArgs),
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Product image to edit (a path or a data: URL)
    #[arg(short, long, value_name = "FILE")]
    pub image: PathBuf,

    /// Editing instruction
    #[arg(short, long)]
    pub prompt: String,

    /// Optional reference image (whole-image edits only; path or data: URL)
    #[arg(short, long, value_name = "FILE", conflicts_with = "region")]
    pub reference: Option<PathBuf>,

    /// Restrict the edit to a region given in percent: x,y,width,height
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_region)]
    pub region: Option<NormalizedRegion>,

    /// Output file. Defaults to edited-image-<timestamp>.png in the current folder.
    #[arg(short, long, value_name = "FILE", conflicts_with = "data_url")]
    pub output: Option<PathBuf>,

    /// Print the result as a data: URL instead of writing a file
    #[arg(long)]
    pub data_url: bool,
}

/// Parse "x,y,w,h" (percent) into a region that stays inside the image
pub fn parse_region(text: &str) -> Result<NormalizedRegion, String> {
    let values: Vec<f32> = text
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid number: {}", e))?;

    let &[x, y, width, height] = values.as_slice() else {
        return Err(format!("expected 4 values, got {}", values.len()));
    };

    if [x, y, width, height].iter().any(|v| !(0.0..=100.0).contains(v)) {
        return Err("values must be between 0 and 100".to_string());
    }

    // Same clamping as a drag: the far corner can't leave the image
    let anchor = PercentPoint { x, y };
    let corner = PercentPoint {
        x: (x + width).min(100.0),
        y: (y + height).min(100.0),
    };
    Ok(selection::span(anchor, corner))
}

/// Run the headless command and return an exit code
pub fn run(command: Command) -> ExitCode {
    let Command::Edit(args) = command;

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run_edit(args)) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

/// Load an image argument: inline `data:` URLs are decoded, anything else is read from disk
pub async fn load_image(arg: &Path) -> Result<ImageAsset, String> {
    let text = arg.to_string_lossy();
    if text.starts_with("data:") {
        let encoded = codec::parse_data_url(&text).map_err(|e| format!("inline image: {}", e))?;
        return codec::decode(&encoded.content, &encoded.format_tag)
            .map_err(|e| format!("inline image: {}", e));
    }

    codec::encode_file(arg)
        .await
        .map_err(|e| format!("{}: {}", arg.display(), e))
}

/// Returns what to print on success: the saved path or the data URL
async fn run_edit(args: EditArgs) -> Result<String, String> {
    let prompt = args.prompt.trim().to_string();
    if prompt.is_empty() {
        return Err("the prompt must not be empty".to_string());
    }
    if args.region.is_some_and(|region| region.is_degenerate()) {
        return Err("the region has no area".to_string());
    }

    let settings = Settings::load();
    let service = GeminiService::new(&settings, Settings::api_key())
        .map_err(|e| EditError::service(e).user_message())?;
    let pipeline = EditPipeline::new(Arc::new(service));

    let image = load_image(&args.image).await?;

    let job = match args.region {
        Some(region) => EditJob::Region {
            base: image,
            region,
            prompt,
        },
        None => {
            let reference = match &args.reference {
                Some(path) => Some(load_image(path).await?),
                None => None,
            };
            EditJob::Whole {
                primary: image,
                reference,
                prompt,
            }
        }
    };

    let edited = pipeline.run(job).await.map_err(|e| {
        tracing::error!("❌ {:?}", e);
        e.user_message()
    })?;

    if args.data_url {
        return Ok(codec::to_data_url(edited.content(), edited.format_tag()));
    }

    let saved = match args.output {
        Some(path) => export::save_png(&edited, &path),
        None => export::save_to_dir(&edited, &std::env::current_dir().unwrap_or_default()),
    };
    saved
        .map(|path| path.display().to_string())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        let region = parse_region("10, 20, 30, 40").unwrap();
        assert_eq!(
            region,
            NormalizedRegion {
                x: 10.0,
                y: 20.0,
                width: 30.0,
                height: 40.0,
            }
        );
    }

    #[test]
    fn test_parse_region_clamps_far_corner() {
        let region = parse_region("80,90,50,50").unwrap();
        assert_eq!(region.x + region.width, 100.0);
        assert_eq!(region.y + region.height, 100.0);
    }

    #[test]
    fn test_parse_region_rejects_bad_input() {
        assert!(parse_region("1,2,3").is_err());
        assert!(parse_region("a,b,c,d").is_err());
        assert!(parse_region("-5,0,10,10").is_err());
    }

    #[test]
    fn test_cli_parses_edit() {
        let cli = Cli::try_parse_from([
            "product-editor",
            "edit",
            "-i",
            "shoe.png",
            "-p",
            "white background",
            "--region",
            "0,0,50,50",
        ])
        .unwrap();

        let Some(Command::Edit(args)) = cli.command else {
            panic!("expected edit subcommand");
        };
        assert_eq!(args.image, PathBuf::from("shoe.png"));
        assert!(args.region.is_some());
    }

    #[test]
    fn test_cli_without_subcommand_opens_window() {
        let cli = Cli::try_parse_from(["product-editor"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[tokio::test]
    async fn test_load_image_accepts_data_url() {
        let asset = load_image(Path::new("data:image/png;base64,QUJD")).await.unwrap();
        assert_eq!(asset.format_tag(), "image/png");
        assert_eq!(asset.content(), "QUJD");
    }

    #[tokio::test]
    async fn test_load_image_reports_bad_inline_image() {
        let err = load_image(Path::new("data:image/png;base64")).await.unwrap_err();
        assert!(err.starts_with("inline image:"));
    }

    #[tokio::test]
    async fn test_load_image_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shoe.png");
        std::fs::write(&path, b"QUJD").unwrap();

        let asset = load_image(&path).await.unwrap();
        assert_eq!(asset.encoded.bytes().unwrap(), b"QUJD".to_vec());
    }

    #[test]
    fn test_data_url_conflicts_with_output() {
        let result = Cli::try_parse_from([
            "product-editor",
            "edit",
            "-i",
            "shoe.png",
            "-p",
            "edit",
            "-o",
            "out.png",
            "--data-url",
        ]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_degenerate_region_rejected_before_loading() {
        let args = EditArgs {
            image: PathBuf::from("/nonexistent.png"),
            prompt: "edit".to_string(),
            reference: None,
            region: Some(parse_region("10,10,0,20").unwrap()),
            output: None,
            data_url: false,
        };
        assert_eq!(run_edit(args).await.unwrap_err(), "the region has no area");
    }
}
