use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "maquette", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Flatten one view of a layout document into a PNG.
    Compose(ComposeArgs),
    /// Parse and validate a layout document.
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Input layout JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Garment view to flatten.
    #[arg(long, value_enum, default_value_t = ViewChoice::Front)]
    view: ViewChoice,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Directory image sources resolve against (defaults to the layout's directory).
    #[arg(long)]
    assets: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input layout JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ViewChoice {
    Front,
    Back,
    Side,
}

impl From<ViewChoice> for maquette::ApparelView {
    fn from(choice: ViewChoice) -> Self {
        match choice {
            ViewChoice::Front => maquette::ApparelView::Front,
            ViewChoice::Back => maquette::ApparelView::Back,
            ViewChoice::Side => maquette::ApparelView::Side,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Validate(args) => cmd_validate(args),
    }
}

fn read_layout_json(path: &Path) -> anyhow::Result<maquette::StudioDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("open layout '{}'", path.display()))?;
    let doc = maquette::StudioDocument::from_json_str(&text)?;
    Ok(doc)
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let doc = read_layout_json(&args.in_path)?;

    let assets_root = match args.assets {
        Some(dir) => dir,
        None => args
            .in_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf(),
    };

    let mut studio =
        maquette::Studio::from_document(doc, maquette::AssetLibrary::new(assets_root));
    let png = studio.composite_png(args.view.into())?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let doc = read_layout_json(&args.in_path)?;

    let placed: usize = maquette::ApparelView::ALL
        .iter()
        .map(|view| doc.layouts.layout(*view).elements.len())
        .sum();
    eprintln!(
        "{}: ok ({} placed element{})",
        args.in_path.display(),
        placed,
        if placed == 1 { "" } else { "s" }
    );
    Ok(())
}
