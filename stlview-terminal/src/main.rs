/// stlview terminal viewer
///
/// Controls:
///   - WASD / Arrow Keys: Orbit the camera
///   - +/-: Zoom
///   - Q/ESC: Quit
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use stlview_core::config::{
    AUTO_ROTATE_ATTRIBUTE, COLOR_ATTRIBUTE, MATERIAL_TYPE_ATTRIBUTE, MODEL_ATTRIBUTE,
};
use stlview_core::{FileFetcher, Rgb};
use stlview_terminal::{terminal_viewport, TerminalApp};
use tracing_subscriber::filter::LevelFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum MaterialArg {
    /// Shaded, specular surface
    Material,
    /// Flat wireframe
    Wireframe,
}

#[derive(Parser)]
#[command(name = "stlview-terminal")]
#[command(about = "Render an STL model in the terminal")]
struct Cli {
    /// STL file to display
    model: PathBuf,

    /// Tint as a hexadecimal color starting with '#'
    #[arg(short, long, default_value = "#696969", value_parser = parse_color)]
    color: String,

    /// Surface style
    #[arg(short, long, value_enum, default_value_t = MaterialArg::Material)]
    material: MaterialArg,

    /// Slowly spin the camera around the model
    #[arg(long)]
    auto_rotate: bool,

    /// Target frame rate
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=120))]
    fps: u32,

    /// Write debug logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_color(value: &str) -> Result<String, String> {
    if !value.starts_with('#') {
        return Err(format!(
            "the color must be a hexadecimal value starting with '#', got {value}"
        ));
    }
    Rgb::from_hex(value)
        .map(|_| value.to_string())
        .map_err(|e| e.to_string())
}

impl Cli {
    fn attributes(&self) -> BTreeMap<String, String> {
        let material = match self.material {
            MaterialArg::Material => "material",
            MaterialArg::Wireframe => "wireframe",
        };
        BTreeMap::from([
            (MODEL_ATTRIBUTE.to_string(), self.model.display().to_string()),
            (COLOR_ATTRIBUTE.to_string(), self.color.clone()),
            (MATERIAL_TYPE_ATTRIBUTE.to_string(), material.to_string()),
            (AUTO_ROTATE_ATTRIBUTE.to_string(), self.auto_rotate.to_string()),
        ])
    }
}

fn init_logging(path: Option<&PathBuf>) -> Result<()> {
    // The alternate screen owns stdout and stderr, so logs only go to a file
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(LevelFilter::DEBUG)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let viewport = terminal_viewport().context("reading terminal size")?;
    let mut app = TerminalApp::new(io::stdout(), viewport, &cli.attributes(), cli.fps)?;
    app.run(&FileFetcher::new())
        .with_context(|| format!("viewing {}", cli.model.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stlview_core::{MaterialMode, ViewerConfig};

    #[test]
    fn test_cli_maps_to_attributes() {
        let cli = Cli::parse_from(["stlview-terminal", "part.stl", "--material", "wireframe", "--auto-rotate"]);
        let config = ViewerConfig::from_attributes(&cli.attributes()).unwrap();
        assert_eq!(config.model_source, "part.stl");
        assert_eq!(config.tint, Rgb::from_u32(0x696969));
        assert_eq!(config.material_mode, MaterialMode::Wireframe);
        assert!(config.auto_rotate);
    }

    #[test]
    fn test_default_material_is_shaded() {
        let cli = Cli::parse_from(["stlview-terminal", "part.stl", "-c", "#00ff00"]);
        let config = ViewerConfig::from_attributes(&cli.attributes()).unwrap();
        assert_eq!(config.material_mode, MaterialMode::Solid);
        assert!(!config.auto_rotate);
    }

    #[test]
    fn test_color_must_start_with_hash() {
        assert!(Cli::try_parse_from(["stlview-terminal", "part.stl", "-c", "0x00ff00"]).is_err());
        assert!(Cli::try_parse_from(["stlview-terminal", "part.stl", "-c", "#00ff0"]).is_err());
        assert!(Cli::try_parse_from(["stlview-terminal", "part.stl", "-m", "shiny"]).is_err());
    }
}
