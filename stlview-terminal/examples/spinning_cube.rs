/// Example: view a generated cube without touching the filesystem
///
/// Usage: cargo run --example spinning_cube -- [#rrggbb]
use std::env;
use std::io;
use stlview_core::loader::encode_binary_stl;
use stlview_core::{MemoryFetcher, Mesh};
use stlview_terminal::{terminal_viewport, AppError, TerminalApp};

fn main() -> Result<(), AppError> {
    let color = env::args().nth(1).unwrap_or_else(|| "#00c0ff".to_string());

    // Hand the STL bytes over in memory, the same way an embedding app passes inline model text
    let fetcher = MemoryFetcher::new().with_asset("cube.stl", encode_binary_stl(&Mesh::cube(40.0)));
    let attributes = [
        ("model", "cube.stl"),
        ("color", color.as_str()),
        ("materialType", "material"),
        ("auto_rotate", "true"),
    ];

    let mut app = TerminalApp::new(io::stdout(), terminal_viewport()?, &attributes, 30)?;
    app.run(&fetcher)?;

    println!("Thank you for using stlview!");
    Ok(())
}
