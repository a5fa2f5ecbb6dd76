fn main() -> Result<(), Box<dyn std::error::Error>> {
    sumgen::build::Build::new()
        .file("src/shapes.sum")
        .compile()?;
    Ok(())
}
