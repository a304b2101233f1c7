use anyhow::Result;

pub fn execute() -> Result<()> {
    println!("rtspmon version {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
