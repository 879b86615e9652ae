use anyhow::Result;

fn main() -> Result<()> {
    cpra_freq::cli::run()
}
