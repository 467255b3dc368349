fn main() -> anyhow::Result<()> {
    matkeep::cli::run_cli()
}
