fn main() -> anyhow::Result<()> {
    levelcodec::cli::run_cli()
}
